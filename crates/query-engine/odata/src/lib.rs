//! The structured query plan and its compilation into OData request syntax.

pub mod odata;
