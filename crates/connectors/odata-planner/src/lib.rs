//! Answer natural-language requests for 1C data: pick candidate entities, plan an OData
//! query, repair it against the metadata and run it.

pub mod connector;
pub mod error;
pub mod hints;
pub mod query;
pub mod state;
pub mod summary;
