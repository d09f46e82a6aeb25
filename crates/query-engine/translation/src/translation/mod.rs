//! Translate between the structured query plan and flat protocol parameters, and check plans
//! against the metadata index.

pub mod error;
pub mod params;
pub mod plan;
pub mod validation;
