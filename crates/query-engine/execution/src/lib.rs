//! Query execution against a 1C OData service.

pub mod entities;
pub mod error;
pub mod metrics;
pub mod query;

pub use error::{format_api_error, Error};
pub use metrics::Metrics;
pub use query::{ODataClient, QueryResult};
