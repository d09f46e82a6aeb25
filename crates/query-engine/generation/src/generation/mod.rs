pub mod client;
pub mod error;
pub mod prompt;
pub mod response;

pub use client::{GeneratedPlan, PlanGenerator};
pub use error::Error;
