//! Errors surfaced by the planner.

use odata_planner_configuration::error::{MakeRuntimeConfigurationError, ParseConfigurationError};
use query_engine_execution as execution;
use query_engine_generation::generation;
use query_engine_translation::translation;

use crate::state::InitializationError;

/// Everything that can stop a request, from configuration to execution.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    ParseConfiguration(#[from] ParseConfigurationError),
    #[error("{0}")]
    RuntimeConfiguration(#[from] MakeRuntimeConfigurationError),
    #[error("{0}")]
    Initialization(#[from] InitializationError),
    #[error("LLM error: {0}")]
    Generation(#[from] generation::Error),
    #[error("{0}")]
    Translation(#[from] translation::error::Error),
    #[error("{0}")]
    Execution(#[from] execution::Error),
}
