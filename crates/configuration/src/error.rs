//! Errors that can be thrown when processing configuration.

use std::path::PathBuf;

/// The errors that can be thrown when parsing a configuration directory.
#[derive(Debug, thiserror::Error)]
pub enum ParseConfigurationError {
    #[error("parse error on {file_path}:{line}:{column}: {message}")]
    ParseError {
        file_path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("I/O error: {0}")]
    IoErrorButStringified(String),
}

/// The errors that can be thrown when writing a configuration directory.
#[derive(Debug, thiserror::Error)]
pub enum WriteParsedConfigurationError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unable to serialize configuration: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// The errors that can be thrown when turning a parsed configuration into a runtime one.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MakeRuntimeConfigurationError {
    #[error("Missing environment variable '{from_env}': {message}")]
    MissingEnvironmentVariable { from_env: String, message: String },

    #[error("Invalid value for '{setting}': {message}")]
    InvalidValue { setting: String, message: String },
}
