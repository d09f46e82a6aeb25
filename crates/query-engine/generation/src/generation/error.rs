//! Errors for plan generation.

use query_engine_translation::translation;

/// A type for plan generation errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("LLM is not configured: {0}")]
    Configuration(String),
    #[error("LLM request failed: {source}")]
    Transport {
        #[source]
        source: reqwest::Error,
    },
    #[error("LLM HTTP {status}: {body}")]
    Backend { status: u16, body: String },
    #[error("Unexpected LLM response: {0}")]
    InvalidResponse(String),
    #[error("Failed to parse plan: {message}. Raw: {raw}")]
    PlanParse { message: String, raw: String },
}

impl Error {
    /// Whether another attempt could succeed: only connection and timeout failures qualify.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport { source } => {
                source.is_connect() || source.is_timeout() || source.is_request()
            }
            _ => false,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(source: reqwest::Error) -> Self {
        Error::Transport { source }
    }
}

impl From<translation::error::Error> for Error {
    fn from(error: translation::error::Error) -> Self {
        match error {
            translation::error::Error::PlanParse { message, raw } => {
                Error::PlanParse { message, raw }
            }
            other => Error::PlanParse {
                message: other.to_string(),
                raw: String::new(),
            },
        }
    }
}
