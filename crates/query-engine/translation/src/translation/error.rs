//! Errors for translation.

use query_engine_odata::odata::string::RenderError;
use query_engine_odata::odata::url::UrlError;

/// A type for translation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Render(#[from] RenderError),
    #[error("{0}")]
    Url(#[from] UrlError),
    #[error("Failed to parse plan: {message}")]
    PlanParse { message: String, raw: String },
}

impl Error {
    pub(crate) fn plan_parse(message: impl Into<String>, raw: &str) -> Self {
        Error::PlanParse {
            message: message.into(),
            raw: raw.to_string(),
        }
    }
}
