//! Errors for query execution.

use query_engine_odata::odata::url::{QueryParameters, UrlError};

/// A type for query execution errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Configuration(#[from] UrlError),
    #[error("OData request to {url} failed: {source}")]
    Transport {
        url: String,
        elapsed_ms: u64,
        params: QueryParameters,
        #[source]
        source: reqwest::Error,
    },
    #[error("{}", format_api_error(*status, detail))]
    Http {
        status: u16,
        /// The response body, as JSON when it parses, else as a string.
        detail: serde_json::Value,
        url: String,
        elapsed_ms: u64,
        params: QueryParameters,
    },
    #[error("Failed to parse OData response from {url}: {message}")]
    InvalidPayload {
        url: String,
        status: u16,
        elapsed_ms: u64,
        params: QueryParameters,
        message: String,
    },
}

impl Error {
    /// Whether another attempt could succeed: only connection and timeout failures qualify.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport { source, .. } => {
                source.is_connect() || source.is_timeout() || source.is_request()
            }
            _ => false,
        }
    }

    /// The HTTP status the service answered with, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } | Error::InvalidPayload { status, .. } => Some(*status),
            Error::Transport { source, .. } => source.status().map(|status| status.as_u16()),
            Error::Configuration(_) => None,
        }
    }

    /// The parameters of the failed request, if it was sent.
    pub fn params(&self) -> Option<&QueryParameters> {
        match self {
            Error::Transport { params, .. }
            | Error::Http { params, .. }
            | Error::InvalidPayload { params, .. } => Some(params),
            Error::Configuration(_) => None,
        }
    }
}

/// Describe an error response: `HTTP <status> (code=<code>): <message>` for JSON objects,
/// `HTTP <status>: <body>` for anything else.
pub fn format_api_error(status: u16, detail: &serde_json::Value) -> String {
    let text = match detail {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    let object = match detail {
        serde_json::Value::Object(object) => Some(object.clone()),
        serde_json::Value::String(text) => match serde_json::from_str(text) {
            Ok(serde_json::Value::Object(object)) => Some(object),
            _ => None,
        },
        _ => None,
    };
    let Some(object) = object else {
        return format!("HTTP {status}: {text}");
    };

    let code = object.get("code").map_or_else(|| "unknown".to_string(), display_value);
    let message = ["message", "error"]
        .into_iter()
        .filter_map(|key| object.get(key))
        .find(|value| is_truthy(value))
        .map_or(text, display_value);
    format!("HTTP {status} (code={code}): {message}")
}

fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(flag) => *flag,
        serde_json::Value::String(text) => !text.is_empty(),
        serde_json::Value::Array(items) => !items.is_empty(),
        serde_json::Value::Object(fields) => !fields.is_empty(),
        serde_json::Value::Number(number) => number.as_f64() != Some(0.0),
    }
}
