//! Low-level literal syntax of `$filter` expressions.

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

use super::ast::{FilterValue, ValueType};

/// The canonical datetime layout, `YYYY-MM-DDTHH:MM:SS`.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Accepted textual datetime layouts, and whether they carry a time part.
const DATETIME_LAYOUTS: &[(&str, bool)] = &[
    ("%Y-%m-%dT%H:%M:%S", true),
    ("%Y-%m-%dT%H:%M", true),
    ("%Y-%m-%d", false),
    ("%d.%m.%Y %H:%M:%S", true),
    ("%d.%m.%Y %H:%M", true),
    ("%d.%m.%Y", false),
];

/// Errors raised while writing literals.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("Unrecognized datetime format: {0}")]
    InvalidDatetime(String),
}

impl std::fmt::Display for FilterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            FilterValue::Null => write!(f, "null"),
            FilterValue::Bool(b) => write!(f, "{b}"),
            FilterValue::Number(n) => write!(f, "{n}"),
            FilterValue::String(s) => write!(f, "{s}"),
            FilterValue::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
            FilterValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Write `value` as a literal of the given type.
///
/// A null value is always written as `null`, whatever its declared type.
pub fn format_value(value: &FilterValue, value_type: ValueType) -> Result<String, RenderError> {
    if *value == FilterValue::Null {
        return Ok("null".to_string());
    }
    Ok(match value_type {
        ValueType::String => quote(&value.to_string()),
        ValueType::Datetime => format!("datetime'{}'", normalize_datetime(value)?),
        ValueType::Guid => format!("guid'{value}'"),
        ValueType::Boolean => is_truthy(value).to_string(),
        ValueType::Number => value.to_string(),
    })
}

/// Single-quote a string, doubling embedded quotes.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Interpret a value as a boolean: numbers are true unless zero, strings only when they
/// read `true` or `1`.
fn is_truthy(value: &FilterValue) -> bool {
    match value {
        FilterValue::Null => false,
        FilterValue::Bool(b) => *b,
        FilterValue::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        FilterValue::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1"),
        FilterValue::DateTime(_) | FilterValue::Date(_) => true,
    }
}

/// Normalize a date or datetime to `YYYY-MM-DDTHH:MM:SS`.
pub fn normalize_datetime(value: &FilterValue) -> Result<String, RenderError> {
    match value {
        FilterValue::DateTime(dt) => Ok(dt.format(DATETIME_FORMAT).to_string()),
        FilterValue::Date(d) => Ok(d
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .format(DATETIME_FORMAT)
            .to_string()),
        FilterValue::String(s) => normalize_datetime_str(s),
        other => Err(RenderError::InvalidDatetime(other.to_string())),
    }
}

/// Normalize textual `YYYY-MM-DD[THH:MM[:SS]]` or `DD.MM.YYYY[ HH:MM[:SS]]` input.
/// Missing time parts become midnight, missing seconds become `00`.
pub fn normalize_datetime_str(raw: &str) -> Result<String, RenderError> {
    let raw = raw.trim();
    for (layout, has_time) in DATETIME_LAYOUTS {
        let parsed = if *has_time {
            NaiveDateTime::parse_from_str(raw, layout).ok()
        } else {
            NaiveDate::parse_from_str(raw, layout)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        };
        if let Some(parsed) = parsed {
            return Ok(parsed.format(DATETIME_FORMAT).to_string());
        }
    }

    // Anything else with a time separator keeps its text, padded to three time components.
    if let Some((date, time)) = raw.split_once('T') {
        let mut bits: Vec<&str> = time.split(':').take(3).collect();
        while bits.len() < 3 {
            bits.push("00");
        }
        return Ok(format!("{date}T{}", bits.join(":")));
    }

    Err(RenderError::InvalidDatetime(raw.to_string()))
}
