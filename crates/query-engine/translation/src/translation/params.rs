//! Normalization of loosely shaped protocol parameter maps.

use std::sync::OnceLock;

use regex::Regex;

use query_engine_odata::odata::string::normalize_datetime_str;
use query_engine_odata::odata::url::{entity_url, QueryParameters};

use super::error::Error;

/// Parameter keys that are accepted without their `$` prefix.
const KEYWORDS: [&str; 6] = ["filter", "select", "top", "orderby", "format", "expand"];

fn date_literal_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"'(\d{4}-\d{2}-\d{2}(?:[Tt]\d{2}:\d{2}(?::\d{2})?)?)'")
            .expect("date literal pattern is a valid regex")
    })
}

/// Bring a raw parameter map into canonical form.
///
/// Keys are trimmed, bare keywords get their `$` prefix, null and empty values are dropped,
/// quoted dates inside `$filter` become datetime literals and `$format` defaults to `json`.
pub fn normalize_params(params: Option<&QueryParameters>) -> QueryParameters {
    let mut normalized = QueryParameters::new();

    for (key, value) in params.into_iter().flatten() {
        if value.is_null() || value.as_str() == Some("") {
            continue;
        }
        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        let lowercase = key.to_lowercase();
        let key = if KEYWORDS.contains(&lowercase.as_str()) {
            format!("${lowercase}")
        } else {
            key.to_string()
        };

        let value = match value {
            serde_json::Value::String(filter) if key == "$filter" => {
                serde_json::Value::String(normalize_filter_dates(filter))
            }
            other => other.clone(),
        };
        normalized.insert(key, value);
    }

    normalized
        .entry("$format".to_string())
        .or_insert_with(|| serde_json::Value::String("json".to_string()));
    normalized
}

/// Rewrite quoted `YYYY-MM-DD[THH:MM[:SS]]` literals in a filter as `datetime'...'`.
///
/// Filters that already contain a datetime literal are returned unchanged, as are
/// literals that directly follow another quote or a word character.
pub fn normalize_filter_dates(filter: &str) -> String {
    if filter.to_lowercase().contains("datetime'") {
        return filter.to_string();
    }

    let mut rewritten = String::with_capacity(filter.len());
    let mut last = 0;
    for captures in date_literal_pattern().captures_iter(filter) {
        let (Some(whole), Some(literal)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let preceding = filter[..whole.start()].chars().next_back();
        if matches!(preceding, Some(c) if c == '\'' || c.is_alphanumeric()) {
            continue;
        }
        let Ok(normalized) = normalize_datetime_str(&literal.as_str().replace('t', "T")) else {
            continue;
        };
        rewritten.push_str(&filter[last..whole.start()]);
        rewritten.push_str(&format!("datetime'{normalized}'"));
        last = whole.end();
    }
    rewritten.push_str(&filter[last..]);
    rewritten
}

/// Normalize `params` and resolve the entity URL they will be sent to.
///
/// Returns the URL without a query string, together with the normalized parameters.
pub fn build_request(
    base_url: &str,
    entity: &str,
    params: Option<&QueryParameters>,
) -> Result<(String, QueryParameters), Error> {
    let root = entity_url(base_url, entity)?;
    Ok((root, normalize_params(params)))
}
