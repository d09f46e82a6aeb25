//! Compile an entity name and a parameter mapping into a request URL.

use indexmap::IndexMap;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;

use query_engine_metadata::metadata::EntityPrefix;

/// Protocol parameters in the order they are sent.
pub type QueryParameters = IndexMap<String, serde_json::Value>;

/// The path of the OData service below the base URL.
pub const SERVICE_SUFFIX: &str = "/odata/standard.odata";

const ODATA_SUFFIX: &str = "/odata";
const COLLECTION_SUFFIX: &str = "/standard.odata";

/// Characters always left alone, on top of ASCII alphanumerics.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~');

const ENTITY: &AsciiSet = &UNRESERVED.remove(b'$').remove(b'(').remove(b')');

/// `$filter` keeps the punctuation of the filter syntax readable.
const FILTER: &AsciiSet = &UNRESERVED
    .remove(b'$')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b',')
    .remove(b'=')
    .remove(b'<')
    .remove(b'>')
    .remove(b':')
    .remove(b'+');

const VALUE: &AsciiSet = &UNRESERVED.remove(b'$').remove(b',').remove(b':').remove(b'\'');

const KEY: &AsciiSet = &UNRESERVED.remove(b'$');

/// Errors raised when a request cannot be addressed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("OData base URL is not configured")]
    MissingBaseUrl,
    #[error("OData entity is not specified")]
    MissingEntity,
}

/// The service root for a configured base URL: the base with the service suffix completed.
pub fn service_root(base_url: &str) -> Result<String, UrlError> {
    let base = base_url.trim().trim_end_matches('/');
    if base.is_empty() {
        return Err(UrlError::MissingBaseUrl);
    }
    let lowercase = base.to_lowercase();
    Ok(if lowercase.ends_with(SERVICE_SUFFIX) {
        base.to_string()
    } else if lowercase.ends_with(ODATA_SUFFIX) {
        format!("{base}{COLLECTION_SUFFIX}")
    } else {
        format!("{base}{SERVICE_SUFFIX}")
    })
}

/// The location of the service's `$metadata` document.
pub fn metadata_url(base_url: &str) -> Result<String, UrlError> {
    Ok(format!("{}/$metadata", service_root(base_url)?))
}

/// Put the entity name into `Prefix_Name` form when it starts with a known prefix,
/// inserting a missing separator and collapsing repeated ones. Other names are only trimmed.
pub fn normalize_entity_name(entity: &str) -> String {
    let entity = entity.trim();
    match EntityPrefix::strip_from(entity) {
        Some((prefix, rest)) => {
            let rest = rest.trim_start_matches('_');
            if rest.is_empty() {
                entity.to_string()
            } else {
                format!("{}_{rest}", prefix.name())
            }
        }
        None => entity.to_string(),
    }
}

/// The URL of an entity set, without a query string.
pub fn entity_url(base_url: &str, entity: &str) -> Result<String, UrlError> {
    let root = service_root(base_url)?;
    let entity = normalize_entity_name(entity);
    if entity.is_empty() {
        return Err(UrlError::MissingEntity);
    }
    Ok(format!("{root}/{}", encode(&entity, ENTITY)))
}

/// The full request URL: the entity URL followed by the encoded parameters.
///
/// `$format=json` is added unless a format is already set, and parameters with null or
/// empty values are dropped.
pub fn build_url(base_url: &str, entity: &str, params: &QueryParameters) -> Result<String, UrlError> {
    let root = entity_url(base_url, entity)?;
    let query = encode_query(params);
    if query.is_empty() {
        return Ok(root);
    }
    let query = query
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");
    Ok(format!("{root}?{query}"))
}

/// Encode every sendable parameter into a `(key, value)` pair, in insertion order.
pub fn encode_query(params: &QueryParameters) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = params
        .iter()
        .filter_map(|(key, value)| {
            let value = parameter_value(value)?;
            let set = if key == "$filter" { FILTER } else { VALUE };
            Some((encode(key, KEY), encode(&value, set)))
        })
        .collect();
    if !params.contains_key("$format") {
        pairs.push(("$format".to_string(), "json".to_string()));
    }
    pairs
}

/// The textual form of a parameter value, or `None` when it should not be sent.
pub fn parameter_value(value: &serde_json::Value) -> Option<String> {
    let text = match value {
        serde_json::Value::Null => return None,
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(parameter_value)
            .collect::<Vec<_>>()
            .join(","),
        serde_json::Value::Object(_) => value.to_string(),
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Percent-encode `input` with `set`, leaving existing `%XX` escapes as they are.
fn encode(input: &str, set: &'static AsciiSet) -> String {
    let bytes = input.as_bytes();
    let mut encoded = String::with_capacity(input.len());
    let mut start = 0;
    let mut position = 0;
    while position < bytes.len() {
        let is_escape = bytes[position] == b'%'
            && position + 2 < bytes.len()
            && bytes[position + 1].is_ascii_hexdigit()
            && bytes[position + 2].is_ascii_hexdigit();
        if is_escape {
            encoded.extend(utf8_percent_encode(&input[start..position], set));
            encoded.push_str(&input[position..position + 3]);
            position += 3;
            start = position;
        } else {
            position += 1;
        }
    }
    encoded.extend(utf8_percent_encode(&input[start..], set));
    encoded
}
