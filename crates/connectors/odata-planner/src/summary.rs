//! A short description of a query result.

use serde::Serialize;

use query_engine_metadata::metadata::{split_entity, EntityPrefix};

const PREVIEW_FIELDS: usize = 5;
const NAVIGATION_LINKS: usize = 5;

/// Row count, a few field names, and navigation links to the first rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// The length of the `value` array, if the payload has one.
    pub row_count: Option<usize>,
    pub preview_fields: Vec<String>,
    pub navigation_links: Vec<String>,
}

/// Summarize an OData payload read from `entity`.
pub fn summarize(entity: &str, payload: &serde_json::Value, navigation_base: Option<&str>) -> Summary {
    let Some(rows) = payload.get("value").and_then(serde_json::Value::as_array) else {
        return Summary::default();
    };

    let preview_fields = rows
        .first()
        .and_then(serde_json::Value::as_object)
        .map(|row| row.keys().take(PREVIEW_FIELDS).cloned().collect())
        .unwrap_or_default();

    let navigation_links = rows
        .iter()
        .filter_map(|row| {
            ["Ref_Key", "Ref"]
                .into_iter()
                .filter_map(|key| row.get(key)?.as_str())
                .find(|reference| !reference.is_empty())
        })
        .filter_map(|reference| data_link(entity, reference, navigation_base))
        .take(NAVIGATION_LINKS)
        .collect();

    Summary {
        row_count: Some(rows.len()),
        preview_fields,
        navigation_links,
    }
}

/// The link that opens one object in the 1C client:
/// `#e1cib/data/<localized kind>.<name>?ref=<reference>`, after `navigation_base` if given.
pub fn data_link(entity: &str, reference: &str, navigation_base: Option<&str>) -> Option<String> {
    if reference.is_empty() {
        return None;
    }
    let (prefix, name) = split_entity(entity)?;
    let kind = EntityPrefix::from_name(prefix).map_or(prefix, |prefix| prefix.localized_name());
    let suffix = format!("#e1cib/data/{kind}.{name}?ref={reference}");
    Some(match navigation_base.map(str::trim).filter(|base| !base.is_empty()) {
        Some(base) => format!("{base}{suffix}"),
        None => suffix,
    })
}

impl Summary {
    /// Plain-text lines describing the result of `user_query` against `entity`.
    pub fn describe(&self, user_query: &str, entity: &str) -> String {
        let mut lines = vec![
            format!("Request: {user_query}"),
            format!("Entity: {entity}"),
            format!(
                "Rows: {}",
                self.row_count
                    .map_or_else(|| "n/a".to_string(), |count| count.to_string())
            ),
        ];
        if !self.preview_fields.is_empty() {
            lines.push(format!("Fields (sample): {}", self.preview_fields.join(", ")));
        }
        if !self.navigation_links.is_empty() {
            lines.push("Navigation links:".to_string());
            lines.extend(self.navigation_links.iter().map(|link| format!("- {link}")));
        }
        lines.join("\n")
    }
}
