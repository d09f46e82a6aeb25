//! Flatten structured plans into protocol parameters, and parse generated plan text.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use query_engine_odata::odata::ast::QueryPlan;
use query_engine_odata::odata::convert::render_filter;
use query_engine_odata::odata::url::{normalize_entity_name, QueryParameters};

use super::error::Error;

/// Keys whose presence marks a plan as structured rather than legacy.
const STRUCTURED_KEYS: [&str; 4] = ["filter_group", "select", "orderby", "top"];

/// A plan expressed directly in protocol parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyQueryPlan {
    pub entity: String,
    #[serde(default)]
    pub params: QueryParameters,
}

impl LegacyQueryPlan {
    pub fn new(entity: impl Into<String>) -> Self {
        LegacyQueryPlan {
            entity: entity.into(),
            params: QueryParameters::new(),
        }
    }
}

/// A plan as produced by plan generation, in either of the accepted shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedPlan {
    Structured(QueryPlan),
    Legacy(LegacyQueryPlan),
}

impl ParsedPlan {
    pub fn entity(&self) -> &str {
        match self {
            ParsedPlan::Structured(plan) => plan.entity(),
            ParsedPlan::Legacy(plan) => &plan.entity,
        }
    }

    /// The legacy form of the plan, translating a structured plan if needed.
    pub fn into_legacy(self) -> Result<LegacyQueryPlan, Error> {
        match self {
            ParsedPlan::Structured(plan) => translate(&plan),
            ParsedPlan::Legacy(plan) => Ok(plan),
        }
    }
}

/// Flatten a structured plan into protocol parameters.
pub fn translate(plan: &QueryPlan) -> Result<LegacyQueryPlan, Error> {
    let mut legacy = LegacyQueryPlan::new(plan.entity());
    let params = &mut legacy.params;

    let filter = render_filter(plan.filter_group.as_ref())?;
    if !filter.is_empty() {
        params.insert("$filter".to_string(), filter.into());
    }
    if !plan.select.is_empty() {
        params.insert("$select".to_string(), plan.select.join(",").into());
    }
    if let Some(top) = plan.top() {
        params.insert("$top".to_string(), top.into());
    }
    if !plan.orderby.is_empty() {
        let orderby = plan
            .orderby
            .iter()
            .map(|element| format!("{} {}", element.field, element.direction.keyword()))
            .collect::<Vec<_>>()
            .join(",");
        params.insert("$orderby".to_string(), orderby.into());
    }
    if !plan.expand().is_empty() {
        params.insert("$expand".to_string(), plan.expand().join(",").into());
    }

    Ok(legacy)
}

fn json_object_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("json object pattern is a valid regex"))
}

/// Parse generated text into a plan.
///
/// The text is parsed as JSON directly, or else from its outermost `{...}` span. An object
/// carrying any of `filter_group`, `select`, `orderby` or `top` is read as a structured plan;
/// anything else as a legacy `{entity, params}` plan, whose params may also be a query string.
pub fn parse_plan(text: &str) -> Result<ParsedPlan, Error> {
    let raw = text.trim();
    if raw.is_empty() {
        return Err(Error::plan_parse("response is empty", text));
    }

    let parsed: serde_json::Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(_) => {
            let span = json_object_pattern()
                .find(raw)
                .ok_or_else(|| Error::plan_parse("response is not valid JSON", text))?;
            serde_json::from_str(span.as_str())
                .map_err(|err| Error::plan_parse(format!("response is not valid JSON: {err}"), text))?
        }
    };

    let serde_json::Value::Object(object) = &parsed else {
        return Err(Error::plan_parse("plan is not a JSON object", text));
    };

    if STRUCTURED_KEYS.iter().any(|key| object.contains_key(*key)) {
        let plan = serde_json::from_value(parsed)
            .map_err(|err| Error::plan_parse(format!("invalid plan structure: {err}"), text))?;
        return Ok(ParsedPlan::Structured(plan));
    }

    parse_legacy_plan(object, text).map(ParsedPlan::Legacy)
}

fn parse_legacy_plan(
    object: &serde_json::Map<String, serde_json::Value>,
    text: &str,
) -> Result<LegacyQueryPlan, Error> {
    let entity = object
        .get("entity")
        .and_then(serde_json::Value::as_str)
        .map(normalize_entity_name)
        .unwrap_or_default();
    if entity.is_empty() {
        return Err(Error::plan_parse("invalid plan structure: entity is missing", text));
    }

    let params = match object.get("params") {
        None | Some(serde_json::Value::Null) => QueryParameters::new(),
        Some(serde_json::Value::String(query)) => parse_query_string(query),
        Some(value) => serde_json::from_value(value.clone()).map_err(|err| {
            Error::plan_parse(format!("invalid plan structure: params: {err}"), text)
        })?,
    };

    Ok(LegacyQueryPlan { entity, params })
}

/// Read `key=value&...` pairs, keeping blank values.
fn parse_query_string(query: &str) -> QueryParameters {
    url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .map(|(key, value)| (key.into_owned(), serde_json::Value::String(value.into_owned())))
        .collect()
}
