//! The chat messages sent to the text-generation backend.

use serde::{Deserialize, Serialize};
use serde_json::json;

use query_engine_metadata::metadata::Candidate;

/// How many field names of each candidate are shown to the model.
const FIELDS_PER_CANDIDATE: usize = 5;

/// One message of a chat-completion conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

const INSTRUCTIONS: &str = r#"You translate requests for data from a 1C:Enterprise database into OData query plans.
Answer with a single JSON object and nothing else, in this format:
{"entity": "<Prefix>_<Name>", "filter_group": {"logic": "and"|"or", "conditions": [...]}, "select": ["<field>", ...], "orderby": [["<field>", "asc"|"desc"], ...], "top": <1..1000>, "expand": ["<field>", ...]}

Rules:
- "entity" must match ^(Catalog|Document|InformationRegister|AccumulationRegister|ChartOfAccounts)_\w+$ and should be one of the candidates below.
- A condition is {"field": "<field>", "operator": "eq"|"ne"|"gt"|"lt"|"ge"|"le", "value": <value>, "value_type": "string"|"number"|"boolean"|"datetime"|"guid"}.
- A condition list may contain nested groups of the same {"logic", "conditions"} shape.
- Dates are written as YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS with value_type "datetime".
- Only use field names you know; leave out filter_group, select and orderby when they are not needed.
- Use a small "top" unless the request asks for more rows."#;

/// Pairs of request and expected plan shown to the model before the real request.
fn few_shots() -> Vec<(&'static str, serde_json::Value)> {
    vec![
        (
            "Покажи товары с ценой больше 1000",
            json!({
                "entity": "Catalog_Номенклатура",
                "filter_group": {"logic": "and", "conditions": [
                    {"field": "Цена", "operator": "gt", "value": 1000, "value_type": "number"}
                ]},
                "top": 10
            }),
        ),
        (
            "Документы за январь 2024",
            json!({
                "entity": "Document_РеализацияТоваровУслуг",
                "filter_group": {"logic": "and", "conditions": [
                    {"field": "Date", "operator": "ge", "value": "2024-01-01", "value_type": "datetime"},
                    {"field": "Date", "operator": "lt", "value": "2024-02-01", "value_type": "datetime"}
                ]},
                "orderby": [["Date", "desc"]],
                "top": 20
            }),
        ),
        (
            "Найди контрагента ООО Ромашка",
            json!({
                "entity": "Catalog_Контрагенты",
                "filter_group": {"logic": "and", "conditions": [
                    {"field": "Наименование", "operator": "eq", "value": "ООО Ромашка", "value_type": "string"}
                ]},
                "top": 5
            }),
        ),
        (
            "Активные договоры с суммой больше 1 млн",
            json!({
                "entity": "Document_Договор",
                "filter_group": {"logic": "and", "conditions": [
                    {"field": "Сумма", "operator": "gt", "value": 1_000_000, "value_type": "number"},
                    {"field": "Активен", "operator": "eq", "value": true, "value_type": "boolean"}
                ]},
                "select": ["Номер", "Дата", "Контрагент", "Сумма"],
                "top": 50
            }),
        ),
        (
            "Найди справки с датой ранее 01.04.2024",
            json!({
                "entity": "Document_Справка",
                "filter_group": {"logic": "and", "conditions": [
                    {"field": "Date", "operator": "lt", "value": "2024-04-01", "value_type": "datetime"}
                ]},
                "top": 20
            }),
        ),
    ]
}

/// One line per candidate: the entity, its synonym, and its first few fields.
pub fn describe_candidates(candidates: &[Candidate]) -> String {
    candidates
        .iter()
        .map(|candidate| {
            let label = [&candidate.synonym, &candidate.name]
                .into_iter()
                .find(|label| !label.is_empty())
                .map_or("-", String::as_str);
            let mut line = format!("- {} ({label})", candidate.entity);
            if !candidate.fields.is_empty() {
                let fields = candidate
                    .fields
                    .iter()
                    .take(FIELDS_PER_CANDIDATE)
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                line.push_str(&format!(": fields - {fields}"));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The system prompt: grammar, examples and the candidate listing.
pub fn system_prompt(candidates: &[Candidate]) -> String {
    let examples = few_shots()
        .into_iter()
        .map(|(request, plan)| format!("Request: {request}\nPlan: {plan}"))
        .collect::<Vec<_>>()
        .join("\n\n");
    let listing = if candidates.is_empty() {
        "(no candidates found)".to_string()
    } else {
        describe_candidates(candidates)
    };
    format!("{INSTRUCTIONS}\n\nExamples:\n\n{examples}\n\nCandidate entities:\n{listing}")
}

/// The conversation for one request: the system prompt followed by the user's text.
pub fn build_messages(user_query: &str, candidates: &[Candidate]) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt(candidates)),
        ChatMessage::user(user_query),
    ]
}
