//! Reading the assistant text out of a chat-completion response.

use super::error::Error;

/// The assistant text of a response, from `choices[0].message.content`, `choices[0].text`
/// or a top-level `result`, in that order.
pub fn extract_text(payload: &serde_json::Value) -> Result<String, Error> {
    let first_choice = payload.pointer("/choices/0");
    [
        first_choice.and_then(|choice| choice.pointer("/message/content")),
        first_choice.and_then(|choice| choice.get("text")),
        payload.get("result"),
    ]
    .into_iter()
    .flatten()
    .find_map(serde_json::Value::as_str)
    .map(str::to_string)
    .ok_or_else(|| {
        Error::InvalidResponse("Unexpected LLM response format, no text content found".to_string())
    })
}
