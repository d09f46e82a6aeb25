//! Calling the chat-completion backend and turning its answer into a plan.

use std::time::Instant;

use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION};
use serde::Serialize;
use tracing::{info_span, Instrument};

use odata_planner_configuration::LlmConnection;
use query_engine_metadata::metadata::Candidate;
use query_engine_translation::translation::plan::{parse_plan, ParsedPlan};

use super::error::Error;
use super::prompt::{build_messages, ChatMessage};
use super::response::extract_text;

/// A plan produced by the backend, with the text it was parsed from.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedPlan {
    pub plan: ParsedPlan,
    pub raw_text: String,
    /// Duration of the successful backend call.
    pub elapsed_ms: u64,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

const JSON_OBJECT: ResponseFormat = ResponseFormat {
    kind: "json_object",
};

/// Generates query plans through a chat-completion endpoint.
#[derive(Debug, Clone)]
pub struct PlanGenerator {
    client: reqwest::Client,
    settings: LlmConnection,
}

impl PlanGenerator {
    pub fn new(settings: LlmConnection) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|err| Error::Configuration(format!("cannot create HTTP client: {err}")))?;
        Ok(PlanGenerator { client, settings })
    }

    pub fn settings(&self) -> &LlmConnection {
        &self.settings
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    /// Fail fast on settings that no request could succeed with.
    fn check_configuration(&self) -> Result<(), Error> {
        if self.settings.api_key.is_empty() {
            return Err(Error::Configuration("API_KEY is not set".to_string()));
        }
        if self.settings.model_id.is_empty() {
            return Err(Error::Configuration("CLOUD_MODEL_ID is not set".to_string()));
        }
        for (name, value) in &self.settings.extra_headers {
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| Error::Configuration(format!("invalid header name {name}: {err}")))?;
            HeaderValue::from_str(value)
                .map_err(|err| Error::Configuration(format!("invalid value of header {name}: {err}")))?;
        }
        Ok(())
    }

    /// Ask the backend for a plan answering `user_query`, restricted to `candidates`.
    ///
    /// Transport failures are retried according to the configured policy; backend errors,
    /// unusable responses and unparseable plans are returned at once.
    pub async fn generate_plan(
        &self,
        user_query: &str,
        candidates: &[Candidate],
    ) -> Result<GeneratedPlan, Error> {
        self.check_configuration()?;
        let messages = build_messages(user_query, candidates);

        let span = info_span!(
            "generate_plan",
            model_id = %self.settings.model_id,
            candidates = candidates.len(),
            structured_output = self.settings.structured_output,
        );
        async {
            let (raw_text, elapsed_ms) = self
                .settings
                .retry
                .run("llm_chat_completion", Error::is_retryable, |attempt| {
                    self.complete(&messages, attempt)
                })
                .await?;
            let plan = parse_plan(&raw_text)?;
            tracing::info!(entity = plan.entity(), elapsed_ms, "generated plan");
            Ok(GeneratedPlan {
                plan,
                raw_text,
                elapsed_ms,
            })
        }
        .instrument(span)
        .await
    }

    /// One attempt: send the conversation and return the assistant text with the call duration.
    async fn complete(&self, messages: &[ChatMessage], attempt: u32) -> Result<(String, u64), Error> {
        let start = Instant::now();
        let json_mode = self.settings.structured_output;

        let mut response = self.send(messages, json_mode).await?;
        if json_mode && response.status().as_u16() >= 400 {
            tracing::warn!(
                status = response.status().as_u16(),
                attempt,
                json_mode_fallback = true,
                "backend rejected JSON response mode, resending without it"
            );
            response = self.send(messages, false).await?;
        }

        let status = response.status();
        if status.as_u16() >= 400 {
            let body = response.text().await?;
            return Err(Error::Backend {
                status: status.as_u16(),
                body,
            });
        }

        let payload: serde_json::Value = response.json().await.map_err(|err| {
            if err.is_decode() {
                Error::InvalidResponse(format!("response body is not JSON: {err}"))
            } else {
                Error::Transport { source: err }
            }
        })?;
        let text = extract_text(&payload)?;
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::debug!(attempt, elapsed_ms, status = status.as_u16(), "chat completion finished");
        Ok((text, elapsed_ms))
    }

    async fn send(
        &self,
        messages: &[ChatMessage],
        json_mode: bool,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let body = ChatRequest {
            model: &self.settings.model_id,
            messages,
            temperature: 0,
            response_format: json_mode.then_some(JSON_OBJECT),
        };
        let mut request = self
            .client
            .post(self.completions_url())
            .timeout(self.settings.timeout)
            .header(
                AUTHORIZATION,
                format!("{} {}", self.settings.auth_scheme, self.settings.api_key),
            )
            .json(&body);
        for (name, value) in &self.settings.extra_headers {
            request = request.header(name.as_str(), value.as_str());
        }
        request.send().await
    }
}
