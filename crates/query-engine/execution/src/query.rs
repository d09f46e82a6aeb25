//! Execute a compiled request against the OData service.

use std::time::Instant;

use serde::Serialize;
use tracing::{info_span, Instrument};

use odata_planner_configuration::ODataConnection;
use query_engine_odata::odata::url::{build_url, QueryParameters};

use crate::error::Error;
use crate::metrics::Metrics;

/// The outcome of a successful request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub url: String,
    pub payload: serde_json::Value,
    pub elapsed_ms: u64,
    pub status_code: u16,
    pub params: QueryParameters,
}

/// An HTTP client for one OData service and one set of credentials.
#[derive(Debug, Clone)]
pub struct ODataClient {
    http: reqwest::Client,
    connection: ODataConnection,
}

pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

impl ODataClient {
    pub fn new(connection: ODataConnection) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().build()?;
        Ok(ODataClient { http, connection })
    }

    pub fn connection(&self) -> &ODataConnection {
        &self.connection
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// The same client, authenticating with the given credentials where they are non-empty.
    #[must_use]
    pub fn with_credentials(&self, username: Option<&str>, password: Option<&str>) -> Self {
        let mut connection = self.connection.clone();
        if let Some(username) = username.map(str::trim).filter(|value| !value.is_empty()) {
            connection.username = username.to_string();
        }
        if let Some(password) = password.filter(|value| !value.is_empty()) {
            connection.password = password.to_string();
        }
        ODataClient {
            http: self.http.clone(),
            connection,
        }
    }

    /// Attach basic authentication, unless both username and password are empty.
    pub(crate) fn authenticate(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let ODataConnection {
            username, password, ..
        } = &self.connection;
        if username.is_empty() && password.is_empty() {
            request
        } else {
            request.basic_auth(username, Some(password))
        }
    }

    /// Fetch `entity` with the given query parameters.
    ///
    /// Connection failures and timeouts are retried according to the configured policy, each
    /// attempt with a fresh timeout. HTTP error statuses and unreadable bodies are not retried.
    pub async fn fetch(
        &self,
        metrics: &Metrics,
        entity: &str,
        params: &QueryParameters,
    ) -> Result<QueryResult, Error> {
        let url = build_url(&self.connection.base_url, entity, params)?;

        let span = info_span!("odata_request", entity, url = %url);
        async {
            let start = Instant::now();
            let result = self
                .connection
                .retry
                .run("odata_fetch", Error::is_retryable, |attempt| {
                    self.get_json(&url, params, attempt)
                })
                .await;
            metrics.record_odata_request(start.elapsed(), result.is_ok());

            match &result {
                Ok(result) => tracing::info!(
                    status_code = result.status_code,
                    elapsed_ms = result.elapsed_ms,
                    "OData request finished"
                ),
                Err(err) => tracing::warn!(
                    status_code = err.status(),
                    error = %err,
                    "OData request failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn get_json(
        &self,
        url: &str,
        params: &QueryParameters,
        attempt: u32,
    ) -> Result<QueryResult, Error> {
        let start = Instant::now();
        let request = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(self.connection.timeout);
        let response = self
            .authenticate(request)
            .send()
            .await
            .map_err(|source| transport(url, params, start, source))?;

        let status = response.status().as_u16();
        tracing::debug!(attempt, status_code = status, "OData response received");
        let body = response
            .bytes()
            .await
            .map_err(|source| transport(url, params, start, source))?;
        let elapsed_ms = elapsed_ms(start);

        if status >= 400 {
            let detail = serde_json::from_slice(&body).unwrap_or_else(|_| {
                serde_json::Value::String(String::from_utf8_lossy(&body).into_owned())
            });
            return Err(Error::Http {
                status,
                detail,
                url: url.to_string(),
                elapsed_ms,
                params: params.clone(),
            });
        }

        let payload = serde_json::from_slice(&body).map_err(|err| Error::InvalidPayload {
            url: url.to_string(),
            status,
            elapsed_ms,
            params: params.clone(),
            message: err.to_string(),
        })?;

        Ok(QueryResult {
            url: url.to_string(),
            payload,
            elapsed_ms,
            status_code: status,
            params: params.clone(),
        })
    }
}

pub(crate) fn transport(
    url: &str,
    params: &QueryParameters,
    start: Instant,
    source: reqwest::Error,
) -> Error {
    Error::Transport {
        url: url.to_string(),
        elapsed_ms: elapsed_ms(start),
        params: params.clone(),
        source,
    }
}
