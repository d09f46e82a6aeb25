//! Configuration for the planner.

use std::collections::BTreeMap;
use std::time::Duration;

use query_engine_metadata::metadata::MetadataIndex;

use crate::values::RetrySettings;

/// The 'Configuration' type collects all the information necessary to serve queries at runtime.
///
/// Values of this type are produced from a 'ParsedConfiguration' using
/// 'make_runtime_configuration', which resolves every secret.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub odata: ODataConnection,
    pub llm: LlmConnection,
    pub metadata_index: MetadataIndex,
    pub candidate_limit: usize,
    pub default_top: u32,
    pub navigation_base: Option<String>,
}

/// Resolved OData service settings.
#[derive(Debug, Clone)]
pub struct ODataConnection {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
    pub retry: RetrySettings,
}

/// Resolved chat-completion backend settings.
#[derive(Debug, Clone)]
pub struct LlmConnection {
    pub api_key: String,
    pub model_id: String,
    pub base_url: String,
    pub timeout: Duration,
    pub auth_scheme: String,
    pub extra_headers: BTreeMap<String, String>,
    pub structured_output: bool,
    pub retry: RetrySettings,
}
