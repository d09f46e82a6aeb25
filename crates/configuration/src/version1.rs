//! Version 1 of the configuration directory format.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use schemars::{gen::SchemaSettings, JsonSchema};
use serde::{Deserialize, Serialize};
use tokio::fs;

use query_engine_metadata::metadata::{MetadataIndex, DEFAULT_CANDIDATE_LIMIT};

use crate::error::{ParseConfigurationError, WriteParsedConfigurationError};
use crate::values::{RetrySettings, Secret};

pub const CONFIGURATION_FILENAME: &str = "configuration.json";
pub const CONFIGURATION_JSONSCHEMA_FILENAME: &str = "schema.json";

pub const DEFAULT_ODATA_URL_VARIABLE: &str = "ODATA_1C_URL";
pub const DEFAULT_ODATA_USER_VARIABLE: &str = "ODATA_1C_USER";
pub const DEFAULT_ODATA_PASSWORD_VARIABLE: &str = "ODATA_1C_PASSWORD";
pub const DEFAULT_API_KEY_VARIABLE: &str = "API_KEY";
pub const DEFAULT_MODEL_ID_VARIABLE: &str = "CLOUD_MODEL_ID";

pub const DEFAULT_LLM_BASE_URL: &str = "https://foundation-models.api.cloud.ru/v1";
pub const DEFAULT_METADATA_INDEX_FILENAME: &str = "metadata_index.json";

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize, JsonSchema)]
pub enum Version {
    #[serde(rename = "1")]
    This,
}

/// The contents of `configuration.json`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParsedConfiguration {
    pub version: Version,
    pub odata: ODataSettings,
    pub llm: LlmSettings,
    /// The pre-built metadata index, relative to the configuration directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_index_file: Option<PathBuf>,
    /// How many candidate entities are offered to plan generation.
    #[serde(default = "candidate_limit_default")]
    pub candidate_limit: usize,
    /// `$top` used when neither the plan nor the request names one.
    #[serde(default = "default_top_default")]
    pub default_top: u32,
    /// Prefix for navigation links into the source system's client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation_base: Option<String>,
    /// The index read from `metadata_index_file`.
    #[serde(skip)]
    pub metadata_index: MetadataIndex,
}

/// Settings of the OData service.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ODataSettings {
    pub base_url: Secret,
    pub username: Secret,
    pub password: Secret,
    #[serde(default = "odata_timeout_default")]
    pub timeout_seconds: f64,
    #[serde(default = "RetrySettings::odata_default")]
    pub retry: RetrySettings,
}

/// Settings of the chat-completion backend used for plan generation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LlmSettings {
    pub api_key: Secret,
    pub model_id: Secret,
    #[serde(default = "llm_base_url_default")]
    pub base_url: String,
    #[serde(default = "llm_timeout_default")]
    pub timeout_seconds: f64,
    /// Scheme of the `Authorization` header.
    #[serde(default = "auth_scheme_default")]
    pub auth_scheme: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_headers: BTreeMap<String, String>,
    /// Ask the backend for a JSON-only response.
    #[serde(default = "structured_output_default")]
    pub structured_output: bool,
    #[serde(default = "RetrySettings::llm_default")]
    pub retry: RetrySettings,
}

impl ParsedConfiguration {
    pub fn initial() -> Self {
        ParsedConfiguration::empty()
    }

    pub fn empty() -> Self {
        Self {
            version: Version::This,
            odata: ODataSettings {
                base_url: Secret::from_environment(DEFAULT_ODATA_URL_VARIABLE),
                username: Secret::from_environment(DEFAULT_ODATA_USER_VARIABLE),
                password: Secret::from_environment(DEFAULT_ODATA_PASSWORD_VARIABLE),
                timeout_seconds: odata_timeout_default(),
                retry: RetrySettings::odata_default(),
            },
            llm: LlmSettings {
                api_key: Secret::from_environment(DEFAULT_API_KEY_VARIABLE),
                model_id: Secret::from_environment(DEFAULT_MODEL_ID_VARIABLE),
                base_url: llm_base_url_default(),
                timeout_seconds: llm_timeout_default(),
                auth_scheme: auth_scheme_default(),
                extra_headers: BTreeMap::new(),
                structured_output: structured_output_default(),
                retry: RetrySettings::llm_default(),
            },
            metadata_index_file: Some(PathBuf::from(DEFAULT_METADATA_INDEX_FILENAME)),
            candidate_limit: candidate_limit_default(),
            default_top: default_top_default(),
            navigation_base: None,
            metadata_index: MetadataIndex::empty(),
        }
    }
}

// for serde default //
fn candidate_limit_default() -> usize {
    DEFAULT_CANDIDATE_LIMIT
}
fn default_top_default() -> u32 {
    5
}
fn odata_timeout_default() -> f64 {
    20.0
}
fn llm_timeout_default() -> f64 {
    30.0
}
fn llm_base_url_default() -> String {
    DEFAULT_LLM_BASE_URL.to_string()
}
fn auth_scheme_default() -> String {
    "Bearer".to_string()
}
fn structured_output_default() -> bool {
    true
}

/// Read `configuration.json` from the configuration directory, along with the metadata
/// index it refers to.
///
/// An index that cannot be read or parsed is replaced by an empty one.
pub async fn parse_configuration(
    configuration_dir: impl AsRef<Path>,
) -> Result<ParsedConfiguration, ParseConfigurationError> {
    let configuration_file = configuration_dir.as_ref().join(CONFIGURATION_FILENAME);

    let configuration_file_contents =
        fs::read_to_string(&configuration_file)
            .await
            .map_err(|err| {
                ParseConfigurationError::IoErrorButStringified(format!(
                    "{}: {}",
                    &configuration_file.display(),
                    err
                ))
            })?;

    let mut parsed_config: ParsedConfiguration = serde_json::from_str(&configuration_file_contents)
        .map_err(|error| ParseConfigurationError::ParseError {
            file_path: configuration_file.clone(),
            line: error.line(),
            column: error.column(),
            message: error.to_string(),
        })?;

    if let Some(index_file) = &parsed_config.metadata_index_file {
        parsed_config.metadata_index =
            read_metadata_index(&configuration_dir.as_ref().join(index_file)).await;
    }

    Ok(parsed_config)
}

async fn read_metadata_index(path: &Path) -> MetadataIndex {
    let contents = match fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "metadata index is unavailable");
            return MetadataIndex::empty();
        }
    };
    match serde_json::from_str(&contents) {
        Ok(index) => index,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "metadata index is malformed");
            MetadataIndex::empty()
        }
    }
}

/// Write `configuration.json` and its JSON schema into `out_dir`.
pub async fn write_parsed_configuration(
    parsed_config: ParsedConfiguration,
    out_dir: impl AsRef<Path>,
) -> Result<(), WriteParsedConfigurationError> {
    let configuration_file = out_dir.as_ref().to_owned().join(CONFIGURATION_FILENAME);
    fs::create_dir_all(out_dir.as_ref()).await?;

    // create the configuration file
    fs::write(
        configuration_file,
        serde_json::to_string_pretty(&parsed_config)? + "\n",
    )
    .await?;

    // create the jsonschema file
    let configuration_jsonschema_file_path = out_dir
        .as_ref()
        .to_owned()
        .join(CONFIGURATION_JSONSCHEMA_FILENAME);

    let output = serde_json::to_string_pretty(&configuration_schema())?;
    fs::write(&configuration_jsonschema_file_path, output + "\n").await?;

    Ok(())
}

/// The JSON schema of `configuration.json`.
pub fn configuration_schema() -> schemars::schema::RootSchema {
    SchemaSettings::draft07()
        .into_generator()
        .into_root_schema_for::<ParsedConfiguration>()
}
