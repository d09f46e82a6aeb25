//! Convert a parsed configuration into the runtime `Configuration`.

use std::time::Duration;

use crate::configuration::{Configuration, LlmConnection, ODataConnection};
use crate::environment::{Environment, Variable};
use crate::error::MakeRuntimeConfigurationError;
use crate::values::Secret;
use crate::version1::ParsedConfiguration;

/// Resolve every secret of `parsed_config` against `environment`.
///
/// The OData base URL is required. Credentials, API key and model identifier resolve to empty
/// strings when their variables are unset; the clients reject those when they are used.
pub fn make_runtime_configuration(
    parsed_config: ParsedConfiguration,
    environment: impl Environment,
) -> Result<Configuration, MakeRuntimeConfigurationError> {
    let base_url = resolve_required(&parsed_config.odata.base_url, &environment)?;

    Ok(Configuration {
        odata: ODataConnection {
            base_url,
            username: resolve_optional(&parsed_config.odata.username, &environment),
            password: resolve_optional(&parsed_config.odata.password, &environment),
            timeout: timeout("odata.timeoutSeconds", parsed_config.odata.timeout_seconds)?,
            retry: parsed_config.odata.retry,
        },
        llm: LlmConnection {
            api_key: resolve_optional(&parsed_config.llm.api_key, &environment),
            model_id: resolve_optional(&parsed_config.llm.model_id, &environment),
            base_url: parsed_config.llm.base_url.trim().to_string(),
            timeout: timeout("llm.timeoutSeconds", parsed_config.llm.timeout_seconds)?,
            auth_scheme: parsed_config.llm.auth_scheme,
            extra_headers: parsed_config.llm.extra_headers,
            structured_output: parsed_config.llm.structured_output,
            retry: parsed_config.llm.retry,
        },
        metadata_index: parsed_config.metadata_index,
        candidate_limit: parsed_config.candidate_limit,
        default_top: parsed_config.default_top,
        navigation_base: parsed_config.navigation_base,
    })
}

fn resolve_required(
    secret: &Secret,
    environment: &impl Environment,
) -> Result<String, MakeRuntimeConfigurationError> {
    match secret {
        Secret::Plain(value) => Ok(value.trim().to_string()),
        Secret::FromEnvironment { variable } => environment
            .read(variable)
            .map(|value| value.trim().to_string())
            .map_err(|error| missing_variable(variable, &error)),
    }
}

fn resolve_optional(secret: &Secret, environment: &impl Environment) -> String {
    match secret {
        Secret::Plain(value) => value.trim().to_string(),
        Secret::FromEnvironment { variable } => environment
            .read(variable)
            .map(|value| value.trim().to_string())
            .unwrap_or_default(),
    }
}

fn missing_variable(
    variable: &Variable,
    error: &crate::environment::Error,
) -> MakeRuntimeConfigurationError {
    MakeRuntimeConfigurationError::MissingEnvironmentVariable {
        from_env: variable.to_string(),
        message: error.to_string(),
    }
}

fn timeout(setting: &str, seconds: f64) -> Result<Duration, MakeRuntimeConfigurationError> {
    match Duration::try_from_secs_f64(seconds) {
        Ok(duration) if !duration.is_zero() => Ok(duration),
        Ok(_) => Err(MakeRuntimeConfigurationError::InvalidValue {
            setting: setting.to_string(),
            message: "must be positive".to_string(),
        }),
        Err(error) => Err(MakeRuntimeConfigurationError::InvalidValue {
            setting: setting.to_string(),
            message: error.to_string(),
        }),
    }
}
