//! Transient state used by the planner.
//!
//! This is initialized on startup.

use thiserror::Error;
use tracing::{info_span, Instrument};

use odata_planner_configuration::Configuration;
use query_engine_execution::{metrics, ODataClient};
use query_engine_generation::generation::{self, PlanGenerator};

/// State for the planner: metrics and the HTTP clients for both external services.
#[derive(Debug, Clone)]
pub struct State {
    pub metrics: metrics::Metrics,
    pub odata: ODataClient,
    pub generator: PlanGenerator,
}

/// Register metrics and create the clients described by `configuration`.
pub async fn create_state(
    configuration: &Configuration,
    metrics_registry: &mut prometheus::Registry,
) -> Result<State, InitializationError> {
    let metrics = async {
        let metrics_inner = metrics::Metrics::initialize(metrics_registry)
            .map_err(InitializationError::MetricsError)?;
        Ok(metrics_inner)
    }
    .instrument(info_span!("Setup metrics"))
    .await?;

    let odata = ODataClient::new(configuration.odata.clone())
        .map_err(InitializationError::HttpClientError)?;
    let generator = PlanGenerator::new(configuration.llm.clone())
        .map_err(InitializationError::GeneratorError)?;

    Ok(State {
        metrics,
        odata,
        generator,
    })
}

/// State initialization error.
#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("error initializing metrics: {0}")]
    MetricsError(prometheus::Error),
    #[error("unable to create HTTP client: {0}")]
    HttpClientError(reqwest::Error),
    #[error("unable to create plan generator: {0}")]
    GeneratorError(generation::Error),
}
