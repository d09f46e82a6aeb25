//! The planner's entry points: setup, candidate listing, entity listing and queries.
//!
//! Every failure is logged here, once, before it is returned to the caller.

use std::path::Path;
use std::sync::Arc;

use tracing::{info_span, Instrument};

use odata_planner_configuration::environment::Environment;
use odata_planner_configuration::{
    make_runtime_configuration, parse_configuration, Configuration,
};
use query_engine_metadata::metadata::{extract_explicit_entity, Candidate};

use crate::error::Error;
use crate::query::{self, QueryRequest, QueryResponse};
use crate::state::{self, State};

/// A configured planner with its initialized state.
#[derive(Debug, Clone)]
pub struct Planner {
    configuration: Arc<Configuration>,
    state: Arc<State>,
}

fn log_error(event_name: &'static str, err: &Error) {
    tracing::error!(
        meta.signal_type = "log",
        event.domain = "odata-planner",
        event.name = event_name,
        name = event_name,
        body = %err,
        error = true,
    );
}

impl Planner {
    /// Read the configuration directory, resolve its secrets from `environment`, and
    /// initialize the state.
    pub async fn setup(
        configuration_dir: impl AsRef<Path>,
        environment: impl Environment,
        metrics_registry: &mut prometheus::Registry,
    ) -> Result<Self, Error> {
        let parsed_configuration = parse_configuration(configuration_dir)
            .instrument(info_span!("parse configuration"))
            .await?;
        let configuration = make_runtime_configuration(parsed_configuration, environment)?;
        Planner::new(configuration, metrics_registry).await
    }

    pub async fn new(
        configuration: Configuration,
        metrics_registry: &mut prometheus::Registry,
    ) -> Result<Self, Error> {
        let state = state::create_state(&configuration, metrics_registry)
            .instrument(info_span!("Initialise state"))
            .await
            .map_err(Error::from)
            .map_err(|err| {
                log_error("Initialization error", &err);
                err
            })?;

        Ok(Planner {
            configuration: Arc::new(configuration),
            state: Arc::new(state),
        })
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// The candidate entities for `user_query`, including the `$metadata` fallback.
    pub async fn candidates(&self, user_query: &str) -> Vec<Candidate> {
        let explicit_entity = extract_explicit_entity(user_query);
        query::select_candidates(
            &self.configuration,
            &self.state,
            &self.state.odata,
            user_query,
            explicit_entity.as_deref(),
        )
        .instrument(info_span!("Select candidates"))
        .await
    }

    /// The entity sets the OData service declares.
    pub async fn entities(
        &self,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<Vec<String>, Error> {
        self.state
            .odata
            .with_credentials(username, password)
            .fetch_entity_sets(&self.state.metrics)
            .await
            .map_err(Error::from)
            .map_err(|err| {
                log_error("Entities error", &err);
                err
            })
    }

    /// Plan and run a natural-language request.
    pub async fn query(&self, request: QueryRequest) -> Result<QueryResponse, Error> {
        query::query(&self.configuration, &self.state, request)
            .instrument(info_span!("Query"))
            .await
            .map_err(|err| {
                log_error("Query error", &err);
                err
            })
    }
}
