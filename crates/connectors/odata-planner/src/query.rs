//! The query pipeline: from a natural-language request to OData rows.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info_span, Instrument};

use odata_planner_configuration::Configuration;
use query_engine_execution::{ODataClient, QueryResult};
use query_engine_metadata::metadata::{
    choose_candidates, extract_explicit_entity, prepend_explicit_entity, Candidate, WeightedRatio,
};
use query_engine_odata::odata::url::normalize_entity_name;
use query_engine_translation::translation::params::normalize_params;
use query_engine_translation::translation::plan::{translate, LegacyQueryPlan, ParsedPlan};
use query_engine_translation::translation::validation::PlanValidator;

use crate::error::Error;
use crate::hints::extract_top_hint;
use crate::state::State;
use crate::summary::{summarize, Summary};

/// How many `$metadata` entity sets become candidates when the index has none.
const METADATA_CANDIDATE_LIMIT: usize = 50;

/// A natural-language request, with optional credentials overriding the configured ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub user_query: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl QueryRequest {
    pub fn new(user_query: impl Into<String>) -> Self {
        QueryRequest {
            user_query: user_query.into(),
            ..QueryRequest::default()
        }
    }
}

/// The executed plan, how it was obtained, and what the service returned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    pub plan: LegacyQueryPlan,
    /// The generated text the plan was parsed from; empty when no generation took place.
    pub plan_raw: String,
    pub llm_ms: Option<u64>,
    pub odata: QueryResult,
    pub summary: Summary,
    /// Problems left in the generated plan after repair. They do not stop the request.
    pub validation_errors: Vec<String>,
}

/// A plan ready to be executed, before the row limit and parameter normalization.
struct PlannedQuery {
    plan: LegacyQueryPlan,
    plan_raw: String,
    llm_ms: Option<u64>,
    validation_errors: Vec<String>,
}

/// Plan and execute `request`.
pub async fn query(
    configuration: &Configuration,
    state: &State,
    request: QueryRequest,
) -> Result<QueryResponse, Error> {
    let user_query = request.user_query.trim();
    let odata = state
        .odata
        .with_credentials(request.username.as_deref(), request.password.as_deref());
    let explicit_entity = extract_explicit_entity(user_query);

    let candidates = select_candidates(
        configuration,
        state,
        &odata,
        user_query,
        explicit_entity.as_deref(),
    )
    .instrument(info_span!("Select candidates"))
    .await;

    let planned = match explicit_entity {
        Some(entity) => {
            tracing::info!(entity = %entity, "request names its entity explicitly");
            PlannedQuery {
                plan: LegacyQueryPlan::new(normalize_entity_name(&entity)),
                plan_raw: String::new(),
                llm_ms: None,
                validation_errors: vec![],
            }
        }
        None => plan_query(configuration, state, user_query, &candidates)
            .instrument(info_span!("Plan query"))
            .await?,
    };

    let PlannedQuery {
        mut plan,
        plan_raw,
        llm_ms,
        validation_errors,
    } = planned;

    let mut params = normalize_params(Some(&plan.params));
    if !params.contains_key("$top") {
        let top = extract_top_hint(user_query, configuration.default_top);
        plan.params.insert("$top".to_string(), top.into());
        params = normalize_params(Some(&plan.params));
    }
    plan.params = params;

    let odata = odata.fetch(&state.metrics, &plan.entity, &plan.params).await?;
    let summary = summarize(
        &plan.entity,
        &odata.payload,
        configuration.navigation_base.as_deref(),
    );

    Ok(QueryResponse {
        plan,
        plan_raw,
        llm_ms,
        odata,
        summary,
        validation_errors,
    })
}

/// Rank the metadata index against the request, put an explicitly named entity first, and
/// fall back to the service's entity sets when nothing matched.
pub async fn select_candidates(
    configuration: &Configuration,
    state: &State,
    odata: &ODataClient,
    user_query: &str,
    explicit_entity: Option<&str>,
) -> Vec<Candidate> {
    let mut candidates = choose_candidates(
        &configuration.metadata_index,
        &WeightedRatio,
        user_query,
        configuration.candidate_limit,
    );
    if let Some(entity) = explicit_entity {
        prepend_explicit_entity(&mut candidates, entity);
    }
    if candidates.is_empty() {
        tracing::info!("no candidates in the metadata index, reading $metadata");
        candidates = metadata_candidates(state, odata).await;
    }
    tracing::debug!(candidates = candidates.len(), "selected candidates");
    candidates
}

/// Zero-score candidates for the first entity sets of `$metadata`. Failures give no candidates.
async fn metadata_candidates(state: &State, odata: &ODataClient) -> Vec<Candidate> {
    match odata.fetch_entity_sets(&state.metrics).await {
        Ok(names) => names
            .iter()
            .take(METADATA_CANDIDATE_LIMIT)
            .map(|name| Candidate::from_entity_name(name, 0))
            .collect(),
        Err(err) => {
            tracing::warn!(error = %err, "unable to list entity sets");
            vec![]
        }
    }
}

/// Generate a plan, check it against the metadata index, repair what can be repaired, and
/// flatten it into protocol parameters.
async fn plan_query(
    configuration: &Configuration,
    state: &State,
    user_query: &str,
    candidates: &[Candidate],
) -> Result<PlannedQuery, Error> {
    let start = Instant::now();
    let generated = state.generator.generate_plan(user_query, candidates).await;
    state
        .metrics
        .record_generation(start.elapsed(), generated.is_ok());
    let generated = generated?;

    let (plan, validation_errors) = match generated.plan {
        ParsedPlan::Structured(mut plan) => {
            let validator = PlanValidator::new(&configuration.metadata_index);
            let mut errors = validator.validate(&plan);
            if !errors.is_empty() {
                tracing::info!(?errors, "repairing generated plan");
                validator.suggest_fixes(&mut plan, &errors, &WeightedRatio);
                errors = validator.validate(&plan);
            }
            if !errors.is_empty() {
                tracing::warn!(?errors, "plan still has validation errors");
            }
            (translate(&plan)?, errors)
        }
        ParsedPlan::Legacy(plan) => (plan, vec![]),
    };

    Ok(PlannedQuery {
        plan,
        plan_raw: generated.raw_text,
        llm_ms: Some(generated.elapsed_ms),
        validation_errors,
    })
}
