//! Common functions used across test cases.

use odata_planner::connector::Planner;
use odata_planner_configuration::Configuration;
use tests_common::fixtures;
use tests_common::mock::MockServer;

/// A planner for `configuration`, with the registry its metrics live in.
pub async fn create_planner(configuration: Configuration) -> (Planner, prometheus::Registry) {
    tests_common::init_logging();
    let mut registry = prometheus::Registry::new();
    let planner = Planner::new(configuration, &mut registry)
        .await
        .expect("planner initialization");
    (planner, registry)
}

/// A planner talking to the given mock servers, using the fixture metadata index.
pub async fn create_planner_for(odata: &MockServer, llm: &MockServer) -> (Planner, prometheus::Registry) {
    create_planner(fixtures::configuration(&odata.odata_url(), &llm.llm_url())).await
}

/// The value of a counter in `registry`.
pub fn counter_value(registry: &prometheus::Registry, name: &str) -> Option<f64> {
    registry
        .gather()
        .into_iter()
        .find(|family| family.get_name() == name)
        .and_then(|family| family.get_metric().first().map(|metric| metric.get_counter().get_value()))
}
