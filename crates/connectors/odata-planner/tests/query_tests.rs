pub mod common;

use serde_json::json;
use similar_asserts::assert_eq;

use odata_planner::error::Error;
use odata_planner::query::QueryRequest;
use odata_planner_configuration::Configuration;
use query_engine_execution as execution;
use query_engine_generation::generation;
use query_engine_metadata::metadata::MetadataIndex;
use tests_common::fixtures;
use tests_common::mock::{MockServer, Reply};

const PLAN_WITH_TYPO: &str = r#"{"entity": "Catalog_Номенклатура", "filter_group": {"logic": "and", "conditions": [{"field": "Цина", "operator": "gt", "value": 1000, "value_type": "number"}]}, "select": ["Code", "Descriptoin", "Цена"], "top": 10}"#;

#[tokio::test]
async fn generates_repairs_and_runs_a_plan() {
    let llm = MockServer::llm(vec![Reply::completion(PLAN_WITH_TYPO)]);
    let odata = MockServer::odata(vec![Reply::json(fixtures::goods_rows())]);
    let (planner, registry) = common::create_planner_for(&odata, &llm).await;

    let response = planner
        .query(QueryRequest::new("Покажи товары с ценой больше 1000"))
        .await
        .unwrap();

    assert_eq!(response.plan.entity, "Catalog_Номенклатура");
    insta::assert_json_snapshot!(response.plan.params, @r###"
    {
      "$filter": "Цена gt 1000",
      "$select": "Code,Description,Цена",
      "$top": 10,
      "$format": "json"
    }
    "###);
    assert!(response.validation_errors.is_empty(), "{:?}", response.validation_errors);
    assert_eq!(response.plan_raw, PLAN_WITH_TYPO);
    assert!(response.llm_ms.is_some());
    assert_eq!(response.odata.status_code, 200);
    assert_eq!(response.summary.row_count, Some(3));
    assert_eq!(
        response.summary.navigation_links[0],
        "#e1cib/data/Справочник.Номенклатура?ref=5b7b3d7c-0001-11ee-9c3a-0050569f2e9f"
    );

    assert_eq!(llm.hits(), 1);
    assert_eq!(
        odata.requests()[0].decoded_uri(),
        "/odata/standard.odata/Catalog_Номенклатура?$filter=Цена gt 1000&$select=Code,Description,Цена&$top=10&$format=json"
    );
    assert_eq!(
        common::counter_value(&registry, "odata_planner_generation_total"),
        Some(1.0)
    );
    assert_eq!(
        common::counter_value(&registry, "odata_planner_odata_request_total"),
        Some(1.0)
    );
}

#[tokio::test]
async fn explicit_entities_skip_generation() {
    let llm = MockServer::llm(vec![Reply::completion(PLAN_WITH_TYPO)]);
    let odata = MockServer::odata(vec![Reply::json(json!({"value": []}))]);
    let (planner, _registry) = common::create_planner_for(&odata, &llm).await;

    let response = planner
        .query(QueryRequest::new("покажи catalog_Контрагенты, 3 записи"))
        .await
        .unwrap();

    assert_eq!(response.plan.entity, "Catalog_Контрагенты");
    assert_eq!(response.plan.params["$top"], json!(3));
    assert_eq!(response.plan_raw, "");
    assert_eq!(response.llm_ms, None);
    assert_eq!(response.summary.row_count, Some(0));
    assert_eq!(llm.hits(), 0);
}

#[tokio::test]
async fn legacy_plans_are_normalized() {
    let llm = MockServer::llm(vec![Reply::completion(
        r#"{"entity": "DocumentРеализацияТоваровУслуг", "params": "filter=Date ge '2024-01-01'&$top=2"}"#,
    )]);
    let odata = MockServer::odata(vec![Reply::json(json!({"value": []}))]);
    let (planner, _registry) = common::create_planner_for(&odata, &llm).await;

    let response = planner
        .query(QueryRequest::new("продажи с начала года"))
        .await
        .unwrap();

    assert_eq!(response.plan.entity, "Document_РеализацияТоваровУслуг");
    assert_eq!(
        response.plan.params["$filter"],
        json!("Date ge datetime'2024-01-01T00:00:00'")
    );
    assert_eq!(response.plan.params["$top"], json!("2"));
    assert_eq!(response.plan.params["$format"], json!("json"));
}

#[tokio::test]
async fn falls_back_to_metadata_entity_sets() {
    let llm = MockServer::llm(vec![Reply::completion(
        r#"{"entity": "Document_Продажа", "top": 3}"#,
    )]);
    let odata = MockServer::odata_with_metadata(
        vec![Reply::json(json!({"value": [{"Ref_Key": "r1"}]}))],
        fixtures::metadata_xml(&["Catalog_Склады", "Document_Продажа"]),
    );
    let configuration = Configuration {
        metadata_index: MetadataIndex::empty(),
        ..fixtures::configuration(&odata.odata_url(), &llm.llm_url())
    };
    let (planner, _registry) = common::create_planner(configuration).await;

    let response = planner
        .query(QueryRequest::new("последние продажи"))
        .await
        .unwrap();

    let system_prompt = llm.requests()[0].body.as_ref().unwrap()["messages"][0]["content"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(system_prompt.contains("- Catalog_Склады (Склады)"), "{system_prompt}");
    assert!(system_prompt.contains("- Document_Продажа (Продажа)"), "{system_prompt}");

    assert_eq!(response.plan.entity, "Document_Продажа");
    assert_eq!(
        response.validation_errors,
        vec!["Unknown entity: Document_Продажа"]
    );
    assert_eq!(
        response.summary.navigation_links,
        vec!["#e1cib/data/Документ.Продажа?ref=r1"]
    );
    assert_eq!(odata.hits(), 2);
}

#[tokio::test]
async fn metadata_failures_leave_no_candidates() {
    let odata = MockServer::odata(vec![]);
    let llm = MockServer::llm(vec![]);
    let configuration = Configuration {
        metadata_index: MetadataIndex::empty(),
        ..fixtures::configuration(&odata.odata_url(), &llm.llm_url())
    };
    let (planner, _registry) = common::create_planner(configuration).await;

    assert!(planner.candidates("что угодно").await.is_empty());
}

#[tokio::test]
async fn candidates_put_explicit_entities_first() {
    let odata = MockServer::odata(vec![]);
    let llm = MockServer::llm(vec![]);
    let (planner, _registry) = common::create_planner_for(&odata, &llm).await;

    let candidates = planner
        .candidates("Document_РеализацияТоваровУслуг за январь")
        .await;
    assert_eq!(candidates[0].entity, "Document_РеализацияТоваровУслуг");
    assert_eq!(candidates[0].score, 100);
    assert!(!candidates[0].fields.is_empty());
    assert_eq!(odata.hits(), 0);
}

#[tokio::test]
async fn request_credentials_override_configured_ones() {
    let llm = MockServer::llm(vec![]);
    let odata = MockServer::odata(vec![Reply::json(json!({"value": []}))]);
    let (planner, _registry) = common::create_planner_for(&odata, &llm).await;

    planner
        .query(QueryRequest {
            user_query: "Catalog_Контрагенты".to_string(),
            username: Some("admin".to_string()),
            password: Some("pw".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(
        odata.requests()[0].authorization.as_deref(),
        Some("Basic YWRtaW46cHc=")
    );
}

#[tokio::test]
async fn odata_errors_are_returned() {
    let llm = MockServer::llm(vec![]);
    let odata = MockServer::odata(vec![Reply::json_status(
        400,
        json!({"code": 6, "message": "Неизвестное поле"}),
    )]);
    let (planner, registry) = common::create_planner_for(&odata, &llm).await;

    let error = planner
        .query(QueryRequest::new("Catalog_Контрагенты"))
        .await
        .unwrap_err();

    assert!(
        matches!(error, Error::Execution(execution::Error::Http { status: 400, .. })),
        "{error}"
    );
    assert_eq!(error.to_string(), "HTTP 400 (code=6): Неизвестное поле");
    assert_eq!(
        common::counter_value(&registry, "odata_planner_odata_error_total"),
        Some(1.0)
    );
}

#[tokio::test]
async fn generation_errors_are_returned() {
    let llm = MockServer::llm(vec![Reply::completion("no idea")]);
    let odata = MockServer::odata(vec![]);
    let (planner, registry) = common::create_planner_for(&odata, &llm).await;

    let error = planner
        .query(QueryRequest::new("товары"))
        .await
        .unwrap_err();

    assert!(
        matches!(error, Error::Generation(generation::Error::PlanParse { .. })),
        "{error}"
    );
    assert_eq!(odata.hits(), 0);
    assert_eq!(
        common::counter_value(&registry, "odata_planner_generation_error_total"),
        Some(1.0)
    );
}
