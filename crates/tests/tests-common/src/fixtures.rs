//! Shared data: a small metadata index, OData payloads and a runtime configuration
//! pointing at mock servers.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::json;

use odata_planner_configuration::{Configuration, LlmConnection, ODataConnection, RetrySettings};
use query_engine_metadata::metadata::{IndexEntry, MetadataIndex};

/// A retry policy with the default attempt count and millisecond delays.
pub fn fast_retry() -> RetrySettings {
    RetrySettings {
        max_attempts: 3,
        initial_backoff_ms: 10,
        max_backoff_ms: 20,
    }
}

fn entry(r#type: &str, name: &str, synonym: &str, fields: &[&str], extra_text: &str) -> IndexEntry {
    IndexEntry {
        name: name.to_string(),
        synonym: synonym.to_string(),
        r#type: r#type.to_string(),
        fields: fields.iter().map(ToString::to_string).collect(),
        field_types: BTreeMap::new(),
        search_text: format!("{name} {synonym} {extra_text}").to_lowercase(),
    }
}

/// Goods, sales documents and counterparties.
pub fn metadata_index() -> MetadataIndex {
    MetadataIndex::from(vec![
        entry(
            "Catalog",
            "Номенклатура",
            "Номенклатура",
            &["Ref_Key", "Code", "Description", "Цена", "Артикул"],
            "товары номенклатура справочник",
        ),
        entry(
            "Document",
            "РеализацияТоваровУслуг",
            "Реализация товаров и услуг",
            &["Ref_Key", "Number", "Date", "Контрагент", "СуммаДокумента"],
            "продажи реализация документы",
        ),
        entry(
            "Catalog",
            "Контрагенты",
            "Контрагенты",
            &["Ref_Key", "Description", "ИНН"],
            "контрагенты поставщики покупатели",
        ),
    ])
}

/// A collection response with three goods.
pub fn goods_rows() -> serde_json::Value {
    json!({
        "odata.metadata": "http://localhost/odata/standard.odata/$metadata#Catalog_Номенклатура",
        "value": [
            {"Ref_Key": "5b7b3d7c-0001-11ee-9c3a-0050569f2e9f", "Code": "001", "Description": "Стол", "Цена": 1500},
            {"Ref_Key": "5b7b3d7c-0002-11ee-9c3a-0050569f2e9f", "Code": "002", "Description": "Стул", "Цена": 1200},
            {"Ref_Key": "5b7b3d7c-0003-11ee-9c3a-0050569f2e9f", "Code": "003", "Description": "Шкаф", "Цена": 8900}
        ]
    })
}

/// An EDMX document declaring the given entity sets.
pub fn metadata_xml(entity_sets: &[&str]) -> String {
    let sets = entity_sets
        .iter()
        .map(|name| format!(r#"<EntitySet Name="{name}" EntityType="StandardODATA.{name}"/>"#))
        .collect::<Vec<_>>()
        .join("\n        ");
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<edmx:Edmx xmlns:edmx="http://schemas.microsoft.com/ado/2007/06/edmx" Version="1.0">
  <edmx:DataServices xmlns:m="http://schemas.microsoft.com/ado/2007/08/dataservices/metadata" m:DataServiceVersion="3.0">
    <Schema xmlns="http://schemas.microsoft.com/ado/2009/11/edm" Namespace="StandardODATA">
      <EntityContainer Name="EnterpriseV8" m:IsDefaultEntityContainer="true">
        {sets}
      </EntityContainer>
    </Schema>
  </edmx:DataServices>
</edmx:Edmx>"#
    )
}

/// A runtime configuration talking to the given OData and chat-completion base URLs.
pub fn configuration(odata_url: &str, llm_url: &str) -> Configuration {
    Configuration {
        odata: ODataConnection {
            base_url: odata_url.to_string(),
            username: "reader".to_string(),
            password: "secret".to_string(),
            timeout: Duration::from_secs(2),
            retry: fast_retry(),
        },
        llm: LlmConnection {
            api_key: "test-key".to_string(),
            model_id: "test-model".to_string(),
            base_url: llm_url.to_string(),
            timeout: Duration::from_secs(2),
            auth_scheme: "Bearer".to_string(),
            extra_headers: BTreeMap::new(),
            structured_output: true,
            retry: fast_retry(),
        },
        metadata_index: metadata_index(),
        candidate_limit: 10,
        default_top: 5,
        navigation_base: None,
    }
}
