use std::fs;
use std::path::PathBuf;

use query_engine_metadata::metadata::{MetadataIndex, WeightedRatio};
use query_engine_odata::odata::url::{build_url, QueryParameters};
use query_engine_translation::translation::{params, plan, validation};

pub const BASE_URL: &str = "http://localhost:8080/base/odata";

/// What a plan from the goldenfiles compiles to.
#[derive(Debug)]
pub struct Translated {
    pub entity: String,
    pub params: QueryParameters,
    pub url: String,
    pub errors_before_repair: Vec<String>,
    pub errors_after_repair: Vec<String>,
}

/// Parse, check, repair and compile the plan of a goldenfile test.
pub fn test_translation(testname: &str) -> anyhow::Result<Translated> {
    let goldenfiles = PathBuf::from("tests/goldenfiles");
    let index: MetadataIndex =
        serde_json::from_str(&fs::read_to_string(goldenfiles.join("metadata_index.json"))?)?;
    let text = fs::read_to_string(goldenfiles.join(testname).join("plan.json"))?;

    let validator = validation::PlanValidator::new(&index);
    let (legacy, errors_before_repair, errors_after_repair) = match plan::parse_plan(&text)? {
        plan::ParsedPlan::Structured(mut structured) => {
            let before = validator.validate(&structured);
            validator.suggest_fixes(&mut structured, &before, &WeightedRatio);
            let after = validator.validate(&structured);
            (plan::translate(&structured)?, before, after)
        }
        plan::ParsedPlan::Legacy(legacy) => (legacy, vec![], vec![]),
    };

    let params = params::normalize_params(Some(&legacy.params));
    let url = build_url(BASE_URL, &legacy.entity, &params)?;

    Ok(Translated {
        entity: legacy.entity,
        params,
        url,
        errors_before_repair,
        errors_after_repair,
    })
}
