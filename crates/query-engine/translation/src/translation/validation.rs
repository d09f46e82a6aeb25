//! Check query plans against the metadata index, and repair unknown field names.

use std::collections::{BTreeMap, BTreeSet};

use query_engine_metadata::metadata::similarity::best_match;
use query_engine_metadata::metadata::{MetadataIndex, Similarity};
use query_engine_odata::odata::ast::{FilterGroup, FilterNode, QueryPlan};

/// Known entities and their fields, built once from the metadata index.
#[derive(Debug, Clone, Default)]
pub struct PlanValidator {
    entities: BTreeSet<String>,
    fields_by_entity: BTreeMap<String, BTreeSet<String>>,
}

impl PlanValidator {
    pub fn new(index: &MetadataIndex) -> Self {
        PlanValidator {
            entities: index.entities(),
            fields_by_entity: index.fields_by_entity(),
        }
    }

    /// The fields of `entity`, if the index knows any.
    fn known_fields(&self, entity: &str) -> Option<&BTreeSet<String>> {
        self.fields_by_entity
            .get(entity)
            .filter(|fields| !fields.is_empty())
    }

    /// Describe every problem with `plan`, in plan order. An empty list means the plan is valid.
    ///
    /// Field checks are skipped for an entity with no known fields.
    pub fn validate(&self, plan: &QueryPlan) -> Vec<String> {
        let mut errors = vec![];
        if !self.entities.contains(plan.entity()) {
            errors.push(format!("Unknown entity: {}", plan.entity()));
        }

        let Some(fields) = self.known_fields(plan.entity()) else {
            return errors;
        };

        if let Some(group) = &plan.filter_group {
            check_filter_fields(group, fields, &mut errors);
        }
        for field in &plan.select {
            if !fields.contains(field) {
                errors.push(format!("Unknown field in select: {field}"));
            }
        }
        for element in &plan.orderby {
            if !fields.contains(&element.field) {
                errors.push(format!("Unknown field in orderby: {}", element.field));
            }
        }
        errors
    }

    /// Replace unknown field names with the closest known field.
    ///
    /// Does nothing unless `errors` is non-empty and the entity has known fields. Only field
    /// names change; valid names are left as they are.
    pub fn suggest_fixes<S>(&self, plan: &mut QueryPlan, errors: &[String], similarity: &S)
    where
        S: Similarity + ?Sized,
    {
        if errors.is_empty() {
            return;
        }
        let Some(fields) = self.known_fields(plan.entity()) else {
            return;
        };

        let fix = |field: &mut String| {
            if fields.contains(field.as_str()) {
                return;
            }
            if let Some((replacement, score)) =
                best_match(similarity, field, fields.iter().map(String::as_str))
            {
                tracing::debug!(from = %field, to = replacement, score, "repairing unknown field");
                *field = replacement.to_string();
            }
        };

        if let Some(group) = &mut plan.filter_group {
            fix_filter_fields(group, &fix);
        }
        plan.select.iter_mut().for_each(fix);
        plan.orderby
            .iter_mut()
            .for_each(|element| fix(&mut element.field));
    }
}

fn check_filter_fields(group: &FilterGroup, fields: &BTreeSet<String>, errors: &mut Vec<String>) {
    for node in &group.conditions {
        match node {
            FilterNode::Condition(condition) => {
                if !fields.contains(&condition.field) {
                    errors.push(format!("Unknown field in filter: {}", condition.field));
                }
            }
            FilterNode::Group(inner) => check_filter_fields(inner, fields, errors),
        }
    }
}

fn fix_filter_fields(group: &mut FilterGroup, fix: &impl Fn(&mut String)) {
    for node in &mut group.conditions {
        match node {
            FilterNode::Condition(condition) => fix(&mut condition.field),
            FilterNode::Group(inner) => fix_filter_fields(inner, fix),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use query_engine_metadata::metadata::{IndexEntry, WeightedRatio};
    use query_engine_odata::odata::ast::*;
    use query_engine_odata::odata::helpers::*;
    use similar_asserts::assert_eq;

    fn index() -> MetadataIndex {
        MetadataIndex::from(vec![
            IndexEntry {
                name: "Items".to_string(),
                r#type: "Catalog".to_string(),
                fields: ["Code", "Description", "Price", "Ref_Key"]
                    .map(String::from)
                    .to_vec(),
                search_text: "catalog items".to_string(),
                ..IndexEntry::default()
            },
            IndexEntry {
                name: "Sale".to_string(),
                r#type: "Document".to_string(),
                search_text: "document sale".to_string(),
                ..IndexEntry::default()
            },
        ])
    }

    fn plan_with_typos() -> QueryPlan {
        QueryPlan::new("Catalog_Items")
            .unwrap()
            .with_filter(and(vec![
                condition("Code", FilterOperator::Eq, "001", ValueType::String),
                nested(or(vec![condition(
                    "Prise",
                    FilterOperator::Gt,
                    100,
                    ValueType::Number,
                )])),
            ]))
            .with_select(vec!["Descriptoin".to_string(), "Code".to_string()])
            .with_orderby(vec![order_by("Pric", SortDirection::Desc)])
            .with_expand(vec!["Owner".to_string()])
            .with_top(7)
            .unwrap()
    }

    #[test]
    fn reports_problems_in_plan_order() {
        let validator = PlanValidator::new(&index());
        assert_eq!(
            validator.validate(&plan_with_typos()),
            vec![
                "Unknown field in filter: Prise",
                "Unknown field in select: Descriptoin",
                "Unknown field in orderby: Pric",
            ]
        );
    }

    #[test]
    fn valid_plan_has_no_errors() {
        let plan = QueryPlan::new("Catalog_Items")
            .unwrap()
            .with_select(vec!["Code".to_string()]);
        assert!(PlanValidator::new(&index()).validate(&plan).is_empty());
    }

    #[test]
    fn entity_without_fields_skips_field_checks() {
        let plan = QueryPlan::new("Document_Sale")
            .unwrap()
            .with_select(vec!["Anything".to_string()]);
        assert!(PlanValidator::new(&index()).validate(&plan).is_empty());

        let plan = QueryPlan::new("Document_Missing")
            .unwrap()
            .with_select(vec!["Anything".to_string()]);
        assert_eq!(
            PlanValidator::new(&index()).validate(&plan),
            vec!["Unknown entity: Document_Missing"]
        );
    }

    #[test]
    fn repairs_unknown_fields_only() {
        let validator = PlanValidator::new(&index());
        let mut plan = plan_with_typos();
        let errors = validator.validate(&plan);
        validator.suggest_fixes(&mut plan, &errors, &WeightedRatio);

        assert!(validator.validate(&plan).is_empty());
        assert_eq!(plan.select, vec!["Description", "Code"]);
        assert_eq!(plan.orderby[0].field, "Price");
        assert_eq!(plan.orderby[0].direction, SortDirection::Desc);
        assert_eq!(plan.entity(), "Catalog_Items");
        assert_eq!(plan.top(), Some(7));
        assert_eq!(plan.expand(), ["Owner".to_string()]);

        let group = plan.filter_group.as_ref().unwrap();
        let FilterNode::Group(inner) = &group.conditions[1] else {
            panic!("expected a nested group");
        };
        let FilterNode::Condition(repaired) = &inner.conditions[0] else {
            panic!("expected a condition");
        };
        assert_eq!(repaired.field, "Price");
        assert_eq!(repaired.operator, FilterOperator::Gt);
        assert_eq!(repaired.value, FilterValue::from(100));
    }

    #[test]
    fn repair_requires_errors() {
        let validator = PlanValidator::new(&index());
        let mut plan = plan_with_typos();
        let before = plan.clone();
        validator.suggest_fixes(&mut plan, &[], &WeightedRatio);
        assert_eq!(plan, before);
    }

    #[test]
    fn repair_requires_known_fields() {
        let validator = PlanValidator::new(&index());
        let mut plan = QueryPlan::new("Document_Sale")
            .unwrap()
            .with_select(vec!["Nomber".to_string()]);
        validator.suggest_fixes(&mut plan, &["Unknown entity: x".to_string()], &WeightedRatio);
        assert_eq!(plan.select, vec!["Nomber"]);
    }
}
