//! Helpers for building plan and filter AST values in common shapes.

use super::ast::*;

/// A leaf condition.
pub fn condition(
    field: impl Into<String>,
    operator: FilterOperator,
    value: impl Into<FilterValue>,
    value_type: ValueType,
) -> FilterNode {
    FilterNode::Condition(FilterCondition {
        field: field.into(),
        operator,
        value: value.into(),
        value_type,
    })
}

/// A group whose members must all hold.
pub fn and(conditions: Vec<FilterNode>) -> FilterGroup {
    FilterGroup {
        logic: Logic::And,
        conditions,
    }
}

/// A group where any member may hold.
pub fn or(conditions: Vec<FilterNode>) -> FilterGroup {
    FilterGroup {
        logic: Logic::Or,
        conditions,
    }
}

/// Nest a group inside another group.
pub fn nested(group: FilterGroup) -> FilterNode {
    FilterNode::Group(group)
}

/// An `$orderby` element.
pub fn order_by(field: impl Into<String>, direction: SortDirection) -> OrderByElement {
    OrderByElement {
        field: field.into(),
        direction,
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::String(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::String(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Number(value.into())
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        FilterValue::Number(value.into())
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value).map_or(FilterValue::Null, FilterValue::Number)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

impl From<chrono::NaiveDateTime> for FilterValue {
    fn from(value: chrono::NaiveDateTime) -> Self {
        FilterValue::DateTime(value)
    }
}

impl From<chrono::NaiveDate> for FilterValue {
    fn from(value: chrono::NaiveDate) -> Self {
        FilterValue::Date(value)
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FilterValue::Null, Into::into)
    }
}
