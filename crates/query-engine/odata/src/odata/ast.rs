//! Type definitions of the structured query plan.
//!
//! The filter is a tree: a [`FilterGroup`] exclusively owns its children, which are either
//! leaf [`FilterCondition`]s or nested groups. Child order is significant and is preserved
//! when rendering.

use chrono::{NaiveDate, NaiveDateTime};
use enum_iterator::Sequence;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use query_engine_metadata::metadata::is_valid_entity_name;

/// The largest `$top` a plan may request.
pub const MAX_TOP: u32 = 1000;

/// Comparison operators supported in filter conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Sequence, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl FilterOperator {
    /// The operator keyword in `$filter` syntax.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Ge => "ge",
            Self::Le => "le",
        }
    }
}

/// How a condition's value is written as a literal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Sequence, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    String,
    Number,
    Boolean,
    Datetime,
    Guid,
}

/// How the members of a group are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Logic {
    #[default]
    And,
    Or,
}

impl Logic {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

/// The value side of a condition.
///
/// Date and time variants are only constructed programmatically; JSON strings always
/// deserialize as [`FilterValue::String`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    #[serde(skip_deserializing)]
    DateTime(NaiveDateTime),
    #[serde(skip_deserializing)]
    Date(NaiveDate),
}

/// A single `field operator value` comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub field: String,
    pub operator: FilterOperator,
    pub value: FilterValue,
    #[serde(default)]
    pub value_type: ValueType,
}

/// A member of a filter group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterNode {
    Condition(FilterCondition),
    Group(FilterGroup),
}

/// Conditions and nested groups combined with one logical operator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterGroup {
    #[serde(default)]
    pub logic: Logic,
    pub conditions: Vec<FilterNode>,
}

/// Sort direction of an `$orderby` element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// One `$orderby` element. Serialized as a `[field, direction]` pair; a
/// `{"field", "direction"}` object is accepted as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OrderByInput", into = "(String, SortDirection)")]
pub struct OrderByElement {
    pub field: String,
    pub direction: SortDirection,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OrderByInput {
    Pair(String, SortDirection),
    Object {
        field: String,
        #[serde(default)]
        direction: SortDirection,
    },
}

impl From<OrderByInput> for OrderByElement {
    fn from(input: OrderByInput) -> Self {
        match input {
            OrderByInput::Pair(field, direction) | OrderByInput::Object { field, direction } => {
                OrderByElement { field, direction }
            }
        }
    }
}

impl From<(String, SortDirection)> for OrderByElement {
    fn from((field, direction): (String, SortDirection)) -> Self {
        OrderByElement { field, direction }
    }
}

impl From<OrderByElement> for (String, SortDirection) {
    fn from(element: OrderByElement) -> Self {
        (element.field, element.direction)
    }
}

/// Errors raised when a plan violates its invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("Invalid entity format: {0}")]
    InvalidEntity(String),
    #[error("top must be between 1 and {MAX_TOP}, got {0}")]
    TopOutOfRange(i64),
}

/// The structured description of one read query.
///
/// The target entity and `$top` are checked when the plan is built and cannot be changed
/// afterwards. Filter, projection and ordering stay mutable so field names can be repaired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedQueryPlan")]
pub struct QueryPlan {
    entity: String,
    pub filter_group: Option<FilterGroup>,
    pub select: Vec<String>,
    pub orderby: Vec<OrderByElement>,
    top: Option<u32>,
    expand: Vec<String>,
}

impl QueryPlan {
    /// An unfiltered plan over `entity`.
    pub fn new(entity: impl Into<String>) -> Result<Self, PlanError> {
        let entity = entity.into();
        if !is_valid_entity_name(&entity) {
            return Err(PlanError::InvalidEntity(entity));
        }
        Ok(QueryPlan {
            entity,
            filter_group: None,
            select: vec![],
            orderby: vec![],
            top: None,
            expand: vec![],
        })
    }

    pub fn with_filter(mut self, filter_group: FilterGroup) -> Self {
        self.filter_group = Some(filter_group);
        self
    }

    pub fn with_select(mut self, select: Vec<String>) -> Self {
        self.select = select;
        self
    }

    pub fn with_orderby(mut self, orderby: Vec<OrderByElement>) -> Self {
        self.orderby = orderby;
        self
    }

    pub fn with_expand(mut self, expand: Vec<String>) -> Self {
        self.expand = expand;
        self
    }

    pub fn with_top(mut self, top: i64) -> Result<Self, PlanError> {
        self.top = Some(check_top(top)?);
        Ok(self)
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn top(&self) -> Option<u32> {
        self.top
    }

    pub fn expand(&self) -> &[String] {
        &self.expand
    }
}

fn check_top(top: i64) -> Result<u32, PlanError> {
    match u32::try_from(top) {
        Ok(value) if (1..=MAX_TOP).contains(&value) => Ok(value),
        _ => Err(PlanError::TopOutOfRange(top)),
    }
}

/// The wire shape of a plan before its invariants are checked. Unknown keys are ignored
/// and absent or null lists are treated as empty.
#[derive(Deserialize)]
struct UncheckedQueryPlan {
    entity: String,
    #[serde(default)]
    filter_group: Option<FilterGroup>,
    #[serde(default)]
    select: Option<Vec<String>>,
    #[serde(default)]
    orderby: Option<Vec<OrderByElement>>,
    #[serde(default)]
    top: Option<i64>,
    #[serde(default)]
    expand: Option<Vec<String>>,
}

impl TryFrom<UncheckedQueryPlan> for QueryPlan {
    type Error = PlanError;

    fn try_from(unchecked: UncheckedQueryPlan) -> Result<Self, Self::Error> {
        let mut plan = QueryPlan::new(unchecked.entity)?
            .with_select(unchecked.select.unwrap_or_default())
            .with_orderby(unchecked.orderby.unwrap_or_default())
            .with_expand(unchecked.expand.unwrap_or_default());
        plan.filter_group = unchecked.filter_group;
        if let Some(top) = unchecked.top {
            plan = plan.with_top(top)?;
        }
        Ok(plan)
    }
}
