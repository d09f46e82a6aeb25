//! Render the filter AST as a `$filter` expression.

use super::ast::*;
use super::string::{format_value, RenderError};

impl FilterCondition {
    /// `field operator literal`.
    pub fn to_filter(&self) -> Result<String, RenderError> {
        Ok(format!(
            "{} {} {}",
            self.field,
            self.operator.name(),
            format_value(&self.value, self.value_type)?
        ))
    }
}

impl FilterNode {
    /// Render a group member. Nested groups are always parenthesized; an empty nested
    /// group renders to nothing.
    fn to_filter(&self) -> Result<Option<String>, RenderError> {
        match self {
            FilterNode::Condition(condition) => condition.to_filter().map(Some),
            FilterNode::Group(group) => Ok(group.to_filter()?.map(|inner| format!("({inner})"))),
        }
    }
}

impl FilterGroup {
    /// Render the group, or `None` when it has no renderable members.
    ///
    /// A single member is written as is. Several members are each parenthesized, unless
    /// already wrapped, and joined with the group's logical keyword.
    pub fn to_filter(&self) -> Result<Option<String>, RenderError> {
        let mut parts = vec![];
        for node in &self.conditions {
            if let Some(part) = node.to_filter()? {
                parts.push(part);
            }
        }

        Ok(match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => Some(
                parts
                    .iter()
                    .map(|part| {
                        if part.starts_with('(') && part.ends_with(')') {
                            part.clone()
                        } else {
                            format!("({part})")
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(&format!(" {} ", self.logic.keyword())),
            ),
        })
    }
}

/// The `$filter` text of an optional group; empty when there is nothing to filter on.
pub fn render_filter(filter_group: Option<&FilterGroup>) -> Result<String, RenderError> {
    match filter_group {
        None => Ok(String::new()),
        Some(group) => Ok(group.to_filter()?.unwrap_or_default()),
    }
}
