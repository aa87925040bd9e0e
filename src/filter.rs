//! Filter AST and its wire form.
//!
//! A [`FilterState`] is built per request from a [`RawFilterState`] and thrown
//! away after compilation. Validation turns the loosely shaped wire conditions
//! into typed [`Predicate`]s, so the compiler only ever sees string values bound
//! to a known operator. An unknown operator is always rejected; how strictly
//! fields and values are checked is decided by the [`FilterPolicy`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::datatype;
use crate::error::{LeadsiftError, Result};

#[cfg(feature = "strict")]
use crate::registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogicalOperator {
    #[default]
    #[serde(rename = "AND", alias = "and")]
    And,
    #[serde(rename = "OR", alias = "or")]
    Or,
}
impl LogicalOperator {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
}
impl Operator {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "equals" => Some(Self::Equals),
            "contains" => Some(Self::Contains),
            "startsWith" => Some(Self::StartsWith),
            "endsWith" => Some(Self::EndsWith),
            _ => None,
        }
    }
    /// Like `parse`, as a validation error for unknown names.
    pub fn require(name: &str) -> Result<Self> {
        Self::parse(name).ok_or_else(|| {
            LeadsiftError::Validation(format!("'{name}' is not a supported operator"))
        })
    }
}

/// An operator together with the value it compares against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Equals(String),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
}
impl Predicate {
    pub fn new(operator: Operator, value: String) -> Self {
        match operator {
            Operator::Equals => Self::Equals(value),
            Operator::Contains => Self::Contains(value),
            Operator::StartsWith => Self::StartsWith(value),
            Operator::EndsWith => Self::EndsWith(value),
        }
    }
    pub fn operator(&self) -> Operator {
        match self {
            Self::Equals(_) => Operator::Equals,
            Self::Contains(_) => Operator::Contains,
            Self::StartsWith(_) => Operator::StartsWith,
            Self::EndsWith(_) => Operator::EndsWith,
        }
    }
    pub fn value(&self) -> &str {
        match self {
            Self::Equals(v) | Self::Contains(v) | Self::StartsWith(v) | Self::EndsWith(v) => v,
        }
    }
    /// The value as it is bound: exact for `Equals`, wildcarded otherwise.
    pub fn bound_value(&self) -> String {
        match self {
            Self::Equals(v) => v.clone(),
            Self::Contains(v) => datatype::contains_pattern(v),
            Self::StartsWith(v) => datatype::prefix_pattern(v),
            Self::EndsWith(v) => datatype::suffix_pattern(v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub field: String,
    pub predicate: Predicate,
}
impl Condition {
    pub fn new(field: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            field: field.into(),
            predicate,
        }
    }
    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, Predicate::Equals(value.into()))
    }
    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, Predicate::Contains(value.into()))
    }
    pub fn starts_with(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, Predicate::StartsWith(value.into()))
    }
    pub fn ends_with(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, Predicate::EndsWith(value.into()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterState {
    pub conditions: Vec<Condition>,
    pub logical_operator: LogicalOperator,
}
impl FilterState {
    pub fn new(conditions: Vec<Condition>, logical_operator: LogicalOperator) -> Self {
        Self {
            conditions,
            logical_operator,
        }
    }
    pub fn all(conditions: Vec<Condition>) -> Self {
        Self::new(conditions, LogicalOperator::And)
    }
    pub fn any(conditions: Vec<Condition>) -> Self {
        Self::new(conditions, LogicalOperator::Or)
    }
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Validates a wire filter into a typed one. Every wire condition either
    /// becomes a typed condition or fails the whole filter.
    pub fn from_wire(raw: RawFilterState, policy: FilterPolicy) -> Result<Self> {
        let conditions = raw
            .conditions
            .into_iter()
            .map(|condition| policy.admit(condition))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(conditions, raw.logical_operator))
    }

    /// Parses and validates the JSON text of a wire filter.
    pub fn parse(json: &str, policy: FilterPolicy) -> Result<Self> {
        Self::from_wire(RawFilterState::from_json(json)?, policy)
    }
}

// ------------- Wire form -------------
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFilterState {
    #[serde(default)]
    pub conditions: Vec<RawCondition>,
    #[serde(default)]
    pub logical_operator: LogicalOperator,
}
impl RawFilterState {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| LeadsiftError::Validation(format!("filters is not a valid filter: {e}")))
    }
}

// Every member is optional so that one malformed condition does not take the
// whole filter down with it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCondition {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub value: Value,
}

// ------------- Policy -------------
/// How strictly conditions are checked before compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterPolicy {
    /// Coerce any value to a string and leave unknown fields to the compiler,
    /// which skips them. That keeps older saved filters working after a field
    /// is removed from the registry.
    #[default]
    Lenient,
    /// Also reject unknown fields and non-scalar values.
    #[cfg(feature = "strict")]
    Strict,
}
impl FilterPolicy {
    fn admit(self, raw: RawCondition) -> Result<Condition> {
        match self {
            Self::Lenient => admit_lenient(raw),
            #[cfg(feature = "strict")]
            Self::Strict => admit_strict(raw),
        }
    }
}

fn admit_lenient(raw: RawCondition) -> Result<Condition> {
    let operator = Operator::require(&raw.operator)?;
    let value = datatype::coerce(&raw.value);
    Ok(Condition::new(raw.field, Predicate::new(operator, value)))
}

#[cfg(feature = "strict")]
fn admit_strict(raw: RawCondition) -> Result<Condition> {
    if !registry::is_allowed(&raw.field) {
        return Err(LeadsiftError::Validation(format!(
            "'{}' is not a filterable field",
            raw.field
        )));
    }
    let operator = Operator::require(&raw.operator)?;
    let value = datatype::scalar(&raw.value).ok_or_else(|| {
        LeadsiftError::Validation(format!("the value for '{}' must be a scalar", raw.field))
    })?;
    Ok(Condition::new(raw.field, Predicate::new(operator, value)))
}
