//! Query filters evaluated against stored JSON documents.
//!
//! Semantics follow document databases: a condition on an array field
//! matches when any element matches, numbers compare numerically, and a
//! numeric string compared against a number is parsed first.

use std::cmp::Ordering;

use regex::Regex;
use serde_json::Value;

use crate::document::lookup;

/// A single condition applied to one field.
#[derive(Debug, Clone)]
pub enum Condition {
    /// Field equals the value.
    Eq(Value),
    /// Field does not equal the value (missing fields match).
    Ne(Value),
    /// Field is greater than the value.
    Gt(Value),
    /// Field is greater than or equal to the value.
    Gte(Value),
    /// Field is less than the value.
    Lt(Value),
    /// Field is less than or equal to the value.
    Lte(Value),
    /// Field equals one of the values.
    In(Vec<Value>),
    /// String field matches the pattern.
    Regex(Regex),
    /// Field is present (`true`) or absent (`false`).
    Exists(bool),
}

impl Condition {
    /// Parse a comparison operator name (`gt`, `gte`, `lt`, `lte`, `ne`, `eq`).
    pub fn from_operator(op: &str, value: Value) -> Option<Self> {
        match op {
            "eq" => Some(Condition::Eq(value)),
            "ne" => Some(Condition::Ne(value)),
            "gt" => Some(Condition::Gt(value)),
            "gte" => Some(Condition::Gte(value)),
            "lt" => Some(Condition::Lt(value)),
            "lte" => Some(Condition::Lte(value)),
            _ => None,
        }
    }

    /// Evaluate against the (possibly missing) field value.
    pub fn matches(&self, field: Option<&Value>) -> bool {
        let actual = match (self, field) {
            (Condition::Exists(want), f) => return f.is_some() == *want,
            (Condition::Ne(_), None) => return true,
            (Condition::Eq(Value::Null), None) => return true,
            (_, None) => return false,
            (_, Some(actual)) => actual,
        };

        match self {
            Condition::Eq(expected) => {
                loose_eq(actual, expected) || any_element(actual, |v| loose_eq(v, expected))
            }
            Condition::Ne(expected) => {
                !(loose_eq(actual, expected) || any_element(actual, |v| loose_eq(v, expected)))
            }
            Condition::Gt(bound) => any_element(actual, |v| compare(v, bound) == Some(Ordering::Greater)),
            Condition::Gte(bound) => any_element(actual, |v| {
                matches!(compare(v, bound), Some(Ordering::Greater | Ordering::Equal))
            }),
            Condition::Lt(bound) => any_element(actual, |v| compare(v, bound) == Some(Ordering::Less)),
            Condition::Lte(bound) => any_element(actual, |v| {
                matches!(compare(v, bound), Some(Ordering::Less | Ordering::Equal))
            }),
            Condition::In(options) => {
                any_element(actual, |v| options.iter().any(|o| loose_eq(v, o)))
            }
            Condition::Regex(re) => any_element(actual, |v| v.as_str().is_some_and(|s| re.is_match(s))),
            Condition::Exists(want) => *want,
        }
    }
}

/// A conjunction of field conditions.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<(String, Condition)>,
}

impl Filter {
    /// A filter matching every document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an arbitrary condition.
    pub fn with(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.clauses.push((field.into(), condition));
        self
    }

    /// Field equals value.
    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Eq(value.into()))
    }

    /// Field does not equal value.
    pub fn ne(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Ne(value.into()))
    }

    /// Field greater than value.
    pub fn gt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Gt(value.into()))
    }

    /// Field greater than or equal to value.
    pub fn gte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Gte(value.into()))
    }

    /// Field less than value.
    pub fn lt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Lt(value.into()))
    }

    /// Field less than or equal to value.
    pub fn lte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Lte(value.into()))
    }

    /// Field equals any of the values.
    pub fn is_in<V: Into<Value>>(self, field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.with(field, Condition::In(values))
    }

    /// String field matches a regular expression.
    pub fn regex(self, field: impl Into<String>, re: Regex) -> Self {
        self.with(field, Condition::Regex(re))
    }

    /// String field contains `text`, ignoring case.
    pub fn contains_ci(self, field: impl Into<String>, text: &str) -> Self {
        // An escaped literal always compiles.
        match Regex::new(&format!("(?i){}", regex::escape(text))) {
            Ok(re) => self.regex(field, re),
            Err(_) => self,
        }
    }

    /// Field is present or absent.
    pub fn exists(self, field: impl Into<String>, present: bool) -> Self {
        self.with(field, Condition::Exists(present))
    }

    /// Append all clauses of another filter.
    pub fn and(mut self, other: Filter) -> Self {
        self.clauses.extend(other.clauses);
        self
    }

    /// Whether no clauses are set.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Number of clauses.
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// The clauses in insertion order.
    pub fn clauses(&self) -> &[(String, Condition)] {
        &self.clauses
    }

    /// Evaluate the filter against a document.
    pub fn matches(&self, doc: &Value) -> bool {
        self.clauses
            .iter()
            .all(|(field, condition)| condition.matches(lookup(doc, field)))
    }
}

fn any_element(value: &Value, pred: impl Fn(&Value) -> bool) -> bool {
    match value {
        Value::Array(items) => items.iter().any(pred),
        other => pred(other),
    }
}

/// Numeric view of a value, parsing numeric strings.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Equality with number/string coercion.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::Number(_), _) | (_, Value::Number(_)) => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
        _ => false,
    }
}

/// Ordering between two scalar values, `None` when they are not comparable.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Number(_), _) | (_, Value::Number(_)) => {
            as_number(a)?.partial_cmp(&as_number(b)?)
        }
        _ => None,
    }
}
