//! Equality criteria and their query-string form.
//!
//! Criteria are built from `(attribute, expected value)` constraints kept in
//! the order they were added. A [`QueryStringFactory`] turns them into a
//! [`QueryString`]; the default factory is deterministic, so equal criteria
//! always produce textually equal queries.

use std::fmt;

use crate::uri::QueryString;

/// Query key for the pagination offset.
pub const OFFSET_PARAM: &str = "offset";

/// Query key for the pagination limit.
pub const LIMIT_PARAM: &str = "limit";

/// The right-hand side of an equality constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CriteriaValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl fmt::Display for CriteriaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for CriteriaValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for CriteriaValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for CriteriaValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<String> for CriteriaValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for CriteriaValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// `attribute == value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EqualsExpression {
    pub attribute: String,
    pub value: CriteriaValue,
}

/// Ordered equality constraints plus optional pagination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criteria {
    expressions: Vec<EqualsExpression>,
    offset: Option<u32>,
    limit: Option<u32>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build criteria from constraints, preserving their order.
    pub fn from_constraints<I, K, V>(constraints: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<CriteriaValue>,
    {
        constraints
            .into_iter()
            .fold(Self::new(), |criteria, (k, v)| criteria.add_eq(k, v))
    }

    /// Append `attribute == value`.
    pub fn add_eq(mut self, attribute: impl Into<String>, value: impl Into<CriteriaValue>) -> Self {
        self.expressions.push(EqualsExpression {
            attribute: attribute.into(),
            value: value.into(),
        });
        self
    }

    pub fn offset_by(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit_to(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn expressions(&self) -> &[EqualsExpression] {
        &self.expressions
    }

    pub fn offset(&self) -> Option<u32> {
        self.offset
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }
}

/// Turns criteria into outgoing query parameters.
pub trait QueryStringFactory: Send + Sync {
    fn create_query_string(&self, criteria: &Criteria) -> QueryString;
}

/// Writes each expression as `attribute=value` in order, then `offset` and
/// `limit` when set.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultQueryStringFactory;

impl QueryStringFactory for DefaultQueryStringFactory {
    fn create_query_string(&self, criteria: &Criteria) -> QueryString {
        let mut query = QueryString::new();
        for expr in criteria.expressions() {
            query.put(expr.attribute.clone(), expr.value.to_string());
        }
        if let Some(offset) = criteria.offset() {
            query.put(OFFSET_PARAM, offset.to_string());
        }
        if let Some(limit) = criteria.limit() {
            query.put(LIMIT_PARAM, limit.to_string());
        }
        query
    }
}
