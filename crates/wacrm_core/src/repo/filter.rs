//! Query filters understood by every record store.

use serde_json::Value;

/// Comparison applied between a field and a bound value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Lte,
    Gte,
}

impl Comparison {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Lte => "<=",
            Self::Gte => ">=",
        }
    }
}

/// One `field <op> value` condition.
///
/// Values use the record's serialized form: ids and timestamps as strings.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: Comparison,
    pub value: Value,
}

/// Conjunction of conditions plus optional ordering and limit.
///
/// The default filter matches every record of the owner, in the entity's
/// natural order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub conditions: Vec<Condition>,
    /// Overrides the entity's natural order; ties still break by `id`.
    pub order_by: Option<String>,
    pub limit: Option<u32>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Comparison::Eq, value)
    }

    pub fn lte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Comparison::Lte, value)
    }

    pub fn gte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Comparison::Gte, value)
    }

    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(field.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    fn with(mut self, field: impl Into<String>, op: Comparison, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }
}
