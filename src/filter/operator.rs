use crate::query::{Comparison, Queryable};
use regex::Regex;
use serde::Serialize;
use serde::ser::SerializeStruct;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Operand(s) extracted from a filter token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// A single scalar, e.g. `30` in `age<=30`
    Scalar(String),
    /// An ordered `(lo, hi)` pair, e.g. `[10;20]`
    Range(String, String),
    /// A `;`-separated list, e.g. `{active;pending}`
    List(Vec<String>),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Scalar(value) => write!(f, "{value}"),
            FilterValue::Range(low, high) => write!(f, "[{low};{high}]"),
            FilterValue::List(values) => write!(f, "{{{}}}", values.join(";")),
        }
    }
}

/// One filter syntax: recognition, extraction and application
///
/// Implementations carry no mutable state; a registry shares them across
/// threads for the lifetime of the process.
pub trait Operator: Send + Sync {
    /// Short identifier, unique within a registry
    fn name(&self) -> &'static str;

    /// Trial order; lower levels are tried first
    fn priority(&self) -> u8;

    /// Human readable token shape, e.g. `field<=value`
    fn syntax(&self) -> &'static str;

    /// Try to read `token` as this operator's syntax. `None` means "not mine",
    /// including tokens whose delimiter fits but whose operands do not.
    fn extract(&self, token: &str) -> Option<(String, FilterValue)>;

    /// Conjoin the constraint described by `filter` onto `query`
    fn apply(&self, query: &mut dyn Queryable, filter: &CompiledFilter);
}

/// How many operands the pattern captures after the field name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// Capture 2 is taken verbatim (a missing capture reads as empty)
    Scalar,
    /// Captures 2 and 3 form an ordered pair
    Pair,
    /// Capture 2 is split on `;`
    List,
}

/// The constraint an operator adds to a [`Queryable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Compare(Comparison),
    In,
    NotIn,
    Between,
    NotBetween,
    Like,
}

/// A regex-backed [`Operator`]. Capture group 1 is always the field name.
#[derive(Debug, Clone)]
pub struct PatternOperator {
    name: &'static str,
    priority: u8,
    syntax: &'static str,
    pattern: Regex,
    operand: Operand,
    constraint: ConstraintKind,
}

impl PatternOperator {
    pub fn new(
        name: &'static str,
        priority: u8,
        syntax: &'static str,
        pattern: Regex,
        operand: Operand,
        constraint: ConstraintKind,
    ) -> Self {
        Self {
            name,
            priority,
            syntax,
            pattern,
            operand,
            constraint,
        }
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }
}

impl Operator for PatternOperator {
    fn name(&self) -> &'static str {
        self.name
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn syntax(&self) -> &'static str {
        self.syntax
    }

    fn extract(&self, token: &str) -> Option<(String, FilterValue)> {
        let caps = self.pattern.captures(token)?;

        // Whole-token semantics even for patterns registered without anchors
        let whole = caps.get(0)?;
        if whole.start() != 0 || whole.end() != token.len() {
            return None;
        }

        let field = caps.get(1)?.as_str().to_string();
        let value = match self.operand {
            Operand::Scalar => {
                FilterValue::Scalar(caps.get(2).map_or("", |m| m.as_str()).to_string())
            }
            Operand::Pair => FilterValue::Range(
                caps.get(2)?.as_str().to_string(),
                caps.get(3)?.as_str().to_string(),
            ),
            Operand::List => FilterValue::List(
                caps.get(2)?
                    .as_str()
                    .split(';')
                    .map(str::to_string)
                    .collect(),
            ),
        };

        Some((field, value))
    }

    fn apply(&self, query: &mut dyn Queryable, filter: &CompiledFilter) {
        let field = filter.field();
        match (self.constraint, filter.value()) {
            (ConstraintKind::Compare(op), FilterValue::Scalar(value)) => {
                query.where_compare(field, op, value)
            }
            (ConstraintKind::In, FilterValue::List(values)) => query.where_in(field, values),
            (ConstraintKind::NotIn, FilterValue::List(values)) => {
                query.where_not_in(field, values)
            }
            (ConstraintKind::Between, FilterValue::Range(low, high)) => {
                query.where_between(field, low, high)
            }
            (ConstraintKind::NotBetween, FilterValue::Range(low, high)) => {
                query.where_not_between(field, low, high)
            }
            (ConstraintKind::Like, FilterValue::Scalar(pattern)) => query.where_like(field, pattern),
            (constraint, value) => warn!(
                operator = self.name,
                ?constraint,
                %value,
                "operand shape does not fit the operator, filter skipped"
            ),
        }
    }
}

/// A token resolved to its field, operand(s) and originating operator
#[derive(Clone)]
pub struct CompiledFilter {
    field: String,
    value: FilterValue,
    operator: Arc<dyn Operator>,
}

impl CompiledFilter {
    pub(crate) fn new(field: String, value: FilterValue, operator: Arc<dyn Operator>) -> Self {
        Self {
            field,
            value,
            operator,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn value(&self) -> &FilterValue {
        &self.value
    }

    pub fn operator(&self) -> &dyn Operator {
        self.operator.as_ref()
    }

    pub fn operator_name(&self) -> &'static str {
        self.operator.name()
    }

    /// Hand this filter to its operator
    pub fn apply(&self, query: &mut dyn Queryable) {
        self.operator.apply(query, self);
    }
}

impl PartialEq for CompiledFilter {
    fn eq(&self, other: &Self) -> bool {
        self.field == other.field
            && self.value == other.value
            && self.operator.name() == other.operator.name()
            && self.operator.priority() == other.operator.priority()
    }
}

impl fmt::Debug for CompiledFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledFilter")
            .field("field", &self.field)
            .field("value", &self.value)
            .field("operator", &self.operator.name())
            .finish()
    }
}

impl Serialize for CompiledFilter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("CompiledFilter", 4)?;
        state.serialize_field("field", &self.field)?;
        state.serialize_field("operator", self.operator.name())?;
        state.serialize_field("priority", &self.operator.priority())?;
        state.serialize_field("value", &self.value)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryPlan;

    fn unanchored_lte() -> PatternOperator {
        PatternOperator::new(
            "lte",
            2,
            "field<=value",
            Regex::new(r"([A-Za-z0-9._-]+)<=(.*)").unwrap(),
            Operand::Scalar,
            ConstraintKind::Compare(Comparison::Lte),
        )
    }

    #[test]
    fn test_extract_requires_whole_token_match() {
        let op = unanchored_lte();
        assert_eq!(
            op.extract("age<=30"),
            Some(("age".to_string(), FilterValue::Scalar("30".to_string())))
        );
        // The unanchored pattern finds "age<=30" inside, but the token has a prefix
        assert_eq!(op.extract("!age<=30"), None);
    }

    #[test]
    fn test_mismatched_operand_shape_adds_nothing() {
        let op: Arc<dyn Operator> = Arc::new(unanchored_lte());
        let filter = CompiledFilter::new(
            "age".to_string(),
            FilterValue::List(vec!["1".to_string()]),
            op,
        );
        let mut plan = QueryPlan::new();
        filter.apply(&mut plan);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_filter_value_display_mirrors_token_syntax() {
        assert_eq!(FilterValue::Scalar("30".into()).to_string(), "30");
        assert_eq!(
            FilterValue::Range("10".into(), "20".into()).to_string(),
            "[10;20]"
        );
        assert_eq!(
            FilterValue::List(vec!["a".into(), "b".into()]).to_string(),
            "{a;b}"
        );
    }
}
