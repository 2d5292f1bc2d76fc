use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;
use tracing::warn;

/// Binary comparison used by the scalar operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Comparison {
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Ne => "!=",
            Comparison::Lt => "<",
            Comparison::Lte => "<=",
            Comparison::Gt => ">",
            Comparison::Gte => ">=",
        }
    }

    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            Comparison::Eq => ordering == Ordering::Equal,
            Comparison::Ne => ordering != Ordering::Equal,
            Comparison::Lt => ordering == Ordering::Less,
            Comparison::Lte => ordering != Ordering::Greater,
            Comparison::Gt => ordering == Ordering::Greater,
            Comparison::Gte => ordering != Ordering::Less,
        }
    }
}

/// A builder that accumulates conjoined constraints.
///
/// Every call adds exactly one constraint; nothing is ever removed and there
/// is no way to express a disjunction. Implementations decide whether the
/// result is executed in memory, rendered to SQL, or handed to something else.
pub trait Queryable {
    fn where_compare(&mut self, field: &str, op: Comparison, value: &str);
    fn where_in(&mut self, field: &str, values: &[String]);
    fn where_not_in(&mut self, field: &str, values: &[String]);
    fn where_between(&mut self, field: &str, low: &str, high: &str);
    fn where_not_between(&mut self, field: &str, low: &str, high: &str);
    fn where_like(&mut self, field: &str, pattern: &str);
}

/// SQL `LIKE` pattern compiled once for in-memory evaluation
#[derive(Debug, Clone)]
pub struct LikePattern {
    raw: String,
    regex: Option<Regex>,
}

impl LikePattern {
    pub fn new(raw: &str) -> Self {
        let mut translated = String::from("(?is)^");
        for c in raw.chars() {
            match c {
                '%' => translated.push_str(".*"),
                '_' => translated.push('.'),
                other => translated.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
            }
        }
        translated.push('$');

        let regex = match Regex::new(&translated) {
            Ok(regex) => Some(regex),
            Err(err) => {
                warn!(pattern = raw, error = %err, "LIKE pattern could not be compiled");
                None
            }
        };

        Self {
            raw: raw.to_string(),
            regex,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(text))
    }
}

impl PartialEq for LikePattern {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

/// One conjoined constraint of a [`QueryPlan`]
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Compare {
        field: String,
        op: Comparison,
        value: String,
    },
    In {
        field: String,
        values: Vec<String>,
    },
    NotIn {
        field: String,
        values: Vec<String>,
    },
    Between {
        field: String,
        low: String,
        high: String,
    },
    NotBetween {
        field: String,
        low: String,
        high: String,
    },
    Like {
        field: String,
        pattern: LikePattern,
    },
}

impl Constraint {
    pub fn field(&self) -> &str {
        match self {
            Constraint::Compare { field, .. }
            | Constraint::In { field, .. }
            | Constraint::NotIn { field, .. }
            | Constraint::Between { field, .. }
            | Constraint::NotBetween { field, .. }
            | Constraint::Like { field, .. } => field,
        }
    }

    /// Evaluate against a JSON record. A missing or null field fails every
    /// constraint, negated ones included.
    pub fn matches(&self, record: &Value) -> bool {
        let Some(actual) = lookup_field(record, self.field()) else {
            return false;
        };

        match self {
            Constraint::Compare { op, value, .. } => {
                compare_operand(actual, value).is_some_and(|ordering| op.holds(ordering))
            }
            Constraint::In { values, .. } => contains_operand(actual, values),
            Constraint::NotIn { values, .. } => {
                scalar_text(actual).is_some() && !contains_operand(actual, values)
            }
            Constraint::Between { low, high, .. } => {
                within(actual, low, high).unwrap_or(false)
            }
            Constraint::NotBetween { low, high, .. } => {
                within(actual, low, high).is_some_and(|inside| !inside)
            }
            Constraint::Like { pattern, .. } => {
                scalar_text(actual).is_some_and(|text| pattern.is_match(&text))
            }
        }
    }

    fn write_sql(&self, clause: &mut String, params: &mut Vec<String>) {
        let column = quote_identifier(self.field());
        match self {
            Constraint::Compare { op, value, .. } => {
                clause.push_str(&format!("{column} {} ?", op.symbol()));
                params.push(value.clone());
            }
            Constraint::In { values, .. } if values.is_empty() => clause.push_str("1 = 0"),
            Constraint::NotIn { values, .. } if values.is_empty() => clause.push_str("1 = 1"),
            Constraint::In { values, .. } | Constraint::NotIn { values, .. } => {
                let keyword = if matches!(self, Constraint::In { .. }) {
                    "IN"
                } else {
                    "NOT IN"
                };
                let placeholders = vec!["?"; values.len()].join(", ");
                clause.push_str(&format!("{column} {keyword} ({placeholders})"));
                params.extend(values.iter().cloned());
            }
            Constraint::Between { low, high, .. } => {
                clause.push_str(&format!("{column} BETWEEN ? AND ?"));
                params.push(low.clone());
                params.push(high.clone());
            }
            Constraint::NotBetween { low, high, .. } => {
                clause.push_str(&format!("{column} NOT BETWEEN ? AND ?"));
                params.push(low.clone());
                params.push(high.clone());
            }
            Constraint::Like { pattern, .. } => {
                clause.push_str(&format!("{column} LIKE ?"));
                params.push(pattern.as_str().to_string());
            }
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Compare { field, op, value } => {
                write!(f, "{field} {} {value}", op.symbol())
            }
            Constraint::In { field, values } => write!(f, "{field} IN ({})", values.join(", ")),
            Constraint::NotIn { field, values } => {
                write!(f, "{field} NOT IN ({})", values.join(", "))
            }
            Constraint::Between { field, low, high } => {
                write!(f, "{field} BETWEEN {low} AND {high}")
            }
            Constraint::NotBetween { field, low, high } => {
                write!(f, "{field} NOT BETWEEN {low} AND {high}")
            }
            Constraint::Like { field, pattern } => write!(f, "{field} LIKE {}", pattern.as_str()),
        }
    }
}

/// Parameterised `WHERE` clause rendered from a [`QueryPlan`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlFragment {
    /// Empty when the plan carries no constraint
    pub clause: String,
    pub params: Vec<String>,
}

/// The crate's own [`Queryable`]: an ordered conjunction of constraints
/// that can be evaluated against JSON records or rendered as SQL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPlan {
    constraints: Vec<Constraint>,
}

impl QueryPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn matches(&self, record: &Value) -> bool {
        self.constraints.iter().all(|c| c.matches(record))
    }

    pub fn filter<'a>(&self, records: impl IntoIterator<Item = &'a Value>) -> Vec<&'a Value> {
        records
            .into_iter()
            .filter(|record| self.matches(record))
            .collect()
    }

    pub fn to_sql(&self) -> SqlFragment {
        let mut fragment = SqlFragment::default();
        if self.constraints.is_empty() {
            return fragment;
        }

        fragment.clause.push_str("WHERE ");
        for (idx, constraint) in self.constraints.iter().enumerate() {
            if idx > 0 {
                fragment.clause.push_str(" AND ");
            }
            constraint.write_sql(&mut fragment.clause, &mut fragment.params);
        }
        fragment
    }
}

impl fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.constraints.is_empty() {
            return write!(f, "TRUE");
        }
        for (idx, constraint) in self.constraints.iter().enumerate() {
            if idx > 0 {
                write!(f, " AND ")?;
            }
            write!(f, "{constraint}")?;
        }
        Ok(())
    }
}

impl Queryable for QueryPlan {
    fn where_compare(&mut self, field: &str, op: Comparison, value: &str) {
        self.constraints.push(Constraint::Compare {
            field: field.to_string(),
            op,
            value: value.to_string(),
        });
    }

    fn where_in(&mut self, field: &str, values: &[String]) {
        self.constraints.push(Constraint::In {
            field: field.to_string(),
            values: values.to_vec(),
        });
    }

    fn where_not_in(&mut self, field: &str, values: &[String]) {
        self.constraints.push(Constraint::NotIn {
            field: field.to_string(),
            values: values.to_vec(),
        });
    }

    fn where_between(&mut self, field: &str, low: &str, high: &str) {
        self.constraints.push(Constraint::Between {
            field: field.to_string(),
            low: low.to_string(),
            high: high.to_string(),
        });
    }

    fn where_not_between(&mut self, field: &str, low: &str, high: &str) {
        self.constraints.push(Constraint::NotBetween {
            field: field.to_string(),
            low: low.to_string(),
            high: high.to_string(),
        });
    }

    fn where_like(&mut self, field: &str, pattern: &str) {
        self.constraints.push(Constraint::Like {
            field: field.to_string(),
            pattern: LikePattern::new(pattern),
        });
    }
}

/// Resolve a possibly dotted field name inside a record. A literal key that
/// contains dots wins over the nested path.
pub fn lookup_field<'a>(record: &'a Value, field: &str) -> Option<&'a Value> {
    let object = record.as_object()?;
    if let Some(value) = object.get(field) {
        return (!value.is_null()).then_some(value);
    }

    let mut current = record;
    for segment in field.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    (!current.is_null()).then_some(current)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Plain decimal text, e.g. `30`, `-4`, `2.5`. Excludes `NaN`, `inf` and
/// exponent forms that `f64::from_str` would otherwise accept.
static DECIMAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[0-9]+(\.[0-9]+)?$").expect("valid decimal regex"));

fn decimal(text: &str) -> Option<f64> {
    if DECIMAL_RE.is_match(text) {
        text.parse().ok()
    } else {
        None
    }
}

fn numeric(actual: &Value) -> Option<f64> {
    match actual {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => decimal(s),
        _ => None,
    }
}

fn compare_operand(actual: &Value, operand: &str) -> Option<Ordering> {
    if let (Some(lhs), Some(rhs)) = (numeric(actual), decimal(operand)) {
        return lhs.partial_cmp(&rhs);
    }
    let text = scalar_text(actual)?;
    Some(text.as_str().cmp(operand))
}

fn contains_operand(actual: &Value, values: &[String]) -> bool {
    values
        .iter()
        .any(|v| compare_operand(actual, v) == Some(Ordering::Equal))
}

/// `None` unless the record value and both bounds are numbers
fn within(actual: &Value, low: &str, high: &str) -> Option<bool> {
    let value = numeric(actual)?;
    Some(value >= decimal(low)? && value <= decimal(high)?)
}

fn quote_identifier(field: &str) -> String {
    field
        .split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_plan_matches_everything() {
        let plan = QueryPlan::new();
        assert!(plan.matches(&json!({"age": 10})));
        assert_eq!(plan.to_string(), "TRUE");
        assert_eq!(plan.to_sql(), SqlFragment::default());
    }

    #[test]
    fn test_numeric_comparison_uses_numbers_not_text() {
        let mut plan = QueryPlan::new();
        plan.where_compare("age", Comparison::Lte, "30");

        assert!(plan.matches(&json!({"age": 4})));
        assert!(plan.matches(&json!({"age": 30.0})));
        assert!(!plan.matches(&json!({"age": 31})));
    }

    #[test]
    fn test_only_plain_decimals_compare_as_numbers() {
        let mut eq_nan = QueryPlan::new();
        eq_nan.where_compare("name", Comparison::Eq, "NaN");
        let mut ne_nan = QueryPlan::new();
        ne_nan.where_compare("name", Comparison::Ne, "NaN");
        assert!(eq_nan.matches(&json!({"name": "NaN"})));
        assert!(!ne_nan.matches(&json!({"name": "NaN"})));

        let mut eq_inf = QueryPlan::new();
        eq_inf.where_compare("name", Comparison::Eq, "inf");
        assert!(!eq_inf.matches(&json!({"name": "Infinity"})));

        let mut in_exp = QueryPlan::new();
        in_exp.where_in("code", &["1e1".to_string()]);
        assert!(!in_exp.matches(&json!({"code": "10"})));
        assert!(!in_exp.matches(&json!({"code": 10})));

        let mut lt = QueryPlan::new();
        lt.where_compare("rank", Comparison::Lt, "10");
        assert!(lt.matches(&json!({"rank": "9"})));
        assert!(lt.matches(&json!({"rank": -2.5})));
    }

    #[test]
    fn test_ranges_fail_for_non_numeric_values() {
        let mut outside = QueryPlan::new();
        outside.where_not_between("score", "10", "20");
        let mut inside = QueryPlan::new();
        inside.where_between("score", "10", "20");

        for value in [json!("abc"), json!("15x"), json!(true), json!([15])] {
            let record = json!({ "score": value });
            assert!(!outside.matches(&record), "not_between on {record}");
            assert!(!inside.matches(&record), "between on {record}");
        }

        assert!(inside.matches(&json!({"score": "15"})));
        assert!(outside.matches(&json!({"score": "21"})));
    }

    #[test]
    fn test_missing_field_fails_negated_constraints_too() {
        let mut plan = QueryPlan::new();
        plan.where_not_between("score", "10", "20");
        assert!(!plan.matches(&json!({"name": "x"})));
        assert!(!plan.matches(&json!({"score": null})));
        assert!(plan.matches(&json!({"score": 25})));
        assert!(!plan.matches(&json!({"score": 15})));
    }

    #[test]
    fn test_dotted_fields_walk_nested_objects() {
        let mut plan = QueryPlan::new();
        plan.where_in("address.city", &["Hanoi".to_string()]);
        assert!(plan.matches(&json!({"address": {"city": "Hanoi"}})));
        assert!(plan.matches(&json!({"address.city": "Hanoi"})));
        assert!(!plan.matches(&json!({"address": {"city": "Hue"}})));
    }

    #[test]
    fn test_like_translates_wildcards() {
        let pattern = LikePattern::new("%son");
        assert!(pattern.is_match("Johnson"));
        assert!(pattern.is_match("WILSON"));
        assert!(!pattern.is_match("Smith"));

        let pattern = LikePattern::new("a_c.");
        assert!(pattern.is_match("abc."));
        assert!(!pattern.is_match("abcd"));
    }

    #[test]
    fn test_display_and_sql_keep_constraint_order() {
        let mut plan = QueryPlan::new();
        plan.where_compare("age", Comparison::Lte, "30");
        plan.where_in("status", &["active".to_string(), "pending".to_string()]);
        plan.where_not_between("meta.score", "10", "20");

        assert_eq!(
            plan.to_string(),
            "age <= 30 AND status IN (active, pending) AND meta.score NOT BETWEEN 10 AND 20"
        );

        let sql = plan.to_sql();
        assert_eq!(
            sql.clause,
            r#"WHERE "age" <= ? AND "status" IN (?, ?) AND "meta"."score" NOT BETWEEN ? AND ?"#
        );
        assert_eq!(sql.params, vec!["30", "active", "pending", "10", "20"]);
    }
}
