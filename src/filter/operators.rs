//! The standard operator set
//!
//! Levels are spaced so that any syntax which is a prefix of another, or
//! whose operand grammar is looser, is tried after it:
//!
//! ```text
//!  1 gte          field>=value
//!  2 lte          field<=value
//!  3 gt           field>value        (after gte, which shares the '>')
//!  4 lt           field<value        (after lte)
//!  5 between      field=[lo;hi]
//!  6 not_between  field!=[lo;hi]
//!  7 not_in       field!={v1;v2}
//!  8 like         field~pattern
//!  9 in           field={v1;v2}
//! 10 ne           field!=value       (after not_between / not_in)
//! 11 eq           field=value        (after between / in)
//! ```
//!
//! `ne` and `eq` also refuse operands opening with `[` or `{`, so a malformed
//! range or set never degrades into a plain comparison.

use super::operator::{ConstraintKind, Operand, Operator, PatternOperator};
use crate::query::Comparison;
use regex::Regex;
use std::sync::Arc;
use std::sync::LazyLock;

static GTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^([A-Za-z0-9._-]+)>=(.*)$").expect("valid gte regex"));
static LTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^([A-Za-z0-9._-]+)<=(.*)$").expect("valid lte regex"));
static GT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^([A-Za-z0-9._-]+)>(.*)$").expect("valid gt regex"));
static LT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^([A-Za-z0-9._-]+)<(.*)$").expect("valid lt regex"));
static BETWEEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9._-]+)=\[([0-9]+);([0-9]+)\]$").expect("valid between regex")
});
static NOT_BETWEEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9._-]+)!=\[([0-9]+);([0-9]+)\]$").expect("valid not_between regex")
});
static NOT_IN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^([A-Za-z0-9._-]+)!=\{(.+)\}$").expect("valid not_in regex")
});
static LIKE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^([A-Za-z0-9._-]+)~(.*)$").expect("valid like regex"));
static IN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^([A-Za-z0-9._-]+)=\{(.+)\}$").expect("valid in regex"));
static NE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^([A-Za-z0-9._-]+)!=((?:[^\[{].*)?)$").expect("valid ne regex")
});
static EQ_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^([A-Za-z0-9._-]+)=((?:[^\[{].*)?)$").expect("valid eq regex")
});

pub fn gte() -> PatternOperator {
    PatternOperator::new(
        "gte",
        1,
        "field>=value",
        GTE_RE.clone(),
        Operand::Scalar,
        ConstraintKind::Compare(Comparison::Gte),
    )
}

pub fn lte() -> PatternOperator {
    PatternOperator::new(
        "lte",
        2,
        "field<=value",
        LTE_RE.clone(),
        Operand::Scalar,
        ConstraintKind::Compare(Comparison::Lte),
    )
}

pub fn gt() -> PatternOperator {
    PatternOperator::new(
        "gt",
        3,
        "field>value",
        GT_RE.clone(),
        Operand::Scalar,
        ConstraintKind::Compare(Comparison::Gt),
    )
}

pub fn lt() -> PatternOperator {
    PatternOperator::new(
        "lt",
        4,
        "field<value",
        LT_RE.clone(),
        Operand::Scalar,
        ConstraintKind::Compare(Comparison::Lt),
    )
}

pub fn between() -> PatternOperator {
    PatternOperator::new(
        "between",
        5,
        "field=[lo;hi]",
        BETWEEN_RE.clone(),
        Operand::Pair,
        ConstraintKind::Between,
    )
}

/// `field!=[lo;hi]`, both bounds decimal digits only
pub fn not_between() -> PatternOperator {
    PatternOperator::new(
        "not_between",
        6,
        "field!=[lo;hi]",
        NOT_BETWEEN_RE.clone(),
        Operand::Pair,
        ConstraintKind::NotBetween,
    )
}

pub fn not_in() -> PatternOperator {
    PatternOperator::new(
        "not_in",
        7,
        "field!={v1;v2;...}",
        NOT_IN_RE.clone(),
        Operand::List,
        ConstraintKind::NotIn,
    )
}

/// `%` matches any run of characters, `_` exactly one
pub fn like() -> PatternOperator {
    PatternOperator::new(
        "like",
        8,
        "field~pattern",
        LIKE_RE.clone(),
        Operand::Scalar,
        ConstraintKind::Like,
    )
}

pub fn in_set() -> PatternOperator {
    PatternOperator::new(
        "in",
        9,
        "field={v1;v2;...}",
        IN_RE.clone(),
        Operand::List,
        ConstraintKind::In,
    )
}

pub fn ne() -> PatternOperator {
    PatternOperator::new(
        "ne",
        10,
        "field!=value",
        NE_RE.clone(),
        Operand::Scalar,
        ConstraintKind::Compare(Comparison::Ne),
    )
}

pub fn eq() -> PatternOperator {
    PatternOperator::new(
        "eq",
        11,
        "field=value",
        EQ_RE.clone(),
        Operand::Scalar,
        ConstraintKind::Compare(Comparison::Eq),
    )
}

pub fn standard_operators() -> Vec<Arc<dyn Operator>> {
    vec![
        Arc::new(gte()),
        Arc::new(lte()),
        Arc::new(gt()),
        Arc::new(lt()),
        Arc::new(between()),
        Arc::new(not_between()),
        Arc::new(not_in()),
        Arc::new(like()),
        Arc::new(in_set()),
        Arc::new(ne()),
        Arc::new(eq()),
    ]
}
