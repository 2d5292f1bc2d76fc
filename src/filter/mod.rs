//! Filter expression compiling and application
//!
//! Clients filter entity listings with compact, URL-safe expressions, one
//! per query parameter. Each expression is resolved to exactly one operator
//! (or dropped), and the resulting filters are conjoined onto a
//! [`Queryable`](crate::query::Queryable).
//!
//! # Syntax
//!
//! ```text
//! field>=value          Greater than or equal
//! field<=value          Less than or equal
//! field>value           Greater than
//! field<value           Less than
//! field=[lo;hi]         Inside a numeric range (inclusive)
//! field!=[lo;hi]        Outside a numeric range
//! field!={v1;v2}        Not one of the values
//! field~pattern         SQL LIKE (% and _ wildcards, case-insensitive)
//! field={v1;v2}         One of the values
//! field!=value          Not equal
//! field=value           Equal
//! ```
//!
//! Field names may contain letters, digits, `.`, `_` and `-`. A dotted field
//! addresses a nested attribute.
//!
//! # Examples
//!
//! ```text
//! age<=30                       # age at most 30
//! status={active;pending}       # active or pending
//! score!=[10;20]                # score below 10 or above 20
//! age<=30 status={active}       # both, combined with AND
//! ```
//!
//! Tokens that match no syntax are dropped unless the compiler runs with
//! [`UnrecognizedPolicy::Reject`].

pub mod applier;
pub mod compiler;
pub mod error;
pub mod operator;
pub mod operators;
pub mod registry;

pub use applier::apply_all;
pub use compiler::{FilterCompiler, TokenResolution, UnrecognizedPolicy};
pub use error::FilterError;
pub use operator::{CompiledFilter, ConstraintKind, FilterValue, Operand, Operator, PatternOperator};
pub use registry::OperatorRegistry;
