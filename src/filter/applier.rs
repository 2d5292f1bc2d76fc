use super::operator::CompiledFilter;
use crate::query::Queryable;

/// Fold compiled filters onto a queryable, left to right
///
/// Each filter is handed to the operator that produced it, so the resulting
/// constraints are conjoined in exactly the order the caller supplied the
/// tokens.
pub fn apply_all<Q: Queryable>(mut query: Q, filters: &[CompiledFilter]) -> Q {
    for filter in filters {
        filter.apply(&mut query);
    }
    query
}
