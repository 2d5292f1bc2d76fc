use super::operator::Operator;
use super::operators::standard_operators;
use std::sync::{Arc, LazyLock};

/// Immutable, priority-ordered set of operators
#[derive(Clone)]
pub struct OperatorRegistry {
    operators: Vec<Arc<dyn Operator>>,
}

impl OperatorRegistry {
    /// Sort once by priority. The sort is stable, so operators sharing a
    /// level keep their registration order.
    pub fn new(mut operators: Vec<Arc<dyn Operator>>) -> Self {
        operators.sort_by_key(|op| op.priority());
        Self { operators }
    }

    /// The process-wide registry holding the standard operator set
    pub fn standard() -> &'static OperatorRegistry {
        static STANDARD: LazyLock<OperatorRegistry> =
            LazyLock::new(|| OperatorRegistry::new(standard_operators()));
        &STANDARD
    }

    pub fn in_priority_order(&self) -> &[Arc<dyn Operator>] {
        &self.operators
    }

    pub fn find(&self, name: &str) -> Option<&Arc<dyn Operator>> {
        self.operators.iter().find(|op| op.name() == name)
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

impl std::fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.operators.iter().map(|op| (op.priority(), op.name())))
            .finish()
    }
}
