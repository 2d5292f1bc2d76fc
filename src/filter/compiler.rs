use super::error::FilterError;
use super::operator::CompiledFilter;
use super::registry::OperatorRegistry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// What to do with a token no operator recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnrecognizedPolicy {
    /// Drop the token; it has no effect on the query
    #[default]
    Ignore,
    /// Fail compilation with [`FilterError::UnrecognizedToken`]
    Reject,
}

/// How a single token was resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenResolution {
    pub token: String,
    /// `None` when no operator recognized the token
    pub filter: Option<CompiledFilter>,
}

/// Resolves raw filter tokens against an [`OperatorRegistry`]
#[derive(Debug, Clone, Copy)]
pub struct FilterCompiler<'r> {
    registry: &'r OperatorRegistry,
    policy: UnrecognizedPolicy,
}

impl FilterCompiler<'static> {
    pub fn standard() -> Self {
        Self::new(OperatorRegistry::standard())
    }
}

impl<'r> FilterCompiler<'r> {
    pub fn new(registry: &'r OperatorRegistry) -> Self {
        Self {
            registry,
            policy: UnrecognizedPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: UnrecognizedPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> UnrecognizedPolicy {
        self.policy
    }

    pub fn registry(&self) -> &'r OperatorRegistry {
        self.registry
    }

    /// Resolve one token: the first operator in priority order whose
    /// extraction succeeds wins.
    pub fn resolve(&self, token: &str) -> Option<CompiledFilter> {
        self.registry.in_priority_order().iter().find_map(|op| {
            op.extract(token)
                .map(|(field, value)| CompiledFilter::new(field, value, Arc::clone(op)))
        })
    }

    /// Compile tokens in caller order, silently dropping unrecognized ones.
    /// This never fails, whatever the configured policy.
    pub fn compile<I, S>(&self, tokens: I) -> Vec<CompiledFilter>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tokens
            .into_iter()
            .filter_map(|token| {
                let token = token.as_ref();
                let resolved = self.resolve(token);
                if resolved.is_none() {
                    debug!(token, "no operator recognized filter token, dropped");
                }
                resolved
            })
            .collect()
    }

    /// Compile tokens honouring the configured [`UnrecognizedPolicy`]
    pub fn compile_checked<I, S>(&self, tokens: I) -> Result<Vec<CompiledFilter>, FilterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        match self.policy {
            UnrecognizedPolicy::Ignore => Ok(self.compile(tokens)),
            UnrecognizedPolicy::Reject => tokens
                .into_iter()
                .map(|token| {
                    let token = token.as_ref();
                    self.resolve(token)
                        .ok_or_else(|| FilterError::UnrecognizedToken(token.to_string()))
                })
                .collect(),
        }
    }

    /// Report the resolution of every token, recognized or not
    pub fn explain<I, S>(&self, tokens: I) -> Vec<TokenResolution>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tokens
            .into_iter()
            .map(|token| TokenResolution {
                token: token.as_ref().to_string(),
                filter: self.resolve(token.as_ref()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterValue;

    #[test]
    fn test_resolve_picks_lowest_level() {
        let compiler = FilterCompiler::standard();

        // gt would also read this as field "age", value "=30"
        let filter = compiler.resolve("age>=30").unwrap();
        assert_eq!(filter.operator_name(), "gte");
        assert_eq!(filter.value(), &FilterValue::Scalar("30".to_string()));

        // in is tried before eq
        let filter = compiler.resolve("status={a;b}").unwrap();
        assert_eq!(filter.operator_name(), "in");
    }

    #[test]
    fn test_compile_drops_unrecognized_tokens() {
        let compiler = FilterCompiler::standard();
        let filters = compiler.compile(["page", "age<=30", "score!=[abc;20]"]);
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].field(), "age");
    }

    #[test]
    fn test_reject_policy_reports_first_unrecognized_token() {
        let compiler = FilterCompiler::standard().with_policy(UnrecognizedPolicy::Reject);
        let err = compiler
            .compile_checked(["age<=30", "score!=[abc;20]", "bogus"])
            .unwrap_err();
        assert_eq!(
            err,
            FilterError::UnrecognizedToken("score!=[abc;20]".to_string())
        );

        // compile itself stays permissive
        assert_eq!(compiler.compile(["bogus"]).len(), 0);
    }

    #[test]
    fn test_explain_keeps_dropped_tokens() {
        let compiler = FilterCompiler::standard();
        let report = compiler.explain(["age<=30", "nonsense"]);
        assert_eq!(report.len(), 2);
        assert_eq!(
            report[0].filter.as_ref().map(|f| f.operator_name()),
            Some("lte")
        );
        assert!(report[1].filter.is_none());
    }
}
