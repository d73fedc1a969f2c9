use thiserror::Error;

/// Errors raised at the rule-editing boundary.
///
/// Rules loaded from storage never produce these: a stored pattern that fails
/// to compile becomes [`Rule::InvalidRegex`](super::Rule::InvalidRegex) instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("rule must not be empty")]
    EmptyRule,

    #[error("invalid regex pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("entity '{entity}' has no rules")]
    UnknownEntity { entity: String },

    #[error("entity '{entity}' has no rule at index {index}")]
    RuleNotFound { entity: String, index: usize },
}
