use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use super::entity::EntityId;

/// Why an entity ended up in the desired set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesireReason {
    AllowListed,
    RuleMatched { rule: String, address: String },
}

impl fmt::Display for DesireReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DesireReason::AllowListed => write!(f, "allow-listed"),
            DesireReason::RuleMatched { rule, address } => {
                write!(f, "rule '{rule}' matched {address}")
            }
        }
    }
}

/// Detailed desired-state report returned by
/// [`evaluate_detailed()`](crate::evaluate_detailed).
///
/// Carries the same membership as [`compute_desired()`](crate::compute_desired)
/// plus the reason each entity is desired and how long evaluation took.
#[derive(Debug, Clone)]
#[must_use]
pub struct DesiredReport {
    reasons: BTreeMap<EntityId, DesireReason>,
    duration: Duration,
}

impl DesiredReport {
    pub(crate) fn new(reasons: BTreeMap<EntityId, DesireReason>, duration: Duration) -> Self {
        Self { reasons, duration }
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.reasons.contains_key(id)
    }

    #[must_use]
    pub fn reason(&self, id: &str) -> Option<&DesireReason> {
        self.reasons.get(id)
    }

    /// The desired entity identifiers.
    #[must_use]
    pub fn desired_set(&self) -> BTreeSet<EntityId> {
        self.reasons.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &DesireReason)> {
        self.reasons.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.reasons.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reasons.is_empty()
    }

    /// Wall-clock duration of the evaluation.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl fmt::Display for DesiredReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<&str> = self.reasons.keys().map(EntityId::as_str).collect();
        write!(f, "desired: [{}]", ids.join(", "))?;
        write!(f, ", duration: {:?}", self.duration)?;
        Ok(())
    }
}
