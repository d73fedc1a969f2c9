mod address;
mod allow_list;
mod audit;
mod desired_report;
mod entity;
mod error;
mod rule;
mod ruleset;

pub use address::{DEFAULT_INTERNAL_SCHEMES, OpenAddressSet};
pub use allow_list::AllowList;
pub use audit::{AuditAction, AuditLogEntry, AuditTrail, DEFAULT_AUDIT_CAPACITY};
pub use desired_report::{DesireReason, DesiredReport};
pub use entity::{EntityId, EntityRecord, TabInfo, TabStatus};
pub use error::RuleError;
pub use rule::{Rule, RuleKind};
pub use ruleset::{EntityRulesBuilder, RuleSet, RuleSetBuilder};
