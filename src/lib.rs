//! Rule-driven extension auto-toggler.
//!
//! Each managed extension carries a list of rules (hostname substrings or
//! `/regex/` patterns). Whenever the set of open tabs changes, the
//! [`Reconciler`] enables every managed extension with a rule matching an
//! open address and disables the rest, recording each change in a bounded
//! audit log. Bursts of tab events are coalesced by a [`Debouncer`].
//!
//! ```
//! use extwake::{AllowList, OpenAddressSet, RuleSetBuilder, compute_desired};
//!
//! let rules = RuleSetBuilder::new()
//!     .entity("dev-tools", |e| e.rule("github.com"))
//!     .entity("mail-helper", |e| e.rule(r"/^https://mail\./"))
//!     .build();
//! let allow = AllowList::new("extwake", Vec::<String>::new());
//! let open: OpenAddressSet = ["https://github.com/rust-lang"].into_iter().collect();
//!
//! let desired = compute_desired(&rules, &allow, &open);
//! assert!(desired.contains("dev-tools"));
//! assert!(!desired.contains("mail-helper"));
//! ```

mod audit;
mod command;
mod config;
mod debounce;
mod error;
mod evaluate;
mod platform;
mod reconcile;
mod service;
mod store;
mod types;

pub use audit::AuditLog;
pub use command::{Command, DataSnapshot, Response, Stats};
pub use config::{Config, ConfigError, DEFAULT_QUIET_PERIOD_MS, DEFAULT_SELF_ID};
pub use debounce::Debouncer;
pub use error::ExtwakeError;
pub use evaluate::{compute_desired, evaluate_detailed, first_match, matches};
pub use platform::{EntityRegistry, MemoryRegistry, MemoryTabs, PlatformError, TabProvider};
pub use reconcile::{Change, Failure, LoadedRules, PassReport, Reconciler, load_rules};
pub use service::{Manager, TabEvent};
pub use store::{JsonFileStore, MemoryStore, Store, StoreError, StoredRules};
pub use types::{
    AllowList, AuditAction, AuditLogEntry, AuditTrail, DEFAULT_AUDIT_CAPACITY,
    DEFAULT_INTERNAL_SCHEMES, DesireReason, DesiredReport, EntityId, EntityRecord,
    EntityRulesBuilder, OpenAddressSet, Rule, RuleError, RuleKind, RuleSet, RuleSetBuilder,
    TabInfo, TabStatus,
};
