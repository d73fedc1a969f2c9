//! Request and response shapes of the dashboard message boundary.
//!
//! Requests are tagged by an `action` field, e.g.
//! `{"action": "toggleExt", "id": "abc", "enabled": true}`.

use serde::{Deserialize, Serialize};

use crate::{AuditLogEntry, EntityId, EntityRecord, RuleSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Command {
    /// Dump extensions, rules, allow-list and pinned list.
    GetData,
    /// Replace the whole rule set and schedule a reconciliation.
    SaveRules { rules: RuleSet },
    /// Manual override, bypassing rule evaluation.
    ToggleExt { id: EntityId, enabled: bool },
    GetLogs,
    ClearLogs,
    SavePinned { pinned: Vec<EntityId> },
    UninstallExt { id: EntityId },
}

/// Summary counts shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub total: usize,
    pub enabled: usize,
    pub managed: usize,
}

impl Stats {
    #[must_use]
    pub fn compute(extensions: &[EntityRecord], rules: &RuleSet) -> Self {
        Self {
            total: extensions.len(),
            enabled: extensions.iter().filter(|e| e.enabled).count(),
            managed: rules.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSnapshot {
    pub extensions: Vec<EntityRecord>,
    pub rules: RuleSet,
    pub whitelist: Vec<EntityId>,
    pub pinned: Vec<EntityId>,
    pub stats: Stats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Data(DataSnapshot),
    Logs { logs: Vec<AuditLogEntry> },
    Error { success: bool, error: String },
    Success { success: bool },
}

impl Response {
    #[must_use]
    pub fn ok() -> Self {
        Response::Success { success: true }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            success: false,
            error: message.into(),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}
