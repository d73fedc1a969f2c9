use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Maximum number of audit entries kept by default.
pub const DEFAULT_AUDIT_CAPACITY: usize = 100;

/// Kind of state change recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    /// Automatically enabled because a rule matched.
    Wake,
    /// Automatically disabled because no rule matched.
    Sleep,
    /// Toggled by the user.
    Manual,
}

impl AuditAction {
    /// The automatic action that moves an entity to `enabled`.
    #[must_use]
    pub fn for_transition(enabled: bool) -> Self {
        if enabled {
            AuditAction::Wake
        } else {
            AuditAction::Sleep
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            AuditAction::Wake => "WAKE",
            AuditAction::Sleep => "SLEEP",
            AuditAction::Manual => "MANUAL",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// Local wall-clock time, `HH:MM:SS`.
    pub time: String,
    pub action: AuditAction,
    /// Display name of the affected entity.
    pub target: String,
    pub details: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl AuditLogEntry {
    pub fn new(action: AuditAction, target: impl Into<String>, details: impl Into<String>) -> Self {
        Self::at(Local::now(), action, target, details)
    }

    pub fn at(
        when: DateTime<Local>,
        action: AuditAction,
        target: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            time: when.format("%H:%M:%S").to_string(),
            action,
            target: target.into(),
            details: details.into(),
            timestamp: when.timestamp_millis(),
        }
    }
}

impl fmt::Display for AuditLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {:<6} {} ({})",
            self.time, self.action, self.target, self.details
        )
    }
}

/// Bounded, newest-first sequence of audit entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditTrail {
    entries: VecDeque<AuditLogEntry>,
    capacity: usize,
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::new(DEFAULT_AUDIT_CAPACITY)
    }
}

impl AuditTrail {
    /// A zero capacity is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Rebuild a trail from stored entries, already ordered newest-first.
    #[must_use]
    pub fn from_entries(entries: Vec<AuditLogEntry>, capacity: usize) -> Self {
        let mut trail = Self::new(capacity);
        trail.entries = entries.into();
        trail.entries.truncate(trail.capacity);
        trail
    }

    /// Prepend an entry, dropping the oldest ones beyond capacity.
    pub fn push(&mut self, entry: AuditLogEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &AuditLogEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<AuditLogEntry> {
        self.entries.iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn entry(n: i64) -> AuditLogEntry {
        AuditLogEntry {
            time: String::new(),
            action: AuditAction::Wake,
            target: format!("ext{n}"),
            details: String::new(),
            timestamp: n,
        }
    }

    #[test]
    fn action_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&AuditAction::Wake).unwrap(), r#""WAKE""#);
        assert_eq!(
            serde_json::from_str::<AuditAction>(r#""MANUAL""#).unwrap(),
            AuditAction::Manual
        );
    }

    #[test]
    fn entry_formats_wall_clock_time() {
        let when = Local.with_ymd_and_hms(2026, 3, 1, 7, 5, 9).unwrap();
        let e = AuditLogEntry::at(when, AuditAction::Sleep, "Reader", "idle");
        assert_eq!(e.time, "07:05:09");
        assert_eq!(e.timestamp, when.timestamp_millis());
        assert_eq!(e.to_string(), "[07:05:09] SLEEP  Reader (idle)");
    }

    #[test]
    fn push_is_newest_first() {
        let mut trail = AuditTrail::new(10);
        trail.push(entry(1));
        trail.push(entry(2));
        let ts: Vec<i64> = trail.iter().map(|e| e.timestamp).collect();
        assert_eq!(ts, vec![2, 1]);
    }

    #[test]
    fn push_drops_oldest_beyond_capacity() {
        let mut trail = AuditTrail::default();
        for n in 0..150 {
            trail.push(entry(n));
        }
        assert_eq!(trail.len(), 100);
        assert_eq!(trail.iter().next().unwrap().timestamp, 149);
        assert_eq!(trail.iter().last().unwrap().timestamp, 50);
    }

    #[test]
    fn from_entries_truncates() {
        let trail = AuditTrail::from_entries((0..5).rev().map(entry).collect(), 3);
        let ts: Vec<i64> = trail.iter().map(|e| e.timestamp).collect();
        assert_eq!(ts, vec![4, 3, 2]);
    }
}
