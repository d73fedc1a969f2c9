//! Browser platform seams.
//!
//! The reconciler talks to the browser only through [`TabProvider`] and
//! [`EntityRegistry`]. A host wires these to the real tab and extension
//! management APIs. The in-memory versions here are test doubles, for this
//! crate's tests and for hosts testing their own wiring: they can simulate
//! outages and policy-locked extensions, and they record issued commands.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;

use crate::{EntityId, EntityRecord, TabInfo};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("failed to query tabs: {0}")]
    TabQuery(String),

    #[error("extension '{id}' not found")]
    EntityNotFound { id: String },

    #[error("extension '{id}' cannot be toggled: {reason}")]
    SetEnabledRejected { id: String, reason: String },

    #[error("extension registry error: {0}")]
    Registry(String),
}

/// Supplies a snapshot of all open tabs.
#[async_trait]
pub trait TabProvider: Send + Sync {
    async fn list_tabs(&self) -> Result<Vec<TabInfo>, PlatformError>;
}

/// The platform's list of manageable extensions.
#[async_trait]
pub trait EntityRegistry: Send + Sync {
    async fn list_entities(&self) -> Result<Vec<EntityRecord>, PlatformError>;

    async fn get_entity(&self, id: &str) -> Result<EntityRecord, PlatformError> {
        self.list_entities()
            .await?
            .into_iter()
            .find(|record| record.id.as_str() == id)
            .ok_or_else(|| PlatformError::EntityNotFound { id: id.to_owned() })
    }

    /// Set the enabled flag. May be rejected, e.g. for policy-installed
    /// extensions.
    async fn set_enabled(&self, id: &str, enabled: bool) -> Result<(), PlatformError>;

    async fn uninstall(&self, id: &str) -> Result<(), PlatformError>;
}

/// Tab provider over a mutable in-memory tab list.
#[derive(Debug, Default)]
pub struct MemoryTabs {
    tabs: RwLock<Vec<TabInfo>>,
    unavailable: RwLock<Option<String>>,
}

impl MemoryTabs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tabs = Self::new();
        tabs.set_urls(urls);
        tabs
    }

    pub fn set_tabs(&self, tabs: Vec<TabInfo>) {
        *self.tabs.write() = tabs;
    }

    pub fn set_urls<I, S>(&self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_tabs(urls.into_iter().map(TabInfo::new).collect());
    }

    /// Make every query fail with `reason` until cleared with `None`.
    pub fn set_unavailable(&self, reason: Option<&str>) {
        *self.unavailable.write() = reason.map(str::to_owned);
    }
}

#[async_trait]
impl TabProvider for MemoryTabs {
    async fn list_tabs(&self) -> Result<Vec<TabInfo>, PlatformError> {
        if let Some(reason) = self.unavailable.read().as_ref() {
            return Err(PlatformError::TabQuery(reason.clone()));
        }
        Ok(self.tabs.read().clone())
    }
}

/// Registry over an in-memory extension table.
///
/// Every accepted `set_enabled` call is recorded so callers can inspect
/// exactly which commands were issued.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    entities: RwLock<BTreeMap<EntityId, EntityRecord>>,
    locked: RwLock<BTreeSet<EntityId>>,
    commands: RwLock<Vec<(EntityId, bool)>>,
}

impl MemoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entities(records: impl IntoIterator<Item = EntityRecord>) -> Self {
        let registry = Self::new();
        for record in records {
            registry.insert(record);
        }
        registry
    }

    pub fn insert(&self, record: EntityRecord) {
        self.entities.write().insert(record.id.clone(), record);
    }

    /// Reject every `set_enabled` for `id`, as for a policy-managed extension.
    pub fn lock(&self, id: &str) {
        self.locked.write().insert(EntityId::from(id));
    }

    #[must_use]
    pub fn is_enabled(&self, id: &str) -> Option<bool> {
        self.entities.read().get(id).map(|record| record.enabled)
    }

    /// Accepted `set_enabled` commands, oldest first.
    #[must_use]
    pub fn commands(&self) -> Vec<(EntityId, bool)> {
        self.commands.read().clone()
    }

    pub fn clear_commands(&self) {
        self.commands.write().clear();
    }
}

#[async_trait]
impl EntityRegistry for MemoryRegistry {
    async fn list_entities(&self) -> Result<Vec<EntityRecord>, PlatformError> {
        Ok(self.entities.read().values().cloned().collect())
    }

    async fn set_enabled(&self, id: &str, enabled: bool) -> Result<(), PlatformError> {
        if self.locked.read().contains(id) {
            return Err(PlatformError::SetEnabledRejected {
                id: id.to_owned(),
                reason: "managed by policy".to_owned(),
            });
        }
        let mut entities = self.entities.write();
        let record = entities
            .get_mut(id)
            .ok_or_else(|| PlatformError::EntityNotFound { id: id.to_owned() })?;
        record.enabled = enabled;
        self.commands.write().push((record.id.clone(), enabled));
        Ok(())
    }

    async fn uninstall(&self, id: &str) -> Result<(), PlatformError> {
        self.entities
            .write()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| PlatformError::EntityNotFound { id: id.to_owned() })
    }
}
