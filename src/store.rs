//! Persistence for rules, the allow-list, pinned extensions and the audit log.
//!
//! Everything lives in one document with the keys `rules`, `whitelist`,
//! `pinned` and `logs`. Rules are stored in raw string form and parsed on
//! load. Every write replaces the whole document.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

use crate::{AuditLogEntry, EntityId, RuleSet};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Rules and allow-list entries as persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredRules {
    pub rules: RuleSet,
    pub whitelist: Vec<EntityId>,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn load_rules(&self) -> Result<StoredRules, StoreError>;

    async fn save_rules(&self, rules: &RuleSet) -> Result<(), StoreError>;

    async fn save_whitelist(&self, ids: &[EntityId]) -> Result<(), StoreError>;

    async fn load_pinned(&self) -> Result<Vec<EntityId>, StoreError>;

    async fn save_pinned(&self, ids: &[EntityId]) -> Result<(), StoreError>;

    /// Audit entries, newest first.
    async fn load_logs(&self) -> Result<Vec<AuditLogEntry>, StoreError>;

    async fn save_logs(&self, logs: &[AuditLogEntry]) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    rules: RuleSet,
    #[serde(default)]
    whitelist: Vec<EntityId>,
    #[serde(default)]
    pinned: Vec<EntityId>,
    #[serde(default)]
    logs: Vec<AuditLogEntry>,
    /// Keys written by other components; preserved on rewrite.
    #[serde(flatten)]
    other: serde_json::Map<String, serde_json::Value>,
}

/// In-memory store for tests, with a switch to simulate an outage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    doc: Mutex<Document>,
    unavailable: Mutex<Option<String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: RuleSet, whitelist: Vec<EntityId>) -> Self {
        let store = Self::new();
        {
            let mut doc = store.doc.lock();
            doc.rules = rules;
            doc.whitelist = whitelist;
        }
        store
    }

    /// Make every operation fail with `reason` until cleared with `None`.
    pub fn set_unavailable(&self, reason: Option<&str>) {
        *self.unavailable.lock() = reason.map(str::to_owned);
    }

    fn check(&self) -> Result<(), StoreError> {
        match self.unavailable.lock().as_ref() {
            Some(reason) => Err(StoreError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn load_rules(&self) -> Result<StoredRules, StoreError> {
        self.check()?;
        let doc = self.doc.lock();
        Ok(StoredRules {
            rules: doc.rules.clone(),
            whitelist: doc.whitelist.clone(),
        })
    }

    async fn save_rules(&self, rules: &RuleSet) -> Result<(), StoreError> {
        self.check()?;
        self.doc.lock().rules = rules.clone();
        Ok(())
    }

    async fn save_whitelist(&self, ids: &[EntityId]) -> Result<(), StoreError> {
        self.check()?;
        self.doc.lock().whitelist = ids.to_vec();
        Ok(())
    }

    async fn load_pinned(&self) -> Result<Vec<EntityId>, StoreError> {
        self.check()?;
        Ok(self.doc.lock().pinned.clone())
    }

    async fn save_pinned(&self, ids: &[EntityId]) -> Result<(), StoreError> {
        self.check()?;
        self.doc.lock().pinned = ids.to_vec();
        Ok(())
    }

    async fn load_logs(&self) -> Result<Vec<AuditLogEntry>, StoreError> {
        self.check()?;
        Ok(self.doc.lock().logs.clone())
    }

    async fn save_logs(&self, logs: &[AuditLogEntry]) -> Result<(), StoreError> {
        self.check()?;
        self.doc.lock().logs = logs.to_vec();
        Ok(())
    }
}

/// JSON file store.
///
/// A missing file reads as an empty document. Writes go to a sibling
/// temporary file that is then renamed over the target.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Document, StoreError> {
        match fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Document::default()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "store file missing, using empty document");
                Ok(Document::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, doc: &Document) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let bytes = serde_json::to_vec_pretty(doc)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn update(&self, f: impl FnOnce(&mut Document) + Send) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read().await?;
        f(&mut doc);
        self.write(&doc).await
    }
}

#[async_trait]
impl Store for JsonFileStore {
    async fn load_rules(&self) -> Result<StoredRules, StoreError> {
        let doc = self.read().await?;
        Ok(StoredRules {
            rules: doc.rules,
            whitelist: doc.whitelist,
        })
    }

    async fn save_rules(&self, rules: &RuleSet) -> Result<(), StoreError> {
        let rules = rules.clone();
        self.update(move |doc| doc.rules = rules).await
    }

    async fn save_whitelist(&self, ids: &[EntityId]) -> Result<(), StoreError> {
        let ids = ids.to_vec();
        self.update(move |doc| doc.whitelist = ids).await
    }

    async fn load_pinned(&self) -> Result<Vec<EntityId>, StoreError> {
        Ok(self.read().await?.pinned)
    }

    async fn save_pinned(&self, ids: &[EntityId]) -> Result<(), StoreError> {
        let ids = ids.to_vec();
        self.update(move |doc| doc.pinned = ids).await
    }

    async fn load_logs(&self) -> Result<Vec<AuditLogEntry>, StoreError> {
        Ok(self.read().await?.logs)
    }

    async fn save_logs(&self, logs: &[AuditLogEntry]) -> Result<(), StoreError> {
        let logs = logs.to_vec();
        self.update(move |doc| doc.logs = logs).await
    }
}
