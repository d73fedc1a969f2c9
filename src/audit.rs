use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::store::{Store, StoreError};
use crate::{AuditLogEntry, AuditTrail};

/// The persisted audit log.
///
/// Each mutation reads the stored entries, applies the change through an
/// [`AuditTrail`] and writes the result back, so the stored log never exceeds
/// its capacity. Mutations are serialized to avoid losing concurrent appends.
pub struct AuditLog {
    store: Arc<dyn Store>,
    capacity: usize,
    lock: Mutex<()>,
}

impl AuditLog {
    pub fn new(store: Arc<dyn Store>, capacity: usize) -> Self {
        Self {
            store,
            capacity: capacity.max(1),
            lock: Mutex::new(()),
        }
    }

    /// Prepend an entry and persist the trimmed log.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the log cannot be read or written.
    pub async fn append(&self, entry: AuditLogEntry) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut trail = AuditTrail::from_entries(self.store.load_logs().await?, self.capacity);
        debug!(action = %entry.action, target = %entry.target, "audit append");
        trail.push(entry);
        self.store.save_logs(&trail.to_vec()).await
    }

    /// All entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the log cannot be read.
    pub async fn list(&self) -> Result<Vec<AuditLogEntry>, StoreError> {
        let mut logs = self.store.load_logs().await?;
        logs.truncate(self.capacity);
        Ok(logs)
    }

    /// # Errors
    ///
    /// Returns [`StoreError`] if the empty log cannot be written.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        self.store.save_logs(&[]).await
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
