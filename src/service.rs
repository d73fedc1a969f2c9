//! The long-running toggler: tab-event intake and the command boundary.

use std::sync::Arc;

use tracing::{info, warn};

use crate::audit::AuditLog;
use crate::command::{Command, DataSnapshot, Response, Stats};
use crate::config::Config;
use crate::debounce::Debouncer;
use crate::error::ExtwakeError;
use crate::platform::{EntityRegistry, TabProvider};
use crate::reconcile::{Reconciler, load_rules};
use crate::store::Store;
use crate::{AuditAction, AuditLogEntry, EntityId, RuleSet};

/// A tab lifecycle notification from the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabEvent {
    Updated {
        status_complete: bool,
        url_changed: bool,
    },
    Removed,
    Activated,
}

impl TabEvent {
    /// Whether the event can change the open-address set. Updates only count
    /// once loading completes or the address changes.
    #[must_use]
    pub fn triggers_reconcile(self) -> bool {
        match self {
            TabEvent::Updated {
                status_complete,
                url_changed,
            } => status_complete || url_changed,
            TabEvent::Removed | TabEvent::Activated => true,
        }
    }
}

/// Owns the reconciler and its debouncer and answers dashboard commands.
pub struct Manager {
    reconciler: Arc<Reconciler>,
    debouncer: Debouncer,
    store: Arc<dyn Store>,
    registry: Arc<dyn EntityRegistry>,
    audit: Arc<AuditLog>,
}

impl Manager {
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new(
        config: &Config,
        store: Arc<dyn Store>,
        tabs: Arc<dyn TabProvider>,
        registry: Arc<dyn EntityRegistry>,
    ) -> Self {
        let audit = Arc::new(AuditLog::new(Arc::clone(&store), config.audit_capacity));
        let reconciler = Arc::new(Reconciler::new(
            config,
            Arc::clone(&store),
            tabs,
            Arc::clone(&registry),
            Arc::clone(&audit),
        ));

        let job = Arc::clone(&reconciler);
        let debouncer = Debouncer::new(config.quiet_period(), move || {
            let reconciler = Arc::clone(&job);
            async move { reconciler.reconcile().await }
        });

        Self {
            reconciler,
            debouncer,
            store,
            registry,
            audit,
        }
    }

    /// Load the rules once and schedule the initial reconciliation.
    ///
    /// # Errors
    ///
    /// Returns [`ExtwakeError::Store`] if the rules cannot be read.
    pub async fn start(&self) -> Result<(), ExtwakeError> {
        let loaded = load_rules(self.store.as_ref(), self.reconciler.self_id()).await?;
        for (id, rule) in loaded.rules.invalid_rules() {
            warn!(entity = %id, rule = %rule, "stored rule has an invalid pattern and will never match");
        }
        info!(rules = %loaded.rules, "extension manager initialized");
        self.debouncer.trigger();
        Ok(())
    }

    pub fn on_tab_event(&self, event: TabEvent) {
        if event.triggers_reconcile() {
            self.debouncer.trigger();
        }
    }

    /// Schedule a reconciliation after the quiet period.
    pub fn schedule_reconcile(&self) {
        self.debouncer.trigger();
    }

    #[must_use]
    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    #[must_use]
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Answer one dashboard request. Failures become an error response.
    pub async fn handle(&self, command: Command) -> Response {
        let result = match command {
            Command::GetData => self.get_data().await.map(Response::Data),
            Command::SaveRules { rules } => self.save_rules(rules).await.map(|()| Response::ok()),
            Command::ToggleExt { id, enabled } => self
                .toggle_ext(id.as_str(), enabled)
                .await
                .map(|()| Response::ok()),
            Command::GetLogs => self.get_logs().await.map(|logs| Response::Logs { logs }),
            Command::ClearLogs => self.clear_logs().await.map(|()| Response::ok()),
            Command::SavePinned { pinned } => {
                self.save_pinned(&pinned).await.map(|()| Response::ok())
            }
            Command::UninstallExt { id } => {
                self.uninstall_ext(id.as_str()).await.map(|()| Response::ok())
            }
        };

        result.unwrap_or_else(|e| {
            warn!(error = %e, "command failed");
            Response::error(e.to_string())
        })
    }

    /// # Errors
    ///
    /// Returns [`ExtwakeError`] if the registry or the store cannot be read.
    pub async fn get_data(&self) -> Result<DataSnapshot, ExtwakeError> {
        let extensions = self.registry.list_entities().await?;
        let stored = self.store.load_rules().await?;
        let pinned = self.store.load_pinned().await?;
        let stats = Stats::compute(&extensions, &stored.rules);
        Ok(DataSnapshot {
            extensions,
            rules: stored.rules,
            whitelist: stored.whitelist,
            pinned,
            stats,
        })
    }

    /// Persist a new rule set and schedule a reconciliation.
    ///
    /// # Errors
    ///
    /// Returns [`ExtwakeError::Store`] if the rules cannot be written.
    pub async fn save_rules(&self, rules: RuleSet) -> Result<(), ExtwakeError> {
        self.store.save_rules(&rules).await?;
        info!(rules = %rules, "rules saved");
        self.debouncer.trigger();
        Ok(())
    }

    /// Set an extension's enabled flag directly and record a `MANUAL` entry.
    /// Rules are neither consulted nor changed.
    ///
    /// # Errors
    ///
    /// Returns [`ExtwakeError`] if the command is rejected or the audit entry
    /// cannot be written.
    pub async fn toggle_ext(&self, id: &str, enabled: bool) -> Result<(), ExtwakeError> {
        self.registry.set_enabled(id, enabled).await?;
        let entity = self.registry.get_entity(id).await?;
        let verb = if enabled { "enabled" } else { "disabled" };
        info!(entity = %id, name = %entity.name, enabled, "manual toggle");
        self.audit
            .append(AuditLogEntry::new(
                AuditAction::Manual,
                entity.name,
                format!("User {verb} extension manually"),
            ))
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`ExtwakeError::Store`] if the log cannot be read.
    pub async fn get_logs(&self) -> Result<Vec<AuditLogEntry>, ExtwakeError> {
        Ok(self.audit.list().await?)
    }

    /// # Errors
    ///
    /// Returns [`ExtwakeError::Store`] if the log cannot be written.
    pub async fn clear_logs(&self) -> Result<(), ExtwakeError> {
        Ok(self.audit.clear().await?)
    }

    /// # Errors
    ///
    /// Returns [`ExtwakeError::Store`] if the list cannot be written.
    pub async fn save_pinned(&self, pinned: &[EntityId]) -> Result<(), ExtwakeError> {
        Ok(self.store.save_pinned(pinned).await?)
    }

    /// # Errors
    ///
    /// Returns [`ExtwakeError::Platform`] if the registry rejects the request.
    pub async fn uninstall_ext(&self, id: &str) -> Result<(), ExtwakeError> {
        self.registry.uninstall(id).await?;
        info!(entity = %id, "extension uninstalled");
        Ok(())
    }
}
