//! Desired-vs-actual reconciliation of extension enabled state.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::audit::AuditLog;
use crate::config::Config;
use crate::error::ExtwakeError;
use crate::platform::{EntityRegistry, TabProvider};
use crate::store::{Store, StoreError};
use crate::{
    AllowList, AuditAction, AuditLogEntry, DesiredReport, EntityId, OpenAddressSet, RuleSet,
    evaluate_detailed,
};

/// Rules and allow-list as loaded for one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedRules {
    pub rules: RuleSet,
    pub allow_list: AllowList,
}

/// Read the rules and allow-list from `store`, adding `self_id` to the
/// allow-list.
///
/// # Errors
///
/// Returns [`StoreError`] if the store cannot be read.
pub async fn load_rules(store: &dyn Store, self_id: &EntityId) -> Result<LoadedRules, StoreError> {
    let stored = store.load_rules().await?;
    Ok(LoadedRules {
        rules: stored.rules,
        allow_list: AllowList::new(self_id.clone(), stored.whitelist),
    })
}

/// One enabled-state change made during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub id: EntityId,
    pub name: String,
    pub enabled: bool,
}

/// One entity whose `set_enabled` command failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub id: EntityId,
    pub enabled: bool,
    pub reason: String,
}

/// Outcome of a single reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct PassReport {
    pub desired: BTreeSet<EntityId>,
    pub changes: Vec<Change>,
    pub failures: Vec<Failure>,
}

impl PassReport {
    /// No command was issued.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty() && self.failures.is_empty()
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} desired, {} changed, {} failed",
            self.desired.len(),
            self.changes.len(),
            self.failures.len()
        )
    }
}

/// Compares desired against actual enabled state and issues corrective
/// commands.
///
/// Only entities with at least one rule are touched, and the toggler itself
/// is always skipped. Every pass reloads rules from the store; nothing is
/// cached between passes.
pub struct Reconciler {
    store: Arc<dyn Store>,
    tabs: Arc<dyn TabProvider>,
    registry: Arc<dyn EntityRegistry>,
    audit: Arc<AuditLog>,
    self_id: EntityId,
    internal_schemes: Vec<String>,
}

impl Reconciler {
    pub fn new(
        config: &Config,
        store: Arc<dyn Store>,
        tabs: Arc<dyn TabProvider>,
        registry: Arc<dyn EntityRegistry>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            store,
            tabs,
            registry,
            audit,
            self_id: EntityId::from(config.self_id.as_str()),
            internal_schemes: config.internal_schemes.clone(),
        }
    }

    #[must_use]
    pub fn self_id(&self) -> &EntityId {
        &self.self_id
    }

    /// Run one pass, logging instead of returning any whole-pass failure.
    pub async fn reconcile(&self) {
        match self.run_pass().await {
            Ok(report) if report.is_noop() => debug!(%report, "reconciliation pass"),
            Ok(report) => info!(%report, "reconciliation pass"),
            Err(e) => error!(error = %e, "reconciliation pass failed"),
        }
    }

    /// Run one pass.
    ///
    /// A failing `set_enabled` for one entity is recorded in the report and
    /// does not stop the others.
    ///
    /// # Errors
    ///
    /// Returns [`ExtwakeError`] if the rules, the tabs or the extension list
    /// cannot be read. No command has been issued in that case.
    pub async fn run_pass(&self) -> Result<PassReport, ExtwakeError> {
        let loaded = load_rules(self.store.as_ref(), &self.self_id).await?;
        for (id, rule) in loaded.rules.invalid_rules() {
            debug!(entity = %id, rule = %rule, "rule has an invalid pattern and never matches");
        }

        let tabs = self.tabs.list_tabs().await?;
        let addresses = OpenAddressSet::from_tabs(&tabs, &self.internal_schemes);
        let desired = evaluate_detailed(&loaded.rules, &loaded.allow_list, &addresses);
        debug!(addresses = addresses.len(), %desired, "computed desired state");

        let entities = self.registry.list_entities().await?;

        let mut report = PassReport {
            desired: desired.desired_set(),
            ..PassReport::default()
        };

        for entity in entities {
            if entity.id == self.self_id || !loaded.rules.is_managed(entity.id.as_str()) {
                continue;
            }

            let should_enable = desired.contains(entity.id.as_str());
            if entity.enabled == should_enable {
                continue;
            }

            if let Err(e) = self
                .registry
                .set_enabled(entity.id.as_str(), should_enable)
                .await
            {
                warn!(entity = %entity.id, error = %e, "failed to apply desired state");
                report.failures.push(Failure {
                    id: entity.id,
                    enabled: should_enable,
                    reason: e.to_string(),
                });
                continue;
            }

            info!(
                entity = %entity.id,
                name = %entity.name,
                enabled = should_enable,
                "auto-toggled extension"
            );

            let entry = AuditLogEntry::new(
                AuditAction::for_transition(should_enable),
                entity.name.clone(),
                change_details(&desired, entity.id.as_str()),
            );
            if let Err(e) = self.audit.append(entry).await {
                warn!(entity = %entity.id, error = %e, "failed to record audit entry");
            }

            report.changes.push(Change {
                id: entity.id,
                name: entity.name,
                enabled: should_enable,
            });
        }

        Ok(report)
    }
}

fn change_details(desired: &DesiredReport, id: &str) -> String {
    match desired.reason(id) {
        Some(reason) => format!("Triggered by active tabs state ({reason})"),
        None => "Triggered by active tabs state (no matching tabs)".to_owned(),
    }
}
