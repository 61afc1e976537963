//! Sync runner driving manifest entries through the resource lifecycle.
//!
//! The runner plays the hosting-framework role: for each declared
//! resource it decides which single operation to issue. No recorded
//! identifier means Create; a recorded identifier is refreshed with Read
//! (a 404 clears the record and the resource is recreated); a changed
//! fingerprint triggers Update. `destroy` deletes every recorded
//! resource. One resource failing does not abort the run.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::{Manifest, SpecHasher};
use crate::error::Result;
use crate::state::{ResourceEntry, ResourcePhase, StateStore, SyncState};
use crate::sync::{
    ProjectSync, ReadOutcome, Reconciled, RegistryCredentialSync, ResourceKind, ResourceSync,
    StoreSync, TeamSync,
};
use crate::valohai::ValohaiClient;

/// Sync runner for one manifest against one API endpoint.
pub struct SyncRunner<'a, S: StateStore> {
    /// Declared resources.
    manifest: &'a Manifest,
    /// Injected API client.
    client: &'a ValohaiClient,
    /// State store.
    state_store: &'a S,
    /// Spec fingerprint hasher.
    hasher: SpecHasher,
}

/// Result of a sync run.
#[derive(Debug, Default, Serialize)]
pub struct SyncReport {
    /// Number of resources created.
    pub created: usize,
    /// Number of resources updated.
    pub updated: usize,
    /// Number of resources left unchanged.
    pub unchanged: usize,
    /// Number of resources removed.
    pub removed: usize,
    /// Errors encountered, one per failed resource.
    pub errors: Vec<String>,
}

/// Status of one tracked resource.
#[derive(Debug, Serialize)]
pub struct ResourceStatus {
    /// Manifest-local label.
    pub label: String,
    /// Resource kind.
    pub kind: ResourceKind,
    /// Remote identifier.
    pub remote_id: String,
    /// Recorded lifecycle phase.
    pub phase: ResourcePhase,
    /// Whether the remote object currently exists.
    pub present: bool,
}

/// What a single resource synchronization did.
enum SyncOutcome {
    Created,
    Updated,
    Unchanged,
}

impl<'a, S: StateStore> SyncRunner<'a, S> {
    /// Creates a new sync runner.
    #[must_use]
    pub const fn new(manifest: &'a Manifest, client: &'a ValohaiClient, state_store: &'a S) -> Self {
        Self {
            manifest,
            client,
            state_store,
            hasher: SpecHasher::new(),
        }
    }

    /// Applies the manifest: creates, refreshes or updates every declared
    /// resource, then persists the state.
    ///
    /// # Errors
    ///
    /// Returns an error when the state cannot be locked, loaded or saved.
    /// Per-resource failures are collected in the report instead.
    pub async fn apply(&self) -> Result<SyncReport> {
        let lock = self.state_store.acquire_lock("").await?;
        let result = self.apply_inner().await;
        if let Err(err) = self.state_store.release_lock(&lock.lock_id).await {
            warn!("Failed to release state lock: {err}");
        }
        result
    }

    async fn apply_inner(&self) -> Result<SyncReport> {
        let mut state = self
            .state_store
            .load()
            .await?
            .unwrap_or_default();

        info!(
            "Applying manifest with {} declared resources",
            self.manifest.resource_count()
        );

        let mut report = SyncReport::default();

        self.sync_kind(
            &ProjectSync::new(self.client),
            &self.manifest.projects,
            &mut state,
            &mut report,
        )
        .await;
        self.sync_kind(
            &TeamSync::new(self.client),
            &self.manifest.teams,
            &mut state,
            &mut report,
        )
        .await;
        self.sync_kind(
            &StoreSync::new(self.client),
            &self.manifest.stores,
            &mut state,
            &mut report,
        )
        .await;
        self.sync_kind(
            &RegistryCredentialSync::new(self.client),
            &self.manifest.registry_credentials,
            &mut state,
            &mut report,
        )
        .await;

        state.manifest_hash = self.hasher.fingerprint(self.manifest);
        self.state_store.save(&state).await?;

        Ok(report)
    }

    /// Synchronizes every declared resource of one kind.
    async fn sync_kind<K: ResourceSync>(
        &self,
        sync: &K,
        specs: &[K::Spec],
        state: &mut SyncState,
        report: &mut SyncReport,
    ) {
        let kind = K::descriptor().kind;
        for spec in specs {
            let label = K::label(spec);
            match self.sync_resource(sync, spec, state).await {
                Ok(SyncOutcome::Created) => report.created += 1,
                Ok(SyncOutcome::Updated) => report.updated += 1,
                Ok(SyncOutcome::Unchanged) => report.unchanged += 1,
                Err(err) => {
                    error!("Failed to sync {kind} {label}: {err}");
                    report.errors.push(format!("{kind} {label}: {err}"));
                }
            }
        }
    }

    /// Drives one resource through exactly one lifecycle operation
    /// (plus the refresh Read that guards updates).
    async fn sync_resource<K: ResourceSync>(
        &self,
        sync: &K,
        spec: &K::Spec,
        state: &mut SyncState,
    ) -> Result<SyncOutcome> {
        let kind = K::descriptor().kind;
        let label = K::label(spec);
        let fingerprint = self.hasher.fingerprint(spec);
        let key = SyncState::key(kind, label);

        let Some(existing) = state.get(&key).cloned() else {
            return self.create_resource(sync, spec, state).await;
        };

        match sync.read(&existing.remote_id, Some(spec)).await? {
            ReadOutcome::Absent => {
                // Deleted outside of valosync; the record is cleared and
                // the resource recreated from the declared state.
                info!("{kind} {label} no longer exists remotely, recreating");
                state.remove(&key);
                self.create_resource(sync, spec, state).await
            }
            ReadOutcome::Present(remote) if existing.fingerprint == fingerprint => {
                if let Some(entry) = state.get_mut(&key) {
                    entry.confirm(&remote, &fingerprint);
                }
                Ok(SyncOutcome::Unchanged)
            }
            ReadOutcome::Present(_) => {
                state.set_phase(&key, ResourcePhase::Updating);
                let reconciled = sync.update(&existing.remote_id, spec).await?;
                if let Some(entry) = state.get_mut(&key) {
                    entry.confirm(&reconciled, &fingerprint);
                }
                Ok(SyncOutcome::Updated)
            }
        }
    }

    async fn create_resource<K: ResourceSync>(
        &self,
        sync: &K,
        spec: &K::Spec,
        state: &mut SyncState,
    ) -> Result<SyncOutcome> {
        let kind = K::descriptor().kind;
        let label = K::label(spec);
        let fingerprint = self.hasher.fingerprint(spec);

        let mut entry = ResourceEntry::new(label, kind, &fingerprint);
        let reconciled = sync.create(spec).await?;
        entry.confirm(&reconciled, &fingerprint);
        state.insert(entry);

        Ok(SyncOutcome::Created)
    }

    /// Deletes every recorded resource and clears the state.
    ///
    /// # Errors
    ///
    /// Returns an error when the state cannot be locked, loaded or saved.
    /// Per-resource failures are collected in the report instead.
    pub async fn destroy(&self) -> Result<SyncReport> {
        let lock = self.state_store.acquire_lock("").await?;
        let result = self.destroy_inner().await;
        if let Err(err) = self.state_store.release_lock(&lock.lock_id).await {
            warn!("Failed to release state lock: {err}");
        }
        result
    }

    async fn destroy_inner(&self) -> Result<SyncReport> {
        let mut report = SyncReport::default();

        let Some(mut state) = self.state_store.load().await? else {
            info!("No state recorded, nothing to destroy");
            return Ok(report);
        };

        let keys: Vec<String> = state.resources.keys().cloned().collect();
        for key in keys {
            let Some(entry) = state.get(&key).cloned() else {
                continue;
            };

            state.set_phase(&key, ResourcePhase::Deleting);
            match self.delete_entry(entry.kind, &entry.remote_id).await {
                Ok(()) => {
                    info!("Deleted {} {} (id: {})", entry.kind, entry.label, entry.remote_id);
                    state.remove(&key);
                    report.removed += 1;
                }
                Err(err) => {
                    error!("Failed to delete {} {}: {err}", entry.kind, entry.label);
                    report
                        .errors
                        .push(format!("{} {}: {err}", entry.kind, entry.label));
                }
            }
        }

        if state.is_empty() {
            self.state_store.delete().await?;
        } else {
            self.state_store.save(&state).await?;
        }

        Ok(report)
    }

    async fn delete_entry(&self, kind: ResourceKind, id: &str) -> Result<()> {
        match kind {
            ResourceKind::Project => ProjectSync::new(self.client).delete(id).await,
            ResourceKind::Team => TeamSync::new(self.client).delete(id).await,
            ResourceKind::Store => StoreSync::new(self.client).delete(id).await,
            ResourceKind::RegistryCredentials => {
                RegistryCredentialSync::new(self.client).delete(id).await
            }
        }
    }

    /// Reads every recorded resource and reports its remote presence.
    ///
    /// # Errors
    ///
    /// Returns an error when the state cannot be loaded or a Read fails
    /// with anything other than a 404.
    pub async fn status(&self) -> Result<Vec<ResourceStatus>> {
        let Some(state) = self.state_store.load().await? else {
            return Ok(Vec::new());
        };

        let mut statuses = Vec::with_capacity(state.resources.len());
        for entry in state.resources.values() {
            let outcome = lookup(self.client, entry.kind, &entry.remote_id).await?;
            statuses.push(ResourceStatus {
                label: entry.label.clone(),
                kind: entry.kind,
                remote_id: entry.remote_id.clone(),
                phase: entry.phase,
                present: outcome.is_some(),
            });
        }

        Ok(statuses)
    }
}

/// Reads one resource by identifier, without any manifest context.
/// Returns `None` when the remote object does not exist.
///
/// # Errors
///
/// Returns an error for any status other than 200 and 404.
pub async fn lookup(
    client: &ValohaiClient,
    kind: ResourceKind,
    id: &str,
) -> Result<Option<Reconciled>> {
    let outcome = match kind {
        ResourceKind::Project => ProjectSync::new(client).read(id, None).await?,
        ResourceKind::Team => TeamSync::new(client).read(id, None).await?,
        ResourceKind::Store => StoreSync::new(client).read(id, None).await?,
        ResourceKind::RegistryCredentials => {
            RegistryCredentialSync::new(client).read(id, None).await?
        }
    };

    match outcome {
        ReadOutcome::Present(reconciled) => Ok(Some(reconciled)),
        ReadOutcome::Absent => Ok(None),
    }
}

impl SyncReport {
    /// Returns true when every resource synchronized cleanly.
    #[must_use]
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Total number of resources that changed remotely.
    #[must_use]
    pub const fn changed(&self) -> usize {
        self.created + self.updated + self.removed
    }
}

impl std::fmt::Display for SyncReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = if self.success() { "successful" } else { "failed" };
        writeln!(f, "Sync {status}:")?;
        writeln!(f, "  Created:   {}", self.created)?;
        writeln!(f, "  Updated:   {}", self.updated)?;
        writeln!(f, "  Unchanged: {}", self.unchanged)?;
        writeln!(f, "  Removed:   {}", self.removed)?;

        if !self.errors.is_empty() {
            writeln!(f, "  Errors:")?;
            for error in &self.errors {
                writeln!(f, "    - {error}")?;
            }
        }

        Ok(())
    }
}
