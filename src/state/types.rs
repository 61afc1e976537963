//! State types for tracking synchronized resources.
//!
//! These types record the server-confirmed state of each declared
//! resource: remote identifier, reconciled attributes, the fingerprint of
//! the spec that produced them and the lifecycle phase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::sync::{AttrValue, Reconciled, ResourceKind};

/// Current version of the state format.
pub const STATE_VERSION: &str = "1.0";

/// The complete synchronization state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncState {
    /// State format version.
    pub version: String,
    /// Fingerprint of the last applied manifest.
    pub manifest_hash: String,
    /// State of individual resources, keyed by `{kind}/{label}`.
    pub resources: BTreeMap<String, ResourceEntry>,
    /// When the state was last updated.
    pub last_updated: DateTime<Utc>,
}

/// Recorded state of one resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceEntry {
    /// Manifest-local label.
    pub label: String,
    /// Resource kind.
    pub kind: ResourceKind,
    /// Remote identifier; set only after a confirmed success status.
    pub remote_id: String,
    /// Fingerprint of the spec that was last applied.
    pub fingerprint: String,
    /// Lifecycle phase.
    pub phase: ResourcePhase,
    /// Reconciled attribute values.
    pub attributes: BTreeMap<String, AttrValue>,
    /// When the resource was first created.
    pub created_at: DateTime<Utc>,
    /// When the entry was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle phase of a managed resource. Unmanaged resources have no
/// entry at all.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResourcePhase {
    /// Create issued, awaiting confirmation.
    Creating,
    /// Server-confirmed and tracked.
    Present,
    /// Update issued, awaiting confirmation.
    Updating,
    /// Delete issued, awaiting confirmation.
    Deleting,
}

impl ResourcePhase {
    /// Whether the lifecycle permits moving to `next` from this phase.
    #[must_use]
    pub const fn can_transition(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Creating | Self::Updating, Self::Present)
                | (Self::Present, Self::Updating | Self::Deleting)
        )
    }
}

impl std::fmt::Display for ResourcePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let phase = match self {
            Self::Creating => "creating",
            Self::Present => "present",
            Self::Updating => "updating",
            Self::Deleting => "deleting",
        };
        write!(f, "{phase}")
    }
}

impl SyncState {
    /// Creates a new empty state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            manifest_hash: String::new(),
            resources: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }

    /// Builds the state key for a resource.
    #[must_use]
    pub fn key(kind: ResourceKind, label: &str) -> String {
        format!("{kind}/{label}")
    }

    /// Gets a resource entry by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ResourceEntry> {
        self.resources.get(key)
    }

    /// Gets a mutable resource entry by key.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut ResourceEntry> {
        self.resources.get_mut(key)
    }

    /// Adds or replaces a resource entry.
    pub fn insert(&mut self, entry: ResourceEntry) {
        let key = Self::key(entry.kind, &entry.label);
        self.resources.insert(key, entry);
        self.last_updated = Utc::now();
    }

    /// Removes a resource entry by key.
    pub fn remove(&mut self, key: &str) -> Option<ResourceEntry> {
        let removed = self.resources.remove(key);
        if removed.is_some() {
            self.last_updated = Utc::now();
        }
        removed
    }

    /// Moves an entry to a new lifecycle phase, logging invalid
    /// transitions instead of applying them.
    pub fn set_phase(&mut self, key: &str, next: ResourcePhase) {
        if let Some(entry) = self.resources.get_mut(key) {
            if entry.phase == next || entry.phase.can_transition(next) {
                entry.phase = next;
                entry.updated_at = Utc::now();
            } else {
                warn!(
                    "Ignoring invalid phase transition {} -> {next} for {key}",
                    entry.phase
                );
            }
        }
        self.last_updated = Utc::now();
    }

    /// Returns true when no resources are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceEntry {
    /// Creates an unconfirmed entry. The remote identifier stays empty and
    /// the phase stays `Creating` until [`ResourceEntry::confirm`] runs
    /// with a server-confirmed state.
    #[must_use]
    pub fn new(label: &str, kind: ResourceKind, fingerprint: &str) -> Self {
        let now = Utc::now();
        Self {
            label: label.to_string(),
            kind,
            remote_id: String::new(),
            fingerprint: fingerprint.to_string(),
            phase: ResourcePhase::Creating,
            attributes: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Commits a server-confirmed reconciled state to the entry.
    pub fn confirm(&mut self, reconciled: &Reconciled, fingerprint: &str) {
        self.remote_id = reconciled.id.clone();
        self.attributes = reconciled.attributes.clone();
        self.fingerprint = fingerprint.to_string();
        self.phase = ResourcePhase::Present;
        self.updated_at = Utc::now();
    }
}
