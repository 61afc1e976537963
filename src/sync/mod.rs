//! The resource synchronization protocol.
//!
//! Every resource kind follows one shared protocol against the API:
//! validate locally, POST to the collection on create (exactly 201),
//! GET the object on read (404 is a defined absence, not an error),
//! full-replace PUT on update (exactly 200), DELETE with an idempotent
//! success set of {200, 204, 404}. The per-kind modules contribute payload
//! construction, local validation and the mapping from remote records to
//! reconciled attribute sets.

mod descriptor;
mod project;
mod registry;
mod store;
mod team;

pub use descriptor::{
    AttrMode, AttrSpec, AttrType, AttrValue, PROJECT, REGISTRY_CREDENTIALS, ResourceDescriptor,
    ResourceKind, STORE, TEAM,
};
pub use project::ProjectSync;
pub use registry::{RegistryCredentialSync, check_configuration, normalized_configuration};
pub use store::{CONFIGURATION_KEYS as STORE_CONFIGURATION_KEYS, StoreSync, check_access_mode};
pub use team::TeamSync;

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{ApiError, Result};
use crate::valohai::ValohaiClient;

/// Server-confirmed state of a resource after a successful operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciled {
    /// Remote identifier; equals the remote record's identifier.
    pub id: String,
    /// Attribute values conforming to the kind's descriptor.
    pub attributes: BTreeMap<String, AttrValue>,
}

impl Reconciled {
    /// Builds a reconciled state, enforcing the kind's descriptor.
    ///
    /// # Errors
    ///
    /// Returns an invalid-response error when the identifier is empty or
    /// the attributes violate the descriptor.
    pub fn new(
        descriptor: &ResourceDescriptor,
        id: impl Into<String>,
        attributes: BTreeMap<String, AttrValue>,
    ) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(ApiError::invalid_response(format!(
                "{} record carries no identifier",
                descriptor.kind
            ))
            .into());
        }

        descriptor.check(&attributes).map_err(|message| {
            ApiError::invalid_response(format!("{} record rejected: {message}", descriptor.kind))
        })?;

        Ok(Self { id, attributes })
    }

    /// Looks up an attribute value by name.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }
}

/// Outcome of a Read operation.
#[derive(Debug, Clone)]
pub enum ReadOutcome {
    /// The resource exists remotely.
    Present(Reconciled),
    /// The remote object is gone (HTTP 404); not an error.
    Absent,
}

/// One resource kind's CRUD synchronization against the API.
#[async_trait]
pub trait ResourceSync: Sync {
    /// Manifest entry type describing the desired state.
    type Spec: Serialize + Sync;

    /// Static descriptor for this kind.
    fn descriptor() -> &'static ResourceDescriptor;

    /// Manifest-local label of a desired state entry.
    fn label(spec: &Self::Spec) -> &str;

    /// The injected API client.
    fn client(&self) -> &ValohaiClient;

    /// Validates a desired state locally, before any network I/O.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the offending field.
    fn validate(spec: &Self::Spec) -> Result<()>;

    /// Creates the resource remotely. Success is exactly HTTP 201; the
    /// returned identifier is permanent.
    async fn create(&self, spec: &Self::Spec) -> Result<Reconciled>;

    /// Reads the resource. When `desired` is given, caller-declared map
    /// attributes are harmonized with the remote record (server values
    /// win, only declared keys are kept).
    async fn read(&self, id: &str, desired: Option<&Self::Spec>) -> Result<ReadOutcome>;

    /// Replaces the resource via a full PUT of every set attribute.
    async fn update(&self, id: &str, spec: &Self::Spec) -> Result<Reconciled>;

    /// Deletes the resource; 200, 204 and 404 all count as deleted.
    async fn delete(&self, id: &str) -> Result<()> {
        self.client()
            .delete(Self::descriptor().collection(), id)
            .await
    }
}
