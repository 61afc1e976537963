//! Valohai API record types.
//!
//! These types mirror the JSON objects the platform returns. Reference
//! fields whose shape varies per endpoint version (a bare identifier or an
//! embedded object) are modeled as untagged enums with an explicit
//! normalization step.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// A project reference as returned by the API: either a bare identifier
/// string or an embedded object carrying at least an `id`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ProjectRef {
    /// Bare identifier.
    Id(String),
    /// Embedded object form.
    Embedded(EmbeddedRef),
}

/// The embedded-object form of a reference.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddedRef {
    /// Identifier of the referenced object.
    pub id: RefId,
    /// Display name, when the endpoint includes one.
    #[serde(default)]
    pub name: Option<String>,
}

/// An identifier that may be serialized as a string or a number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RefId {
    /// String identifier (UUID-style).
    Text(String),
    /// Numeric identifier.
    Numeric(i64),
}

impl RefId {
    /// Returns the identifier in its canonical string form.
    #[must_use]
    pub fn canonical(&self) -> String {
        match self {
            Self::Text(id) => id.clone(),
            Self::Numeric(id) => id.to_string(),
        }
    }
}

impl ProjectRef {
    /// Normalizes the reference to a single canonical identifier string.
    ///
    /// The embedded identifier wins when present.
    #[must_use]
    pub fn canonical(&self) -> String {
        match self {
            Self::Id(id) => id.clone(),
            Self::Embedded(embedded) => embedded.id.canonical(),
        }
    }
}

/// An organization reference: a bare numeric id or an embedded object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OrganizationRef {
    /// Bare numeric identifier.
    Id(i64),
    /// Embedded object form.
    Embedded {
        /// Organization identifier.
        id: i64,
        /// Organization name, when included.
        #[serde(default)]
        name: Option<String>,
    },
}

impl OrganizationRef {
    /// Returns the canonical numeric identifier.
    #[must_use]
    pub const fn id(&self) -> i64 {
        match self {
            Self::Id(id) | Self::Embedded { id, .. } => *id,
        }
    }
}

/// An owner reference on project records: a bare name, a bare numeric id,
/// or an embedded object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OwnerRef {
    /// Bare numeric identifier.
    Id(i64),
    /// Bare owner name.
    Name(String),
    /// Embedded object form.
    Embedded {
        /// Owner identifier.
        #[serde(default)]
        id: Option<i64>,
        /// Owner account name.
        #[serde(default)]
        username: Option<String>,
    },
}

impl OwnerRef {
    /// Normalizes the reference to the owner name callers declare,
    /// falling back to the numeric id.
    #[must_use]
    pub fn canonical(&self) -> String {
        match self {
            Self::Id(id) => id.to_string(),
            Self::Name(name) => name.clone(),
            Self::Embedded { id, username } => username.clone().unwrap_or_else(|| {
                id.map(|id| id.to_string()).unwrap_or_default()
            }),
        }
    }
}

/// A project as the API reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectRecord {
    /// Unique project identifier.
    pub id: String,
    /// Project name.
    pub name: String,
    /// Project description.
    #[serde(default)]
    pub description: Option<String>,
    /// Owning user or organization.
    #[serde(default)]
    pub owner: Option<OwnerRef>,
    /// Canonical API URL of the project.
    #[serde(default)]
    pub url: Option<String>,
}

/// A team as the API reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct TeamRecord {
    /// Unique team identifier.
    #[serde(default)]
    pub id: String,
    /// Team name.
    pub name: String,
    /// Owning organization; Read responses embed the full object.
    #[serde(default)]
    pub organization: Option<OrganizationRef>,
    /// Canonical API URL of the team.
    #[serde(default)]
    pub url: Option<String>,
}

/// A store (storage backend) as the API reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreRecord {
    /// Unique store identifier.
    #[serde(default)]
    pub id: String,
    /// Store name.
    pub name: String,
    /// Backend type (s3, swift, azure, google).
    #[serde(rename = "type", default)]
    pub store_type: Option<String>,
    /// Access mode.
    #[serde(default)]
    pub access_mode: Option<String>,
    /// Whether reads are allowed.
    #[serde(default)]
    pub allow_read: bool,
    /// Whether writes are allowed.
    #[serde(default)]
    pub allow_write: bool,
    /// Whether URI downloads are allowed.
    #[serde(default)]
    pub allow_uri_download: bool,
    /// Backend configuration; value types vary per key.
    #[serde(default)]
    pub configuration: BTreeMap<String, Value>,
    /// Owning organization id.
    #[serde(default)]
    pub owner: Option<i64>,
    /// Attached project; shape varies per endpoint version.
    #[serde(default)]
    pub project: Option<ProjectRef>,
    /// Named path mappings inside the store.
    #[serde(default)]
    pub paths: BTreeMap<String, Value>,
    /// Teams granted access.
    #[serde(default)]
    pub teams: Vec<String>,
    /// Canonical API URL of the store.
    #[serde(default)]
    pub url: Option<String>,
}

/// Registry credentials as the API reports them.
///
/// The configuration sub-map is write-only on the API side and never
/// appears in responses.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryCredentialRecord {
    /// Unique credential identifier.
    pub id: String,
    /// Credential type (docker, aws-ecr, aws-ecr-role, gcp-cr).
    #[serde(rename = "type")]
    pub credential_type: String,
    /// Image pattern the credentials apply to.
    pub image_pattern: String,
    /// Owning organization id.
    #[serde(default)]
    pub owner: Option<i64>,
}
