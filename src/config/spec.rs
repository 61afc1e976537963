//! Manifest specification types.
//!
//! This module defines the structs that map to the `valosync.yaml` file.
//! Each entry declares the desired state of one platform resource; unset
//! optional fields are never sent to the API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The root manifest structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Manifest {
    /// API authentication settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Projects to synchronize.
    #[serde(default)]
    pub projects: Vec<ProjectSpec>,
    /// Teams to synchronize.
    #[serde(default)]
    pub teams: Vec<TeamSpec>,
    /// Stores to synchronize.
    #[serde(default)]
    pub stores: Vec<StoreSpec>,
    /// Registry credentials to synchronize.
    #[serde(default)]
    pub registry_credentials: Vec<RegistryCredentialSpec>,
}

/// API authentication settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AuthConfig {
    /// API token; falls back to the `VALOHAI_API_TOKEN` environment
    /// variable when unset.
    #[serde(default)]
    pub token: Option<String>,
    /// API root override (self-hosted installs).
    #[serde(default)]
    pub api_url: Option<String>,
}

/// Desired state of a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectSpec {
    /// Project name.
    pub name: String,
    /// Owning user or organization name.
    pub owner: String,
    /// Project description.
    #[serde(default)]
    pub description: Option<String>,
    /// Template repository URL applied at creation.
    #[serde(default)]
    pub template_url: Option<String>,
    /// Whether default notifications are enabled.
    #[serde(default)]
    pub default_notifications: Option<bool>,
}

/// Desired state of a team.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamSpec {
    /// Team name.
    pub name: String,
    /// Owning organization id.
    pub organization: i64,
}

/// Desired state of a store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreSpec {
    /// Store name (max 64 characters).
    pub name: String,
    /// Backend type.
    #[serde(rename = "type")]
    pub store_type: StoreType,
    /// Access mode.
    #[serde(default)]
    pub access_mode: Option<AccessMode>,
    /// Whether reads are allowed.
    #[serde(default)]
    pub allow_read: Option<bool>,
    /// Whether writes are allowed.
    #[serde(default)]
    pub allow_write: Option<bool>,
    /// Whether URI downloads are allowed.
    #[serde(default)]
    pub allow_uri_download: Option<bool>,
    /// Backend configuration (bucket, region, credentials, ...).
    #[serde(default)]
    pub configuration: BTreeMap<String, String>,
    /// Owning organization id.
    #[serde(default)]
    pub owner_id: Option<i64>,
    /// Attached project id (single_project access mode).
    #[serde(default)]
    pub project: Option<String>,
    /// Named path mappings inside the store.
    #[serde(default)]
    pub paths: BTreeMap<String, String>,
    /// Teams granted access (teams access mode).
    #[serde(default)]
    pub teams: Vec<String>,
}

/// Store backend types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreType {
    /// AWS S3 or S3-compatible.
    S3,
    /// OpenStack Swift.
    Swift,
    /// Azure Blob Storage.
    Azure,
    /// Google Cloud Storage.
    Google,
}

impl StoreType {
    /// Wire name of the backend type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::S3 => "s3",
            Self::Swift => "swift",
            Self::Azure => "azure",
            Self::Google => "google",
        }
    }
}

impl std::fmt::Display for StoreType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Store access modes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    /// Accessible to everyone in the organization and beyond.
    Public,
    /// Accessible to a single attached project.
    SingleProject,
    /// Accessible to the listed teams.
    Teams,
    /// Accessible to the owning organization only.
    OwnerOrganization,
}

impl AccessMode {
    /// Wire name of the access mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::SingleProject => "single_project",
            Self::Teams => "teams",
            Self::OwnerOrganization => "owner_organization",
        }
    }
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Desired state of registry credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistryCredentialSpec {
    /// Manifest-local label; never sent to the API.
    pub name: String,
    /// Credential type.
    #[serde(rename = "type")]
    pub credential_type: CredentialType,
    /// Image pattern the credentials apply to.
    pub image_pattern: String,
    /// Owning organization id.
    #[serde(default)]
    pub owner: Option<i64>,
    /// Type-specific configuration (usernames, keys, secrets).
    #[serde(default)]
    pub configuration: BTreeMap<String, String>,
}

/// Registry credential types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialType {
    /// Plain Docker registry credentials.
    Docker,
    /// AWS ECR with static keys.
    AwsEcr,
    /// AWS ECR with an assumed role.
    AwsEcrRole,
    /// Google Container Registry service account.
    GcpCr,
}

impl CredentialType {
    /// Wire name of the credential type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::AwsEcr => "aws-ecr",
            Self::AwsEcrRole => "aws-ecr-role",
            Self::GcpCr => "gcp-cr",
        }
    }
}

impl std::fmt::Display for CredentialType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Manifest {
    /// Returns the total number of declared resources.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.projects.len()
            + self.teams.len()
            + self.stores.len()
            + self.registry_credentials.len()
    }

    /// Returns true when no resources are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resource_count() == 0
    }
}
