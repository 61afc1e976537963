//! Store resource synchronization.
//!
//! Stores carry the most involved local rules: a name length cap, mutual
//! exclusion between access modes and attachment fields, a known key set
//! for the backend configuration, and map harmonization on reconcile
//! (caller-declared keys only, server values preferred).

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::info;

use crate::config::{AccessMode, StoreSpec};
use crate::error::{ConfigError, Result, ValosyncError};
use crate::valohai::{ProjectRef, StoreRecord, ValohaiClient};

use super::descriptor::{AttrValue, ResourceDescriptor, STORE};
use super::{ReadOutcome, Reconciled, ResourceSync};

/// Maximum store name length.
const MAX_NAME_LEN: usize = 64;

/// Configuration keys the API understands.
pub const CONFIGURATION_KEYS: &[&str] = &[
    "bucket",
    "region",
    "access_key_id",
    "secret_access_key",
    "multipart_upload_iam_role",
    "endpoint_url",
    "role_arn",
    "kms_key_arn",
    "use_presigned_put_object",
    "insecure",
    "skip_upload_file_name_check",
    "test_configuration",
];

/// Configuration keys the API expects as booleans.
const BOOL_CONFIGURATION_KEYS: &[&str] = &[
    "use_presigned_put_object",
    "insecure",
    "skip_upload_file_name_check",
    "test_configuration",
];

/// Checks the mutual-exclusion rules between the access mode and the
/// `teams`/`project` attachment fields.
///
/// # Errors
///
/// Returns a description of the violated rule.
pub fn check_access_mode(spec: &StoreSpec) -> std::result::Result<(), String> {
    let has_teams = !spec.teams.is_empty();
    let has_project = spec.project.as_deref().is_some_and(|p| !p.is_empty());

    match spec.access_mode {
        Some(AccessMode::OwnerOrganization) if has_teams || has_project => Err(String::from(
            "with access_mode 'owner_organization', 'teams' and 'project' must not be set",
        )),
        Some(AccessMode::Teams) if has_project => Err(String::from(
            "with access_mode 'teams', 'project' must not be set",
        )),
        Some(AccessMode::SingleProject) if has_teams => Err(String::from(
            "with access_mode 'single_project', 'teams' must not be set",
        )),
        _ => Ok(()),
    }
}

/// Synchronizes `store` resources.
#[derive(Debug)]
pub struct StoreSync<'a> {
    client: &'a ValohaiClient,
}

/// Create/update payload. The backend type is fixed at creation and
/// omitted on update; unset optional fields are omitted entirely.
#[derive(Debug, Serialize)]
struct StorePayload<'a> {
    name: &'a str,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    store_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    access_mode: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    allow_read: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    allow_write: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    allow_uri_download: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    configuration: Option<serde_json::Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    owner: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    project: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    paths: Option<&'a BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    teams: Option<&'a [String]>,
}

impl<'a> StoreSync<'a> {
    /// Creates a new store synchronizer.
    #[must_use]
    pub const fn new(client: &'a ValohaiClient) -> Self {
        Self { client }
    }

    fn payload<'s>(spec: &'s StoreSpec, include_type: bool) -> StorePayload<'s> {
        StorePayload {
            name: &spec.name,
            store_type: include_type.then(|| spec.store_type.as_str()),
            access_mode: spec.access_mode.map(AccessMode::as_str),
            allow_read: spec.allow_read,
            allow_write: spec.allow_write,
            allow_uri_download: spec.allow_uri_download,
            configuration: (!spec.configuration.is_empty())
                .then(|| payload_configuration(&spec.configuration)),
            owner: spec.owner_id,
            project: spec.project.as_deref(),
            paths: (!spec.paths.is_empty()).then_some(&spec.paths),
            teams: (!spec.teams.is_empty()).then_some(spec.teams.as_slice()),
        }
    }

    /// Overlays remote record values on the desired state.
    fn reconcile(
        desired: Option<&StoreSpec>,
        record: &StoreRecord,
        fallback_id: &str,
    ) -> Result<Reconciled> {
        let id = if record.id.is_empty() {
            fallback_id.to_string()
        } else {
            record.id.clone()
        };

        let mut attributes = BTreeMap::new();
        attributes.insert(String::from("name"), AttrValue::Str(record.name.clone()));

        let store_type = record
            .store_type
            .clone()
            .or_else(|| desired.map(|spec| spec.store_type.as_str().to_string()));
        if let Some(store_type) = store_type {
            attributes.insert(String::from("type"), AttrValue::Str(store_type));
        }

        if let Some(access_mode) = record.access_mode.clone().filter(|mode| !mode.is_empty()) {
            attributes.insert(String::from("access_mode"), AttrValue::Str(access_mode));
        }
        attributes.insert(String::from("allow_read"), AttrValue::Bool(record.allow_read));
        attributes.insert(
            String::from("allow_write"),
            AttrValue::Bool(record.allow_write),
        );
        attributes.insert(
            String::from("allow_uri_download"),
            AttrValue::Bool(record.allow_uri_download),
        );

        let configuration = desired.map_or_else(
            || stringified_map(&record.configuration),
            |spec| harmonized_map(&spec.configuration, &record.configuration, true),
        );
        if !configuration.is_empty() {
            attributes.insert(String::from("configuration"), AttrValue::Map(configuration));
        }

        if let Some(owner) = record.owner {
            attributes.insert(String::from("owner_id"), AttrValue::Int(owner));
        }

        let project = record
            .project
            .as_ref()
            .map(ProjectRef::canonical)
            .filter(|project| !project.is_empty())
            .or_else(|| desired.and_then(|spec| spec.project.clone()));
        if let Some(project) = project {
            attributes.insert(String::from("project"), AttrValue::Str(project));
        }

        let paths = desired.map_or_else(
            || stringified_map(&record.paths),
            |spec| harmonized_map(&spec.paths, &record.paths, false),
        );
        if !paths.is_empty() {
            attributes.insert(String::from("paths"), AttrValue::Map(paths));
        }

        if !record.teams.is_empty() {
            attributes.insert(String::from("teams"), AttrValue::List(record.teams.clone()));
        }
        if let Some(url) = record.url.clone() {
            attributes.insert(String::from("url"), AttrValue::Str(url));
        }

        Reconciled::new(Self::descriptor(), id, attributes)
    }
}

#[async_trait]
impl ResourceSync for StoreSync<'_> {
    type Spec = StoreSpec;

    fn descriptor() -> &'static ResourceDescriptor {
        &STORE
    }

    fn label(spec: &StoreSpec) -> &str {
        &spec.name
    }

    fn client(&self) -> &ValohaiClient {
        self.client
    }

    fn validate(spec: &StoreSpec) -> Result<()> {
        if spec.name.trim().is_empty() {
            return Err(ValosyncError::Config(ConfigError::validation(
                "store name cannot be empty",
                "name",
            )));
        }
        if spec.name.chars().count() > MAX_NAME_LEN {
            return Err(ValosyncError::Config(ConfigError::validation(
                format!("store name cannot be longer than {MAX_NAME_LEN} characters"),
                "name",
            )));
        }
        check_access_mode(spec).map_err(|message| {
            ValosyncError::Config(ConfigError::validation(message, "access_mode"))
        })?;
        Ok(())
    }

    async fn create(&self, spec: &StoreSpec) -> Result<Reconciled> {
        Self::validate(spec)?;

        let payload = Self::payload(spec, true);
        let record: StoreRecord = self
            .client
            .create(Self::descriptor().collection(), &payload)
            .await?;

        info!("Created store {} (id: {})", spec.name, record.id);
        Self::reconcile(Some(spec), &record, "")
    }

    async fn read(&self, id: &str, desired: Option<&StoreSpec>) -> Result<ReadOutcome> {
        let record: Option<StoreRecord> = self
            .client
            .read(Self::descriptor().collection(), id)
            .await?;

        match record {
            Some(record) => Ok(ReadOutcome::Present(Self::reconcile(
                desired, &record, id,
            )?)),
            None => Ok(ReadOutcome::Absent),
        }
    }

    async fn update(&self, id: &str, spec: &StoreSpec) -> Result<Reconciled> {
        Self::validate(spec)?;

        let payload = Self::payload(spec, false);
        let record: StoreRecord = self
            .client
            .update(Self::descriptor().collection(), id, &payload)
            .await?;

        info!("Updated store {} (id: {id})", spec.name);
        Self::reconcile(Some(spec), &record, id)
    }
}

/// Builds the configuration payload: only known keys are sent, and
/// boolean-valued keys are coerced from their string form.
fn payload_configuration(
    configuration: &BTreeMap<String, String>,
) -> serde_json::Map<String, Value> {
    configuration
        .iter()
        .filter(|(key, _)| CONFIGURATION_KEYS.contains(&key.as_str()))
        .map(|(key, value)| {
            let encoded = if BOOL_CONFIGURATION_KEYS.contains(&key.as_str()) {
                Value::Bool(value == "true")
            } else {
                Value::String(value.clone())
            };
            (key.clone(), encoded)
        })
        .collect()
}

/// Merges a caller-declared string map with the remote values: only
/// declared keys are kept and the server's value wins for each. With
/// `known_keys_only`, declared keys outside the known configuration set
/// are dropped.
fn harmonized_map(
    declared: &BTreeMap<String, String>,
    remote: &BTreeMap<String, Value>,
    known_keys_only: bool,
) -> BTreeMap<String, String> {
    declared
        .iter()
        .filter(|(key, _)| !known_keys_only || CONFIGURATION_KEYS.contains(&key.as_str()))
        .map(|(key, declared_value)| {
            let value = remote
                .get(key)
                .map_or_else(|| declared_value.clone(), stringify);
            (key.clone(), value)
        })
        .collect()
}

/// Stringifies every entry of a remote map (identifier lookups, where no
/// declared keys exist to harmonize against).
fn stringified_map(remote: &BTreeMap<String, Value>) -> BTreeMap<String, String> {
    remote
        .iter()
        .map(|(key, value)| (key.clone(), stringify(value)))
        .collect()
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
