//! Registry credential resource synchronization.
//!
//! Each credential type accepts a fixed set of configuration keys and
//! requires a subset of them. Validation and defaulting run locally,
//! before any network I/O; the server never sees an unchecked
//! configuration.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::config::{CredentialType, RegistryCredentialSpec};
use crate::error::{ConfigError, Result, ValosyncError};
use crate::valohai::{RegistryCredentialRecord, ValohaiClient};

use super::descriptor::{AttrValue, REGISTRY_CREDENTIALS, ResourceDescriptor};
use super::{ReadOutcome, Reconciled, ResourceSync};

/// Allowed configuration keys per credential type.
const fn allowed_keys(credential_type: CredentialType) -> &'static [&'static str] {
    match credential_type {
        CredentialType::Docker => &["username", "password", "version"],
        CredentialType::AwsEcr => &["access_key_id", "secret_access_key", "region", "version"],
        CredentialType::AwsEcrRole => &["role_name", "region", "version"],
        CredentialType::GcpCr => &["service_account_json", "version"],
    }
}

/// Required configuration keys per credential type.
const fn required_keys(credential_type: CredentialType) -> &'static [&'static str] {
    match credential_type {
        CredentialType::Docker => &["username", "password"],
        CredentialType::AwsEcr => &["access_key_id", "secret_access_key", "region"],
        CredentialType::AwsEcrRole => &["role_name", "region"],
        CredentialType::GcpCr => &["service_account_json"],
    }
}

/// Default values applied to absent or blank configuration keys.
const fn default_values(credential_type: CredentialType) -> &'static [(&'static str, &'static str)] {
    match credential_type {
        CredentialType::Docker
        | CredentialType::AwsEcr
        | CredentialType::AwsEcrRole
        | CredentialType::GcpCr => &[("version", "1")],
    }
}

/// Applies per-type defaults to absent or blank configuration keys.
#[must_use]
pub fn normalized_configuration(
    credential_type: CredentialType,
    configuration: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut normalized = configuration.clone();
    for (key, default_value) in default_values(credential_type) {
        let blank = normalized
            .get(*key)
            .is_none_or(|value| value.trim().is_empty());
        if blank {
            normalized.insert((*key).to_string(), (*default_value).to_string());
        }
    }
    normalized
}

/// Checks a configuration against the per-type allow-list and required
/// key set. Expects an already-normalized configuration.
///
/// # Errors
///
/// Returns a description naming the offending key.
pub fn check_configuration(
    credential_type: CredentialType,
    configuration: &BTreeMap<String, String>,
) -> std::result::Result<(), String> {
    let allowed = allowed_keys(credential_type);
    for key in configuration.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(format!(
                "invalid configuration key '{key}' for type '{credential_type}' \
                 (allowed keys: {})",
                allowed.join(", ")
            ));
        }
    }

    for key in required_keys(credential_type) {
        let blank = configuration
            .get(*key)
            .is_none_or(|value| value.trim().is_empty());
        if blank {
            return Err(format!(
                "missing or empty configuration.{key} for type '{credential_type}'"
            ));
        }
    }

    Ok(())
}

/// Synchronizes `registry-credentials` resources.
#[derive(Debug)]
pub struct RegistryCredentialSync<'a> {
    client: &'a ValohaiClient,
}

/// Create/update payload.
#[derive(Debug, Serialize)]
struct RegistryCredentialPayload<'a> {
    #[serde(rename = "type")]
    credential_type: &'a str,
    image_pattern: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    owner: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    configuration: Option<BTreeMap<String, String>>,
}

impl<'a> RegistryCredentialSync<'a> {
    /// Creates a new registry-credential synchronizer.
    #[must_use]
    pub const fn new(client: &'a ValohaiClient) -> Self {
        Self { client }
    }

    fn payload<'s>(spec: &'s RegistryCredentialSpec) -> RegistryCredentialPayload<'s> {
        let configuration = normalized_configuration(spec.credential_type, &spec.configuration);
        RegistryCredentialPayload {
            credential_type: spec.credential_type.as_str(),
            image_pattern: &spec.image_pattern,
            owner: spec.owner,
            configuration: (!configuration.is_empty()).then_some(configuration),
        }
    }

    /// Overlays remote record values on the desired state. The API never
    /// returns the configuration; the reconciled configuration is the
    /// normalized desired map.
    fn reconcile(
        desired: Option<&RegistryCredentialSpec>,
        record: &RegistryCredentialRecord,
    ) -> Result<Reconciled> {
        let mut attributes = BTreeMap::new();
        attributes.insert(
            String::from("type"),
            AttrValue::Str(record.credential_type.clone()),
        );
        attributes.insert(
            String::from("image_pattern"),
            AttrValue::Str(record.image_pattern.clone()),
        );

        let owner = record.owner.or_else(|| desired.and_then(|spec| spec.owner));
        if let Some(owner) = owner {
            attributes.insert(String::from("owner"), AttrValue::Int(owner));
        }

        if let Some(spec) = desired {
            let configuration =
                normalized_configuration(spec.credential_type, &spec.configuration);
            if !configuration.is_empty() {
                attributes.insert(String::from("configuration"), AttrValue::Map(configuration));
            }
        }

        Reconciled::new(Self::descriptor(), record.id.clone(), attributes)
    }
}

#[async_trait]
impl ResourceSync for RegistryCredentialSync<'_> {
    type Spec = RegistryCredentialSpec;

    fn descriptor() -> &'static ResourceDescriptor {
        &REGISTRY_CREDENTIALS
    }

    fn label(spec: &RegistryCredentialSpec) -> &str {
        &spec.name
    }

    fn client(&self) -> &ValohaiClient {
        self.client
    }

    fn validate(spec: &RegistryCredentialSpec) -> Result<()> {
        if spec.image_pattern.trim().is_empty() {
            return Err(ValosyncError::Config(ConfigError::validation(
                "image_pattern cannot be empty",
                "image_pattern",
            )));
        }

        let configuration = normalized_configuration(spec.credential_type, &spec.configuration);
        check_configuration(spec.credential_type, &configuration).map_err(|message| {
            ValosyncError::Config(ConfigError::validation(message, "configuration"))
        })?;
        Ok(())
    }

    async fn create(&self, spec: &RegistryCredentialSpec) -> Result<Reconciled> {
        Self::validate(spec)?;

        let payload = Self::payload(spec);
        let record: RegistryCredentialRecord = self
            .client
            .create(Self::descriptor().collection(), &payload)
            .await?;

        info!(
            "Created registry credentials for {} (id: {})",
            spec.image_pattern, record.id
        );
        Self::reconcile(Some(spec), &record)
    }

    async fn read(
        &self,
        id: &str,
        desired: Option<&RegistryCredentialSpec>,
    ) -> Result<ReadOutcome> {
        let record: Option<RegistryCredentialRecord> = self
            .client
            .read(Self::descriptor().collection(), id)
            .await?;

        match record {
            Some(record) => Ok(ReadOutcome::Present(Self::reconcile(desired, &record)?)),
            None => Ok(ReadOutcome::Absent),
        }
    }

    async fn update(&self, id: &str, spec: &RegistryCredentialSpec) -> Result<Reconciled> {
        Self::validate(spec)?;

        let payload = Self::payload(spec);
        let record: RegistryCredentialRecord = self
            .client
            .update(Self::descriptor().collection(), id, &payload)
            .await?;

        info!(
            "Updated registry credentials for {} (id: {id})",
            spec.image_pattern
        );
        Self::reconcile(Some(spec), &record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docker_spec(configuration: BTreeMap<String, String>) -> RegistryCredentialSpec {
        RegistryCredentialSpec {
            name: String::from("ghcr"),
            credential_type: CredentialType::Docker,
            image_pattern: String::from("ghcr.io/acme/*"),
            owner: None,
            configuration,
        }
    }

    #[test]
    fn test_docker_missing_password_fails_before_network() {
        let spec = docker_spec(BTreeMap::from([(
            String::from("username"),
            String::from("u"),
        )]));

        let err = RegistryCredentialSync::validate(&spec).unwrap_err();
        assert!(err.to_string().contains("configuration.password"));
    }

    #[test]
    fn test_docker_gains_default_version() {
        let configuration = BTreeMap::from([
            (String::from("username"), String::from("u")),
            (String::from("password"), String::from("p")),
        ]);

        let normalized = normalized_configuration(CredentialType::Docker, &configuration);
        assert_eq!(normalized.get("version").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_blank_version_is_replaced() {
        let configuration = BTreeMap::from([
            (String::from("username"), String::from("u")),
            (String::from("password"), String::from("p")),
            (String::from("version"), String::from("  ")),
        ]);

        let normalized = normalized_configuration(CredentialType::Docker, &configuration);
        assert_eq!(normalized.get("version").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_explicit_version_is_kept() {
        let configuration = BTreeMap::from([
            (String::from("username"), String::from("u")),
            (String::from("password"), String::from("p")),
            (String::from("version"), String::from("2")),
        ]);

        let normalized = normalized_configuration(CredentialType::Docker, &configuration);
        assert_eq!(normalized.get("version").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let configuration = BTreeMap::from([
            (String::from("username"), String::from("u")),
            (String::from("password"), String::from("p")),
            (String::from("registry_url"), String::from("x")),
        ]);

        let err =
            check_configuration(CredentialType::Docker, &configuration).unwrap_err();
        assert!(err.contains("registry_url"));
        assert!(err.contains("allowed keys"));
    }

    #[test]
    fn test_aws_ecr_required_keys() {
        let configuration = BTreeMap::from([
            (String::from("access_key_id"), String::from("AKIA")),
            (String::from("secret_access_key"), String::from("s")),
        ]);
        let normalized = normalized_configuration(CredentialType::AwsEcr, &configuration);
        let err = check_configuration(CredentialType::AwsEcr, &normalized).unwrap_err();
        assert!(err.contains("configuration.region"));
    }

    #[test]
    fn test_valid_docker_configuration_passes() {
        let spec = docker_spec(BTreeMap::from([
            (String::from("username"), String::from("u")),
            (String::from("password"), String::from("p")),
        ]));
        assert!(RegistryCredentialSync::validate(&spec).is_ok());
    }

    #[test]
    fn test_payload_carries_normalized_configuration() {
        let spec = docker_spec(BTreeMap::from([
            (String::from("username"), String::from("u")),
            (String::from("password"), String::from("p")),
        ]));

        let payload = RegistryCredentialSync::payload(&spec);
        let encoded = serde_json::to_value(&payload).unwrap();
        assert_eq!(encoded["configuration"]["version"], "1");
        assert_eq!(encoded["type"], "docker");
        assert!(encoded.get("owner").is_none());
    }
}
