//! Team resource synchronization.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::config::TeamSpec;
use crate::error::{ConfigError, Result, ValosyncError};
use crate::valohai::{OrganizationRef, TeamRecord, ValohaiClient};

use super::descriptor::{AttrValue, ResourceDescriptor, TEAM};
use super::{ReadOutcome, Reconciled, ResourceSync};

/// Synchronizes `team` resources.
#[derive(Debug)]
pub struct TeamSync<'a> {
    client: &'a ValohaiClient,
}

/// Create/update payload. The organization is fixed at creation and
/// omitted on update.
#[derive(Debug, Serialize)]
struct TeamPayload<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    organization: Option<i64>,
}

impl<'a> TeamSync<'a> {
    /// Creates a new team synchronizer.
    #[must_use]
    pub const fn new(client: &'a ValohaiClient) -> Self {
        Self { client }
    }

    /// Overlays remote record values on the desired state. Read responses
    /// embed the organization as an object; it normalizes to its id.
    fn reconcile(
        desired: Option<&TeamSpec>,
        record: &TeamRecord,
        fallback_id: &str,
    ) -> Result<Reconciled> {
        let id = if record.id.is_empty() {
            fallback_id.to_string()
        } else {
            record.id.clone()
        };

        let mut attributes = BTreeMap::new();
        attributes.insert(String::from("name"), AttrValue::Str(record.name.clone()));

        let organization = record
            .organization
            .as_ref()
            .map(OrganizationRef::id)
            .or_else(|| desired.map(|spec| spec.organization));
        if let Some(organization) = organization {
            attributes.insert(String::from("organization"), AttrValue::Int(organization));
        }

        if let Some(url) = record.url.clone() {
            attributes.insert(String::from("url"), AttrValue::Str(url));
        }

        Reconciled::new(Self::descriptor(), id, attributes)
    }
}

#[async_trait]
impl ResourceSync for TeamSync<'_> {
    type Spec = TeamSpec;

    fn descriptor() -> &'static ResourceDescriptor {
        &TEAM
    }

    fn label(spec: &TeamSpec) -> &str {
        &spec.name
    }

    fn client(&self) -> &ValohaiClient {
        self.client
    }

    fn validate(spec: &TeamSpec) -> Result<()> {
        if spec.name.trim().is_empty() {
            return Err(ValosyncError::Config(ConfigError::validation(
                "team name cannot be empty",
                "name",
            )));
        }
        if spec.organization <= 0 {
            return Err(ValosyncError::Config(ConfigError::validation(
                "team organization must be a positive id",
                "organization",
            )));
        }
        Ok(())
    }

    async fn create(&self, spec: &TeamSpec) -> Result<Reconciled> {
        Self::validate(spec)?;

        let payload = TeamPayload {
            name: &spec.name,
            organization: Some(spec.organization),
        };

        let record: TeamRecord = self
            .client
            .create(Self::descriptor().collection(), &payload)
            .await?;

        info!("Created team {} (id: {})", spec.name, record.id);
        Self::reconcile(Some(spec), &record, "")
    }

    async fn read(&self, id: &str, desired: Option<&TeamSpec>) -> Result<ReadOutcome> {
        let record: Option<TeamRecord> = self
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

    async fn update(&self, id: &str, spec: &TeamSpec) -> Result<Reconciled> {
        Self::validate(spec)?;

        let payload = TeamPayload {
            name: &spec.name,
            organization: None,
        };

        let record: TeamRecord = self
            .client
            .update(Self::descriptor().collection(), id, &payload)
            .await?;

        info!("Updated team {} (id: {id})", spec.name);
        Self::reconcile(Some(spec), &record, id)
    }
}
