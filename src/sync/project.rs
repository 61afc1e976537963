//! Project resource synchronization.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::config::ProjectSpec;
use crate::error::{ConfigError, Result, ValosyncError};
use crate::valohai::{OwnerRef, ProjectRecord, ValohaiClient};

use super::descriptor::{AttrValue, PROJECT, ResourceDescriptor};
use super::{ReadOutcome, Reconciled, ResourceSync};

/// Synchronizes `project` resources.
#[derive(Debug)]
pub struct ProjectSync<'a> {
    client: &'a ValohaiClient,
}

/// Create/update payload. Unset optional fields are omitted entirely.
#[derive(Debug, Serialize)]
struct ProjectPayload<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    owner: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    // The API names the template field `template`
    #[serde(rename = "template", skip_serializing_if = "Option::is_none")]
    template: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_notifications: Option<bool>,
}

impl<'a> ProjectSync<'a> {
    /// Creates a new project synchronizer.
    #[must_use]
    pub const fn new(client: &'a ValohaiClient) -> Self {
        Self { client }
    }

    /// Overlays remote record values on the desired state.
    fn reconcile(
        desired: Option<&ProjectSpec>,
        record: &ProjectRecord,
    ) -> Result<Reconciled> {
        let mut attributes = BTreeMap::new();
        attributes.insert(String::from("name"), AttrValue::Str(record.name.clone()));

        let owner = record
            .owner
            .as_ref()
            .map(OwnerRef::canonical)
            .filter(|owner| !owner.is_empty())
            .or_else(|| desired.map(|spec| spec.owner.clone()));
        if let Some(owner) = owner {
            attributes.insert(String::from("owner"), AttrValue::Str(owner));
        }

        let description = record
            .description
            .clone()
            .or_else(|| desired.and_then(|spec| spec.description.clone()));
        if let Some(description) = description {
            attributes.insert(String::from("description"), AttrValue::Str(description));
        }

        if let Some(template_url) = desired.and_then(|spec| spec.template_url.clone()) {
            attributes.insert(String::from("template_url"), AttrValue::Str(template_url));
        }
        if let Some(notifications) = desired.and_then(|spec| spec.default_notifications) {
            attributes.insert(
                String::from("default_notifications"),
                AttrValue::Bool(notifications),
            );
        }
        if let Some(url) = record.url.clone() {
            attributes.insert(String::from("url"), AttrValue::Str(url));
        }

        Reconciled::new(Self::descriptor(), record.id.clone(), attributes)
    }
}

#[async_trait]
impl ResourceSync for ProjectSync<'_> {
    type Spec = ProjectSpec;

    fn descriptor() -> &'static ResourceDescriptor {
        &PROJECT
    }

    fn label(spec: &ProjectSpec) -> &str {
        &spec.name
    }

    fn client(&self) -> &ValohaiClient {
        self.client
    }

    fn validate(spec: &ProjectSpec) -> Result<()> {
        if spec.name.trim().is_empty() {
            return Err(ValosyncError::Config(ConfigError::validation(
                "project name cannot be empty",
                "name",
            )));
        }
        if spec.owner.trim().is_empty() {
            return Err(ValosyncError::Config(ConfigError::validation(
                "project owner cannot be empty",
                "owner",
            )));
        }
        Ok(())
    }

    async fn create(&self, spec: &ProjectSpec) -> Result<Reconciled> {
        Self::validate(spec)?;

        let payload = ProjectPayload {
            name: &spec.name,
            owner: Some(&spec.owner),
            description: spec.description.as_deref(),
            template: spec.template_url.as_deref(),
            default_notifications: spec.default_notifications,
        };

        let record: ProjectRecord = self
            .client
            .create(Self::descriptor().collection(), &payload)
            .await?;

        info!("Created project {} (id: {})", spec.name, record.id);
        Self::reconcile(Some(spec), &record)
    }

    async fn read(&self, id: &str, desired: Option<&ProjectSpec>) -> Result<ReadOutcome> {
        let record: Option<ProjectRecord> = self
            .client
            .read(Self::descriptor().collection(), id)
            .await?;

        match record {
            Some(record) => Ok(ReadOutcome::Present(Self::reconcile(desired, &record)?)),
            None => Ok(ReadOutcome::Absent),
        }
    }

    async fn update(&self, id: &str, spec: &ProjectSpec) -> Result<Reconciled> {
        Self::validate(spec)?;

        // owner and template are fixed at creation
        let payload = ProjectPayload {
            name: &spec.name,
            owner: None,
            description: spec.description.as_deref(),
            template: None,
            default_notifications: spec.default_notifications,
        };

        let record: ProjectRecord = self
            .client
            .update(Self::descriptor().collection(), id, &payload)
            .await?;

        info!("Updated project {} (id: {id})", spec.name);
        Self::reconcile(Some(spec), &record)
    }
}
