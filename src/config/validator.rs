//! Manifest validation.
//!
//! This module validates the declared resources before any network call:
//! duplicate labels, required fields, store access-mode exclusivity and
//! registry-credential configuration rules. Errors are fatal; warnings
//! flag suspicious but workable declarations.

use crate::error::{ConfigError, Result, ValosyncError};
use std::collections::HashSet;
use tracing::debug;

use crate::sync::{
    STORE_CONFIGURATION_KEYS, check_access_mode, check_configuration, normalized_configuration,
};

use super::spec::{Manifest, ProjectSpec, RegistryCredentialSpec, StoreSpec, TeamSpec};

/// Maximum store name length accepted by the API.
const MAX_STORE_NAME_LEN: usize = 64;

/// Validator for manifests.
#[derive(Debug, Default)]
pub struct ManifestValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ManifestValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a manifest.
    ///
    /// # Errors
    ///
    /// Returns the first error found when validation fails.
    pub fn validate(&self, manifest: &Manifest) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        if manifest.is_empty() {
            result
                .warnings
                .push(String::from("No resources declared in manifest"));
        }

        Self::validate_projects(&manifest.projects, &mut result);
        Self::validate_teams(&manifest.teams, &mut result);
        Self::validate_stores(&manifest.stores, &mut result);
        Self::validate_registry_credentials(&manifest.registry_credentials, &mut result);

        if result.errors.is_empty() {
            debug!("Manifest validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(ValosyncError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }))
        }
    }

    fn validate_projects(projects: &[ProjectSpec], result: &mut ValidationResult) {
        let mut seen_names = HashSet::new();

        for (i, project) in projects.iter().enumerate() {
            let prefix = format!("projects[{i}]");

            if !seen_names.insert(&project.name) {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.name"),
                    message: format!("Duplicate project name: {}", project.name),
                });
            }
            if project.name.trim().is_empty() {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.name"),
                    message: String::from("Project name cannot be empty"),
                });
            }
            if project.owner.trim().is_empty() {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.owner"),
                    message: String::from("Project owner cannot be empty"),
                });
            }
        }
    }

    fn validate_teams(teams: &[TeamSpec], result: &mut ValidationResult) {
        let mut seen_names = HashSet::new();

        for (i, team) in teams.iter().enumerate() {
            let prefix = format!("teams[{i}]");

            if !seen_names.insert(&team.name) {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.name"),
                    message: format!("Duplicate team name: {}", team.name),
                });
            }
            if team.name.trim().is_empty() {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.name"),
                    message: String::from("Team name cannot be empty"),
                });
            }
            if team.organization <= 0 {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.organization"),
                    message: String::from("Team organization must be a positive id"),
                });
            }
        }
    }

    fn validate_stores(stores: &[StoreSpec], result: &mut ValidationResult) {
        let mut seen_names = HashSet::new();

        for (i, store) in stores.iter().enumerate() {
            let prefix = format!("stores[{i}]");

            if !seen_names.insert(&store.name) {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.name"),
                    message: format!("Duplicate store name: {}", store.name),
                });
            }
            if store.name.trim().is_empty() {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.name"),
                    message: String::from("Store name cannot be empty"),
                });
            } else if store.name.chars().count() > MAX_STORE_NAME_LEN {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.name"),
                    message: format!(
                        "Store name cannot be longer than {MAX_STORE_NAME_LEN} characters"
                    ),
                });
            }

            if let Err(message) = check_access_mode(store) {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.access_mode"),
                    message,
                });
            }

            for key in store.configuration.keys() {
                if !STORE_CONFIGURATION_KEYS.contains(&key.as_str()) {
                    result.warnings.push(format!(
                        "{prefix}.configuration: Unknown key '{key}' will not be sent to the API"
                    ));
                }
            }

            if store.configuration.is_empty() {
                result.warnings.push(format!(
                    "{prefix}: Store has no configuration; the backend will be unusable \
                     until one is set"
                ));
            }
        }
    }

    fn validate_registry_credentials(
        credentials: &[RegistryCredentialSpec],
        result: &mut ValidationResult,
    ) {
        let mut seen_names = HashSet::new();

        for (i, credential) in credentials.iter().enumerate() {
            let prefix = format!("registry_credentials[{i}]");

            if !seen_names.insert(&credential.name) {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.name"),
                    message: format!("Duplicate registry credential label: {}", credential.name),
                });
            }
            if credential.image_pattern.trim().is_empty() {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.image_pattern"),
                    message: String::from("image_pattern cannot be empty"),
                });
            }

            let configuration = normalized_configuration(
                credential.credential_type,
                &credential.configuration,
            );
            if let Err(message) =
                check_configuration(credential.credential_type, &configuration)
            {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.configuration"),
                    message,
                });
            }
        }
    }
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
