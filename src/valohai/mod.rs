//! Valohai API integration module.
//!
//! This module provides the HTTP client and record types for the
//! platform's REST API, including the best-effort extraction of error
//! messages from its inconsistent failure shapes.

mod client;
mod error_body;
mod types;

pub use client::{ApiCredentials, DEFAULT_API_URL, TOKEN_ENV_VAR, ValohaiClient};
pub use error_body::extract_message;
pub use types::{
    EmbeddedRef, OrganizationRef, OwnerRef, ProjectRecord, ProjectRef, RefId,
    RegistryCredentialRecord, StoreRecord, TeamRecord,
};
