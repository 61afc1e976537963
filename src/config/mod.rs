//! Configuration module for the valosync manifest.
//!
//! This module handles all manifest-related functionality:
//! - Parsing and deserializing `valosync.yaml`
//! - Validation of declared resources before any network call
//! - Computing spec fingerprints for change detection

mod hash;
mod parser;
mod spec;
mod validator;

pub use hash::SpecHasher;
pub use parser::{
    API_URL_ENV_VAR, DEFAULT_MANIFEST_FILES, ManifestParser, find_manifest_file,
};
pub use spec::{
    AccessMode, AuthConfig, CredentialType, Manifest, ProjectSpec, RegistryCredentialSpec,
    StoreSpec, StoreType, TeamSpec,
};
pub use validator::{ManifestValidator, ValidationError, ValidationResult};
