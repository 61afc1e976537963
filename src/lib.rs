// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # valosync
//!
//! Declarative resource synchronization for the Valohai MLOps platform.
//!
//! ## Overview
//!
//! valosync maps a declarative YAML manifest onto CRUD operations against
//! the platform's REST API. It manages four resource kinds:
//!
//! - **projects** - Valohai projects and their metadata
//! - **teams** - teams within an organization
//! - **stores** - storage backends (S3, Swift, Azure, Google)
//! - **registry-credentials** - container registry credentials
//!
//! ## Architecture
//!
//! Every kind follows one shared synchronization protocol:
//!
//! 1. **Desired State**: typed manifest entries from `valosync.yaml`
//! 2. **Remote Record**: the JSON object the API reports
//! 3. **Reconciled State**: desired values overlaid with server values,
//!    persisted to a local state file after every confirmed operation
//!
//! Validation runs locally before any network call; a 404 on Read or
//! Delete is a defined absence, never an error; no operation retries.
//!
//! ## Modules
//!
//! - [`config`]: manifest parsing, validation and fingerprinting
//! - [`valohai`]: REST client and remote record types
//! - [`sync`]: per-kind resource synchronizers and descriptors
//! - [`state`]: local state storage and locking
//! - [`runner`]: drives manifest entries through the lifecycle
//! - [`cli`]: command-line interface
//!
//! ## Example
//!
//! ```yaml
//! projects:
//!   - name: analytics
//!     owner: acme
//!
//! stores:
//!   - name: artifacts
//!     type: s3
//!     access_mode: owner_organization
//!     configuration:
//!       bucket: acme-artifacts
//!       region: eu-west-1
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod runner;
pub mod state;
pub mod sync;
pub mod valohai;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{Manifest, ManifestParser, ManifestValidator, SpecHasher};
pub use error::{ApiError, ConfigError, Result, StateError, ValosyncError};
pub use runner::{SyncReport, SyncRunner};
pub use state::{LocalStateStore, StateStore, SyncState};
pub use sync::{
    ProjectSync, ReadOutcome, Reconciled, RegistryCredentialSync, ResourceKind, ResourceSync,
    StoreSync, TeamSync,
};
pub use valohai::{ApiCredentials, ValohaiClient};
