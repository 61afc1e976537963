//! Spec fingerprinting for change detection.
//!
//! Each declared resource is fingerprinted so a later run can tell whether
//! its desired state changed since the last successful synchronization.
//! Maps in the spec types are `BTreeMap`s, so encoding is deterministic.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Hasher for computing spec fingerprints.
#[derive(Debug, Default)]
pub struct SpecHasher;

impl SpecHasher {
    /// Creates a new spec hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the fingerprint of a single resource spec.
    #[must_use]
    pub fn fingerprint<T: Serialize>(&self, spec: &T) -> String {
        let encoded = serde_json::to_vec(spec).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&encoded);
        hex::encode(hasher.finalize())
    }
}
