//! State management module.
//!
//! This module provides persistent storage for the server-confirmed state
//! of synchronized resources: remote identifiers, reconciled attributes
//! and lifecycle phases.

mod local;
mod lock;
mod store;
mod types;

pub use local::LocalStateStore;
pub use lock::{LOCK_EXPIRY_SECS, LockInfo, generate_holder_id};
pub use store::StateStore;
pub use types::{ResourceEntry, ResourcePhase, STATE_VERSION, SyncState};
