//! Record schema versioning.
//!
//! Every persisted record (candidate, position, decision event, outcome
//! label, manifest, checkpoint) carries a `schema_version`. Stores refuse to
//! open data written by an incompatible major version — a minor version
//! bump must stay backward-readable (new optional fields only).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current schema version for all persisted artifacts in this crate.
///
/// Bump the major component whenever a field is removed, retyped, or an
/// enum variant's meaning changes. Bump the minor component for additive,
/// backward-compatible changes (new optional field, new enum variant that
/// old readers can ignore).
pub const CURRENT_SCHEMA_VERSION: SchemaVersion = SchemaVersion { major: 1, minor: 0 };

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaVersion {
    pub major: u32,
    pub minor: u32,
}

impl SchemaVersion {
    /// A store may open data written at `other` if the major versions match.
    /// Newer minor versions are always readable by older code (additive only);
    /// older minor versions are always readable by newer code.
    pub fn is_compatible_with(&self, other: SchemaVersion) -> bool {
        self.major == other.major
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        CURRENT_SCHEMA_VERSION
    }
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema version mismatch: store contains {found}, this build expects major version {expected_major}")]
    IncompatibleVersion {
        found: SchemaVersion,
        expected_major: u32,
    },
}

/// Validate that `found` can be opened by code expecting `CURRENT_SCHEMA_VERSION`.
pub fn check_compatible(found: SchemaVersion) -> Result<(), SchemaError> {
    if CURRENT_SCHEMA_VERSION.is_compatible_with(found) {
        Ok(())
    } else {
        Err(SchemaError::IncompatibleVersion {
            found,
            expected_major: CURRENT_SCHEMA_VERSION.major,
        })
    }
}
