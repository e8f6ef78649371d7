//! FeatureSnapshot — the per-bar output of the feature pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel value substituted for NaN/div-by-zero feature inputs.
pub const FEATURE_SENTINEL: f64 = -999.0;

/// A mapping from feature name to value, plus bar context and readiness.
///
/// Uses a `BTreeMap` (not `HashMap`) so iteration order is stable, which
/// matters for deterministic fingerprint hashing downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSnapshot {
    pub symbol: String,
    pub bar_timestamp: DateTime<Utc>,
    pub values: BTreeMap<String, f64>,
    pub buckets: BTreeMap<String, String>,
    /// False if any required feature resolved to the sentinel this bar.
    pub feature_ready: bool,
}

impl FeatureSnapshot {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn bucket(&self, key: &str) -> Option<&str> {
        self.buckets.get(key).map(|s| s.as_str())
    }
}
