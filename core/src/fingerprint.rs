//! Feature fingerprinting — deterministic identity for a candidate's bucketed features.
//!
//! A `Candidate` carries a hash of its bucketed feature labels so the
//! learning substrate can group candidates by market regime without storing
//! the entire feature vector redundantly, and so tests can assert that two
//! candidates produced from identical regimes hash identically regardless of
//! the exact float values that produced the buckets.

use crate::domain::ConfigHash;
use std::collections::BTreeMap;

/// Compute a deterministic fingerprint from a candidate's bucketed feature
/// labels. `BTreeMap` guarantees canonical key ordering so the same bucket
/// set always hashes identically regardless of insertion order.
pub fn feature_fingerprint(buckets: &BTreeMap<String, String>) -> ConfigHash {
    let canonical = serde_json::to_string(buckets).expect("bucket map must serialize");
    ConfigHash::from_bytes(canonical.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_buckets() -> BTreeMap<String, String> {
        let mut m = BTreeMap::new();
        m.insert("rsi_14".to_string(), "overbought".to_string());
        m.insert("adx_14".to_string(), "strong_trend".to_string());
        m
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let b = sample_buckets();
        assert_eq!(feature_fingerprint(&b), feature_fingerprint(&b));
    }

    #[test]
    fn fingerprint_ignores_insertion_order() {
        let mut a = BTreeMap::new();
        a.insert("adx_14".to_string(), "strong_trend".to_string());
        a.insert("rsi_14".to_string(), "overbought".to_string());

        let b = sample_buckets();
        assert_eq!(feature_fingerprint(&a), feature_fingerprint(&b));
    }

    #[test]
    fn different_buckets_different_fingerprint() {
        let a = sample_buckets();
        let mut b = sample_buckets();
        b.insert("rsi_14".to_string(), "oversold".to_string());
        assert_ne!(feature_fingerprint(&a), feature_fingerprint(&b));
    }
}
