//! Playbook engine — deterministic, stateless opportunity detectors.
//!
//! A playbook never sees portfolio or open-position state: it answers
//! "what is an opportunity", never "whether to take it". That split keeps
//! playbooks pure and trivially testable with property-based tests.

pub mod breakout;
pub mod config;
pub mod pullback;

use crate::domain::{Bar, Direction, ExitSpec};
use crate::features::FeatureSnapshot;
use chrono::{DateTime, Utc};

pub use breakout::Breakout;
pub use config::{BreakoutConfig, PullbackConfig};
pub use pullback::Pullback;

/// An opportunity produced by a playbook, before the runner stamps it with
/// a candidate id and run id.
#[derive(Debug, Clone)]
pub struct CandidateDraft {
    pub symbol: String,
    pub bar_timestamp: DateTime<Utc>,
    pub playbook_name: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub exit_spec: ExitSpec,
}

/// A stateless, portfolio-agnostic opportunity detector.
///
/// # Architecture invariant
/// `evaluate` receives only features and the current bar — no portfolio,
/// no open positions, no account state. A playbook that needed portfolio
/// state would no longer be answering "what is an opportunity" but "should
/// I act", which is the LLM harness's job.
pub trait Playbook: Send + Sync {
    fn name(&self) -> &str;

    /// At most one candidate per (bar, playbook, symbol): `Some` or `None`.
    fn evaluate(&self, features: &FeatureSnapshot, bar: &Bar) -> Option<CandidateDraft>;
}

/// Compute the bucketed-feature fingerprint a candidate is stamped with.
pub fn candidate_fingerprint(features: &FeatureSnapshot) -> crate::domain::ConfigHash {
    crate::fingerprint::feature_fingerprint(&features.buckets.clone().into_iter().collect())
}
