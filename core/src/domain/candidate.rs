//! Candidate — a potential trade produced deterministically by a playbook.

use super::direction::Direction;
use super::exit_spec::ExitSpec;
use super::ids::{CandidateId, ConfigHash, PositionId, RunId};
use crate::schema::{SchemaVersion, CURRENT_SCHEMA_VERSION};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A candidate trade, persisted regardless of the downstream take/skip
/// decision so that skipped setups remain auditable.
///
/// Immutable after creation except for `taken` and `position_id`, which the
/// runner sets exactly once when the candidate is accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub schema_version: SchemaVersion,
    pub id: CandidateId,
    pub run_id: RunId,
    pub symbol: String,
    pub bar_timestamp: DateTime<Utc>,
    pub playbook_name: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub exit_spec: ExitSpec,
    pub feature_fingerprint: ConfigHash,
    pub taken: bool,
    pub position_id: Option<PositionId>,
}

impl Candidate {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: CandidateId,
        run_id: RunId,
        symbol: impl Into<String>,
        bar_timestamp: DateTime<Utc>,
        playbook_name: impl Into<String>,
        direction: Direction,
        entry_price: f64,
        exit_spec: ExitSpec,
        feature_fingerprint: ConfigHash,
    ) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            id,
            run_id,
            symbol: symbol.into(),
            bar_timestamp,
            playbook_name: playbook_name.into(),
            direction,
            entry_price,
            exit_spec,
            feature_fingerprint,
            taken: false,
            position_id: None,
        }
    }

    /// Mark this candidate as taken, recording the resulting position id.
    /// Called exactly once by the runner, after the position is opened.
    pub fn mark_taken(&mut self, position_id: PositionId) {
        self.taken = true;
        self.position_id = Some(position_id);
    }
}
