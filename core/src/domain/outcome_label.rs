//! OutcomeLabel — computed post-exit, enabling post-hoc learning without
//! mutating the ledger.

use super::ids::{CandidateId, PositionId};
use super::position::ExitReason;
use crate::schema::{SchemaVersion, CURRENT_SCHEMA_VERSION};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeLabel {
    #[serde(default)]
    pub schema_version: SchemaVersion,
    pub candidate_id: CandidateId,
    pub position_id: PositionId,
    pub actual_r_multiple: f64,
    pub exit_reason: ExitReason,
    pub bars_held: usize,
}

impl OutcomeLabel {
    pub fn new(
        candidate_id: CandidateId,
        position_id: PositionId,
        actual_r_multiple: f64,
        exit_reason: ExitReason,
        bars_held: usize,
    ) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            candidate_id,
            position_id,
            actual_r_multiple,
            exit_reason,
            bars_held,
        }
    }
}
