//! DecisionEvent — append-only log record per candidate evaluation.

use super::ids::CandidateId;
use crate::llm::parser::ParsedDecision;
use crate::schema::{SchemaVersion, CURRENT_SCHEMA_VERSION};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Circuit breaker state recorded alongside a decision, so the decision log
/// can be audited without re-deriving harness internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitStateLabel {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionEvent {
    #[serde(default)]
    pub schema_version: SchemaVersion,
    pub timestamp: DateTime<Utc>,
    pub candidate_id: CandidateId,
    pub llm_raw_response: Option<String>,
    pub parsed_decision: ParsedDecision,
    pub latency_ms: u64,
    pub retries: u32,
    pub fallback_used: bool,
    pub circuit_state: CircuitStateLabel,
}
