//! Manifest — a run-level provenance record: config snapshot, schema
//! versions, bar-count processed, final status, timestamps, and a content
//! hash over the config. Updated at start, at each checkpoint, and on
//! termination (success or failure).

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trendlab_core::domain::RunId;
use trendlab_core::schema::{SchemaVersion, CURRENT_SCHEMA_VERSION};

use crate::config::{ConfigHash, RunConfig};
use crate::error::RunError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub schema_version: SchemaVersion,
    pub run_id: RunId,
    pub config_hash: ConfigHash,
    pub config_snapshot: RunConfig,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub bars_processed: usize,
    pub status: RunStatus,
    pub error: Option<String>,
}

impl Manifest {
    pub fn start(run_id: RunId, config: &RunConfig, started_at: DateTime<Utc>) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            run_id,
            config_hash: config.content_hash(),
            config_snapshot: config.clone(),
            created_at: started_at,
            updated_at: started_at,
            bars_processed: 0,
            status: RunStatus::Running,
            error: None,
        }
    }

    pub fn record_progress(&mut self, bars_processed: usize, now: DateTime<Utc>) {
        self.bars_processed = bars_processed;
        self.updated_at = now;
    }

    pub fn finish_success(&mut self, bars_processed: usize, now: DateTime<Utc>) {
        self.bars_processed = bars_processed;
        self.status = RunStatus::Succeeded;
        self.error = None;
        self.updated_at = now;
    }

    pub fn finish_failure(&mut self, bars_processed: usize, now: DateTime<Utc>, error: String) {
        self.bars_processed = bars_processed;
        self.status = RunStatus::Failed;
        self.error = Some(error);
        self.updated_at = now;
    }

    pub fn save(&self, path: &Path) -> Result<(), RunError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| RunError::Checkpoint(format!("failed to serialize manifest: {e}")))?;
        fs::write(path, json)
            .map_err(|e| RunError::Checkpoint(format!("failed to write manifest to {path:?}: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self, RunError> {
        let json = fs::read_to_string(path)
            .map_err(|e| RunError::Checkpoint(format!("failed to read manifest at {path:?}: {e}")))?;
        serde_json::from_str(&json)
            .map_err(|e| RunError::Checkpoint(format!("failed to parse manifest: {e}")))
    }
}
