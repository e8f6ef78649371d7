//! Checkpoint — periodic snapshot of runner, feature-pipeline, and
//! open-position state enabling crash-safe resume. A checkpoint is only
//! honored on restart if its config hash matches the current run's config.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trendlab_core::domain::PositionId;
use trendlab_core::features::FeaturePipeline;
use trendlab_core::schema::{SchemaVersion, CURRENT_SCHEMA_VERSION};

use crate::config::ConfigHash;
use crate::error::RunError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(default)]
    pub schema_version: SchemaVersion,
    pub config_hash: ConfigHash,
    pub bar_index: usize,
    pub bar_timestamp: DateTime<Utc>,
    pub feature_pipeline_state: serde_json::Value,
    pub open_position_ids: Vec<PositionId>,
}

impl Checkpoint {
    pub fn new(
        config_hash: ConfigHash,
        bar_index: usize,
        bar_timestamp: DateTime<Utc>,
        feature_pipeline: &FeaturePipeline,
        open_position_ids: Vec<PositionId>,
    ) -> Result<Self, RunError> {
        let feature_pipeline_state = serde_json::to_value(feature_pipeline)
            .map_err(|e| RunError::Checkpoint(format!("failed to serialize feature state: {e}")))?;
        Ok(Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            config_hash,
            bar_index,
            bar_timestamp,
            feature_pipeline_state,
            open_position_ids,
        })
    }

    /// Reconstruct the feature pipeline from the checkpointed state.
    pub fn restore_feature_pipeline(&self) -> Result<FeaturePipeline, RunError> {
        serde_json::from_value(self.feature_pipeline_state.clone())
            .map_err(|e| RunError::Checkpoint(format!("failed to restore feature state: {e}")))
    }

    pub fn save(&self, path: &Path) -> Result<(), RunError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| RunError::Checkpoint(format!("failed to serialize checkpoint: {e}")))?;
        fs::write(path, json)
            .map_err(|e| RunError::Checkpoint(format!("failed to write checkpoint to {path:?}: {e}")))
    }

    /// Load a checkpoint from `path`, honoring it only if `config_hash`
    /// matches the current run's config.
    pub fn load_if_valid(path: &Path, config_hash: &ConfigHash) -> Result<Option<Self>, RunError> {
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(path)
            .map_err(|e| RunError::Checkpoint(format!("failed to read checkpoint at {path:?}: {e}")))?;
        let checkpoint: Checkpoint = serde_json::from_str(&json)
            .map_err(|e| RunError::Checkpoint(format!("failed to parse checkpoint: {e}")))?;
        if &checkpoint.config_hash != config_hash {
            return Ok(None);
        }
        Ok(Some(checkpoint))
    }
}
