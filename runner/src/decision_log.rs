//! DecisionLog — append-only JSONL writer for `decision_events.jsonl`.
//! One record per candidate evaluation, written in the deterministic order
//! the runner reduces concurrent LLM results back into (playbook name,
//! then symbol), never completion order.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use trendlab_core::domain::DecisionEvent;

use crate::error::RunError;

pub struct DecisionLog {
    writer: BufWriter<File>,
}

impl DecisionLog {
    pub fn open(path: &Path) -> Result<Self, RunError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| RunError::Checkpoint(format!("failed to open decision log at {path:?}: {e}")))?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    pub fn append(&mut self, event: &DecisionEvent) -> Result<(), RunError> {
        let line = serde_json::to_string(event)
            .map_err(|e| RunError::Checkpoint(format!("failed to serialize decision event: {e}")))?;
        writeln!(self.writer, "{line}")
            .map_err(|e| RunError::Checkpoint(format!("failed to append decision event: {e}")))?;
        self.writer
            .flush()
            .map_err(|e| RunError::Checkpoint(format!("failed to flush decision log: {e}")))
    }
}
