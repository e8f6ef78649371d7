//! RunResult — the summary aggregate returned by a completed (or
//! cleanly-cancelled) run. All performance analytics recompute from the
//! ledger; this struct carries only run-shape bookkeeping, not derived
//! PnL metrics.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunResult {
    pub bars_processed: usize,
    pub candidates_generated: usize,
    pub positions_opened: usize,
    pub positions_closed: usize,
    pub warmup_bars: usize,
    pub data_quality_warnings: Vec<String>,
}

impl RunResult {
    pub fn new(warmup_bars: usize) -> Self {
        Self {
            warmup_bars,
            ..Default::default()
        }
    }
}
