//! Pre-flight validation — fails the run fast, before any store is opened:
//! config schema, feature requirements vs declared pipeline outputs, data
//! availability for the requested range, output directory writable,
//! storage stores openable.

use std::fs;
use std::path::Path;

use trendlab_core::features::{FeaturePipeline, FeaturePipelineConfig};

use crate::config::RunConfig;
use crate::error::PreflightError;
use crate::ohlcv::OHLCVSource;
use crate::storage::{CandidateCache, OutcomeLabels, PositionLedger};

/// Field-range/structural checks, data availability, writable output
/// directory, and storage openability, in that order. Opens and
/// immediately drops the three stores purely to prove they're openable;
/// the runner opens its own long-lived handles afterward.
pub fn run_preflight(
    config: &RunConfig,
    feature_config: &FeaturePipelineConfig,
    source: &dyn OHLCVSource,
    output_dir: &Path,
) -> Result<(), PreflightError> {
    config.validate_ranges()?;

    let pipeline = FeaturePipeline::new(feature_config.clone());
    if pipeline.required_keys().is_empty() {
        return Err(PreflightError::Config(
            crate::error::ConfigError::InvariantViolation(
                "feature pipeline declares zero required keys".to_string(),
            ),
        ));
    }

    for symbol in &config.market.symbols {
        let mut bars = source
            .iter_bars(
                symbol,
                config.market.start_date,
                config.market.end_date,
                &config.market.timeframe,
            )
            .map_err(|e| PreflightError::DataUnavailable(format!("{symbol}: {e}")))?
            .peekable();
        if bars.peek().is_none() {
            return Err(PreflightError::DataUnavailable(format!(
                "no bars available for {symbol} in [{}, {}]",
                config.market.start_date, config.market.end_date
            )));
        }
    }

    fs::create_dir_all(output_dir)
        .map_err(|_| PreflightError::OutputDirNotWritable(output_dir.display().to_string()))?;
    let probe_path = output_dir.join(".preflight_write_probe");
    fs::write(&probe_path, b"ok")
        .map_err(|_| PreflightError::OutputDirNotWritable(output_dir.display().to_string()))?;
    let _ = fs::remove_file(&probe_path);

    let candidates_path = output_dir.join("candidates.sqlite");
    CandidateCache::open(candidates_path.to_str().unwrap_or_default()).map_err(|source| {
        PreflightError::StoreUnopenable {
            store: "candidates".to_string(),
            source,
        }
    })?;
    let positions_path = output_dir.join("positions.sqlite");
    PositionLedger::open(positions_path.to_str().unwrap_or_default()).map_err(|source| {
        PreflightError::StoreUnopenable {
            store: "positions".to_string(),
            source,
        }
    })?;
    let labels_path = output_dir.join("labels.sqlite");
    OutcomeLabels::open(labels_path.to_str().unwrap_or_default()).map_err(|source| {
        PreflightError::StoreUnopenable {
            store: "labels".to_string(),
            source,
        }
    })?;

    Ok(())
}
