//! # TrendLab Runner
//!
//! Bar-driven orchestration: the per-bar loop that coordinates the feature
//! pipeline, playbook engine, LLM harness, and position/exit engine from
//! `trendlab-core`, plus everything around it that makes a run durable and
//! resumable.
//!
//! ## Components
//!
//! - `RunConfig`: versioned, content-hashed run configuration
//! - `Runner`: drives the bar loop, checkpoints, and finalizes the manifest
//! - `Manifest`: run-level provenance record (status, timestamps, content hash)
//! - `Checkpoint`: periodic snapshot enabling crash-safe resume
//! - `storage`: the three durable stores — candidate cache, position ledger,
//!   outcome labels
//! - `OHLCVSource`: the trait boundary to historical bar data, plus an
//!   in-memory mock for tests
//! - `preflight`: fail-fast validation before any store is opened

pub mod checkpoint;
pub mod config;
pub mod decision_log;
pub mod error;
pub mod manifest;
pub mod ohlcv;
pub mod preflight;
pub mod result;
pub mod runner;
pub mod storage;

pub use checkpoint::Checkpoint;
pub use config::RunConfig;
pub use decision_log::DecisionLog;
pub use error::RunError;
pub use manifest::{Manifest, RunStatus};
pub use ohlcv::{InMemoryOHLCVSource, OHLCVSource};
pub use result::RunResult;
pub use runner::Runner;
