//! TrendLab Core — domain types, feature pipeline, playbook engine, LLM
//! harness, and Position/Exit Engine for the bar-driven backtesting loop.
//!
//! This crate is the hard-engineering core: a single-threaded, event-time
//! state machine that couples incremental feature computation, deterministic
//! playbook evaluation, bounded LLM consultation, and compound position exit
//! logic. The runner loop that drives it bar-by-bar, plus the durable
//! storage layer, lives in `trendlab-runner`.

pub mod domain;
pub mod features;
pub mod fingerprint;
pub mod indicators;
pub mod llm;
pub mod playbooks;
pub mod positions;
pub mod schema;
