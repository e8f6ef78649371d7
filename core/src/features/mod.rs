//! Feature pipeline — incremental per-bar indicator computation and
//! categorical bucketing, gated by a warmup window.

pub mod config;
pub mod pipeline;
pub mod snapshot;

pub use config::FeaturePipelineConfig;
pub use pipeline::FeaturePipeline;
pub use snapshot::{FeatureSnapshot, FEATURE_SENTINEL};
