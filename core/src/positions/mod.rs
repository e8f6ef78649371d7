//! Position/Exit Engine: opens positions from accepted candidates and
//! evaluates compound exits bar by bar with strict priority ordering.

pub mod config;
pub mod engine;

pub use config::{FeeModel, RMultipleBasis};
pub use engine::{ClosureEvent, PositionEngine};
