//! Versioned run configuration — market scope, fees, portfolio constraints,
//! LLM settings, enabled playbooks, and execution settings. Cross-field
//! invariants are checked by [`crate::preflight::run_preflight`], not here;
//! this module owns the schema and the content hash.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use trendlab_core::llm::LLMHarnessConfig;
use trendlab_core::playbooks::{BreakoutConfig, PullbackConfig};
use trendlab_core::positions::{FeeModel, RMultipleBasis};

use crate::error::ConfigError;

/// Deterministic content hash of a [`RunConfig`], used both for the
/// manifest's provenance field and for checkpoint validity (a checkpoint is
/// only honored if it was written under an identical config hash).
pub type ConfigHash = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketScope {
    pub venue: String,
    pub symbols: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub timeframe: String,
    pub warmup_bars: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PortfolioConfig {
    pub starting_equity: f64,
    pub max_positions: usize,
    pub max_exposure_fraction: f64,
    pub risk_per_trade: f64,
    pub size_method: SizeMethod,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SizeMethod {
    /// Size so that `stop distance * size_units == risk_per_trade * equity`.
    RiskFraction,
    /// Size to a fixed fraction of equity at entry notional.
    FixedFractionNotional,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecisionTiming {
    /// The playbook evaluates and the LLM is consulted on the bar close.
    OnClose,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FillTiming {
    /// Accepted candidates are filled at the next bar's open.
    NextOpen,
    /// Accepted candidates are filled at the deciding bar's close.
    SameClose,
}

// `FeeModel`, `BreakoutConfig`, `PullbackConfig`, and `LLMHarnessConfig` are
// defined in `trendlab-core` and don't derive `PartialEq` there, so none of
// the structs below that embed them (directly or via `PlaybookToggle`)
// derive it either — the orphan rule forbids implementing a foreign trait
// for a foreign type from this crate. Config equality in tests is checked
// via `content_hash()` or a JSON-string comparison instead.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSettings {
    pub decision_timing: DecisionTiming,
    pub fill_timing: FillTiming,
    pub fee_model: FeeModel,
    pub is_taker: bool,
    pub r_multiple_basis: RMultipleBasis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybookToggle<T> {
    pub enabled: bool,
    pub params: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybooksConfig {
    pub breakout: PlaybookToggle<BreakoutConfig>,
    pub pullback: PlaybookToggle<PullbackConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SetupQualityGate {
    /// Minimum setup quality (e.g. `"B"`) a `take` decision must meet to
    /// open a position, per spec §4.6 step 5.
    pub minimum_setup_quality: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub schema_version: u32,
    pub run_label: String,
    pub market: MarketScope,
    pub portfolio: PortfolioConfig,
    pub llm: LLMHarnessConfig,
    pub quality_gate: SetupQualityGate,
    pub playbooks: PlaybooksConfig,
    pub execution: ExecutionSettings,
    pub checkpoint_interval_bars: usize,
    pub heartbeat_interval_bars: usize,
}

pub const CURRENT_CONFIG_SCHEMA_VERSION: u32 = 1;

impl RunConfig {
    /// Deterministic content hash over the canonical JSON encoding. Used to
    /// validate checkpoint compatibility and stamped into the manifest.
    pub fn content_hash(&self) -> ConfigHash {
        let json = serde_json::to_string(self).expect("RunConfig always serializes");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Field-range and structural checks that don't require touching the
    /// filesystem or data source; cross-field/data/storage checks live in
    /// `preflight::run_preflight`.
    pub fn validate_ranges(&self) -> Result<(), ConfigError> {
        if self.market.symbols.is_empty() {
            return Err(ConfigError::InvariantViolation(
                "market.symbols must not be empty".to_string(),
            ));
        }
        if self.market.start_date >= self.market.end_date {
            return Err(ConfigError::InvariantViolation(
                "market.start_date must precede market.end_date".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.portfolio.max_exposure_fraction) {
            return Err(ConfigError::OutOfRange {
                field: "portfolio.max_exposure_fraction".to_string(),
                reason: "must be within [0, 1]".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.portfolio.risk_per_trade) {
            return Err(ConfigError::OutOfRange {
                field: "portfolio.risk_per_trade".to_string(),
                reason: "must be within [0, 1]".to_string(),
            });
        }
        if self.portfolio.max_positions == 0 {
            return Err(ConfigError::OutOfRange {
                field: "portfolio.max_positions".to_string(),
                reason: "must be >= 1".to_string(),
            });
        }
        if self.llm.max_calls_per_minute <= 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "llm.max_calls_per_minute".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        if self.checkpoint_interval_bars == 0 {
            return Err(ConfigError::OutOfRange {
                field: "checkpoint_interval_bars".to_string(),
                reason: "must be >= 1".to_string(),
            });
        }
        if !self.playbooks.breakout.enabled && !self.playbooks.pullback.enabled {
            return Err(ConfigError::InvariantViolation(
                "at least one playbook must be enabled".to_string(),
            ));
        }
        Ok(())
    }
}
