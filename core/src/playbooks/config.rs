//! Per-playbook parameter sets.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakoutConfig {
    pub donchian_period: usize,
    pub breakout_threshold_atr: f64,
    pub adx_threshold: f64,
    pub volume_ratio_threshold: f64,
    pub sl_atr: f64,
    pub tp_atr: f64,
    pub time_stop_bars: usize,
    pub trailing_activation_atr: f64,
    pub trailing_distance_atr: f64,
}

impl Default for BreakoutConfig {
    fn default() -> Self {
        Self {
            donchian_period: 20,
            breakout_threshold_atr: 0.25,
            adx_threshold: 20.0,
            volume_ratio_threshold: 1.2,
            sl_atr: 1.5,
            tp_atr: 3.0,
            time_stop_bars: 40,
            trailing_activation_atr: 1.5,
            trailing_distance_atr: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullbackConfig {
    pub adx_threshold: f64,
    pub pullback_tolerance_atr: f64,
    pub sl_atr: f64,
    pub tp_atr: f64,
    pub time_stop_bars: usize,
    pub trailing_activation_atr: f64,
    pub trailing_distance_atr: f64,
}

impl Default for PullbackConfig {
    fn default() -> Self {
        Self {
            adx_threshold: 20.0,
            pullback_tolerance_atr: 0.5,
            sl_atr: 1.5,
            tp_atr: 2.5,
            time_stop_bars: 30,
            trailing_activation_atr: 1.0,
            trailing_distance_atr: 1.5,
        }
    }
}
