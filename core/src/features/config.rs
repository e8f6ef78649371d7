//! Feature pipeline configuration — periods and windows for every
//! accumulator, plus the warmup gate.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturePipelineConfig {
    pub warmup_bars: usize,
    pub ema_periods: Vec<usize>,
    pub atr_period: usize,
    pub adx_period: usize,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_period: usize,
    pub bollinger_multiplier: f64,
    pub donchian_period: usize,
    pub volume_window: usize,
}

impl Default for FeaturePipelineConfig {
    fn default() -> Self {
        Self {
            warmup_bars: 200,
            ema_periods: vec![20, 50, 200],
            atr_period: 14,
            adx_period: 14,
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger_period: 20,
            bollinger_multiplier: 2.0,
            donchian_period: 20,
            volume_window: 96,
        }
    }
}
