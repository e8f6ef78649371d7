//! Pullback playbook: requires an established trend regime, price tagging
//! the EMA20 from the trend side and reclaiming it, with trend-strength
//! confirmation.

use super::config::PullbackConfig;
use super::{CandidateDraft, Playbook};
use crate::domain::{Bar, Direction, ExitSpec};
use crate::features::FeatureSnapshot;

pub struct Pullback {
    config: PullbackConfig,
}

impl Pullback {
    pub fn new(config: PullbackConfig) -> Self {
        Self { config }
    }
}

impl Playbook for Pullback {
    fn name(&self) -> &str {
        "pullback"
    }

    fn evaluate(&self, features: &FeatureSnapshot, bar: &Bar) -> Option<CandidateDraft> {
        if !features.feature_ready {
            return None;
        }
        let ema20 = features.get("ema_20")?;
        let ema50 = features.get("ema_50")?;
        let ema200 = features.get("ema_200")?;
        let atr = features.get("atr_14")?;
        let adx = features.get("adx_14")?;

        if adx < self.config.adx_threshold {
            return None;
        }

        let tolerance = self.config.pullback_tolerance_atr * atr;

        let direction = if ema50 > ema200 && bar.low <= ema20 + tolerance && bar.close > ema20 {
            Direction::Long
        } else if ema50 < ema200 && bar.high >= ema20 - tolerance && bar.close < ema20 {
            Direction::Short
        } else {
            return None;
        };

        let entry_price = bar.close;
        let sign = direction.sign();
        let exit_spec = ExitSpec {
            stop_loss_price: entry_price - sign * self.config.sl_atr * atr,
            take_profit_price: entry_price + sign * self.config.tp_atr * atr,
            time_stop_bars: self.config.time_stop_bars,
            trailing_enabled: true,
            trailing_activation_price: entry_price + sign * self.config.trailing_activation_atr * atr,
            trailing_distance_atr: self.config.trailing_distance_atr,
        };
        if exit_spec.validate(direction, entry_price).is_err() {
            return None;
        }

        Some(CandidateDraft {
            symbol: bar.symbol.clone(),
            bar_timestamp: bar.timestamp,
            playbook_name: self.name().to_string(),
            direction,
            entry_price,
            exit_spec,
        })
    }
}
