//! Breakout playbook: fires when price clears a Donchian extreme by a
//! volatility-scaled margin, with trend and volume confirmation.

use super::config::BreakoutConfig;
use super::{CandidateDraft, Playbook};
use crate::domain::{Bar, Direction, ExitSpec};
use crate::features::FeatureSnapshot;

pub struct Breakout {
    config: BreakoutConfig,
}

impl Breakout {
    pub fn new(config: BreakoutConfig) -> Self {
        Self { config }
    }

    fn trend_aligned(&self, features: &FeatureSnapshot, direction: Direction) -> bool {
        let (ema20, ema50, ema200) = match (
            features.get("ema_20"),
            features.get("ema_50"),
            features.get("ema_200"),
        ) {
            (Some(a), Some(b), Some(c)) => (a, b, c),
            _ => return false,
        };
        match direction {
            Direction::Long => ema20 > ema50 && ema50 > ema200,
            Direction::Short => ema20 < ema50 && ema50 < ema200,
        }
    }
}

impl Playbook for Breakout {
    fn name(&self) -> &str {
        "breakout"
    }

    fn evaluate(&self, features: &FeatureSnapshot, bar: &Bar) -> Option<CandidateDraft> {
        if !features.feature_ready {
            return None;
        }
        let donchian_key_upper = format!("donchian_upper_{}", self.config.donchian_period);
        let donchian_key_lower = format!("donchian_lower_{}", self.config.donchian_period);
        let atr = features.get("atr_14")?;
        let adx = features.get("adx_14")?;
        let volume_ratio = features.get("volume_ratio")?;
        let upper = features.get(&donchian_key_upper)?;
        let lower = features.get(&donchian_key_lower)?;

        if adx < self.config.adx_threshold || volume_ratio < self.config.volume_ratio_threshold {
            return None;
        }

        let margin = self.config.breakout_threshold_atr * atr;

        let direction = if bar.close > upper + margin {
            Direction::Long
        } else if bar.close < lower - margin {
            Direction::Short
        } else {
            return None;
        };

        if !self.trend_aligned(features, direction) {
            return None;
        }

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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn bar(close: f64) -> Bar {
        Bar {
            symbol: "BTCUSDT".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
        }
    }

    fn features(overrides: &[(&str, f64)]) -> FeatureSnapshot {
        let mut values = BTreeMap::new();
        values.insert("ema_20".to_string(), 110.0);
        values.insert("ema_50".to_string(), 105.0);
        values.insert("ema_200".to_string(), 100.0);
        values.insert("atr_14".to_string(), 2.0);
        values.insert("adx_14".to_string(), 30.0);
        values.insert("volume_ratio".to_string(), 1.5);
        values.insert("donchian_upper_20".to_string(), 110.0);
        values.insert("donchian_lower_20".to_string(), 90.0);
        for (k, v) in overrides {
            values.insert(k.to_string(), *v);
        }
        FeatureSnapshot {
            symbol: "BTCUSDT".to_string(),
            bar_timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            values,
            buckets: BTreeMap::new(),
            feature_ready: true,
        }
    }

    #[test]
    fn fires_long_on_clean_breakout() {
        let playbook = Breakout::new(BreakoutConfig::default());
        let feats = features(&[]);
        let candidate = playbook.evaluate(&feats, &bar(112.0)).unwrap();
        assert_eq!(candidate.direction, Direction::Long);
    }

    #[test]
    fn rejects_when_adx_too_low() {
        let playbook = Breakout::new(BreakoutConfig::default());
        let feats = features(&[("adx_14", 5.0)]);
        assert!(playbook.evaluate(&feats, &bar(112.0)).is_none());
    }

    #[test]
    fn rejects_when_trend_not_aligned() {
        let playbook = Breakout::new(BreakoutConfig::default());
        let feats = features(&[("ema_50", 115.0)]); // ema20 < ema50 breaks long alignment
        assert!(playbook.evaluate(&feats, &bar(112.0)).is_none());
    }

    #[test]
    fn no_fire_inside_channel() {
        let playbook = Breakout::new(BreakoutConfig::default());
        let feats = features(&[]);
        assert!(playbook.evaluate(&feats, &bar(100.0)).is_none());
    }
}
