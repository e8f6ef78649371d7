//! FeaturePipeline — incremental multi-symbol feature computation.
//!
//! `on_bar` is the whole contract: feed a bar, get back `None` during
//! warmup or `Some(FeatureSnapshot)` once every required key is available.

use super::config::FeaturePipelineConfig;
use super::snapshot::{FeatureSnapshot, FEATURE_SENTINEL};
use crate::domain::Bar;
use crate::indicators::{bucket, Adx, Atr, Bollinger, Donchian, Ema, Macd, Rsi, VolumeStats};
use std::collections::{BTreeMap, HashMap};

#[derive(serde::Serialize, serde::Deserialize)]
struct SymbolState {
    bars_seen: usize,
    emas: HashMap<usize, Ema>,
    atr: Atr,
    adx: Adx,
    rsi: Rsi,
    macd: Macd,
    bollinger: Bollinger,
    donchian: Donchian,
    volume: VolumeStats,
}

impl SymbolState {
    fn new(cfg: &FeaturePipelineConfig) -> Self {
        let emas = cfg
            .ema_periods
            .iter()
            .map(|&p| (p, Ema::new(p)))
            .collect();
        Self {
            bars_seen: 0,
            emas,
            atr: Atr::new(cfg.atr_period),
            adx: Adx::new(cfg.adx_period),
            rsi: Rsi::new(cfg.rsi_period),
            macd: Macd::new(cfg.macd_fast, cfg.macd_slow, cfg.macd_signal),
            bollinger: Bollinger::new(cfg.bollinger_period, cfg.bollinger_multiplier),
            donchian: Donchian::new(cfg.donchian_period),
            volume: VolumeStats::new(cfg.volume_window),
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct FeaturePipeline {
    config: FeaturePipelineConfig,
    per_symbol: HashMap<String, SymbolState>,
}

impl FeaturePipeline {
    pub fn new(config: FeaturePipelineConfig) -> Self {
        Self {
            config,
            per_symbol: HashMap::new(),
        }
    }

    /// The declared required-key set, enforced post-warmup.
    pub fn required_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        for &p in &self.config.ema_periods {
            keys.push(format!("ema_{p}"));
        }
        keys.push(format!("atr_{}", self.config.atr_period));
        keys.push(format!("adx_{}", self.config.adx_period));
        keys.push(format!("plus_di_{}", self.config.adx_period));
        keys.push(format!("minus_di_{}", self.config.adx_period));
        keys.push(format!("rsi_{}", self.config.rsi_period));
        keys.push("macd".to_string());
        keys.push("macd_signal".to_string());
        keys.push("macd_histogram".to_string());
        keys.push("bollinger_upper".to_string());
        keys.push("bollinger_middle".to_string());
        keys.push("bollinger_lower".to_string());
        keys.push(format!("donchian_upper_{}", self.config.donchian_period));
        keys.push(format!("donchian_lower_{}", self.config.donchian_period));
        keys.push("volume_mean".to_string());
        keys.push("volume_zscore".to_string());
        keys.push("volume_ratio".to_string());
        keys
    }

    /// Feed the next bar for its symbol. Returns `None` during warmup.
    pub fn on_bar(&mut self, bar: &Bar) -> Option<FeatureSnapshot> {
        let config = &self.config;
        let state = self
            .per_symbol
            .entry(bar.symbol.clone())
            .or_insert_with(|| SymbolState::new(config));
        state.bars_seen += 1;

        let mut values = BTreeMap::new();
        let mut ready = true;
        let mut put = |key: String, v: Option<f64>, values: &mut BTreeMap<String, f64>| {
            match v {
                Some(x) if x.is_finite() => {
                    values.insert(key, x);
                }
                _ => {
                    values.insert(key, FEATURE_SENTINEL);
                    ready = false;
                }
            }
        };

        for &p in &config.ema_periods {
            let ema = state.emas.get_mut(&p).expect("ema accumulator configured per period");
            put(format!("ema_{p}"), Some(ema.update(bar.close)), &mut values);
        }

        let atr = state.atr.update(bar.high, bar.low, bar.close);
        put(format!("atr_{}", config.atr_period), Some(atr), &mut values);

        let adx = state.adx.update(bar.high, bar.low, bar.close);
        put(format!("adx_{}", config.adx_period), Some(adx.adx), &mut values);
        put(format!("plus_di_{}", config.adx_period), Some(adx.plus_di), &mut values);
        put(format!("minus_di_{}", config.adx_period), Some(adx.minus_di), &mut values);

        let rsi = state.rsi.update(bar.close);
        put(format!("rsi_{}", config.rsi_period), Some(rsi), &mut values);

        let macd = state.macd.update(bar.close);
        put("macd".to_string(), Some(macd.macd), &mut values);
        put("macd_signal".to_string(), Some(macd.signal), &mut values);
        put("macd_histogram".to_string(), Some(macd.histogram), &mut values);

        let bollinger = state.bollinger.update(bar.close);
        put("bollinger_upper".to_string(), bollinger.map(|b| b.upper), &mut values);
        put("bollinger_middle".to_string(), bollinger.map(|b| b.middle), &mut values);
        put("bollinger_lower".to_string(), bollinger.map(|b| b.lower), &mut values);

        let donchian = state.donchian.update(bar.high, bar.low);
        put(
            format!("donchian_upper_{}", config.donchian_period),
            donchian.map(|d| d.upper),
            &mut values,
        );
        put(
            format!("donchian_lower_{}", config.donchian_period),
            donchian.map(|d| d.lower),
            &mut values,
        );

        let volume = state.volume.update(bar.volume);
        put("volume_mean".to_string(), volume.map(|v| v.mean), &mut values);
        put("volume_zscore".to_string(), volume.map(|v| v.z_score), &mut values);
        put("volume_ratio".to_string(), volume.map(|v| v.ratio), &mut values);

        if state.bars_seen < config.warmup_bars {
            return None;
        }

        let mut buckets = BTreeMap::new();
        if let Some(rsi) = values.get(&format!("rsi_{}", config.rsi_period)) {
            buckets.insert("rsi".to_string(), bucket::bucket_rsi(*rsi).to_string());
        }
        if let Some(adx) = values.get(&format!("adx_{}", config.adx_period)) {
            buckets.insert("adx".to_string(), bucket::bucket_adx(*adx).to_string());
        }
        if let Some(z) = values.get("volume_zscore") {
            buckets.insert("volume_zscore".to_string(), bucket::bucket_volume_z(*z).to_string());
        }
        if let Some(hist) = values.get("macd_histogram") {
            buckets.insert(
                "macd_histogram".to_string(),
                bucket::bucket_macd_histogram(*hist).to_string(),
            );
        }
        if let (Some(upper), Some(lower)) =
            (values.get("bollinger_upper"), values.get("bollinger_lower"))
        {
            buckets.insert(
                "bollinger_position".to_string(),
                bucket::bucket_bollinger_position(bar.close, *upper, *lower).to_string(),
            );
        }

        Some(FeatureSnapshot {
            symbol: bar.symbol.clone(),
            bar_timestamp: bar.timestamp,
            values,
            buckets,
            feature_ready: ready,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(i: i64, symbol: &str, close: f64) -> Bar {
        Bar {
            symbol: symbol.to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::hours(i),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn returns_none_during_warmup() {
        let mut cfg = FeaturePipelineConfig::default();
        cfg.warmup_bars = 5;
        let mut pipeline = FeaturePipeline::new(cfg);
        for i in 0..4 {
            assert!(pipeline.on_bar(&bar(i, "BTCUSDT", 100.0 + i as f64)).is_none());
        }
    }

    #[test]
    fn emits_snapshot_with_all_required_keys_after_warmup() {
        let mut cfg = FeaturePipelineConfig::default();
        cfg.warmup_bars = 250;
        let mut pipeline = FeaturePipeline::new(cfg);
        let mut last = None;
        for i in 0..260 {
            last = pipeline.on_bar(&bar(i, "BTCUSDT", 100.0 + (i as f64 * 0.1)));
        }
        let snap = last.unwrap();
        for key in pipeline.required_keys() {
            assert!(snap.values.contains_key(&key), "missing key {key}");
        }
    }

    #[test]
    fn symbols_maintain_independent_state() {
        let mut cfg = FeaturePipelineConfig::default();
        cfg.warmup_bars = 1;
        let mut pipeline = FeaturePipeline::new(cfg);
        let a = pipeline.on_bar(&bar(0, "BTCUSDT", 100.0));
        let b = pipeline.on_bar(&bar(0, "ETHUSDT", 3000.0));
        assert_ne!(a.unwrap().get("ema_20"), b.unwrap().get("ema_20"));
    }
}
