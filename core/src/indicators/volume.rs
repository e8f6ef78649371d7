//! Rolling volume statistics — mean and z-score over a fixed window
//! (96 bars by default, per the feature pipeline's declared window).

use std::collections::VecDeque;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct VolumeStats {
    period: usize,
    window: VecDeque<f64>,
    sum: f64,
    sum_sq: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct VolumeValue {
    pub mean: f64,
    pub z_score: f64,
    pub ratio: f64,
}

impl VolumeStats {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "volume window must be >= 1");
        Self {
            period,
            window: VecDeque::with_capacity(period),
            sum: 0.0,
            sum_sq: 0.0,
        }
    }

    pub fn default_window() -> Self {
        Self::new(96)
    }

    /// Feed the next bar's volume. Returns `None` until the window fills.
    pub fn update(&mut self, volume: f64) -> Option<VolumeValue> {
        self.window.push_back(volume);
        self.sum += volume;
        self.sum_sq += volume * volume;
        if self.window.len() > self.period {
            if let Some(evicted) = self.window.pop_front() {
                self.sum -= evicted;
                self.sum_sq -= evicted * evicted;
            }
        }
        if self.window.len() < self.period {
            return None;
        }
        let n = self.period as f64;
        let mean = self.sum / n;
        let variance = (self.sum_sq / n - mean * mean).max(0.0);
        let stddev = variance.sqrt();
        let z_score = if stddev > 0.0 {
            (volume - mean) / stddev
        } else {
            0.0
        };
        let ratio = if mean > 0.0 { volume / mean } else { 0.0 };
        Some(VolumeValue {
            mean,
            z_score,
            ratio,
        })
    }
}
