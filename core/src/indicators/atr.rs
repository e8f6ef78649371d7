//! Average True Range — incremental Wilder-smoothed accumulator.
//!
//! True range: `max(high-low, |high-prev_close|, |low-prev_close|)`.
//! Wilder smoothing: `alpha = 1/period`, seeded with the first true range
//! (there is no previous close before the first bar, so the first sample
//! degenerates to `high - low`).

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Atr {
    period: usize,
    value: Option<f64>,
    prev_close: Option<f64>,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            value: None,
            prev_close: None,
        }
    }

    pub fn true_range(&self, high: f64, low: f64) -> f64 {
        match self.prev_close {
            None => high - low,
            Some(pc) => (high - low).max((high - pc).abs()).max((low - pc).abs()),
        }
    }

    /// Feed the next bar's high/low/close, returning the updated ATR.
    pub fn update(&mut self, high: f64, low: f64, close: f64) -> f64 {
        let tr = self.true_range(high, low);
        let alpha = 1.0 / self.period as f64;
        let next = match self.value {
            None => tr,
            Some(prev) => alpha * tr + (1.0 - alpha) * prev,
        };
        self.value = Some(next);
        self.prev_close = Some(close);
        next
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }
}
