//! Bollinger Bands — rolling mean/population-stddev over a fixed window.

use std::collections::VecDeque;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Bollinger {
    period: usize,
    multiplier: f64,
    window: VecDeque<f64>,
    sum: f64,
    sum_sq: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct BollingerValue {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl Bollinger {
    pub fn new(period: usize, multiplier: f64) -> Self {
        assert!(period >= 1, "Bollinger period must be >= 1");
        Self {
            period,
            multiplier,
            window: VecDeque::with_capacity(period),
            sum: 0.0,
            sum_sq: 0.0,
        }
    }

    /// Feed the next close price. Returns `None` until the window fills.
    pub fn update(&mut self, price: f64) -> Option<BollingerValue> {
        self.window.push_back(price);
        self.sum += price;
        self.sum_sq += price * price;
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
        Some(BollingerValue {
            upper: mean + self.multiplier * stddev,
            middle: mean,
            lower: mean - self.multiplier * stddev,
        })
    }
}
