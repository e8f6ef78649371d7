//! Exponential Moving Average — incremental accumulator.
//!
//! Recursive: `ema[t] = alpha * price[t] + (1 - alpha) * ema[t-1]`.
//! Seeded with the first price observed (no separate SMA warmup window,
//! so the accumulator is ready from the very first `update` call).

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Ema {
    alpha: f64,
    value: Option<f64>,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            alpha: 2.0 / (period as f64 + 1.0),
            value: None,
        }
    }

    /// Feed the next price, returning the updated EMA value.
    pub fn update(&mut self, price: f64) -> f64 {
        let next = match self.value {
            None => price,
            Some(prev) => self.alpha * price + (1.0 - self.alpha) * prev,
        };
        self.value = Some(next);
        next
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_with_first_price() {
        let mut ema = Ema::new(10);
        assert_eq!(ema.update(100.0), 100.0);
    }

    #[test]
    fn converges_toward_constant_input() {
        let mut ema = Ema::new(5);
        ema.update(100.0);
        for _ in 0..50 {
            ema.update(110.0);
        }
        assert!((ema.value().unwrap() - 110.0).abs() < 1e-6);
    }

    #[test]
    fn matches_hand_computed_second_step() {
        let mut ema = Ema::new(4); // alpha = 0.4
        ema.update(10.0);
        let second = ema.update(12.0);
        assert!((second - (0.4 * 12.0 + 0.6 * 10.0)).abs() < 1e-12);
    }
}
