//! Relative Strength Index — Wilder-smoothed incremental accumulator.
//!
//! `RSI = 100 - 100 / (1 + avg_gain / avg_loss)`. `avg_loss == 0` saturates
//! to 100; `avg_gain == 0` (with nonzero avg_loss) saturates to 0.

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Rsi {
    period: usize,
    avg_gain: Option<f64>,
    avg_loss: Option<f64>,
    prev_close: Option<f64>,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            avg_gain: None,
            avg_loss: None,
            prev_close: None,
        }
    }

    /// Feed the next close price, returning the updated RSI (defaults to 50
    /// on the very first call, where there is no prior close to diff against).
    pub fn update(&mut self, close: f64) -> f64 {
        let (gain, loss) = match self.prev_close {
            None => (0.0, 0.0),
            Some(pc) => {
                let delta = close - pc;
                (delta.max(0.0), (-delta).max(0.0))
            }
        };
        self.prev_close = Some(close);

        let alpha = 1.0 / self.period as f64;
        let avg_gain = match self.avg_gain {
            None => gain,
            Some(prev) => alpha * gain + (1.0 - alpha) * prev,
        };
        let avg_loss = match self.avg_loss {
            None => loss,
            Some(prev) => alpha * loss + (1.0 - alpha) * prev,
        };
        self.avg_gain = Some(avg_gain);
        self.avg_loss = Some(avg_loss);

        if avg_loss == 0.0 && avg_gain == 0.0 {
            50.0
        } else if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
        }
    }
}
