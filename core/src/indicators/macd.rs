//! MACD — fast/slow EMA difference plus a signal-line EMA of that difference.

use super::ema::Ema;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
}

#[derive(Debug, Clone, Copy)]
pub struct MacdValue {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

impl Macd {
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize) -> Self {
        Self {
            fast: Ema::new(fast_period),
            slow: Ema::new(slow_period),
            signal: Ema::new(signal_period),
        }
    }

    pub fn update(&mut self, price: f64) -> MacdValue {
        let fast = self.fast.update(price);
        let slow = self.slow.update(price);
        let macd = fast - slow;
        let signal = self.signal.update(macd);
        MacdValue {
            macd,
            signal,
            histogram: macd - signal,
        }
    }
}
