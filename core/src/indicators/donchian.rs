//! Donchian Channel — highest-high / lowest-low over a rolling window.

use std::collections::VecDeque;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Donchian {
    period: usize,
    highs: VecDeque<f64>,
    lows: VecDeque<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct DonchianValue {
    pub upper: f64,
    pub lower: f64,
}

impl Donchian {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "Donchian period must be >= 1");
        Self {
            period,
            highs: VecDeque::with_capacity(period),
            lows: VecDeque::with_capacity(period),
        }
    }

    /// Feed the next bar's high/low. Returns `None` until the window fills.
    pub fn update(&mut self, high: f64, low: f64) -> Option<DonchianValue> {
        self.highs.push_back(high);
        self.lows.push_back(low);
        if self.highs.len() > self.period {
            self.highs.pop_front();
            self.lows.pop_front();
        }
        if self.highs.len() < self.period {
            return None;
        }
        Some(DonchianValue {
            upper: self.highs.iter().cloned().fold(f64::MIN, f64::max),
            lower: self.lows.iter().cloned().fold(f64::MAX, f64::min),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_none_before_window_fills() {
        let mut d = Donchian::new(3);
        assert!(d.update(105.0, 95.0).is_none());
        assert!(d.update(106.0, 96.0).is_none());
    }

    #[test]
    fn tracks_extreme_over_window() {
        let mut d = Donchian::new(3);
        d.update(105.0, 95.0);
        d.update(108.0, 90.0);
        let v = d.update(100.0, 98.0).unwrap();
        assert_eq!(v.upper, 108.0);
        assert_eq!(v.lower, 90.0);
    }

    #[test]
    fn window_evicts_oldest() {
        let mut d = Donchian::new(2);
        d.update(120.0, 50.0);
        d.update(100.0, 90.0);
        let v = d.update(95.0, 91.0).unwrap();
        // 120.0/50.0 evicted; window is now [100,95]/[90,91]
        assert_eq!(v.upper, 100.0);
        assert_eq!(v.lower, 90.0);
    }
}
