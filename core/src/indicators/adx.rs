//! ADX / +DI / -DI — incremental Wilder-smoothed directional movement.
//!
//! Per bar: `+DM = max(high-prev_high, 0)` unless `-DM` is larger, in which
//! case `+DM = 0` (and symmetrically for `-DM`). `+DM`, `-DM`, and true range
//! are each Wilder-smoothed (`alpha = 1/period`); `+DI = 100 * smoothed(+DM)
//! / smoothed(TR)`, `-DI` likewise; `DX = 100 * |+DI - -DI| / (+DI + -DI)`;
//! `ADX` is the Wilder smoothing of `DX`.

use super::atr::Atr;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Adx {
    period: usize,
    atr: Atr,
    smoothed_plus_dm: Option<f64>,
    smoothed_minus_dm: Option<f64>,
    adx: Option<f64>,
    prev_high: Option<f64>,
    prev_low: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct AdxValue {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ADX period must be >= 1");
        Self {
            period,
            atr: Atr::new(period),
            smoothed_plus_dm: None,
            smoothed_minus_dm: None,
            adx: None,
            prev_high: None,
            prev_low: None,
        }
    }

    pub fn update(&mut self, high: f64, low: f64, close: f64) -> AdxValue {
        let tr = self.atr.update(high, low, close);
        let (plus_dm, minus_dm) = match (self.prev_high, self.prev_low) {
            (Some(ph), Some(pl)) => {
                let up_move = high - ph;
                let down_move = pl - low;
                let plus_dm = if up_move > down_move && up_move > 0.0 {
                    up_move
                } else {
                    0.0
                };
                let minus_dm = if down_move > up_move && down_move > 0.0 {
                    down_move
                } else {
                    0.0
                };
                (plus_dm, minus_dm)
            }
            _ => (0.0, 0.0),
        };
        self.prev_high = Some(high);
        self.prev_low = Some(low);

        let alpha = 1.0 / self.period as f64;
        let smoothed_plus = match self.smoothed_plus_dm {
            None => plus_dm,
            Some(prev) => alpha * plus_dm + (1.0 - alpha) * prev,
        };
        let smoothed_minus = match self.smoothed_minus_dm {
            None => minus_dm,
            Some(prev) => alpha * minus_dm + (1.0 - alpha) * prev,
        };
        self.smoothed_plus_dm = Some(smoothed_plus);
        self.smoothed_minus_dm = Some(smoothed_minus);

        let plus_di = if tr > 0.0 {
            100.0 * smoothed_plus / tr
        } else {
            0.0
        };
        let minus_di = if tr > 0.0 {
            100.0 * smoothed_minus / tr
        } else {
            0.0
        };
        let di_sum = plus_di + minus_di;
        let dx = if di_sum > 0.0 {
            100.0 * (plus_di - minus_di).abs() / di_sum
        } else {
            0.0
        };
        let adx = match self.adx {
            None => dx,
            Some(prev) => alpha * dx + (1.0 - alpha) * prev,
        };
        self.adx = Some(adx);

        AdxValue {
            adx,
            plus_di,
            minus_di,
        }
    }
}
