//! Fees, slippage, and fee-to-R-multiple configuration for the
//! Position/Exit Engine.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeeModel {
    pub maker_bps: f64,
    pub taker_bps: f64,
    pub slippage_bps: f64,
}

impl Default for FeeModel {
    fn default() -> Self {
        Self {
            maker_bps: 2.0,
            taker_bps: 5.0,
            slippage_bps: 2.0,
        }
    }
}

impl FeeModel {
    pub fn fee_for_notional(&self, notional: f64, is_taker: bool) -> f64 {
        let bps = if is_taker { self.taker_bps } else { self.maker_bps };
        notional * bps / 10_000.0
    }

    /// Slippage-adjusted fill price: worse by `slippage_bps/2` of price,
    /// in the direction unfavorable to the trade.
    pub fn slippage_adjusted_price(&self, price: f64, direction_sign: f64, is_entry: bool) -> f64 {
        let half_bps = self.slippage_bps / 2.0 / 10_000.0;
        let unfavorable_sign = if is_entry { direction_sign } else { -direction_sign };
        price + unfavorable_sign * half_bps * price
    }
}

/// Whether R-multiple is computed pre-fee or post-fee.
///
/// Decided pre-fee by default: the risk unit is defined by the stop
/// distance, independent of execution costs, but the implementation makes
/// this explicit and configurable rather than hard-coding the assumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RMultipleBasis {
    PreFee,
    PostFee,
}

impl Default for RMultipleBasis {
    fn default() -> Self {
        RMultipleBasis::PreFee
    }
}
