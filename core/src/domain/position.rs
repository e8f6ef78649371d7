//! Position — an open or closed holding resulting from an accepted candidate.
//!
//! Exclusively owned and mutated by the Position/Exit Engine
//! (`crate::positions`); the runner only opens positions and reads closure
//! events back out.

use super::direction::Direction;
use super::ids::{CandidateId, PositionId};
use crate::schema::{SchemaVersion, CURRENT_SCHEMA_VERSION};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reason a position was closed, in exit-priority order: a stop loss or
/// trailing stop always takes precedence over a take profit or time stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TrailingStop,
    TakeProfit,
    TimeStop,
}

/// Trailing-stop arming state machine: disabled positions never transition,
/// unarmed positions arm once price crosses `trailing_activation_price`, and
/// armed positions ratchet `current_trailing_stop` monotonically in the
/// favorable direction only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TrailingState {
    Disabled,
    Unarmed,
    Armed { current_trailing_stop: f64 },
}

/// Mutable exit bookkeeping for an open position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitState {
    /// Original stop-loss price from the candidate's ExitSpec — never moves.
    pub original_stop_loss_price: f64,
    pub take_profit_price: f64,
    pub time_stop_bars: usize,
    pub trailing: TrailingState,
    pub trailing_activation_price: f64,
    pub trailing_distance_atr: f64,
    pub atr_at_entry: f64,
    /// Highest high (long) / lowest low (short) observed since entry.
    pub extreme_since_entry: f64,
}

impl ExitState {
    pub fn current_trailing_stop(&self) -> Option<f64> {
        match self.trailing {
            TrailingState::Armed {
                current_trailing_stop,
            } => Some(current_trailing_stop),
            _ => None,
        }
    }
}

/// An open or closed position resulting from an accepted candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub schema_version: SchemaVersion,
    pub id: PositionId,
    pub candidate_id: CandidateId,
    pub symbol: String,
    pub direction: Direction,
    pub entry_bar_index: usize,
    pub entry_timestamp: DateTime<Utc>,
    /// Fill price after fees/slippage.
    pub entry_price: f64,
    pub size_units: f64,
    pub size_quote: f64,
    pub entry_fees: f64,
    pub exit_state: ExitState,
    pub is_open: bool,

    // Populated only once `is_open == false`.
    pub exit_bar_index: Option<usize>,
    pub exit_timestamp: Option<DateTime<Utc>>,
    pub exit_price: Option<f64>,
    pub exit_reason: Option<ExitReason>,
    pub exit_fees: Option<f64>,
    pub realized_pnl_quote: Option<f64>,
    pub realized_r_multiple: Option<f64>,
}

impl Position {
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        id: PositionId,
        candidate_id: CandidateId,
        symbol: impl Into<String>,
        direction: Direction,
        entry_bar_index: usize,
        entry_timestamp: DateTime<Utc>,
        entry_price: f64,
        size_units: f64,
        size_quote: f64,
        entry_fees: f64,
        exit_state: ExitState,
    ) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            id,
            candidate_id,
            symbol: symbol.into(),
            direction,
            entry_bar_index,
            entry_timestamp,
            entry_price,
            size_units,
            size_quote,
            entry_fees,
            exit_state,
            is_open: true,
            exit_bar_index: None,
            exit_timestamp: None,
            exit_price: None,
            exit_reason: None,
            exit_fees: None,
            realized_pnl_quote: None,
            realized_r_multiple: None,
        }
    }

    pub fn bars_held(&self, current_bar_index: usize) -> usize {
        current_bar_index.saturating_sub(self.entry_bar_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_exit_state() -> ExitState {
        ExitState {
            original_stop_loss_price: 95.0,
            take_profit_price: 110.0,
            time_stop_bars: 20,
            trailing: TrailingState::Unarmed,
            trailing_activation_price: 104.0,
            trailing_distance_atr: 2.0,
            atr_at_entry: 1.5,
            extreme_since_entry: 100.0,
        }
    }

    #[test]
    fn open_position_starts_open_with_no_exit_fields() {
        let p = Position::open(
            PositionId(0),
            CandidateId(0),
            "BTCUSDT",
            Direction::Long,
            10,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            100.0,
            1.0,
            100.0,
            0.1,
            sample_exit_state(),
        );
        assert!(p.is_open);
        assert!(p.exit_reason.is_none());
        assert!(p.realized_pnl_quote.is_none());
    }

    #[test]
    fn bars_held_computation() {
        let p = Position::open(
            PositionId(0),
            CandidateId(0),
            "BTCUSDT",
            Direction::Long,
            10,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            100.0,
            1.0,
            100.0,
            0.1,
            sample_exit_state(),
        );
        assert_eq!(p.bars_held(15), 5);
        assert_eq!(p.bars_held(10), 0);
    }

    #[test]
    fn trailing_state_current_stop() {
        let mut state = sample_exit_state();
        assert_eq!(state.current_trailing_stop(), None);
        state.trailing = TrailingState::Armed {
            current_trailing_stop: 101.0,
        };
        assert_eq!(state.current_trailing_stop(), Some(101.0));
    }
}
