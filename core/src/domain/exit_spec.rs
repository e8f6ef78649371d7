//! ExitSpec — the compound exit specification attached to every candidate.

use super::direction::Direction;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The compound exit specification attached to every candidate: a hard
/// stop and take-profit, an optional time stop, and an optional trailing
/// stop that arms once price reaches `trailing_activation_price`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExitSpec {
    pub stop_loss_price: f64,
    pub take_profit_price: f64,
    pub time_stop_bars: usize,
    pub trailing_enabled: bool,
    pub trailing_activation_price: f64,
    pub trailing_distance_atr: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum ExitSpecError {
    #[error("long exit spec requires stop_loss_price < entry_price < take_profit_price (got sl={stop_loss_price}, entry={entry_price}, tp={take_profit_price})")]
    LongOrderingViolation {
        stop_loss_price: f64,
        entry_price: f64,
        take_profit_price: f64,
    },
    #[error("short exit spec requires take_profit_price < entry_price < stop_loss_price (got tp={take_profit_price}, entry={entry_price}, sl={stop_loss_price})")]
    ShortOrderingViolation {
        stop_loss_price: f64,
        entry_price: f64,
        take_profit_price: f64,
    },
    #[error("trailing_distance_atr must be > 0 when trailing_enabled (got {0})")]
    NonPositiveTrailingDistance(f64),
}

impl ExitSpec {
    /// Validate cross-field ordering: for longs,
    /// `stop_loss_price < entry_price < take_profit_price`; for shorts,
    /// reversed; `trailing_distance_atr > 0` when trailing is enabled.
    pub fn validate(&self, direction: Direction, entry_price: f64) -> Result<(), ExitSpecError> {
        match direction {
            Direction::Long => {
                if !(self.stop_loss_price < entry_price && entry_price < self.take_profit_price) {
                    return Err(ExitSpecError::LongOrderingViolation {
                        stop_loss_price: self.stop_loss_price,
                        entry_price,
                        take_profit_price: self.take_profit_price,
                    });
                }
            }
            Direction::Short => {
                if !(self.take_profit_price < entry_price && entry_price < self.stop_loss_price) {
                    return Err(ExitSpecError::ShortOrderingViolation {
                        stop_loss_price: self.stop_loss_price,
                        entry_price,
                        take_profit_price: self.take_profit_price,
                    });
                }
            }
        }
        if self.trailing_enabled && !(self.trailing_distance_atr > 0.0) {
            return Err(ExitSpecError::NonPositiveTrailingDistance(
                self.trailing_distance_atr,
            ));
        }
        Ok(())
    }
}
