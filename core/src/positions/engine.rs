//! Position/Exit Engine: position lifecycle, compound exit evaluation with
//! strict priority, and the monotone trailing-stop state machine.

use super::config::{FeeModel, RMultipleBasis};
use crate::domain::{
    Bar, Candidate, Direction, ExitReason, ExitState, Position, PositionId, TrailingState,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct ClosureEvent {
    pub position_id: PositionId,
    pub exit_bar_index: usize,
    pub exit_timestamp: DateTime<Utc>,
    pub exit_price: f64,
    pub exit_reason: ExitReason,
    pub exit_fees: f64,
    pub realized_pnl_quote: f64,
    pub realized_r_multiple: f64,
}

pub struct PositionEngine {
    fees: FeeModel,
    r_multiple_basis: RMultipleBasis,
    is_taker: bool,
    open_positions: HashMap<PositionId, Position>,
}

impl PositionEngine {
    pub fn new(fees: FeeModel, r_multiple_basis: RMultipleBasis, is_taker: bool) -> Self {
        Self {
            fees,
            r_multiple_basis,
            is_taker,
            open_positions: HashMap::new(),
        }
    }

    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.open_positions.values()
    }

    pub fn open_position_count(&self) -> usize {
        self.open_positions.len()
    }

    /// Reinsert a position loaded from durable storage (checkpoint resume),
    /// bypassing fee/slippage computation since it is already filled.
    pub fn restore_open(&mut self, position: Position) {
        self.open_positions.insert(position.id, position);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn open(
        &mut self,
        id: PositionId,
        candidate: &Candidate,
        raw_fill_price: f64,
        atr_at_entry: f64,
        size_units: f64,
        entry_bar_index: usize,
    ) -> Position {
        let sign = candidate.direction.sign();
        let entry_price = self.fees.slippage_adjusted_price(raw_fill_price, sign, true);
        let size_quote = entry_price * size_units;
        let entry_fees = self.fees.fee_for_notional(size_quote, self.is_taker);

        let exit_spec = &candidate.exit_spec;
        let exit_state = ExitState {
            original_stop_loss_price: exit_spec.stop_loss_price,
            take_profit_price: exit_spec.take_profit_price,
            time_stop_bars: exit_spec.time_stop_bars,
            trailing: if exit_spec.trailing_enabled {
                TrailingState::Unarmed
            } else {
                TrailingState::Disabled
            },
            trailing_activation_price: exit_spec.trailing_activation_price,
            trailing_distance_atr: exit_spec.trailing_distance_atr,
            atr_at_entry,
            extreme_since_entry: entry_price,
        };

        let position = Position::open(
            id,
            candidate.id,
            candidate.symbol.clone(),
            candidate.direction,
            entry_bar_index,
            candidate.bar_timestamp,
            entry_price,
            size_units,
            size_quote,
            entry_fees,
            exit_state,
        );
        self.open_positions.insert(id, position.clone());
        position
    }

    /// Evaluate exit conditions for every open position matching `bar`'s
    /// symbol, applying at most one exit per position per bar, in priority
    /// order: stop loss, trailing stop, take profit, time stop.
    pub fn update(&mut self, bar: &Bar, current_bar_index: usize) -> Vec<ClosureEvent> {
        let mut closures = Vec::new();
        let mut to_close = Vec::new();

        for position in self.open_positions.values_mut() {
            if position.symbol != bar.symbol {
                continue;
            }
            advance_trailing(&mut position.exit_state, position.direction, position.entry_price, bar);

            let sign = position.direction.sign();
            if let Some((reason, exit_price)) = evaluate_exit(position, bar, current_bar_index) {
                to_close.push((position.id, reason, exit_price, sign));
            }
        }

        for (id, reason, exit_price, sign) in to_close {
            if let Some(mut position) = self.open_positions.remove(&id) {
                let size_quote = exit_price * position.size_units;
                let is_forced_fill = matches!(reason, ExitReason::StopLoss | ExitReason::TrailingStop);
                let exit_fees = self.fees.fee_for_notional(size_quote, is_forced_fill || self.is_taker);

                let realized_pnl_quote = (exit_price - position.entry_price) * position.size_units * sign
                    - position.entry_fees
                    - exit_fees;
                let risk_per_unit = position.entry_price - position.exit_state.original_stop_loss_price;
                let mut r_multiple = if risk_per_unit.abs() > f64::EPSILON {
                    (exit_price - position.entry_price) / risk_per_unit
                } else {
                    0.0
                };
                if self.r_multiple_basis == RMultipleBasis::PostFee && risk_per_unit.abs() > f64::EPSILON {
                    let total_fees = position.entry_fees + exit_fees;
                    r_multiple -= total_fees / (position.size_units * risk_per_unit.abs());
                }

                position.is_open = false;
                position.exit_bar_index = Some(current_bar_index);
                position.exit_timestamp = Some(bar.timestamp);
                position.exit_price = Some(exit_price);
                position.exit_reason = Some(reason);
                position.exit_fees = Some(exit_fees);
                position.realized_pnl_quote = Some(realized_pnl_quote);
                position.realized_r_multiple = Some(r_multiple);

                closures.push(ClosureEvent {
                    position_id: id,
                    exit_bar_index: current_bar_index,
                    exit_timestamp: bar.timestamp,
                    exit_price,
                    exit_reason: reason,
                    exit_fees,
                    realized_pnl_quote,
                    realized_r_multiple: r_multiple,
                });
            }
        }

        closures
    }
}

/// Advance the trailing-stop state machine for one bar: arm if the
/// activation threshold is crossed, then ratchet the stop in the
/// favorable direction only.
fn advance_trailing(exit_state: &mut ExitState, direction: Direction, entry_price: f64, bar: &Bar) {
    match exit_state.trailing {
        TrailingState::Disabled => {}
        TrailingState::Unarmed => {
            let crossed = match direction {
                Direction::Long => bar.high >= exit_state.trailing_activation_price,
                Direction::Short => bar.low <= exit_state.trailing_activation_price,
            };
            if crossed {
                let extreme = match direction {
                    Direction::Long => bar.high,
                    Direction::Short => bar.low,
                };
                exit_state.extreme_since_entry = extreme;
                let distance = exit_state.trailing_distance_atr * exit_state.atr_at_entry;
                let raw_stop = match direction {
                    Direction::Long => (extreme - distance).max(entry_price),
                    Direction::Short => (extreme + distance).min(entry_price),
                };
                exit_state.trailing = TrailingState::Armed {
                    current_trailing_stop: raw_stop,
                };
            }
        }
        TrailingState::Armed {
            current_trailing_stop,
        } => {
            let distance = exit_state.trailing_distance_atr * exit_state.atr_at_entry;
            match direction {
                Direction::Long => {
                    exit_state.extreme_since_entry = exit_state.extreme_since_entry.max(bar.high);
                    let new_stop = exit_state.extreme_since_entry - distance;
                    let ratcheted = current_trailing_stop.max(new_stop);
                    exit_state.trailing = TrailingState::Armed {
                        current_trailing_stop: ratcheted,
                    };
                }
                Direction::Short => {
                    exit_state.extreme_since_entry = exit_state.extreme_since_entry.min(bar.low);
                    let new_stop = exit_state.extreme_since_entry + distance;
                    let ratcheted = current_trailing_stop.min(new_stop);
                    exit_state.trailing = TrailingState::Armed {
                        current_trailing_stop: ratcheted,
                    };
                }
            }
        }
    }
}

/// Effective trailing trigger price: never worse than the original stop.
fn effective_trailing_stop(exit_state: &ExitState, direction: Direction) -> Option<f64> {
    exit_state.current_trailing_stop().map(|stop| match direction {
        Direction::Long => stop.max(exit_state.original_stop_loss_price),
        Direction::Short => stop.min(exit_state.original_stop_loss_price),
    })
}

fn evaluate_exit(position: &Position, bar: &Bar, current_bar_index: usize) -> Option<(ExitReason, f64)> {
    let direction = position.direction;
    let exit_state = &position.exit_state;

    let stop_triggered = match direction {
        Direction::Long => bar.low <= exit_state.original_stop_loss_price,
        Direction::Short => bar.high >= exit_state.original_stop_loss_price,
    };
    if stop_triggered {
        return Some((ExitReason::StopLoss, exit_state.original_stop_loss_price));
    }

    if let Some(trailing_price) = effective_trailing_stop(exit_state, direction) {
        let triggered = match direction {
            Direction::Long => bar.low <= trailing_price,
            Direction::Short => bar.high >= trailing_price,
        };
        if triggered {
            return Some((ExitReason::TrailingStop, trailing_price));
        }
    }

    let tp_triggered = match direction {
        Direction::Long => bar.high >= exit_state.take_profit_price,
        Direction::Short => bar.low <= exit_state.take_profit_price,
    };
    if tp_triggered {
        return Some((ExitReason::TakeProfit, exit_state.take_profit_price));
    }

    if position.bars_held(current_bar_index) >= exit_state.time_stop_bars {
        return Some((ExitReason::TimeStop, bar.close));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CandidateId, ConfigHash, ExitSpec, RunId};
    use chrono::TimeZone;

    fn bar_at(hour: i64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            symbol: "BTCUSDT".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::hours(hour),
            open: close,
            high,
            low,
            close,
            volume: 1000.0,
        }
    }

    fn long_candidate() -> Candidate {
        Candidate::new(
            CandidateId(0),
            RunId::from_bytes(b"run"),
            "BTCUSDT",
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            "breakout",
            Direction::Long,
            100.0,
            ExitSpec {
                stop_loss_price: 95.0,
                take_profit_price: 115.0,
                time_stop_bars: 50,
                trailing_enabled: true,
                trailing_activation_price: 104.0,
                trailing_distance_atr: 2.0,
            },
            ConfigHash::from_bytes(b"fp"),
        )
    }

    #[test]
    fn stop_loss_beats_take_profit_in_same_bar() {
        let mut engine = PositionEngine::new(FeeModel::default(), RMultipleBasis::PreFee, true);
        let candidate = long_candidate();
        engine.open(PositionId(0), &candidate, 100.0, 1.5, 1.0, 0);
        // same bar: low pierces stop loss AND high pierces take profit
        let closures = engine.update(&bar_at(1, 120.0, 90.0, 100.0), 1);
        assert_eq!(closures.len(), 1);
        assert_eq!(closures[0].exit_reason, ExitReason::StopLoss);
    }

    #[test]
    fn time_stop_fires_after_bars_held_threshold() {
        let mut cand = long_candidate();
        cand.exit_spec.time_stop_bars = 2;
        cand.exit_spec.trailing_enabled = false;
        let mut engine = PositionEngine::new(FeeModel::default(), RMultipleBasis::PreFee, true);
        engine.open(PositionId(0), &cand, 100.0, 1.5, 1.0, 0);
        assert!(engine.update(&bar_at(1, 101.0, 99.0, 100.0), 1).is_empty());
        let closures = engine.update(&bar_at(2, 101.0, 99.0, 100.0), 2);
        assert_eq!(closures.len(), 1);
        assert_eq!(closures[0].exit_reason, ExitReason::TimeStop);
    }

    #[test]
    fn trailing_arms_and_ratchets_monotonically() {
        let mut engine = PositionEngine::new(FeeModel::default(), RMultipleBasis::PreFee, true);
        let candidate = long_candidate();
        engine.open(PositionId(0), &candidate, 100.0, 2.0, 1.0, 0);
        engine.update(&bar_at(1, 105.0, 103.0, 104.0), 1); // crosses activation 104, arms
        let pos = engine.open_positions().next().unwrap();
        let stop_after_arm = pos.exit_state.current_trailing_stop().unwrap();
        assert!(stop_after_arm > 95.0 && stop_after_arm < 105.0);

        engine.update(&bar_at(2, 110.0, 106.0, 108.0), 2); // new high, stop should ratchet up
        let pos2 = engine.open_positions().next().unwrap();
        let stop_after_ratchet = pos2.exit_state.current_trailing_stop().unwrap();
        assert!(stop_after_ratchet >= stop_after_arm);
    }

    #[test]
    fn restore_open_reinserts_position_without_recomputing_fees() {
        let mut engine = PositionEngine::new(FeeModel::default(), RMultipleBasis::PreFee, true);
        let candidate = long_candidate();
        let opened = engine.open(PositionId(0), &candidate, 100.0, 1.5, 1.0, 0);
        let entry_fees = opened.entry_fees;

        let mut resumed = PositionEngine::new(FeeModel::default(), RMultipleBasis::PreFee, true);
        resumed.restore_open(opened);
        assert_eq!(resumed.open_position_count(), 1);
        let restored = resumed.open_positions().next().unwrap();
        assert_eq!(restored.entry_fees, entry_fees);
    }

    #[test]
    fn realized_r_multiple_matches_formula() {
        let mut engine = PositionEngine::new(FeeModel::default(), RMultipleBasis::PreFee, true);
        let mut cand = long_candidate();
        cand.exit_spec.trailing_enabled = false;
        let opened = engine.open(PositionId(0), &cand, 100.0, 1.5, 1.0, 0);
        let entry_price = opened.entry_price;
        let risk_per_unit = entry_price - 95.0;

        // force take profit
        let closures = engine.update(&bar_at(1, 116.0, 99.0, 110.0), 1);
        assert_eq!(closures.len(), 1);
        let closure = &closures[0];
        let expected_r = (closure.exit_price - entry_price) / risk_per_unit;
        assert!((closure.realized_r_multiple - expected_r).abs() < 1e-6);
    }
}
