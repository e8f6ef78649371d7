//! PositionLedger — the sole source of truth for PnL. No component may
//! compute cumulative equity from any other source; every open/update/close
//! goes through this store.

use rusqlite::{params, Connection, OpenFlags};
use trendlab_core::domain::{ExitState, Position, PositionId, RunId};
use trendlab_core::positions::ClosureEvent;

use super::{check_store_schema, StorageError};

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS positions (
    id INTEGER PRIMARY KEY,
    run_id TEXT NOT NULL,
    symbol TEXT NOT NULL,
    is_open INTEGER NOT NULL,
    open_timestamp TEXT NOT NULL,
    record_json TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_positions_run_symbol_open_ts
    ON positions(run_id, symbol, is_open, open_timestamp);
";

pub struct PositionLedger {
    conn: Connection,
}

impl PositionLedger {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| StorageError::Open {
            path: path.to_string(),
            source,
        })?;
        conn.execute_batch(SCHEMA_SQL)?;
        check_store_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        check_store_schema(&conn)?;
        Ok(Self { conn })
    }

    fn upsert(&self, run_id_hex: &str, position: &Position) -> Result<(), StorageError> {
        let record_json = serde_json::to_string(position)?;
        self.conn.execute(
            "INSERT INTO positions (id, run_id, symbol, is_open, open_timestamp, record_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                is_open = excluded.is_open,
                record_json = excluded.record_json",
            params![
                position.id.0 as i64,
                run_id_hex,
                position.symbol,
                position.is_open,
                position.entry_timestamp.to_rfc3339(),
                record_json,
            ],
        )?;
        Ok(())
    }

    /// Record a newly opened position.
    pub fn open_position(&self, run_id: &RunId, position: &Position) -> Result<(), StorageError> {
        self.upsert(&run_id.as_hex(), position)
    }

    fn load(&self, id: PositionId) -> Result<Position, StorageError> {
        let record_json: String = self
            .conn
            .query_row(
                "SELECT record_json FROM positions WHERE id = ?1",
                params![id.0 as i64],
                |row| row.get(0),
            )
            .map_err(|_| StorageError::NotFound(id.to_string()))?;
        Ok(serde_json::from_str(&record_json)?)
    }

    fn run_id_hex_for(&self, id: PositionId) -> Result<String, StorageError> {
        Ok(self.conn.query_row(
            "SELECT run_id FROM positions WHERE id = ?1",
            params![id.0 as i64],
            |row| row.get(0),
        )?)
    }

    /// Apply an updated exit-state snapshot (e.g. a trailing-stop ratchet)
    /// to an open position. Errors if the position is already closed.
    pub fn update_position(&self, id: PositionId, exit_state: ExitState) -> Result<(), StorageError> {
        let mut position = self.load(id)?;
        if !position.is_open {
            return Err(StorageError::AlreadyClosed(id.to_string()));
        }
        position.exit_state = exit_state;
        let run_id_hex = self.run_id_hex_for(id)?;
        self.upsert(&run_id_hex, &position)
    }

    /// Close an open position with the engine's closure event. Idempotent:
    /// closing an already-closed position is an error.
    pub fn close_position(&self, closure: &ClosureEvent) -> Result<(), StorageError> {
        let mut position = self.load(closure.position_id)?;
        if !position.is_open {
            return Err(StorageError::AlreadyClosed(closure.position_id.to_string()));
        }
        position.is_open = false;
        position.exit_bar_index = Some(closure.exit_bar_index);
        position.exit_timestamp = Some(closure.exit_timestamp);
        position.exit_price = Some(closure.exit_price);
        position.exit_reason = Some(closure.exit_reason);
        position.exit_fees = Some(closure.exit_fees);
        position.realized_pnl_quote = Some(closure.realized_pnl_quote);
        position.realized_r_multiple = Some(closure.realized_r_multiple);

        let run_id_hex = self.run_id_hex_for(closure.position_id)?;
        self.upsert(&run_id_hex, &position)
    }

    pub fn get(&self, id: PositionId) -> Result<Option<Position>, StorageError> {
        match self.load(id) {
            Ok(p) => Ok(Some(p)),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn get_open_positions(&self, run_id: &RunId) -> Result<Vec<Position>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT record_json FROM positions WHERE run_id = ?1 AND is_open = 1 ORDER BY open_timestamp, id",
        )?;
        let rows = stmt.query_map(params![run_id.as_hex()], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(serde_json::from_str(&row?)?);
        }
        Ok(out)
    }

    pub fn get_all(&self, run_id: &RunId) -> Result<Vec<Position>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT record_json FROM positions WHERE run_id = ?1 ORDER BY open_timestamp, id")?;
        let rows = stmt.query_map(params![run_id.as_hex()], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(serde_json::from_str(&row?)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use trendlab_core::domain::{CandidateId, Direction, ExitReason, TrailingState};

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

    fn sample_position(id: u64) -> Position {
        Position::open(
            PositionId(id),
            CandidateId(id),
            "BTCUSDT",
            Direction::Long,
            10,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            100.0,
            1.0,
            100.0,
            0.1,
            sample_exit_state(),
        )
    }

    #[test]
    fn open_then_get_open_positions() {
        let ledger = PositionLedger::open_in_memory().unwrap();
        let run_id = RunId::from_bytes(b"run");
        ledger.open_position(&run_id, &sample_position(1)).unwrap();
        let open = ledger.get_open_positions(&run_id).unwrap();
        assert_eq!(open.len(), 1);
        assert!(open[0].is_open);
    }

    #[test]
    fn update_position_ratchets_exit_state_while_open() {
        let ledger = PositionLedger::open_in_memory().unwrap();
        let run_id = RunId::from_bytes(b"run");
        ledger.open_position(&run_id, &sample_position(1)).unwrap();

        let mut new_state = sample_exit_state();
        new_state.trailing = TrailingState::Armed {
            current_trailing_stop: 101.5,
        };
        ledger.update_position(PositionId(1), new_state).unwrap();

        let p = ledger.get(PositionId(1)).unwrap().unwrap();
        assert_eq!(p.exit_state.current_trailing_stop(), Some(101.5));
    }

    #[test]
    fn close_position_is_idempotent_and_errors_on_second_close() {
        let ledger = PositionLedger::open_in_memory().unwrap();
        let run_id = RunId::from_bytes(b"run");
        ledger.open_position(&run_id, &sample_position(1)).unwrap();

        let closure = ClosureEvent {
            position_id: PositionId(1),
            exit_bar_index: 20,
            exit_timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 5, 0, 0).unwrap(),
            exit_price: 110.0,
            exit_reason: ExitReason::TakeProfit,
            exit_fees: 0.2,
            realized_pnl_quote: 10.0,
            realized_r_multiple: 2.0,
        };
        ledger.close_position(&closure).unwrap();

        let p = ledger.get(PositionId(1)).unwrap().unwrap();
        assert!(!p.is_open);
        assert_eq!(p.exit_reason, Some(ExitReason::TakeProfit));

        let err = ledger.close_position(&closure).unwrap_err();
        assert!(matches!(err, StorageError::AlreadyClosed(_)));
    }

    #[test]
    fn get_all_includes_both_open_and_closed() {
        let ledger = PositionLedger::open_in_memory().unwrap();
        let run_id = RunId::from_bytes(b"run");
        ledger.open_position(&run_id, &sample_position(1)).unwrap();
        ledger.open_position(&run_id, &sample_position(2)).unwrap();
        ledger
            .close_position(&ClosureEvent {
                position_id: PositionId(1),
                exit_bar_index: 20,
                exit_timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 5, 0, 0).unwrap(),
                exit_price: 110.0,
                exit_reason: ExitReason::TakeProfit,
                exit_fees: 0.2,
                realized_pnl_quote: 10.0,
                realized_r_multiple: 2.0,
            })
            .unwrap();

        assert_eq!(ledger.get_all(&run_id).unwrap().len(), 2);
        assert_eq!(ledger.get_open_positions(&run_id).unwrap().len(), 1);
    }
}
