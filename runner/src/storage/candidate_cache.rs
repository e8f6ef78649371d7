//! CandidateCache — append-only record of every candidate a playbook ever
//! produced, whether taken or skipped. The `taken` and `position_id` columns
//! are the only fields ever mutated after insert, and only once, by
//! `mark_taken` when the runner accepts a candidate.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags};
use trendlab_core::domain::{Candidate, CandidateId, PositionId, RunId};

use super::{check_store_schema, StorageError};

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS candidates (
    id INTEGER PRIMARY KEY,
    run_id TEXT NOT NULL,
    symbol TEXT NOT NULL,
    bar_timestamp TEXT NOT NULL,
    taken INTEGER NOT NULL,
    position_id INTEGER,
    record_json TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_candidates_run_symbol_ts
    ON candidates(run_id, symbol, bar_timestamp);

CREATE INDEX IF NOT EXISTS idx_candidates_run_taken
    ON candidates(run_id, taken);
";

/// Optional filter for `CandidateCache::query`; unset fields are unconstrained.
#[derive(Debug, Default, Clone)]
pub struct CandidateFilter {
    pub run_id: Option<RunId>,
    pub symbol: Option<String>,
    pub taken: Option<bool>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

pub struct CandidateCache {
    conn: Connection,
}

impl CandidateCache {
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

    /// Insert a freshly produced candidate. Candidates are append-only: a
    /// second `put` for the same id overwrites the row, but the runner never
    /// calls `put` twice for one id — only `mark_taken` mutates afterward.
    pub fn put(&self, candidate: &Candidate) -> Result<(), StorageError> {
        let record_json = serde_json::to_string(candidate)?;
        self.conn.execute(
            "INSERT INTO candidates (id, run_id, symbol, bar_timestamp, taken, position_id, record_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                taken = excluded.taken,
                position_id = excluded.position_id,
                record_json = excluded.record_json",
            params![
                candidate.id.0 as i64,
                candidate.run_id.as_hex(),
                candidate.symbol,
                candidate.bar_timestamp.to_rfc3339(),
                candidate.taken,
                candidate.position_id.map(|p| p.0 as i64),
                record_json,
            ],
        )?;
        Ok(())
    }

    /// Mark a previously stored candidate as taken, recording the resulting
    /// position id. Called exactly once per candidate.
    pub fn mark_taken(&self, id: CandidateId, position_id: PositionId) -> Result<(), StorageError> {
        let mut candidate = self
            .get(id)?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        candidate.mark_taken(position_id);
        self.put(&candidate)
    }

    pub fn get(&self, id: CandidateId) -> Result<Option<Candidate>, StorageError> {
        let record_json: Option<String> = self
            .conn
            .query_row(
                "SELECT record_json FROM candidates WHERE id = ?1",
                params![id.0 as i64],
                |row| row.get(0),
            )
            .ok();
        match record_json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn query(&self, filter: &CandidateFilter) -> Result<Vec<Candidate>, StorageError> {
        let mut sql = "SELECT record_json FROM candidates WHERE 1=1".to_string();
        let mut bound: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(run_id) = &filter.run_id {
            sql.push_str(" AND run_id = ?");
            bound.push(Box::new(run_id.as_hex()));
        }
        if let Some(symbol) = &filter.symbol {
            sql.push_str(" AND symbol = ?");
            bound.push(Box::new(symbol.clone()));
        }
        if let Some(taken) = filter.taken {
            sql.push_str(" AND taken = ?");
            bound.push(Box::new(taken));
        }
        if let Some(since) = filter.since {
            sql.push_str(" AND bar_timestamp >= ?");
            bound.push(Box::new(since.to_rfc3339()));
        }
        if let Some(until) = filter.until {
            sql.push_str(" AND bar_timestamp <= ?");
            bound.push(Box::new(until.to_rfc3339()));
        }
        sql.push_str(" ORDER BY bar_timestamp, id");

        let mut stmt = self.conn.prepare(&sql)?;
        let params_ref: Vec<&dyn rusqlite::ToSql> = bound.iter().map(|b| b.as_ref()).collect();
        let rows = stmt.query_map(params_ref.as_slice(), |row| row.get::<_, String>(0))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(serde_json::from_str(&row?)?);
        }
        Ok(out)
    }

    pub fn count(&self, run_id: &RunId) -> Result<usize, StorageError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM candidates WHERE run_id = ?1",
            params![run_id.as_hex()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn count_taken(&self, run_id: &RunId) -> Result<usize, StorageError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM candidates WHERE run_id = ?1 AND taken = 1",
            params![run_id.as_hex()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use trendlab_core::domain::{ConfigHash, Direction, ExitSpec};

    fn sample_candidate(id: u64, symbol: &str, taken: bool) -> Candidate {
        let mut c = Candidate::new(
            CandidateId(id),
            RunId::from_bytes(b"run"),
            symbol,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            "breakout",
            Direction::Long,
            100.0,
            ExitSpec {
                stop_loss_price: 95.0,
                take_profit_price: 110.0,
                time_stop_bars: 20,
                trailing_enabled: true,
                trailing_activation_price: 104.0,
                trailing_distance_atr: 2.0,
            },
            ConfigHash::from_bytes(b"fp"),
        );
        if taken {
            c.mark_taken(PositionId(id));
        }
        c
    }

    #[test]
    fn put_then_get_roundtrips() {
        let cache = CandidateCache::open_in_memory().unwrap();
        let c = sample_candidate(1, "BTCUSDT", false);
        cache.put(&c).unwrap();
        let back = cache.get(CandidateId(1)).unwrap().unwrap();
        assert_eq!(back.symbol, "BTCUSDT");
        assert!(!back.taken);
    }

    #[test]
    fn mark_taken_sets_position_id_once() {
        let cache = CandidateCache::open_in_memory().unwrap();
        cache.put(&sample_candidate(1, "BTCUSDT", false)).unwrap();
        cache.mark_taken(CandidateId(1), PositionId(42)).unwrap();
        let back = cache.get(CandidateId(1)).unwrap().unwrap();
        assert!(back.taken);
        assert_eq!(back.position_id, Some(PositionId(42)));
    }

    #[test]
    fn query_filters_by_symbol_and_taken() {
        let cache = CandidateCache::open_in_memory().unwrap();
        cache.put(&sample_candidate(1, "BTCUSDT", true)).unwrap();
        cache.put(&sample_candidate(2, "ETHUSDT", false)).unwrap();
        cache.put(&sample_candidate(3, "BTCUSDT", false)).unwrap();

        let btc = cache
            .query(&CandidateFilter {
                symbol: Some("BTCUSDT".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(btc.len(), 2);

        let taken = cache
            .query(&CandidateFilter {
                taken: Some(true),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].id, CandidateId(1));
    }

    #[test]
    fn counts_match_put_and_taken() {
        let cache = CandidateCache::open_in_memory().unwrap();
        let run_id = RunId::from_bytes(b"run");
        cache.put(&sample_candidate(1, "BTCUSDT", true)).unwrap();
        cache.put(&sample_candidate(2, "BTCUSDT", false)).unwrap();
        assert_eq!(cache.count(&run_id).unwrap(), 2);
        assert_eq!(cache.count_taken(&run_id).unwrap(), 1);
    }
}
