//! OutcomeLabels — populated after a position closes, keyed by candidate
//! id. Skipped candidates are never labeled by the core loop; counterfactual
//! labeling is a post-processing concern (open question, §9 of the design).

use rusqlite::{params, Connection, OpenFlags};
use trendlab_core::domain::{CandidateId, OutcomeLabel, RunId};

use super::{check_store_schema, StorageError};

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS outcome_labels (
    candidate_id INTEGER PRIMARY KEY,
    run_id TEXT NOT NULL,
    record_json TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_outcome_labels_run
    ON outcome_labels(run_id);
";

pub struct OutcomeLabels {
    conn: Connection,
}

impl OutcomeLabels {
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

    pub fn put_label(&self, run_id: &RunId, label: &OutcomeLabel) -> Result<(), StorageError> {
        let record_json = serde_json::to_string(label)?;
        self.conn.execute(
            "INSERT INTO outcome_labels (candidate_id, run_id, record_json)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(candidate_id) DO UPDATE SET record_json = excluded.record_json",
            params![label.candidate_id.0 as i64, run_id.as_hex(), record_json],
        )?;
        Ok(())
    }

    pub fn get_label(&self, candidate_id: CandidateId) -> Result<Option<OutcomeLabel>, StorageError> {
        let record_json: Option<String> = self
            .conn
            .query_row(
                "SELECT record_json FROM outcome_labels WHERE candidate_id = ?1",
                params![candidate_id.0 as i64],
                |row| row.get(0),
            )
            .ok();
        match record_json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// All labels recorded for a run, in candidate-id order.
    pub fn bulk_label(&self, run_id: &RunId) -> Result<Vec<OutcomeLabel>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT record_json FROM outcome_labels WHERE run_id = ?1 ORDER BY candidate_id",
        )?;
        let rows = stmt.query_map(params![run_id.as_hex()], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(serde_json::from_str(&row?)?);
        }
        Ok(out)
    }
}
