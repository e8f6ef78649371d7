//! The three durable stores: candidate cache, position ledger, outcome
//! labels. Each wraps a single `rusqlite::Connection` — one writer per store
//! for the duration of a run, per spec §4.5; concurrent readers are fine
//! since rusqlite connections serialize through SQLite's own file locking.

pub mod candidate_cache;
pub mod outcome_labels;
pub mod position_ledger;

pub use candidate_cache::CandidateCache;
pub use outcome_labels::OutcomeLabels;
pub use position_ledger::PositionLedger;

use thiserror::Error;
use trendlab_core::schema::SchemaVersion;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to open store at {path}: {source}")]
    Open {
        path: String,
        source: rusqlite::Error,
    },
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to (de)serialize record: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("no record found for id {0}")]
    NotFound(String),
    #[error("position {0} is already closed")]
    AlreadyClosed(String),
    #[error("store schema version {found} is incompatible with this build (expects major {expected_major})")]
    SchemaMismatch {
        found: SchemaVersion,
        expected_major: u32,
    },
}

/// Read the `schema_major`/`schema_minor` row from a store's `schema_meta`
/// table (written once at creation) and reject the store if the major
/// version differs from this build's.
pub(crate) fn check_store_schema(conn: &rusqlite::Connection) -> Result<(), StorageError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_meta (
            id INTEGER PRIMARY KEY CHECK (id = 0),
            schema_major INTEGER NOT NULL,
            schema_minor INTEGER NOT NULL
        )",
        [],
    )?;

    let existing: Option<(u32, u32)> = conn
        .query_row(
            "SELECT schema_major, schema_minor FROM schema_meta WHERE id = 0",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .ok();

    let current = trendlab_core::schema::CURRENT_SCHEMA_VERSION;
    match existing {
        Some((major, minor)) => {
            let found = SchemaVersion { major, minor };
            if !current.is_compatible_with(found) {
                return Err(StorageError::SchemaMismatch {
                    found,
                    expected_major: current.major,
                });
            }
        }
        None => {
            conn.execute(
                "INSERT INTO schema_meta (id, schema_major, schema_minor) VALUES (0, ?1, ?2)",
                rusqlite::params![current.major, current.minor],
            )?;
        }
    }
    Ok(())
}
