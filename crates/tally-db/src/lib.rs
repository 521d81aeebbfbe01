//! SQLite backend for the tally engine.
//!
//! [`Database`] implements [`tally_core::Persistence`]. The engine hands it
//! the whole record list whenever records change, and `save_records`
//! rewrites the `records` table inside one transaction; there are no
//! per-row inserts or deletes. `list_records` reads rows back newest first
//! (`ORDER BY id DESC`), the order the record store keeps in memory.
//!
//! Start and end times are RFC 3339 strings in UTC cut to milliseconds,
//! such as `2025-01-29T09:00:00.000Z`. Rows whose stored duration
//! disagrees with their span fail to load.
//!
//! The timer phase lives in `tracker_state`, a table pinned to the single
//! row `id = 1` that holds the state as JSON. A snapshot that no longer
//! parses is logged and treated as missing, so the engine starts idle.
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tally_core::{
    ActivityName, Persistence, PersistenceError, RecordId, TimeRecord, TrackerState,
    ValidationError,
};
use thiserror::Error;
use tracing::{debug, warn};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a record timestamp.
    #[error("invalid timestamp for record {record_id}: {timestamp}")]
    TimestampParse {
        record_id: i64,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored row does not form a valid record.
    #[error("invalid record {record_id}: {source}")]
    InvalidRecord {
        record_id: i64,
        #[source]
        source: ValidationError,
    },
    /// The tracker state snapshot could not be (de)serialized.
    #[error("invalid tracker state: {0}")]
    StateJson(#[from] serde_json::Error),
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A stored record row before validation.
struct RecordRow {
    id: i64,
    activity: String,
    start_time: String,
    end_time: String,
    duration_ms: i64,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        debug!(path = %path.display(), "database opened");
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- Records table: finalized time records
            -- start_time/end_time: RFC 3339 with milliseconds
            -- duration_ms: always end_time - start_time
            CREATE TABLE IF NOT EXISTS records (
                id INTEGER PRIMARY KEY,
                activity TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                duration_ms INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_records_start ON records(start_time);

            CREATE TABLE IF NOT EXISTS tracker_state (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                state_json TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Lists all records, newest first.
    pub fn list_records(&self) -> Result<Vec<TimeRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, activity, start_time, end_time, duration_ms
            FROM records
            ORDER BY id DESC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(RecordRow {
                id: row.get(0)?,
                activity: row.get(1)?,
                start_time: row.get(2)?,
                end_time: row.get(3)?,
                duration_ms: row.get(4)?,
            })
        })?;
        let mut records = Vec::new();
        for row in rows {
            records.push(record_from_row(row?)?);
        }
        Ok(records)
    }

    /// Replaces every stored record with `records` in one transaction.
    pub fn replace_records(&mut self, records: &[TimeRecord]) -> Result<usize, DbError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM records", [])?;
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO records (id, activity, start_time, end_time, duration_ms)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ",
            )?;
            for record in records {
                stmt.execute(params![
                    record.id().get(),
                    record.activity().as_str(),
                    format_timestamp(record.start_time()),
                    format_timestamp(record.end_time()),
                    record.duration_ms(),
                ])?;
            }
        }
        tx.commit()?;
        debug!(count = records.len(), "records saved");
        Ok(records.len())
    }

    /// Loads the tracker state snapshot, if one was saved.
    pub fn load_state(&self) -> Result<Option<TrackerState>, DbError> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT state_json FROM tracker_state WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        json.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(DbError::from)
    }

    /// Overwrites the tracker state snapshot.
    pub fn save_state(&mut self, state: &TrackerState) -> Result<(), DbError> {
        let json = serde_json::to_string(state)?;
        self.conn.execute(
            "
            INSERT INTO tracker_state (id, state_json) VALUES (1, ?1)
            ON CONFLICT(id) DO UPDATE SET state_json = excluded.state_json
            ",
            [json],
        )?;
        Ok(())
    }
}

impl Persistence for Database {
    fn load_records(&self) -> Result<Vec<TimeRecord>, PersistenceError> {
        self.list_records()
            .map_err(|e| PersistenceError::new("load records", e))
    }

    fn save_records(&mut self, records: &[TimeRecord]) -> Result<(), PersistenceError> {
        self.replace_records(records)
            .map(|_| ())
            .map_err(|e| PersistenceError::new("save records", e))
    }

    fn load_tracker_state(&self) -> Result<Option<TrackerState>, PersistenceError> {
        match self.load_state() {
            Ok(state) => Ok(state),
            // Start idle; the next save overwrites the bad row.
            Err(DbError::StateJson(e)) => {
                warn!(error = %e, "discarding unreadable tracker state");
                Ok(None)
            }
            Err(e) => Err(PersistenceError::new("load tracker state", e)),
        }
    }

    fn save_tracker_state(&mut self, state: &TrackerState) -> Result<(), PersistenceError> {
        self.save_state(state)
            .map_err(|e| PersistenceError::new("save tracker state", e))
    }
}

fn record_from_row(row: RecordRow) -> Result<TimeRecord, DbError> {
    let record_id = row.id;
    let invalid = move |source| DbError::InvalidRecord { record_id, source };
    let activity = ActivityName::new(row.activity.as_str()).map_err(invalid)?;
    let start = parse_timestamp(&row.start_time, row.id)?;
    let end = parse_timestamp(&row.end_time, row.id)?;
    TimeRecord::restore(RecordId::new(row.id), activity, start, end, row.duration_ms)
        .map_err(invalid)
}

fn parse_timestamp(timestamp: &str, record_id: i64) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            record_id,
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use chrono::{Duration, TimeZone};
    use tally_core::{EngineConfig, PersistOnChange, Phase, TimeAccountingEngine};

    /// 2025-01-29T09:00:00Z
    fn at_ms(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_738_141_200, 0).unwrap() + Duration::milliseconds(ms)
    }

    fn record(id: i64, activity: &str, start_ms: i64, end_ms: i64) -> TimeRecord {
        TimeRecord::new(
            RecordId::new(id),
            ActivityName::new(activity).unwrap(),
            at_ms(start_ms),
            at_ms(end_ms),
        )
        .unwrap()
    }

    #[test]
    fn open_in_memory_database() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn schema_matches_data_model() {
        let db = Database::open_in_memory().expect("open in-memory db");

        let records_columns = table_columns(&db.conn, "records");
        assert_eq!(
            records_columns,
            vec!["id", "activity", "start_time", "end_time", "duration_ms"]
        );

        let state_columns = table_columns(&db.conn, "tracker_state");
        assert_eq!(state_columns, vec!["id", "state_json"]);

        let indexes = index_names(&db.conn, "records");
        assert!(indexes.contains("idx_records_start"));
    }

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .expect("prepare table_info");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query table_info");
        rows.map(|row| row.expect("table_info row")).collect()
    }

    fn index_names(conn: &Connection, table: &str) -> HashSet<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA index_list({table})"))
            .expect("prepare index_list");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query index_list");
        rows.map(|row| row.expect("index_list row")).collect()
    }

    #[test]
    fn init_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();
        db.init().unwrap();
    }

    #[test]
    fn records_roundtrip_newest_first() {
        let mut db = Database::open_in_memory().unwrap();
        let saved = vec![record(2, "Reading", 60_000, 90_500), record(1, "Study", 0, 60_000)];
        assert_eq!(db.replace_records(&saved).unwrap(), 2);

        let loaded = db.list_records().unwrap();
        assert_eq!(loaded, saved);
    }

    #[test]
    fn replace_records_drops_previous_rows() {
        let mut db = Database::open_in_memory().unwrap();
        db.replace_records(&[record(1, "A", 0, 5_000), record(2, "B", 5_000, 9_000)])
            .unwrap();
        db.replace_records(&[record(2, "B", 5_000, 9_000)]).unwrap();

        let ids: Vec<_> = db
            .list_records()
            .unwrap()
            .iter()
            .map(|r| r.id().get())
            .collect();
        assert_eq!(ids, [2]);
    }

    #[test]
    fn millisecond_precision_survives_storage() {
        let mut db = Database::open_in_memory().unwrap();
        db.replace_records(&[record(1, "A", 123, 4_567)]).unwrap();

        let loaded = &db.list_records().unwrap()[0];
        assert_eq!(loaded.start_time(), at_ms(123));
        assert_eq!(loaded.end_time(), at_ms(4_567));
        assert_eq!(loaded.duration_ms(), 4_444);
    }

    #[test]
    fn timestamps_are_stored_as_utc_millisecond_text() {
        let mut db = Database::open_in_memory().unwrap();
        db.replace_records(&[record(1, "A", 123, 4_567)]).unwrap();

        let (start, end): (String, String) = db
            .conn
            .query_row(
                "SELECT start_time, end_time FROM records WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(start, "2025-01-29T09:00:00.123Z");
        assert_eq!(end, "2025-01-29T09:00:04.567Z");
    }

    #[test]
    fn corrupt_duration_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.conn
            .execute(
                "INSERT INTO records (id, activity, start_time, end_time, duration_ms)
                 VALUES (1, 'A', '2025-01-29T09:00:00.000Z', '2025-01-29T09:00:10.000Z', 99)",
                [],
            )
            .unwrap();

        let err = db.list_records().unwrap_err();
        assert!(matches!(
            err,
            DbError::InvalidRecord {
                record_id: 1,
                source: ValidationError::DurationMismatch { .. }
            }
        ));
    }

    #[test]
    fn bad_timestamp_is_reported() {
        let db = Database::open_in_memory().unwrap();
        db.conn
            .execute(
                "INSERT INTO records (id, activity, start_time, end_time, duration_ms)
                 VALUES (7, 'A', 'yesterday', '2025-01-29T09:00:10.000Z', 10000)",
                [],
            )
            .unwrap();

        let err = db.list_records().unwrap_err();
        assert!(matches!(err, DbError::TimestampParse { record_id: 7, .. }));
    }

    #[test]
    fn state_is_absent_until_saved() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.load_state().unwrap().is_none());
    }

    #[test]
    fn state_snapshot_is_overwritten() {
        let mut db = Database::open_in_memory().unwrap();
        let mut engine = TimeAccountingEngine::new(EngineConfig::default());

        engine.start_timer("Study", at_ms(0)).unwrap();
        db.save_state(engine.state()).unwrap();
        let _ = engine.pause_timer(at_ms(30_000));
        db.save_state(engine.state()).unwrap();

        let count: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM tracker_state", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(db.load_state().unwrap().as_ref(), Some(engine.state()));
    }

    #[test]
    fn unreadable_state_loads_as_none() {
        let db = Database::open_in_memory().unwrap();
        db.conn
            .execute(
                "INSERT INTO tracker_state (id, state_json) VALUES (1, '{not json')",
                [],
            )
            .unwrap();

        assert!(matches!(db.load_state(), Err(DbError::StateJson(_))));
        assert!(db.load_tracker_state().unwrap().is_none());
    }

    #[test]
    fn engine_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.db");

        {
            let db = Database::open(&path).unwrap();
            let mut engine = TimeAccountingEngine::new(EngineConfig::default());
            engine.subscribe(PersistOnChange::new(db));
            engine.start_timer("Study", at_ms(0)).unwrap();
            let _ = engine.pause_timer(at_ms(45_000));
        }

        let db = Database::open(&path).unwrap();
        let mut engine = TimeAccountingEngine::restore(EngineConfig::default(), &db).unwrap();
        assert_eq!(engine.state().phase(), Phase::Paused);
        assert_eq!(engine.records().len(), 1);

        let _ = engine.resume_timer(at_ms(60_000));
        let _ = engine.stop_timer(at_ms(70_000));
        let ids: Vec<_> = engine.records().iter().map(|r| r.id().get()).collect();
        assert_eq!(ids, [2, 1]);
    }
}
