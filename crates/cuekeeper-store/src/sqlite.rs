//! SQLite-based store implementation

use cuekeeper_api::{parse_timestamp, SessionRecord, TableSession, TableStatus};
use cuekeeper_util::TableId;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::{LedgerSnapshot, Store, StoreError, StoreResult};

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection mutex poisoned".into()))
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- One row per table; rewritten as a whole on every save
            CREATE TABLE IF NOT EXISTS tables (
                table_id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                start_time TEXT,
                total_time REAL NOT NULL DEFAULT 0,
                rate REAL NOT NULL
            );
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

fn parse_status(s: &str) -> StoreResult<TableStatus> {
    match s {
        "available" => Ok(TableStatus::Available),
        "running" => Ok(TableStatus::Running),
        "paused" => Ok(TableStatus::Paused),
        other => Err(StoreError::Serialization(format!(
            "unknown table status '{}'",
            other
        ))),
    }
}

struct Row {
    table_id: String,
    status: String,
    start_time: Option<String>,
    total_time: f64,
    rate: f64,
}

impl Row {
    fn into_session(self) -> StoreResult<(TableId, TableSession)> {
        let start_time = self
            .start_time
            .as_deref()
            .map(parse_timestamp)
            .transpose()
            .map_err(StoreError::Serialization)?;

        let record = SessionRecord {
            status: parse_status(&self.status)?,
            start_time,
            total_time: self.total_time,
            rate: self.rate,
        };

        let session = TableSession::try_from(record).map_err(|e| {
            StoreError::Serialization(format!("table {}: {}", self.table_id, e))
        })?;

        Ok((TableId::new(self.table_id), session))
    }
}

impl Store for SqliteStore {
    fn load_ledger(&self) -> StoreResult<Option<LedgerSnapshot>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT table_id, status, start_time, total_time, rate FROM tables",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Row {
                    table_id: row.get(0)?,
                    status: row.get(1)?,
                    start_time: row.get(2)?,
                    total_time: row.get(3)?,
                    rate: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if rows.is_empty() {
            debug!("No ledger rows yet");
            return Ok(None);
        }

        let snapshot = rows
            .into_iter()
            .map(Row::into_session)
            .collect::<StoreResult<LedgerSnapshot>>()?;

        debug!(table_count = snapshot.len(), "Ledger loaded");
        Ok(Some(snapshot))
    }

    fn save_ledger(&self, snapshot: &LedgerSnapshot) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM tables", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO tables (table_id, status, start_time, total_time, rate)
                 VALUES (?, ?, ?, ?, ?)",
            )?;
            for (table_id, session) in snapshot {
                insert.execute(params![
                    table_id.as_str(),
                    session.status().as_str(),
                    session.start_time().map(|t| t.to_rfc3339()),
                    session.total_time,
                    session.rate,
                ])?;
            }
        }
        tx.commit()?;

        debug!(table_count = snapshot.len(), "Ledger saved");
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        match self.conn() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use cuekeeper_api::SessionPhase;

    fn running_session() -> TableSession {
        TableSession {
            phase: SessionPhase::Running {
                started_at: Local.with_ymd_and_hms(2025, 3, 1, 19, 0, 0).unwrap(),
            },
            total_time: 120.5,
            rate: 50.0,
        }
    }

    #[test]
    fn test_empty_store_loads_none() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.load_ledger().unwrap().is_none());
    }

    #[test]
    fn test_save_and_load() {
        let store = SqliteStore::in_memory().unwrap();

        let mut snapshot = LedgerSnapshot::new();
        snapshot.insert(TableId::new("table_1"), TableSession::fresh(50.0));
        snapshot.insert(TableId::new("table_2"), running_session());
        snapshot.insert(
            TableId::new("table_3"),
            TableSession {
                phase: SessionPhase::Paused,
                total_time: 1834.2,
                rate: 50.0,
            },
        );

        store.save_ledger(&snapshot).unwrap();
        let loaded = store.load_ledger().unwrap().unwrap();

        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn test_save_replaces_all_rows() {
        let store = SqliteStore::in_memory().unwrap();

        let mut first = LedgerSnapshot::new();
        first.insert(TableId::new("table_1"), running_session());
        first.insert(TableId::new("table_2"), TableSession::fresh(50.0));
        store.save_ledger(&first).unwrap();

        let mut second = LedgerSnapshot::new();
        second.insert(TableId::new("table_1"), TableSession::fresh(50.0));
        store.save_ledger(&second).unwrap();

        let loaded = store.load_ledger().unwrap().unwrap();
        assert_eq!(loaded, second);
    }

    #[test]
    fn test_invalid_row_is_rejected() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .conn()
            .unwrap()
            .execute(
                "INSERT INTO tables (table_id, status, start_time, total_time, rate)
                 VALUES ('table_1', 'running', NULL, 0, 50)",
                [],
            )
            .unwrap();

        assert!(matches!(
            store.load_ledger(),
            Err(StoreError::Serialization(_))
        ));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cuekeeper.db");

        let mut snapshot = LedgerSnapshot::new();
        snapshot.insert(TableId::new("table_7"), running_session());
        SqliteStore::open(&path).unwrap().save_ledger(&snapshot).unwrap();

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.load_ledger().unwrap().unwrap(), snapshot);
        assert!(reopened.is_healthy());
    }
}
