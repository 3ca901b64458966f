//! The session ledger: every table's session, persisted after each mutation

use chrono::{DateTime, Local};
use cuekeeper_api::{TableEntry, TableSession, TableStatus};
use cuekeeper_store::{LedgerSnapshot, Store, StoreError};
use cuekeeper_util::TableId;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{apply_action, CoreEvent, TableAction};

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Table not found: {0}")]
    UnknownTable(TableId),

    #[error("Cannot {action} table {table_id} while {status}")]
    InvalidTransition {
        table_id: TableId,
        status: TableStatus,
        action: TableAction,
    },

    #[error("Failed to load ledger: {0}")]
    Load(#[from] StoreError),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Owns the session of every configured table
pub struct Ledger {
    sessions: LedgerSnapshot,
    default_rate: f64,
    store: Arc<dyn Store>,
}

impl Ledger {
    /// Load the ledger from `store`, reconciled against the configured ids.
    ///
    /// Persisted sessions of configured tables are kept. Configured tables
    /// without a persisted session start fresh. Persisted tables that are no
    /// longer configured are dropped.
    pub fn load(
        table_ids: &[TableId],
        default_rate: f64,
        store: Arc<dyn Store>,
    ) -> LedgerResult<Self> {
        let persisted = store.load_ledger()?;
        let had_state = persisted.is_some();
        let mut persisted = persisted.unwrap_or_default();

        let mut sessions = LedgerSnapshot::new();
        let mut added = 0usize;
        for id in table_ids {
            let session = match persisted.remove(id) {
                Some(session) => session,
                None => {
                    added += 1;
                    TableSession::fresh(default_rate)
                }
            };
            sessions.insert(id.clone(), session);
        }

        for (id, session) in &persisted {
            warn!(
                table_id = %id,
                status = %session.status(),
                "Dropping persisted table that is no longer configured"
            );
        }

        let ledger = Self {
            sessions,
            default_rate,
            store,
        };

        if !had_state || added > 0 || !persisted.is_empty() {
            ledger.persist();
        }

        info!(
            table_count = ledger.sessions.len(),
            restored = had_state,
            added,
            dropped = persisted.len(),
            "Ledger loaded"
        );

        Ok(ledger)
    }

    /// Start an available table
    pub fn start(&mut self, table_id: &TableId, now: DateTime<Local>) -> LedgerResult<CoreEvent> {
        self.apply(table_id, TableAction::Start, now)
    }

    /// Pause a running table, folding the open interval into its total time
    pub fn pause(&mut self, table_id: &TableId, now: DateTime<Local>) -> LedgerResult<CoreEvent> {
        self.apply(table_id, TableAction::Pause, now)
    }

    /// Resume a paused table
    pub fn resume(&mut self, table_id: &TableId, now: DateTime<Local>) -> LedgerResult<CoreEvent> {
        self.apply(table_id, TableAction::Resume, now)
    }

    /// End a table in any status, billing it and resetting it to the default rate
    pub fn end(&mut self, table_id: &TableId, now: DateTime<Local>) -> LedgerResult<CoreEvent> {
        self.apply(table_id, TableAction::End, now)
    }

    /// Apply `action` to one table and persist the whole ledger
    pub fn apply(
        &mut self,
        table_id: &TableId,
        action: TableAction,
        now: DateTime<Local>,
    ) -> LedgerResult<CoreEvent> {
        let session = self
            .sessions
            .get_mut(table_id)
            .ok_or_else(|| LedgerError::UnknownTable(table_id.clone()))?;

        let (next, transition) =
            apply_action(session, action, now, self.default_rate).map_err(|rejected| {
                debug!(
                    table_id = %table_id,
                    action = %action,
                    status = %rejected.status,
                    "Transition rejected"
                );
                LedgerError::InvalidTransition {
                    table_id: table_id.clone(),
                    status: rejected.status,
                    action,
                }
            })?;

        *session = next.clone();

        info!(
            table_id = %table_id,
            action = %action,
            status = %next.status(),
            total_time = next.total_time,
            "Table updated"
        );

        self.persist();

        Ok(CoreEvent {
            table_id: table_id.clone(),
            transition,
            session: next,
        })
    }

    /// Current session of one table
    pub fn status(&self, table_id: &TableId) -> Option<&TableSession> {
        self.sessions.get(table_id)
    }

    /// Every table in natural id order
    pub fn list(&self) -> Vec<TableEntry> {
        self.sessions
            .iter()
            .map(|(table_id, session)| TableEntry {
                table_id: table_id.clone(),
                session: session.clone(),
            })
            .collect()
    }

    pub fn table_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn store_healthy(&self) -> bool {
        self.store.is_healthy()
    }

    /// Write the full ledger. The in-memory state stays authoritative if
    /// this fails; the next successful save overwrites everything.
    fn persist(&self) {
        if let Err(e) = self.store.save_ledger(&self.sessions) {
            error!(error = %e, "Failed to persist ledger");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use cuekeeper_api::SessionPhase;
    use cuekeeper_store::{JsonFileStore, SqliteStore, StoreResult};

    fn t0() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 1, 19, 0, 0).unwrap()
    }

    fn ids(n: u32) -> Vec<TableId> {
        (1..=n).map(|i| TableId::numbered("table_", i)).collect()
    }

    fn make_ledger() -> (Ledger, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let ledger = Ledger::load(&ids(20), 50.0, store.clone()).unwrap();
        (ledger, store)
    }

    fn table(id: &str) -> TableId {
        TableId::new(id)
    }

    #[test]
    fn test_fresh_ledger_has_default_tables() {
        let (ledger, store) = make_ledger();

        assert_eq!(ledger.table_count(), 20);
        let listing = ledger.list();
        assert_eq!(listing[0].table_id, table("table_1"));
        assert_eq!(listing[1].table_id, table("table_2"));
        assert_eq!(listing[19].table_id, table("table_20"));
        assert!(listing.iter().all(|e| e.session == TableSession::fresh(50.0)));

        // defaults are written out straight away
        assert_eq!(store.load_ledger().unwrap().unwrap().len(), 20);
    }

    #[test]
    fn test_hour_of_play_bills_fifty() {
        let (mut ledger, _) = make_ledger();
        let id = table("table_1");

        ledger.start(&id, t0()).unwrap();
        let paused = ledger.pause(&id, t0() + Duration::seconds(3600)).unwrap();
        assert_eq!(paused.session.total_time, 3600.0);
        assert_eq!(ledger.status(&id).unwrap().status(), TableStatus::Paused);

        let ended = ledger.end(&id, t0() + Duration::seconds(4000)).unwrap();
        let reply = serde_json::to_value(ended.reply()).unwrap();
        assert_eq!(reply["success"], true);
        assert_eq!(reply["total_hours"], 1.0);
        assert_eq!(reply["total_cost"], 50.0);

        assert_eq!(ledger.status(&id).unwrap(), &TableSession::fresh(50.0));
    }

    #[test]
    fn test_start_twice_fails_without_restart() {
        let (mut ledger, _) = make_ledger();
        let id = table("table_3");

        ledger.start(&id, t0()).unwrap();
        let err = ledger.start(&id, t0() + Duration::seconds(60)).unwrap_err();

        assert!(matches!(
            err,
            LedgerError::InvalidTransition {
                status: TableStatus::Running,
                action: TableAction::Start,
                ..
            }
        ));
        assert_eq!(ledger.status(&id).unwrap().start_time(), Some(t0()));
    }

    #[test]
    fn test_repeated_failure_is_stable() {
        let (mut ledger, _) = make_ledger();
        let id = table("table_2");

        for _ in 0..3 {
            assert!(matches!(
                ledger.pause(&id, t0()),
                Err(LedgerError::InvalidTransition { .. })
            ));
            assert!(matches!(
                ledger.resume(&id, t0()),
                Err(LedgerError::InvalidTransition { .. })
            ));
        }
        assert_eq!(ledger.status(&id).unwrap(), &TableSession::fresh(50.0));
    }

    #[test]
    fn test_unknown_table() {
        let (mut ledger, _) = make_ledger();
        let id = table("table_99");

        assert!(matches!(ledger.start(&id, t0()), Err(LedgerError::UnknownTable(_))));
        assert!(matches!(ledger.end(&id, t0()), Err(LedgerError::UnknownTable(_))));
        assert!(ledger.status(&id).is_none());
    }

    #[test]
    fn test_every_mutation_is_persisted() {
        let (mut ledger, store) = make_ledger();
        let id = table("table_5");

        ledger.start(&id, t0()).unwrap();
        let saved = store.load_ledger().unwrap().unwrap();
        assert_eq!(saved[&id].status(), TableStatus::Running);

        ledger.pause(&id, t0() + Duration::seconds(42)).unwrap();
        let saved = store.load_ledger().unwrap().unwrap();
        assert_eq!(saved[&id].total_time, 42.0);

        ledger.end(&id, t0() + Duration::seconds(50)).unwrap();
        let saved = store.load_ledger().unwrap().unwrap();
        assert_eq!(saved[&id], TableSession::fresh(50.0));
    }

    #[test]
    fn test_reload_restores_running_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path().join("table_data.json")));

        let mut ledger = Ledger::load(&ids(20), 50.0, store.clone()).unwrap();
        ledger.start(&table("table_8"), t0()).unwrap();
        drop(ledger);

        let reloaded = Ledger::load(&ids(20), 50.0, store).unwrap();
        assert_eq!(
            reloaded.status(&table("table_8")).unwrap().phase,
            SessionPhase::Running { started_at: t0() }
        );
    }

    #[test]
    fn test_reconcile_with_configuration() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());

        let mut persisted = LedgerSnapshot::new();
        persisted.insert(
            table("table_1"),
            TableSession {
                phase: SessionPhase::Paused,
                total_time: 300.0,
                rate: 50.0,
            },
        );
        persisted.insert(table("retired"), TableSession::fresh(50.0));
        store.save_ledger(&persisted).unwrap();

        let ledger = Ledger::load(&ids(3), 50.0, store.clone()).unwrap();

        assert_eq!(ledger.table_count(), 3);
        assert_eq!(ledger.status(&table("table_1")).unwrap().total_time, 300.0);
        assert_eq!(
            ledger.status(&table("table_3")).unwrap(),
            &TableSession::fresh(50.0)
        );
        assert!(ledger.status(&table("retired")).is_none());

        let saved = store.load_ledger().unwrap().unwrap();
        assert!(!saved.contains_key(&table("retired")));
    }

    struct FailingStore;

    impl Store for FailingStore {
        fn load_ledger(&self) -> StoreResult<Option<LedgerSnapshot>> {
            Ok(None)
        }

        fn save_ledger(&self, _snapshot: &LedgerSnapshot) -> StoreResult<()> {
            Err(StoreError::Database("disk full".into()))
        }

        fn is_healthy(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_save_failure_does_not_change_outcome() {
        let mut ledger = Ledger::load(&ids(2), 50.0, Arc::new(FailingStore)).unwrap();
        let id = table("table_1");

        let event = ledger.start(&id, t0()).unwrap();
        assert!(event.reply().success);
        assert_eq!(ledger.status(&id).unwrap().status(), TableStatus::Running);
        assert!(!ledger.store_healthy());
    }
}
