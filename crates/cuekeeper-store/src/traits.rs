//! Store trait definitions

use cuekeeper_api::TableSession;
use cuekeeper_util::TableId;
use std::collections::BTreeMap;

use crate::StoreResult;

/// Every table's session, in natural id order
pub type LedgerSnapshot = BTreeMap<TableId, TableSession>;

/// Full-state persistence for the session ledger
pub trait Store: Send + Sync {
    /// Load the last saved ledger, or `None` if nothing was ever saved
    fn load_ledger(&self) -> StoreResult<Option<LedgerSnapshot>>;

    /// Replace the stored ledger with `snapshot`
    fn save_ledger(&self, snapshot: &LedgerSnapshot) -> StoreResult<()>;

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
