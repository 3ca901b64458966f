//! JSON file store implementation

use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{LedgerSnapshot, Store, StoreResult};

/// Ledger stored as one JSON object keyed by table id
///
/// ```json
/// {
///   "table_1": { "status": "available", "start_time": null, "total_time": 0.0, "rate": 50.0 }
/// }
/// ```
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl Store for JsonFileStore {
    fn load_ledger(&self) -> StoreResult<Option<LedgerSnapshot>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No ledger file yet");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let snapshot: LedgerSnapshot = serde_json::from_str(&content)?;
        debug!(
            path = %self.path.display(),
            table_count = snapshot.len(),
            "Ledger loaded"
        );
        Ok(Some(snapshot))
    }

    fn save_ledger(&self, snapshot: &LedgerSnapshot) -> StoreResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        // Sibling file renamed over the ledger; the ledger is never half-written
        let json = serde_json::to_string_pretty(snapshot)?;
        let temp_path = self.temp_path();
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        std::fs::rename(&temp_path, &self.path)?;

        debug!(path = %self.path.display(), "Ledger saved");
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.is_dir(),
            _ => true,
        }
    }
}
