//! Validated settings structures

use crate::schema::{RawConfig, RawServiceConfig, RawStoreBackend, RawStoreConfig, RawTablesConfig};
use cuekeeper_util::{data_dir_without_env, socket_path_without_env, TableId};
use std::path::{Path, PathBuf};

/// Number of tables when none are configured
pub const DEFAULT_TABLE_COUNT: u32 = 20;

/// Prefix for numbered table ids
pub const DEFAULT_TABLE_PREFIX: &str = "table_";

/// Hourly rate of a fresh session
pub const DEFAULT_RATE: f64 = 50.0;

pub const DEFAULT_JSON_FILE: &str = "table_data.json";
pub const DEFAULT_SQLITE_FILE: &str = "cuekeeper.db";

/// Validated settings ready for use by the service
#[derive(Debug, Clone)]
pub struct Settings {
    pub service: ServiceConfig,
    pub store: StoreConfig,

    /// The fixed table set, in configuration order
    pub table_ids: Vec<TableId>,

    pub default_rate: f64,
}

impl Settings {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            service: ServiceConfig::from_raw(raw.service),
            store: StoreConfig::from_raw(raw.store),
            table_ids: table_ids_from_raw(raw.tables),
            default_rate: raw.billing.default_rate.unwrap_or(DEFAULT_RATE),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            store: StoreConfig::default(),
            table_ids: numbered_ids(DEFAULT_TABLE_PREFIX, DEFAULT_TABLE_COUNT),
            default_rate: DEFAULT_RATE,
        }
    }
}

fn table_ids_from_raw(raw: RawTablesConfig) -> Vec<TableId> {
    match raw.ids {
        Some(ids) => ids.into_iter().map(TableId::from).collect(),
        None => numbered_ids(
            raw.prefix.as_deref().unwrap_or(DEFAULT_TABLE_PREFIX),
            raw.count.unwrap_or(DEFAULT_TABLE_COUNT),
        ),
    }
}

/// `<prefix>1` through `<prefix><count>`
pub fn numbered_ids(prefix: &str, count: u32) -> Vec<TableId> {
    (1..=count).map(|n| TableId::numbered(prefix, n)).collect()
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub socket_path: PathBuf,
    pub data_dir: PathBuf,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        Self {
            socket_path: raw.socket_path.unwrap_or_else(socket_path_without_env),
            data_dir: raw.data_dir.unwrap_or_else(data_dir_without_env),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from_raw(RawServiceConfig::default())
    }
}

/// Persistence backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Whole ledger as one JSON document
    Json,
    Sqlite,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub path: PathBuf,
}

impl StoreConfig {
    fn from_raw(raw: RawStoreConfig) -> Self {
        let backend = match raw.backend {
            Some(RawStoreBackend::Sqlite) => StoreBackend::Sqlite,
            Some(RawStoreBackend::Json) | None => StoreBackend::Json,
        };
        let path = raw.path.unwrap_or_else(|| match backend {
            StoreBackend::Json => PathBuf::from(DEFAULT_JSON_FILE),
            StoreBackend::Sqlite => PathBuf::from(DEFAULT_SQLITE_FILE),
        });

        Self { backend, path }
    }

    /// Store location; relative paths are taken from `data_dir`
    pub fn resolved_path(&self, data_dir: &Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            data_dir.join(&self.path)
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::from_raw(RawStoreConfig::default())
    }
}
