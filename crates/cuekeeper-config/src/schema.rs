//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Global service settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Persistence backend
    #[serde(default)]
    pub store: RawStoreConfig,

    /// The fixed set of tables
    #[serde(default)]
    pub tables: RawTablesConfig,

    #[serde(default)]
    pub billing: RawBillingConfig,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// IPC socket path
    pub socket_path: Option<PathBuf>,

    /// Data directory for the store
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawStoreConfig {
    /// "json" (default) or "sqlite"
    pub backend: Option<RawStoreBackend>,

    /// Store file, relative paths resolve against the data directory
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RawStoreBackend {
    Json,
    Sqlite,
}

/// Table set definition: either `count` numbered tables or explicit `ids`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawTablesConfig {
    pub count: Option<u32>,

    /// Prefix for numbered ids (default "table_")
    pub prefix: Option<String>,

    pub ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawBillingConfig {
    /// Hourly rate given to every fresh session
    pub default_rate: Option<f64>,
}
