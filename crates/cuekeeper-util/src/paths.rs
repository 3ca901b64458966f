//! Default paths for cuekeeper components
//!
//! Paths are user-writable by default (no root required):
//! - Socket: `$XDG_RUNTIME_DIR/cuekeeperd/cuekeeperd.sock` or `/tmp/cuekeeperd-$USER/cuekeeperd.sock`
//! - Data: `$XDG_DATA_HOME/cuekeeperd` or `~/.local/share/cuekeeperd`
//! - Config: `$XDG_CONFIG_HOME/cuekeeper/config.toml` or `~/.config/cuekeeper/config.toml`

use std::path::PathBuf;

/// Environment variable for overriding the socket path
pub const CUEKEEPER_SOCKET_ENV: &str = "CUEKEEPER_SOCKET";

const SOCKET_FILENAME: &str = "cuekeeperd.sock";

/// Application subdirectory name
const APP_DIR: &str = "cuekeeperd";

/// Config subdirectory name (shared by the service and `cuectl`)
const CONFIG_DIR: &str = "cuekeeper";

/// Get the default socket path.
///
/// Order of precedence:
/// 1. `$CUEKEEPER_SOCKET` environment variable (if set)
/// 2. `$XDG_RUNTIME_DIR/cuekeeperd/cuekeeperd.sock` (if XDG_RUNTIME_DIR is set)
/// 3. `/tmp/cuekeeperd-$USER/cuekeeperd.sock` (fallback)
pub fn default_socket_path() -> PathBuf {
    if let Ok(path) = std::env::var(CUEKEEPER_SOCKET_ENV) {
        return PathBuf::from(path);
    }

    socket_path_without_env()
}

/// Get the socket path without checking the `CUEKEEPER_SOCKET` env var.
pub fn socket_path_without_env() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join(APP_DIR).join(SOCKET_FILENAME);
    }

    let username = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    PathBuf::from(format!("/tmp/{}-{}", APP_DIR, username)).join(SOCKET_FILENAME)
}

/// Get the default data directory.
///
/// `$XDG_DATA_HOME/cuekeeperd`, else `~/.local/share/cuekeeperd`. The
/// service applies its `CUEKEEPER_DATA_DIR` override on top of this.
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

/// Get the default configuration file path.
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(CONFIG_DIR).join("config.toml");
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(CONFIG_DIR)
            .join("config.toml");
    }

    PathBuf::from("/etc").join(CONFIG_DIR).join("config.toml")
}
