//! Platform-specific paths.

use std::path::{Path, PathBuf};

/// Directory name shared by every platform's log location.
pub const APP_DIR_NAME: &str = "obsidian-mcp-tools";

/// Directory the server writes its rolling log files into.
///
/// Falls back to the system temp directory when no home directory is known.
pub fn get_log_dir() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => log_dir_for(&home, std::env::consts::OS),
        None => std::env::temp_dir().join(APP_DIR_NAME),
    }
}

/// Log directory for a given home directory and `std::env::consts::OS` value.
pub fn log_dir_for(home: &Path, os: &str) -> PathBuf {
    match os {
        "macos" => home.join("Library").join("Logs").join(APP_DIR_NAME),
        "windows" => home
            .join("AppData")
            .join("Local")
            .join("Logs")
            .join(APP_DIR_NAME),
        _ => home
            .join(".local")
            .join("share")
            .join("logs")
            .join(APP_DIR_NAME),
    }
}
