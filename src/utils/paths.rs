//! Cross-Platform Path Utilities
//!
//! Functions for resolving the client's configuration directory (~/.meka/).

use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// Environment variable that relocates the MEKA directory.
pub const MEKA_HOME_ENV: &str = "MEKA_HOME";

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the MEKA directory (`$MEKA_HOME`, or ~/.meka/)
pub fn meka_dir() -> AppResult<PathBuf> {
    if let Ok(dir) = std::env::var(MEKA_HOME_ENV) {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    Ok(home_dir()?.join(".meka"))
}

/// Get the config file path (~/.meka/config.json)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(meka_dir()?.join("config.json"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
