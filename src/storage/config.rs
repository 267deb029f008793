//! JSON Configuration Management
//!
//! Handles reading and writing the client configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use crate::models::settings::{AppConfig, SettingsUpdate};
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::{config_path, ensure_dir};

/// Configuration service for managing client settings
#[derive(Debug)]
pub struct ConfigService {
    config_path: PathBuf,
    config: AppConfig,
}

impl ConfigService {
    /// Load the config from `~/.meka/config.json`, creating defaults when missing
    pub fn new() -> AppResult<Self> {
        Self::open(config_path()?)
    }

    /// Load the config at `path`, creating it with defaults when missing.
    ///
    /// If the default file cannot be written the defaults are used in memory
    /// only; saving later reports the error.
    pub fn open(path: impl Into<PathBuf>) -> AppResult<Self> {
        let config_path = path.into();

        let config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            let default_config = AppConfig::default();
            match Self::create_default(&config_path, &default_config) {
                Ok(()) => {
                    tracing::info!("[Config] Created default config at {}", config_path.display());
                }
                Err(e) => {
                    tracing::warn!(
                        "[Config] Could not create {} ({}); using defaults",
                        config_path.display(),
                        e
                    );
                }
            }
            default_config
        };

        Ok(Self {
            config_path,
            config,
        })
    }

    fn create_default(path: &Path, config: &AppConfig) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        Self::save_to_file(path, config)
    }

    /// Load configuration from a file
    fn load_from_file(path: &Path) -> AppResult<AppConfig> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate().map_err(AppError::config)?;
        Ok(config)
    }

    /// Save configuration to a file with pretty formatting
    fn save_to_file(path: &Path, config: &AppConfig) -> AppResult<()> {
        config.validate().map_err(AppError::config)?;
        let content = serde_json::to_string_pretty(config)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Get the current configuration
    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    /// Update the configuration with a partial update and persist it
    pub fn update_config(&mut self, update: SettingsUpdate) -> AppResult<AppConfig> {
        let mut next = self.config.clone();
        next.apply_update(update);
        next.validate().map_err(AppError::config)?;
        if let Some(parent) = self.config_path.parent() {
            ensure_dir(parent)?;
        }
        Self::save_to_file(&self.config_path, &next)?;
        self.config = next;
        Ok(self.config.clone())
    }

    /// Effective configuration for this run: the file, then environment
    /// overrides, then explicit overrides (CLI flags). Nothing is persisted.
    pub fn effective(&self, overrides: SettingsUpdate) -> AppResult<AppConfig> {
        let mut config = self.config.clone();
        config.apply_update(SettingsUpdate::from_env());
        config.apply_update(overrides);
        config.validate().map_err(AppError::config)?;
        Ok(config)
    }

    /// Reset configuration to defaults and persist them
    pub fn reset(&mut self) -> AppResult<()> {
        let defaults = AppConfig::default();
        Self::create_default(&self.config_path, &defaults)?;
        self.config = defaults;
        Ok(())
    }
}
