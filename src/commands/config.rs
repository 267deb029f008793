//! Config Commands
//!
//! `meka config`: inspect and edit the persisted client settings.

use crate::models::settings::{AppConfig, SettingsUpdate};
use crate::storage::ConfigService;
use crate::utils::error::{AppError, AppResult};

/// Pretty JSON of the stored configuration.
pub fn show_config(service: &ConfigService) -> AppResult<String> {
    Ok(serde_json::to_string_pretty(service.get_config())?)
}

/// Persist a partial update. An empty update is rejected.
pub fn update_config(service: &mut ConfigService, update: SettingsUpdate) -> AppResult<AppConfig> {
    if update.is_empty() {
        return Err(AppError::validation("No settings given"));
    }
    service.update_config(update)
}

pub fn reset_config(service: &mut ConfigService) -> AppResult<AppConfig> {
    service.reset()?;
    Ok(service.get_config().clone())
}
