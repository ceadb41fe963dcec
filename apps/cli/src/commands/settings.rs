//! # Settings Commands
//!
//! Display preferences and the custom receipt logo.

use serde_json::Value;
use tracing::{debug, info};

use gemledger_core::validation::validate_logo_data_uri;
use gemledger_core::{LocalKey, Settings};

use crate::context::AppContext;
use crate::error::{AppError, ErrorCode};

pub fn show(ctx: &AppContext) -> Settings {
    ctx.settings().clone()
}

/// Sets one key. `value` is read as JSON when it parses (`true`, `3`,
/// `"x"`), otherwise as a plain string. Unknown keys are kept.
pub async fn set(ctx: &mut AppContext, key: &str, value: &str) -> Result<Settings, AppError> {
    let key = key.trim();
    if key.is_empty() {
        return Err(AppError::validation("Settings key is required"));
    }

    let value = serde_json::from_str::<Value>(value)
        .unwrap_or_else(|_| Value::String(value.to_string()));
    debug!(key = %key, value = %value, "set_setting command");

    let mut patch = serde_json::Map::new();
    patch.insert(key.to_string(), value);

    let mut settings = ctx.settings().clone();
    settings
        .merge(&Value::Object(patch))
        .map_err(|e| AppError::validation(format!("Invalid value for '{}': {}", key, e)))?;

    if !ctx.save_settings(settings).await {
        return Err(AppError::new(ErrorCode::DatabaseError, "Settings could not be saved"));
    }
    info!(key = %key, "Setting updated");
    Ok(ctx.settings().clone())
}

pub async fn set_logo(ctx: &AppContext, data_uri: &str) -> Result<(), AppError> {
    let data_uri = data_uri.trim();
    validate_logo_data_uri(data_uri)?;

    if !ctx.cache().set_value(LocalKey::Logo, data_uri).await {
        return Err(AppError::new(ErrorCode::DatabaseError, "Logo could not be saved"));
    }
    info!(bytes = data_uri.len(), "Custom logo saved");
    Ok(())
}

pub async fn get_logo(ctx: &AppContext) -> Option<String> {
    ctx.cache().get_value(LocalKey::Logo).await
}

pub async fn clear_logo(ctx: &AppContext) -> bool {
    let removed = ctx.cache().remove_value(LocalKey::Logo).await;
    info!("Custom logo cleared");
    removed
}
