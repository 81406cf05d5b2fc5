use serde_json::{json, Value};

use crate::diagnostics::{self, AboutInfo};
use crate::AppContext;

#[tauri::command]
pub async fn app_get_version() -> Result<AboutInfo, String> {
    Ok(diagnostics::about_info())
}

/// Non-secret runtime configuration for the settings screen.
#[tauri::command]
pub async fn app_get_config(ctx: tauri::State<'_, AppContext>) -> Result<Value, String> {
    Ok(json!({
        "dataDir": ctx.config.data_dir.display().to_string(),
        "logDir": ctx.config.log_dir.display().to_string(),
        "analystModel": ctx.config.analyst.model,
        "httpTimeoutSecs": ctx.config.http_timeout.as_secs(),
        "remoteConfigured": ctx.store.is_remote_configured(),
    }))
}
