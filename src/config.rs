//! Environment-based configuration.
//!
//! Values are read once at startup. Every field has a default so the app
//! starts without any configuration; the web app URL itself is not part of
//! this config because the admin sets it at runtime and it is persisted in
//! the local store.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ANALYST_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_ANALYST_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const APP_DIR_NAME: &str = "com.tokosheet.pos";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalystConfig {
    pub model: String,
    /// Base URL of the generative API, without the `/models/...` suffix.
    pub endpoint: String,
}

impl Default for AnalystConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_ANALYST_MODEL.to_string(),
            endpoint: DEFAULT_ANALYST_ENDPOINT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub analyst: AnalystConfig,
    pub http_timeout: Duration,
}

impl AppConfig {
    /// Load from `TOKOSHEET_*` environment variables, falling back to
    /// per-user data directories.
    pub fn from_env() -> Self {
        let data_dir = non_empty_var("TOKOSHEET_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);
        let log_dir = non_empty_var("TOKOSHEET_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("logs"));

        let mut analyst = AnalystConfig::default();
        if let Some(model) = non_empty_var("TOKOSHEET_ANALYST_MODEL") {
            analyst.model = model;
        }
        if let Some(endpoint) = non_empty_var("TOKOSHEET_ANALYST_ENDPOINT") {
            analyst.endpoint = endpoint.trim_end_matches('/').to_string();
        }

        let http_timeout = non_empty_var("TOKOSHEET_HTTP_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS));

        Self {
            data_dir,
            log_dir,
            analyst,
            http_timeout,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `$LOCALAPPDATA`, `$XDG_DATA_HOME` or `~/.local/share`, plus the app dir.
pub fn default_data_dir() -> PathBuf {
    let base = env::var("LOCALAPPDATA")
        .or_else(|_| env::var("XDG_DATA_HOME"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            #[cfg(target_os = "windows")]
            {
                PathBuf::from(env::var("USERPROFILE").unwrap_or_else(|_| ".".into()))
                    .join("AppData")
                    .join("Local")
            }
            #[cfg(not(target_os = "windows"))]
            {
                PathBuf::from(env::var("HOME").unwrap_or_else(|_| ".".into()))
                    .join(".local")
                    .join("share")
            }
        });
    base.join(APP_DIR_NAME)
}

/// Analyst API key from the environment (`GEMINI_API_KEY`, then `API_KEY`).
pub fn analyst_api_key_from_env() -> Option<String> {
    non_empty_var("GEMINI_API_KEY").or_else(|| non_empty_var("API_KEY"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "TOKOSHEET_DATA_DIR",
        "TOKOSHEET_LOG_DIR",
        "TOKOSHEET_ANALYST_MODEL",
        "TOKOSHEET_ANALYST_ENDPOINT",
        "TOKOSHEET_HTTP_TIMEOUT_SECS",
        "GEMINI_API_KEY",
        "API_KEY",
    ];

    fn clear_vars() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn defaults_without_environment() {
        clear_vars();
        let cfg = AppConfig::from_env();
        assert_eq!(cfg.analyst.model, DEFAULT_ANALYST_MODEL);
        assert_eq!(cfg.http_timeout, Duration::from_secs(30));
        assert!(cfg.data_dir.ends_with(APP_DIR_NAME));
        assert_eq!(cfg.log_dir, cfg.data_dir.join("logs"));
    }

    #[test]
    #[serial]
    fn environment_overrides() {
        clear_vars();
        env::set_var("TOKOSHEET_DATA_DIR", "/tmp/tokosheet-test");
        env::set_var("TOKOSHEET_ANALYST_ENDPOINT", "http://127.0.0.1:9000/v1/");
        env::set_var("TOKOSHEET_HTTP_TIMEOUT_SECS", "5");
        let cfg = AppConfig::from_env();
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/tokosheet-test"));
        assert_eq!(cfg.log_dir, PathBuf::from("/tmp/tokosheet-test/logs"));
        assert_eq!(cfg.analyst.endpoint, "http://127.0.0.1:9000/v1");
        assert_eq!(cfg.http_timeout, Duration::from_secs(5));
        clear_vars();
    }

    #[test]
    #[serial]
    fn invalid_timeout_falls_back() {
        clear_vars();
        env::set_var("TOKOSHEET_HTTP_TIMEOUT_SECS", "0");
        assert_eq!(AppConfig::from_env().http_timeout, Duration::from_secs(30));
        env::set_var("TOKOSHEET_HTTP_TIMEOUT_SECS", "soon");
        assert_eq!(AppConfig::from_env().http_timeout, Duration::from_secs(30));
        clear_vars();
    }

    #[test]
    #[serial]
    fn api_key_prefers_gemini_variable() {
        clear_vars();
        assert_eq!(analyst_api_key_from_env(), None);
        env::set_var("API_KEY", "fallback");
        assert_eq!(analyst_api_key_from_env().as_deref(), Some("fallback"));
        env::set_var("GEMINI_API_KEY", "primary");
        assert_eq!(analyst_api_key_from_env().as_deref(), Some("primary"));
        clear_vars();
    }
}
