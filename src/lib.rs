//! TokoSheet POS backend.
//!
//! A small drinks-stall point of sale whose database is a spreadsheet
//! published as a web app. With the `desktop` feature this crate also
//! registers the Tauri IPC commands the web front end calls via
//! `@tauri-apps/api/core::invoke()`.

use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod admin;
pub mod analyst;
pub mod app;
pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod credentials;
pub mod dashboard;
pub mod db;
pub mod diagnostics;
pub mod error;
pub mod ledger;
pub mod models;
pub mod payloads;
pub mod purchases;
pub mod sheet;
pub mod shell;
pub mod storage;

#[cfg(feature = "desktop")]
mod commands;

pub use app::AppContext;
pub use config::AppConfig;
pub use error::{PosError, PosResult};

const DEFAULT_LOG_FILTER: &str = "info,tokosheet_pos_lib=debug";

/// Console plus daily rolling file logging in `log_dir`.
///
/// `RUST_LOG` overrides the default filter. Old files beyond
/// [`diagnostics::MAX_LOG_FILES`] are pruned first.
pub fn init_logging(log_dir: &Path) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    std::fs::create_dir_all(log_dir)?;
    diagnostics::prune_old_logs(log_dir, diagnostics::MAX_LOG_FILES);

    let file_appender = tracing_appender::rolling::daily(log_dir, diagnostics::LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);
    let console_layer = fmt::layer().with_target(true);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    // The writer flushes on drop; the app runs until process exit.
    std::mem::forget(guard);
    Ok(())
}

#[cfg(feature = "desktop")]
pub fn run() {
    use tauri::Manager;

    let config = AppConfig::from_env();
    if let Err(e) = init_logging(&config.log_dir) {
        eprintln!("logging disabled: {e:#}");
    }
    tracing::info!("Starting TokoSheet POS v{}", env!("CARGO_PKG_VERSION"));

    let result = tauri::Builder::default()
        .setup(move |app| {
            let ctx = AppContext::bootstrap(config.clone())?;
            app.manage(ctx);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // runtime
            commands::runtime::app_get_version,
            commands::runtime::app_get_config,
            // auth / shell
            commands::auth::auth_login,
            commands::auth::auth_logout,
            commands::auth::auth_get_current_session,
            commands::auth::shell_get_state,
            commands::auth::shell_select_tab,
            commands::auth::shell_reload,
            // sales
            commands::sales::products_list,
            commands::sales::products_categories,
            commands::sales::products_by_category,
            commands::sales::product_category_choices,
            commands::sales::cups_list,
            commands::sales::cups_usable,
            commands::sales::checkout_submit,
            commands::sales::purchase_submit,
            commands::sales::dashboard_get_summary,
            commands::sales::ledger_query,
            // admin
            commands::settings::settings_get_web_app_url,
            commands::settings::settings_save_web_app_url,
            commands::settings::settings_change_pin,
            commands::settings::settings_save_product,
            commands::settings::settings_delete_product,
            commands::settings::settings_add_cup,
            commands::settings::settings_delete_cup,
            commands::settings::settings_reset_data,
            commands::settings::settings_save_analyst_key,
            // analyst
            commands::analytics::analyst_get_stats,
            commands::analytics::analyst_ask,
            commands::analytics::analyst_suggestions,
        ])
        .run(tauri::generate_context!());

    if let Err(e) = result {
        tracing::error!(error = %e, "tauri application exited with error");
    }
}
