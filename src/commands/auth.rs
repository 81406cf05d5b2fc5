use serde::Serialize;
use serde_json::Value;
use zeroize::Zeroizing;

use crate::auth;
use crate::models::{Purchase, Role, Transaction};
use crate::payloads::payload_arg0_as_string;
use crate::shell::{NavItem, Screen, Tab};
use crate::AppContext;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellState {
    role: Option<Role>,
    screen: Screen,
    active_tab: Tab,
    nav: Vec<NavItem>,
    loading: bool,
    transactions: Vec<Transaction>,
    purchases: Vec<Purchase>,
}

async fn shell_state(ctx: &AppContext) -> ShellState {
    let shell = ctx.shell.lock().await;
    ShellState {
        role: shell.role(),
        screen: shell.screen(),
        active_tab: shell.active_tab(),
        nav: shell.nav(),
        loading: shell.is_loading(),
        transactions: shell.transactions().to_vec(),
        purchases: shell.purchases().to_vec(),
    }
}

#[tauri::command]
pub async fn auth_login(
    arg0: Option<Value>,
    ctx: tauri::State<'_, AppContext>,
) -> Result<Role, String> {
    let pin = payload_arg0_as_string(arg0, &["pin", "value"]).map(Zeroizing::new);
    let pin = pin.ok_or("PIN is required")?;
    Ok(ctx.login(pin).await?)
}

#[tauri::command]
pub async fn auth_logout(ctx: tauri::State<'_, AppContext>) -> Result<(), String> {
    ctx.logout().await;
    Ok(())
}

#[tauri::command]
pub async fn auth_get_current_session(ctx: tauri::State<'_, AppContext>) -> Result<Value, String> {
    Ok(auth::session_json(&ctx.auth))
}

#[tauri::command]
pub async fn shell_get_state(ctx: tauri::State<'_, AppContext>) -> Result<ShellState, String> {
    Ok(shell_state(&ctx).await)
}

#[tauri::command]
pub async fn shell_select_tab(
    tab: Tab,
    ctx: tauri::State<'_, AppContext>,
) -> Result<ShellState, String> {
    ctx.shell.lock().await.select_tab(tab)?;
    Ok(shell_state(&ctx).await)
}

#[tauri::command]
pub async fn shell_reload(ctx: tauri::State<'_, AppContext>) -> Result<ShellState, String> {
    ctx.reload().await?;
    Ok(shell_state(&ctx).await)
}
