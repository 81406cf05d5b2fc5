use serde_json::Value;
use tracing::info;
use zeroize::Zeroizing;

use crate::admin::{self, CupDraft};
use crate::catalog::{self, ProductDraft};
use crate::credentials;
use crate::models::{CupItem, Product};
use crate::payloads::{parse_payload, payload_arg0_as_string, PinChangePayload, ResetPayload};
use crate::AppContext;

#[tauri::command]
pub async fn settings_get_web_app_url(
    ctx: tauri::State<'_, AppContext>,
) -> Result<Option<String>, String> {
    ctx.require_admin()?;
    Ok(ctx.store.web_app_url()?)
}

#[tauri::command]
pub async fn settings_save_web_app_url(
    arg0: Option<Value>,
    ctx: tauri::State<'_, AppContext>,
) -> Result<String, String> {
    let url = payload_arg0_as_string(arg0, &["url", "webAppUrl", "value"])
        .ok_or("Enter the web app URL")?;
    Ok(ctx.configure_web_app(&url).await?)
}

#[tauri::command]
pub async fn settings_change_pin(
    arg0: Option<Value>,
    ctx: tauri::State<'_, AppContext>,
) -> Result<(), String> {
    ctx.require_admin()?;
    let payload: PinChangePayload = parse_payload(arg0, "PIN change")?;
    admin::change_pin(
        &ctx.store,
        payload.role,
        Zeroizing::new(payload.pin),
        Zeroizing::new(payload.confirmation),
    )
    .await?;
    Ok(())
}

#[tauri::command]
pub async fn settings_save_product(
    arg0: Option<Value>,
    ctx: tauri::State<'_, AppContext>,
) -> Result<Vec<Product>, String> {
    ctx.require_admin()?;
    let draft: ProductDraft = parse_payload(arg0, "product")?;
    Ok(catalog::save_product(&ctx.store, &draft).await?)
}

#[tauri::command]
pub async fn settings_delete_product(
    arg0: Option<Value>,
    ctx: tauri::State<'_, AppContext>,
) -> Result<Vec<Product>, String> {
    ctx.require_admin()?;
    let id = payload_arg0_as_string(arg0, &["id", "productId"]).ok_or("Missing product id")?;
    Ok(catalog::delete_product(&ctx.store, &id).await?)
}

#[tauri::command]
pub async fn settings_add_cup(
    arg0: Option<Value>,
    ctx: tauri::State<'_, AppContext>,
) -> Result<Vec<CupItem>, String> {
    ctx.require_admin()?;
    let draft: CupDraft = parse_payload(arg0, "cup")?;
    Ok(admin::add_cup(&ctx.store, draft).await?)
}

#[tauri::command]
pub async fn settings_delete_cup(
    arg0: Option<Value>,
    ctx: tauri::State<'_, AppContext>,
) -> Result<Vec<CupItem>, String> {
    ctx.require_admin()?;
    let id = payload_arg0_as_string(arg0, &["id", "cupId"]).ok_or("Missing cup id")?;
    Ok(admin::delete_cup(&ctx.store, &id).await?)
}

#[tauri::command]
pub async fn settings_reset_data(
    arg0: Option<Value>,
    ctx: tauri::State<'_, AppContext>,
) -> Result<(), String> {
    let payload: ResetPayload = parse_payload(arg0, "reset")?;
    ctx.reset_ledger(payload.kind, payload.confirmed).await?;
    Ok(())
}

#[tauri::command]
pub async fn settings_save_analyst_key(
    arg0: Option<Value>,
    ctx: tauri::State<'_, AppContext>,
) -> Result<(), String> {
    ctx.require_admin()?;
    let key = Zeroizing::new(payload_arg0_as_string(arg0, &["apiKey", "key", "value"]).unwrap_or_default());
    credentials::save_analyst_api_key(&key)?;
    info!(cleared = key.is_empty(), "analyst key setting updated");
    Ok(())
}
