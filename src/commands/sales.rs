use serde_json::Value;

use crate::catalog::{self, PRODUCT_CATEGORIES};
use crate::checkout::{self, Cart, CheckoutReceipt};
use crate::dashboard::DashboardSummary;
use crate::ledger::{self, LedgerQuery, LedgerView};
use crate::models::{CupItem, Product, Purchase};
use crate::payloads::{parse_optional_payload, parse_payload, payload_arg0_as_string, CheckoutPayload};
use crate::purchases::PurchaseDraft;
use crate::AppContext;

#[tauri::command]
pub async fn products_list(ctx: tauri::State<'_, AppContext>) -> Result<Vec<Product>, String> {
    ctx.require_session()?;
    Ok(catalog::fetch_products(&ctx.store).await?)
}

/// Filter chips for the cashier grid, `"Semua"` first.
#[tauri::command]
pub async fn products_categories(
    ctx: tauri::State<'_, AppContext>,
) -> Result<Vec<String>, String> {
    ctx.require_session()?;
    let products = catalog::fetch_products(&ctx.store).await?;
    Ok(catalog::categories(&products))
}

#[tauri::command]
pub async fn products_by_category(
    arg0: Option<Value>,
    ctx: tauri::State<'_, AppContext>,
) -> Result<Vec<Product>, String> {
    ctx.require_session()?;
    let category = payload_arg0_as_string(arg0, &["category", "value"])
        .unwrap_or_else(|| catalog::ALL_CATEGORIES.to_string());
    let products = catalog::fetch_products(&ctx.store).await?;
    Ok(catalog::filter_by_category(&products, &category)
        .into_iter()
        .cloned()
        .collect())
}

#[tauri::command]
pub async fn product_category_choices() -> Result<Vec<&'static str>, String> {
    Ok(PRODUCT_CATEGORIES.to_vec())
}

#[tauri::command]
pub async fn cups_list(ctx: tauri::State<'_, AppContext>) -> Result<Vec<CupItem>, String> {
    ctx.require_session()?;
    Ok(ctx.store.fetch_cups().await?)
}

/// Cup types with enough stock for the cart in `arg0`.
#[tauri::command]
pub async fn cups_usable(
    arg0: Option<Value>,
    ctx: tauri::State<'_, AppContext>,
) -> Result<Vec<CupItem>, String> {
    ctx.require_session()?;
    let cart: Cart = parse_payload(arg0, "cart")?;
    let cups = ctx.store.fetch_cups().await?;
    Ok(checkout::usable_cups(&cups, &cart)
        .into_iter()
        .cloned()
        .collect())
}

#[tauri::command]
pub async fn checkout_submit(
    arg0: Option<Value>,
    ctx: tauri::State<'_, AppContext>,
) -> Result<CheckoutReceipt, String> {
    let payload: CheckoutPayload = parse_payload(arg0, "checkout")?;
    Ok(ctx
        .checkout(&payload.cart, payload.cup_id.as_deref(), payload.payment_method)
        .await?)
}

#[tauri::command]
pub async fn purchase_submit(
    arg0: Option<Value>,
    ctx: tauri::State<'_, AppContext>,
) -> Result<Purchase, String> {
    let draft: PurchaseDraft = parse_payload(arg0, "purchase")?;
    Ok(ctx.record_purchase(draft).await?)
}

#[tauri::command]
pub async fn dashboard_get_summary(
    ctx: tauri::State<'_, AppContext>,
) -> Result<DashboardSummary, String> {
    Ok(ctx.dashboard().await?)
}

#[tauri::command]
pub async fn ledger_query(
    arg0: Option<Value>,
    ctx: tauri::State<'_, AppContext>,
) -> Result<LedgerView, String> {
    ctx.require_session()?;
    let query: LedgerQuery = parse_optional_payload(arg0, "ledger query")?;
    Ok(ledger::ledger_view(&ctx.store, &query).await?)
}
