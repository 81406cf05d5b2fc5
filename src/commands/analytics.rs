use serde_json::Value;

use crate::analyst::{FinancialStats, SUGGESTED_QUESTIONS};
use crate::payloads::payload_arg0_as_string;
use crate::AppContext;

#[tauri::command]
pub async fn analyst_get_stats(
    ctx: tauri::State<'_, AppContext>,
) -> Result<FinancialStats, String> {
    Ok(ctx.analyst_stats().await?)
}

#[tauri::command]
pub async fn analyst_ask(
    arg0: Option<Value>,
    ctx: tauri::State<'_, AppContext>,
) -> Result<String, String> {
    let question = payload_arg0_as_string(arg0, &["question", "query", "value"]).unwrap_or_default();
    Ok(ctx.ask_analyst(&question).await?)
}

#[tauri::command]
pub async fn analyst_suggestions() -> Result<Vec<&'static str>, String> {
    Ok(SUGGESTED_QUESTIONS.to_vec())
}
