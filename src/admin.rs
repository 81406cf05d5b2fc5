//! Admin panel operations: web app link, PINs, cup types and ledger reset.
//!
//! Callers are expected to have checked the session with
//! [`crate::auth::require_admin`].

use serde::Deserialize;
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::auth;
use crate::catalog::new_id;
use crate::error::{PosError, PosResult};
use crate::models::{CupItem, LedgerKind, Role};
use crate::storage::Store;

/// Save the web app URL. The caller reloads afterwards.
pub fn configure_web_app(store: &Store, url: &str) -> PosResult<String> {
    store.save_web_app_url(url)
}

/// Validate and store a new PIN for `role`.
pub async fn change_pin(
    store: &Store,
    role: Role,
    pin: impl Into<Zeroizing<String>>,
    confirmation: impl Into<Zeroizing<String>>,
) -> PosResult<()> {
    let pin: Zeroizing<String> = pin.into();
    let confirmation: Zeroizing<String> = confirmation.into();
    auth::validate_new_pin(pin.trim(), confirmation.trim())?;
    store.save_setting(role.setting_key(), pin.trim()).await?;
    info!(role = role.as_str(), "PIN changed");
    Ok(())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CupDraft {
    pub name: String,
    #[serde(default)]
    pub stock: Option<i64>,
}

impl CupDraft {
    fn into_cup(self) -> PosResult<CupItem> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(PosError::validation("Cup name is required"));
        }
        let stock = self
            .stock
            .ok_or_else(|| PosError::validation("Cup stock is required"))?;
        if stock < 0 {
            return Err(PosError::validation("Cup stock cannot be negative"));
        }
        Ok(CupItem {
            id: new_id(),
            name: name.to_string(),
            stock,
        })
    }
}

pub async fn add_cup(store: &Store, draft: CupDraft) -> PosResult<Vec<CupItem>> {
    let cup = draft.into_cup()?;
    let mut cups = store.fetch_cups().await?;
    info!(id = %cup.id, name = %cup.name, stock = cup.stock, "adding cup type");
    cups.push(cup);
    store.save_cups(&cups).await?;
    Ok(cups)
}

pub async fn delete_cup(store: &Store, id: &str) -> PosResult<Vec<CupItem>> {
    let cups: Vec<CupItem> = store
        .fetch_cups()
        .await?
        .into_iter()
        .filter(|c| c.id != id)
        .collect();
    store.save_cups(&cups).await?;
    info!(id, "cup type removed");
    Ok(cups)
}

/// Permanently empty a ledger. `confirmed` must be set by the caller after
/// asking the user.
pub async fn reset_ledger(store: &Store, kind: LedgerKind, confirmed: bool) -> PosResult<()> {
    if !confirmed {
        return Err(PosError::validation(format!(
            "Resetting {} needs explicit confirmation",
            kind.as_str()
        )));
    }
    warn!(ledger = kind.as_str(), "resetting ledger");
    store.reset_data(kind).await
}
