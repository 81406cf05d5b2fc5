//! Expense entry: stock bought from suppliers.

use chrono::{SecondsFormat, Utc};
use serde::Deserialize;

use crate::catalog::new_id;
use crate::error::{PosError, PosResult};
use crate::models::{line_total, Purchase};
use crate::storage::Store;

pub const UNKNOWN_SUPPLIER: &str = "-";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseDraft {
    pub item_name: String,
    #[serde(default)]
    pub supplier: String,
    pub quantity: i64,
    pub price: i64,
}

impl PurchaseDraft {
    pub fn validate(&self) -> PosResult<()> {
        if self.item_name.trim().is_empty() {
            return Err(PosError::validation("Item name is required"));
        }
        if self.quantity <= 0 {
            return Err(PosError::validation("Quantity must be greater than zero"));
        }
        if self.price <= 0 {
            return Err(PosError::validation("Unit price must be greater than zero"));
        }
        Ok(())
    }

    pub fn total(&self) -> PosResult<i64> {
        line_total(self.quantity, self.price)
    }

    /// Validated purchase stamped with the current time.
    pub fn into_purchase(self) -> PosResult<Purchase> {
        self.validate()?;
        let supplier = match self.supplier.trim() {
            "" => UNKNOWN_SUPPLIER.to_string(),
            s => s.to_string(),
        };
        let total = self.total()?;
        Ok(Purchase {
            id: new_id(),
            date: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            total,
            item_name: self.item_name.trim().to_string(),
            quantity: self.quantity,
            price: self.price,
            supplier,
        })
    }
}

pub async fn record_purchase(store: &Store, draft: PurchaseDraft) -> PosResult<Purchase> {
    let purchase = draft.into_purchase()?;
    store.add_purchase(&purchase).await?;
    Ok(purchase)
}

pub fn total_purchases(purchases: &[Purchase]) -> i64 {
    purchases.iter().map(|p| p.total).sum()
}
