//! Product catalog.
//!
//! The catalog is small and edited rarely, so every save replaces the whole
//! `Products` tab instead of diffing rows.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::db;
use crate::error::{PosError, PosResult};
use crate::models::Product;
use crate::sheet::SheetTab;
use crate::storage::{Store, KEY_PRODUCTS};

/// Pseudo-category that selects every product.
pub const ALL_CATEGORIES: &str = "Semua";

/// Categories offered by the admin product form.
pub const PRODUCT_CATEGORIES: &[&str] = &["Teh", "Kopi", "Susu", "Coklat", "Makanan", "Lainnya"];

pub const DEFAULT_CATEGORY: &str = "Teh";

/// Product form input. `id` is set when editing an existing product.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub price: i64,
    #[serde(default)]
    pub category: String,
}

/// Reject blank names and non-positive prices.
pub fn validate_product(draft: &ProductDraft) -> PosResult<()> {
    if draft.name.trim().is_empty() {
        return Err(PosError::validation("Product name is required"));
    }
    if draft.price <= 0 {
        return Err(PosError::validation("Product price must be greater than zero"));
    }
    Ok(())
}

pub(crate) fn new_id() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}

/// Apply a draft to the list: replace by id when editing, append otherwise.
pub fn upsert_product(products: &[Product], draft: &ProductDraft) -> PosResult<Vec<Product>> {
    validate_product(draft)?;

    let category = match draft.category.trim() {
        "" => DEFAULT_CATEGORY.to_string(),
        c => c.to_string(),
    };
    let editing = draft
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());

    let item = Product {
        id: editing.map(str::to_string).unwrap_or_else(new_id),
        name: draft.name.trim().to_string(),
        price: draft.price,
        category,
    };

    let mut updated = products.to_vec();
    match editing.and_then(|id| updated.iter().position(|p| p.id == id)) {
        Some(idx) => updated[idx] = item,
        None => updated.push(item),
    }
    Ok(updated)
}

pub fn remove_product(products: &[Product], id: &str) -> Vec<Product> {
    products.iter().filter(|p| p.id != id).cloned().collect()
}

/// `"Semua"` followed by the distinct categories in first-seen order.
pub fn categories(products: &[Product]) -> Vec<String> {
    let mut out = vec![ALL_CATEGORIES.to_string()];
    for p in products {
        if !out.iter().any(|c| c == &p.category) {
            out.push(p.category.clone());
        }
    }
    out
}

pub fn filter_by_category<'a>(products: &'a [Product], category: &str) -> Vec<&'a Product> {
    if category == ALL_CATEGORIES {
        return products.iter().collect();
    }
    products.iter().filter(|p| p.category == category).collect()
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

pub async fn fetch_products(store: &Store) -> PosResult<Vec<Product>> {
    let (products, source) = store
        .load_tab(SheetTab::Products, KEY_PRODUCTS, Product::from_row, false)
        .await?;
    info!(count = products.len(), source = ?source, "products loaded");
    Ok(products)
}

/// Replace the catalog locally, then on the sheet.
pub async fn save_products(store: &Store, products: &[Product]) -> PosResult<()> {
    db::write_local_json(store.db(), KEY_PRODUCTS, products)?;
    if let Some(remote) = store.remote()? {
        let rows = products.iter().map(Product::to_row).collect();
        remote.update_products(rows).await.map_err(|e| {
            warn!(error = %e, "failed to sync products to web app");
            e
        })?;
    }
    info!(count = products.len(), "catalog saved");
    Ok(())
}

/// Validate, apply and persist a product form submission.
pub async fn save_product(store: &Store, draft: &ProductDraft) -> PosResult<Vec<Product>> {
    let current = fetch_products(store).await?;
    let updated = upsert_product(&current, draft)?;
    save_products(store, &updated).await?;
    Ok(updated)
}

pub async fn delete_product(store: &Store, id: &str) -> PosResult<Vec<Product>> {
    let current = fetch_products(store).await?;
    let updated = remove_product(&current, id);
    save_products(store, &updated).await?;
    Ok(updated)
}
