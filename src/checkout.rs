//! Cashier cart and checkout.
//!
//! Every drink leaves in a cup, so a checkout consumes one cup per item from
//! the cup type the cashier picks. The cart is refused when that cup type
//! cannot cover the whole cart.

use std::collections::HashSet;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{PosError, PosResult};
use crate::models::{line_total, CupItem, PaymentMethod, Product, Transaction};

/// Line ids carry a three digit suffix, so one batch holds at most this many.
pub const MAX_CART_LINES: usize = 1000;
use crate::storage::Store;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_name: String,
    pub category: String,
    pub price: i64,
    pub quantity: i64,
}

impl CartItem {
    pub fn subtotal(&self) -> PosResult<i64> {
        line_total(self.quantity, self.price)
    }

    fn validate(&self) -> PosResult<()> {
        if self.product_name.trim().is_empty() {
            return Err(PosError::validation("Cart line has no product"));
        }
        if self.quantity <= 0 {
            return Err(PosError::validation(format!(
                "Quantity of {} must be greater than zero",
                self.product_name
            )));
        }
        if self.price <= 0 {
            return Err(PosError::validation(format!(
                "Price of {} must be greater than zero",
                self.product_name
            )));
        }
        Ok(())
    }
}

/// Lines are keyed by product name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add one unit of a product.
    pub fn add(&mut self, product: &Product) {
        match self
            .items
            .iter_mut()
            .find(|item| item.product_name == product.name)
        {
            Some(item) => item.quantity += 1,
            None => self.items.push(CartItem {
                product_name: product.name.clone(),
                category: product.category.clone(),
                price: product.price,
                quantity: 1,
            }),
        }
    }

    /// Change a line's quantity by `delta`. Lines that reach zero are removed.
    pub fn update_quantity(&mut self, product_name: &str, delta: i64) {
        for item in self.items.iter_mut() {
            if item.product_name == product_name {
                item.quantity = (item.quantity + delta).max(0);
            }
        }
        self.items.retain(|item| item.quantity > 0);
    }

    pub fn quantity_of(&self, product_name: &str) -> i64 {
        self.items
            .iter()
            .find(|item| item.product_name == product_name)
            .map(|item| item.quantity)
            .unwrap_or(0)
    }

    pub fn total(&self) -> PosResult<i64> {
        self.items.iter().try_fold(0_i64, |acc, item| {
            acc.checked_add(item.subtotal()?)
                .ok_or_else(|| PosError::validation("Amount too large"))
        })
    }

    pub fn item_count(&self) -> PosResult<i64> {
        self.items.iter().try_fold(0_i64, |acc, item| {
            acc.checked_add(item.quantity)
                .ok_or_else(|| PosError::validation("Too many items in cart"))
        })
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// Cup types that can cover the whole cart.
pub fn usable_cups<'a>(cups: &'a [CupItem], cart: &Cart) -> Vec<&'a CupItem> {
    match cart.item_count() {
        Ok(needed) => cups.iter().filter(|cup| cup.stock >= needed).collect(),
        Err(_) => Vec::new(),
    }
}

/// Check the cart against the cup list before anything is written.
pub fn validate_checkout<'a>(
    cart: &Cart,
    cups: &'a [CupItem],
    cup_id: Option<&str>,
) -> PosResult<&'a CupItem> {
    if cart.is_empty() {
        return Err(PosError::validation("Cart is empty"));
    }
    if cart.items.len() > MAX_CART_LINES {
        return Err(PosError::validation("Too many lines in one checkout"));
    }
    for item in &cart.items {
        item.validate()?;
    }
    cart.total()?;
    if cups.is_empty() {
        return Err(PosError::validation(
            "No cup types yet; add them in the admin panel",
        ));
    }
    let cup_id = cup_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| PosError::validation("Choose a cup type first"))?;
    let cup = cups
        .iter()
        .find(|cup| cup.id == cup_id)
        .ok_or_else(|| PosError::validation("Selected cup type no longer exists"))?;

    let needed = cart.item_count()?;
    if cup.stock < needed {
        return Err(PosError::validation(format!(
            "Not enough {} in stock (left: {}, needed: {needed})",
            cup.name, cup.stock
        )));
    }
    Ok(cup)
}

/// `count` ids of `batch` followed by three random digits, no two alike.
fn line_ids(batch: &str, count: usize) -> PosResult<Vec<String>> {
    if count > MAX_CART_LINES {
        return Err(PosError::validation("Too many lines in one checkout"));
    }
    let mut taken = HashSet::with_capacity(count);
    let mut ids = Vec::with_capacity(count);
    while ids.len() < count {
        let suffix = Uuid::new_v4().as_u128() % MAX_CART_LINES as u128;
        if taken.insert(suffix) {
            ids.push(format!("{batch}{suffix:03}"));
        }
    }
    Ok(ids)
}

/// Turn the cart into one transaction per line, sharing timestamp and
/// payment method.
pub fn build_transactions(
    cart: &Cart,
    payment_method: PaymentMethod,
    cup_id: &str,
) -> PosResult<Vec<Transaction>> {
    let now = Utc::now();
    let batch = now.timestamp_millis().to_string();
    let date = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    let ids = line_ids(&batch, cart.items.len())?;

    cart.items
        .iter()
        .zip(ids)
        .map(|(item, id)| {
            Ok(Transaction {
                id,
                date: date.clone(),
                product_name: item.product_name.clone(),
                category: item.category.clone(),
                quantity: item.quantity,
                price: item.price,
                total: item.subtotal()?,
                payment_method,
                cup_id: Some(cup_id.to_string()),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
    pub transactions: Vec<Transaction>,
    pub total: i64,
    pub item_count: i64,
    pub cup_id: String,
    pub cup_remaining: i64,
    pub cups: Vec<CupItem>,
}

/// Record the cart as sales and take the cups out of stock.
///
/// Validation happens before anything is written. A network failure while
/// pushing a sale aborts the checkout; sales already written stay recorded.
pub async fn checkout(
    store: &Store,
    cart: &Cart,
    cup_id: Option<&str>,
    payment_method: PaymentMethod,
) -> PosResult<CheckoutReceipt> {
    let cups = store.fetch_cups().await?;
    let cup = validate_checkout(cart, &cups, cup_id)?.clone();
    let item_count = cart.item_count()?;
    let total = cart.total()?;

    let transactions = build_transactions(cart, payment_method, &cup.id)?;
    for transaction in &transactions {
        store.add_transaction(transaction).await?;
    }

    let updated: Vec<CupItem> = cups
        .into_iter()
        .map(|mut c| {
            if c.id == cup.id {
                c.stock -= item_count;
            }
            c
        })
        .collect();
    if let Err(e) = store.save_cups(&updated).await {
        // Sales are already on record; the stock change is kept locally.
        warn!(cup_id = %cup.id, error = %e, "cup stock not synced after checkout");
    }

    let cup_remaining = cup.stock - item_count;
    info!(
        lines = transactions.len(),
        items = item_count,
        total,
        payment = payment_method.as_str(),
        cup_id = %cup.id,
        cup_remaining,
        "checkout complete"
    );

    Ok(CheckoutReceipt {
        total,
        item_count,
        cup_id: cup.id,
        cup_remaining,
        cups: updated,
        transactions,
    })
}
