//! Plain records shared by every screen, plus the positional row layout the
//! spreadsheet web app uses for each of them.
//!
//! Rows coming back from the sheet are loosely typed (a price cell may be a
//! number or a numeric string, an empty row may be all blanks), so the
//! `from_row` constructors are lenient and return `None` only for rows that
//! carry no identity at all.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PosError, PosResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentMethod {
    #[default]
    Cash,
    #[serde(rename = "QRIS")]
    Qris,
    Transfer,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::Cash,
        PaymentMethod::Qris,
        PaymentMethod::Transfer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Qris => "QRIS",
            PaymentMethod::Transfer => "Transfer",
        }
    }

    /// Parse a sheet cell. Blank or unknown values count as cash.
    pub fn from_cell(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "qris" => PaymentMethod::Qris,
            "transfer" => PaymentMethod::Transfer,
            _ => PaymentMethod::Cash,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub date: String,
    pub product_name: String,
    pub category: String,
    pub quantity: i64,
    pub price: i64,
    pub total: i64,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cup_id: Option<String>,
}

impl Transaction {
    /// `[id, date, productName, category, qty, price, total, paymentMethod]`
    pub fn to_row(&self) -> Value {
        serde_json::json!([
            self.id,
            self.date,
            self.product_name,
            self.category,
            self.quantity,
            self.price,
            self.total,
            self.payment_method.as_str(),
        ])
    }

    pub fn from_row(row: &Value) -> Option<Self> {
        if !cell_present(row, 0) || !cell_present(row, 2) {
            return None;
        }
        Some(Self {
            id: cell_string(row, 0),
            date: cell_string(row, 1),
            product_name: cell_string(row, 2),
            category: cell_string(row, 3),
            quantity: cell_number(row, 4),
            price: cell_number(row, 5),
            total: cell_number(row, 6),
            payment_method: PaymentMethod::from_cell(&cell_string(row, 7)),
            cup_id: None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: String,
    pub date: String,
    pub item_name: String,
    pub quantity: i64,
    pub price: i64,
    pub total: i64,
    pub supplier: String,
}

impl Purchase {
    /// `[id, date, itemName, supplier, qty, price, total]`
    pub fn to_row(&self) -> Value {
        serde_json::json!([
            self.id,
            self.date,
            self.item_name,
            self.supplier,
            self.quantity,
            self.price,
            self.total,
        ])
    }

    pub fn from_row(row: &Value) -> Option<Self> {
        if !cell_present(row, 0) || !cell_present(row, 2) {
            return None;
        }
        Some(Self {
            id: cell_string(row, 0),
            date: cell_string(row, 1),
            item_name: cell_string(row, 2),
            supplier: cell_string(row, 3),
            quantity: cell_number(row, 4),
            price: cell_number(row, 5),
            total: cell_number(row, 6),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: i64,
    pub category: String,
}

impl Product {
    /// `[id, name, price, category]`
    pub fn to_row(&self) -> Value {
        serde_json::json!([self.id, self.name, self.price, self.category])
    }

    pub fn from_row(row: &Value) -> Option<Self> {
        if !cell_present(row, 0) || !cell_present(row, 1) {
            return None;
        }
        Some(Self {
            id: cell_string(row, 0),
            name: cell_string(row, 1),
            price: cell_number(row, 2),
            category: cell_string(row, 3),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CupItem {
    pub id: String,
    pub name: String,
    pub stock: i64,
}

impl CupItem {
    /// `[id, name, stock]`
    pub fn to_row(&self) -> Value {
        serde_json::json!([self.id, self.name, self.stock])
    }

    pub fn from_row(row: &Value) -> Option<Self> {
        if !cell_present(row, 0) {
            return None;
        }
        Some(Self {
            id: cell_string(row, 0),
            name: cell_string(row, 1),
            stock: cell_number(row, 2),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Cashier,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Cashier => "cashier",
        }
    }

    pub fn setting_key(&self) -> SettingKey {
        match self {
            Role::Admin => SettingKey::AdminPin,
            Role::Cashier => SettingKey::CashierPin,
        }
    }
}

/// Keys of the sheet's `Settings` tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingKey {
    #[serde(rename = "ADMIN_PIN")]
    AdminPin,
    #[serde(rename = "CASHIER_PIN")]
    CashierPin,
}

impl SettingKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::AdminPin => "ADMIN_PIN",
            SettingKey::CashierPin => "CASHIER_PIN",
        }
    }

    pub fn default_pin(&self) -> &'static str {
        match self {
            SettingKey::AdminPin => "1234",
            SettingKey::CashierPin => "0000",
        }
    }
}

/// The two append-only ledgers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LedgerKind {
    #[default]
    Sales,
    Purchases,
}

impl LedgerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerKind::Sales => "sales",
            LedgerKind::Purchases => "purchases",
        }
    }
}

// ---------------------------------------------------------------------------
// Cell helpers
// ---------------------------------------------------------------------------

fn cell(row: &Value, idx: usize) -> Option<&Value> {
    row.as_array().and_then(|cells| cells.get(idx))
}

/// Whether a cell holds something truthy (non-blank text, non-zero number).
pub(crate) fn cell_present(row: &Value, idx: usize) -> bool {
    match cell(row, idx) {
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(Value::Bool(b)) => *b,
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
        Some(Value::Null) | None => false,
    }
}

/// `quantity * price`, refused when it does not fit in an `i64`.
pub fn line_total(quantity: i64, price: i64) -> PosResult<i64> {
    quantity
        .checked_mul(price)
        .ok_or_else(|| PosError::validation("Amount too large"))
}

pub(crate) fn cell_string(row: &Value, idx: usize) -> String {
    match cell(row, idx) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Numeric cell as whole Rupiah/units. Anything unparsable is 0.
pub(crate) fn cell_number(row: &Value, idx: usize) -> i64 {
    match cell(row, idx) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| {
                    trimmed
                        .parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.round() as i64)
                })
                .unwrap_or(0)
        }
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sale_row_parses_numeric_strings_and_defaults_payment() {
        let row = json!(["17001", "2025-03-01T09:15:00.000Z", "Es Teh", "Teh", "2", 5000, "10000"]);
        let t = Transaction::from_row(&row).expect("row with id and name");
        assert_eq!(t.quantity, 2);
        assert_eq!(t.price, 5000);
        assert_eq!(t.total, 10000);
        assert_eq!(t.payment_method, PaymentMethod::Cash);
        assert!(t.cup_id.is_none());
    }

    #[test]
    fn rows_without_identity_are_skipped() {
        assert!(Transaction::from_row(&json!(["", "2025-03-01", "Es Teh"])).is_none());
        assert!(Transaction::from_row(&json!(["1", "2025-03-01", ""])).is_none());
        assert!(Purchase::from_row(&json!([null, null, null])).is_none());
        assert!(Product::from_row(&json!(["p1"])).is_none());
    }

    #[test]
    fn garbage_numbers_become_zero() {
        let row = json!(["p1", "Kopi Susu", "abc", "Kopi"]);
        let p = Product::from_row(&row).expect("product row");
        assert_eq!(p.price, 0);
        assert_eq!(p.category, "Kopi");
    }

    #[test]
    fn numeric_id_cells_are_stringified() {
        let row = json!([1700000000123_i64, "Cup 16oz", 40]);
        let cup = CupItem::from_row(&row).expect("cup row");
        assert_eq!(cup.id, "1700000000123");
        assert_eq!(cup.stock, 40);
    }

    #[test]
    fn transaction_json_uses_camel_case_and_payment_labels() {
        let t = Transaction {
            id: "1".into(),
            date: "2025-03-01T09:15:00Z".into(),
            product_name: "Es Teh".into(),
            category: "Teh".into(),
            quantity: 1,
            price: 5000,
            total: 5000,
            payment_method: PaymentMethod::Qris,
            cup_id: Some("c1".into()),
        };
        let v = serde_json::to_value(&t).expect("serialize");
        assert_eq!(v["productName"], "Es Teh");
        assert_eq!(v["paymentMethod"], "QRIS");
        assert_eq!(v["cupId"], "c1");
        assert_eq!(t.to_row()[7], "QRIS");
    }

    #[test]
    fn payment_method_cells_are_case_insensitive() {
        assert_eq!(PaymentMethod::from_cell("qris"), PaymentMethod::Qris);
        assert_eq!(PaymentMethod::from_cell(" Transfer "), PaymentMethod::Transfer);
        assert_eq!(PaymentMethod::from_cell(""), PaymentMethod::Cash);
    }
}
