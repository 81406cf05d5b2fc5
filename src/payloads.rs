//! Shapes of the `arg0` payloads the front end sends with IPC commands.
//!
//! Kept outside the desktop-only command layer so parsing is tested without
//! a webview.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::checkout::Cart;
use crate::models::{LedgerKind, PaymentMethod, Role};

/// Pull a string out of `arg0`, either directly or from the first of `keys`
/// present on an object payload.
pub fn payload_arg0_as_string(arg0: Option<Value>, keys: &[&str]) -> Option<String> {
    let raw = match arg0? {
        Value::String(s) => s,
        Value::Object(map) => keys
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str).map(str::to_string))?,
        _ => return None,
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Deserialize an object payload.
pub fn parse_payload<T: DeserializeOwned>(arg0: Option<Value>, what: &str) -> Result<T, String> {
    let payload = arg0.ok_or_else(|| format!("Missing {what} payload"))?;
    serde_json::from_value(payload).map_err(|e| format!("Invalid {what} payload: {e}"))
}

/// Like [`parse_payload`], but a missing payload means the default.
pub fn parse_optional_payload<T: DeserializeOwned + Default>(
    arg0: Option<Value>,
    what: &str,
) -> Result<T, String> {
    match arg0 {
        Some(Value::Null) | None => Ok(T::default()),
        Some(v) => parse_payload(Some(v), what),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
    pub cart: Cart,
    #[serde(default, alias = "cup_id")]
    pub cup_id: Option<String>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinChangePayload {
    pub role: Role,
    pub pin: String,
    pub confirmation: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPayload {
    #[serde(rename = "type", alias = "kind")]
    pub kind: LedgerKind,
    #[serde(default)]
    pub confirmed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{LedgerQuery, Period};
    use serde_json::json;

    #[test]
    fn string_arg_or_first_present_key() {
        assert_eq!(
            payload_arg0_as_string(Some(json!("  https://x  ")), &["url"]).as_deref(),
            Some("https://x")
        );
        assert_eq!(
            payload_arg0_as_string(Some(json!({"webAppUrl": "a", "value": "b"})), &["url", "webAppUrl", "value"])
                .as_deref(),
            Some("a")
        );
        assert_eq!(payload_arg0_as_string(Some(json!({"url": "   "})), &["url"]), None);
        assert_eq!(payload_arg0_as_string(Some(json!(42)), &["url"]), None);
        assert_eq!(payload_arg0_as_string(None, &["url"]), None);
    }

    #[test]
    fn checkout_payload_accepts_both_cup_id_spellings() {
        let camel: CheckoutPayload = parse_payload(
            Some(json!({
                "cart": {"items": [{"productName": "Es Teh", "category": "Teh", "price": 5000, "quantity": 2}]},
                "cupId": "c1",
                "paymentMethod": "QRIS"
            })),
            "checkout",
        )
        .expect("camelCase payload");
        assert_eq!(camel.cup_id.as_deref(), Some("c1"));
        assert_eq!(camel.payment_method, PaymentMethod::Qris);
        assert_eq!(camel.cart.item_count().expect("count"), 2);

        let snake: CheckoutPayload =
            parse_payload(Some(json!({"cart": {"items": []}, "cup_id": "c2"})), "checkout")
                .expect("snake_case cup id");
        assert_eq!(snake.cup_id.as_deref(), Some("c2"));
        assert_eq!(snake.payment_method, PaymentMethod::Cash);
    }

    #[test]
    fn reset_payload_reads_type_or_kind() {
        let by_type: ResetPayload =
            parse_payload(Some(json!({"type": "purchases", "confirmed": true})), "reset")
                .expect("type field");
        assert_eq!(by_type.kind, LedgerKind::Purchases);
        assert!(by_type.confirmed);

        let by_kind: ResetPayload =
            parse_payload(Some(json!({"kind": "sales"})), "reset").expect("kind field");
        assert_eq!(by_kind.kind, LedgerKind::Sales);
        assert!(!by_kind.confirmed);
    }

    #[test]
    fn pin_change_payload_needs_every_field() {
        let ok: PinChangePayload = parse_payload(
            Some(json!({"role": "CASHIER", "pin": "2468", "confirmation": "2468"})),
            "PIN change",
        )
        .expect("complete payload");
        assert_eq!(ok.role, Role::Cashier);

        let err = parse_payload::<PinChangePayload>(Some(json!({"role": "ADMIN"})), "PIN change")
            .err()
            .expect("missing pin");
        assert!(err.starts_with("Invalid PIN change payload"));
        let err = parse_payload::<PinChangePayload>(None, "PIN change")
            .err()
            .expect("missing payload");
        assert_eq!(err, "Missing PIN change payload");
    }

    #[test]
    fn missing_ledger_query_uses_defaults() {
        let query: LedgerQuery = parse_optional_payload(None, "ledger query").expect("default");
        assert_eq!(query.period, Period::All);
        assert_eq!(query.view, LedgerKind::Sales);

        let query: LedgerQuery =
            parse_optional_payload(Some(json!({"view": "purchases", "period": "month"})), "ledger query")
                .expect("parsed");
        assert_eq!(query.view, LedgerKind::Purchases);
        assert_eq!(query.period, Period::Month);
    }
}
