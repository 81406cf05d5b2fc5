//! Spreadsheet-style view over the sales and purchase ledgers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PosResult;
use crate::models::{LedgerKind, Purchase, Transaction};
use crate::storage::{DataSource, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    All,
    Today,
    Month,
}

impl Period {
    /// Date prefix a record must start with, if any.
    pub fn prefix(&self, now: DateTime<Utc>) -> Option<String> {
        match self {
            Period::All => None,
            Period::Today => Some(now.format("%Y-%m-%d").to_string()),
            Period::Month => Some(now.format("%Y-%m").to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerQuery {
    #[serde(default)]
    pub view: LedgerKind,
    #[serde(default)]
    pub period: Period,
    #[serde(default)]
    pub search: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LedgerRow {
    Sale(Transaction),
    Purchase(Purchase),
}

impl LedgerRow {
    pub fn total(&self) -> i64 {
        match self {
            LedgerRow::Sale(t) => t.total,
            LedgerRow::Purchase(p) => p.total,
        }
    }

    pub fn quantity(&self) -> i64 {
        match self {
            LedgerRow::Sale(t) => t.quantity,
            LedgerRow::Purchase(p) => p.quantity,
        }
    }

    pub fn date(&self) -> &str {
        match self {
            LedgerRow::Sale(t) => &t.date,
            LedgerRow::Purchase(p) => &p.date,
        }
    }

    /// Case-insensitive match; `needle` must already be lowercase.
    fn matches(&self, needle: &str) -> bool {
        let hit = |field: &str| field.to_lowercase().contains(needle);
        match self {
            LedgerRow::Sale(t) => {
                hit(&t.product_name)
                    || hit(&t.category)
                    || hit(&t.id)
                    || hit(t.payment_method.as_str())
            }
            LedgerRow::Purchase(p) => hit(&p.item_name) || hit(&p.supplier) || hit(&p.id),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerView {
    pub view: LedgerKind,
    pub period: Period,
    pub rows: Vec<LedgerRow>,
    pub total_amount: i64,
    pub total_qty: i64,
    pub source: DataSource,
}

/// Filter one ledger by period and search text, then total what is left.
pub fn filter_ledger(
    transactions: &[Transaction],
    purchases: &[Purchase],
    query: &LedgerQuery,
    now: DateTime<Utc>,
    source: DataSource,
) -> LedgerView {
    let rows: Vec<LedgerRow> = match query.view {
        LedgerKind::Sales => transactions.iter().cloned().map(LedgerRow::Sale).collect(),
        LedgerKind::Purchases => purchases.iter().cloned().map(LedgerRow::Purchase).collect(),
    };

    let prefix = query.period.prefix(now);
    let needle = query.search.trim().to_lowercase();
    let rows: Vec<LedgerRow> = rows
        .into_iter()
        .filter(|row| prefix.as_deref().map_or(true, |p| row.date().starts_with(p)))
        .filter(|row| needle.is_empty() || row.matches(&needle))
        .collect();

    LedgerView {
        view: query.view,
        period: query.period,
        total_amount: rows.iter().map(LedgerRow::total).sum(),
        total_qty: rows.iter().map(LedgerRow::quantity).sum(),
        rows,
        source,
    }
}

/// Load both ledgers and apply `query`.
pub async fn ledger_view(store: &Store, query: &LedgerQuery) -> PosResult<LedgerView> {
    let (transactions, purchases) = match query.view {
        LedgerKind::Sales => (store.fetch_transactions().await?, Vec::new()),
        LedgerKind::Purchases => (Vec::new(), store.fetch_purchases().await?),
    };
    let source = if store.is_remote_configured() {
        DataSource::Remote
    } else {
        DataSource::Local
    };
    Ok(filter_ledger(&transactions, &purchases, query, Utc::now(), source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentMethod;
    use crate::storage::tests::{offline_store, sale};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).single().expect("valid date")
    }

    fn sales() -> Vec<Transaction> {
        let mut a = sale("A1", 2, 5000);
        let mut b = sale("B2", 1, 8000);
        b.product_name = "Kopi Susu".into();
        b.category = "Kopi".into();
        b.payment_method = PaymentMethod::Qris;
        b.date = "2025-02-10T08:00:00.000Z".into();
        let mut c = sale("C3", 4, 3000);
        c.date = "2024-12-31T08:00:00.000Z".into();
        a.date = "2025-03-01T08:00:00.000Z".into();
        vec![a, b, c]
    }

    fn query(period: Period, search: &str) -> LedgerQuery {
        LedgerQuery {
            view: LedgerKind::Sales,
            period,
            search: search.into(),
        }
    }

    #[test]
    fn period_filters_by_date_prefix() {
        let all = filter_ledger(&sales(), &[], &query(Period::All, ""), now(), DataSource::Local);
        assert_eq!(all.rows.len(), 3);
        assert_eq!(all.total_amount, 30000);
        assert_eq!(all.total_qty, 7);

        let today = filter_ledger(&sales(), &[], &query(Period::Today, ""), now(), DataSource::Local);
        assert_eq!(today.rows.len(), 1);
        assert_eq!(today.total_amount, 10000);

        let month = filter_ledger(&sales(), &[], &query(Period::Month, ""), now(), DataSource::Local);
        assert_eq!(month.rows.len(), 1);
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let by_payment = filter_ledger(&sales(), &[], &query(Period::All, "qris"), now(), DataSource::Local);
        assert_eq!(by_payment.rows.len(), 1);
        assert_eq!(by_payment.total_amount, 8000);

        let by_id = filter_ledger(&sales(), &[], &query(Period::All, "c3"), now(), DataSource::Local);
        assert_eq!(by_id.total_qty, 4);

        let none = filter_ledger(&sales(), &[], &query(Period::All, "matcha"), now(), DataSource::Local);
        assert!(none.rows.is_empty());
        assert_eq!(none.total_amount, 0);
    }

    #[test]
    fn purchase_view_searches_supplier() {
        let purchases = vec![
            Purchase {
                id: "p1".into(),
                date: "2025-03-01T07:00:00.000Z".into(),
                item_name: "Gula".into(),
                quantity: 2,
                price: 15000,
                total: 30000,
                supplier: "Toko Makmur".into(),
            },
            Purchase {
                id: "p2".into(),
                date: "2025-03-01T07:30:00.000Z".into(),
                item_name: "Cup".into(),
                quantity: 100,
                price: 300,
                total: 30000,
                supplier: "-".into(),
            },
        ];
        let q = LedgerQuery {
            view: LedgerKind::Purchases,
            period: Period::Today,
            search: "MAKMUR".into(),
        };
        let view = filter_ledger(&[], &purchases, &q, now(), DataSource::Remote);
        assert_eq!(view.rows.len(), 1);
        assert_eq!(view.total_qty, 2);
        assert_eq!(view.source, DataSource::Remote);
    }

    #[tokio::test]
    async fn offline_view_reports_local_source() {
        let store = offline_store();
        store.add_transaction(&sale("1", 1, 5000)).await.expect("sale");
        let view = ledger_view(&store, &LedgerQuery::default()).await.expect("view");
        assert_eq!(view.source, DataSource::Local);
        assert_eq!(view.rows.len(), 1);
    }
}
