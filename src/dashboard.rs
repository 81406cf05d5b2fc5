//! Store summary shown after login.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;

use crate::models::{Purchase, Transaction};

pub const RECENT_ACTIVITY_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Sale,
    Expense,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub name: String,
    pub description: String,
    pub total: i64,
    pub date: String,
    pub kind: ActivityKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_revenue: i64,
    pub total_items: i64,
    pub total_expense: i64,
    pub balance: i64,
    pub today_revenue: i64,
    pub recent_activity: Vec<Activity>,
}

impl DashboardSummary {
    /// `today` is the `YYYY-MM-DD` prefix matched against record dates.
    pub fn compute(transactions: &[Transaction], purchases: &[Purchase], today: &str) -> Self {
        let total_revenue: i64 = transactions.iter().map(|t| t.total).sum();
        let total_items: i64 = transactions.iter().map(|t| t.quantity).sum();
        let total_expense: i64 = purchases.iter().map(|p| p.total).sum();
        let today_revenue = transactions
            .iter()
            .filter(|t| t.date.starts_with(today))
            .map(|t| t.total)
            .sum();

        Self {
            total_revenue,
            total_items,
            total_expense,
            balance: total_revenue - total_expense,
            today_revenue,
            recent_activity: recent_activity(transactions, purchases),
        }
    }

    pub fn for_today(transactions: &[Transaction], purchases: &[Purchase]) -> Self {
        Self::compute(transactions, purchases, &today_prefix())
    }
}

/// Current UTC date as `YYYY-MM-DD`, the prefix records are stamped with.
pub fn today_prefix() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Newest first; unparsable dates sort last.
fn newest_first(a: &Activity, b: &Activity) -> Ordering {
    match (parse_date(&a.date), parse_date(&b.date)) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.date.cmp(&a.date),
    }
}

pub fn recent_activity(transactions: &[Transaction], purchases: &[Purchase]) -> Vec<Activity> {
    let sales = transactions.iter().map(|t| Activity {
        id: t.id.clone(),
        name: t.product_name.clone(),
        description: format!("{} item", t.quantity),
        total: t.total,
        date: t.date.clone(),
        kind: ActivityKind::Sale,
    });
    let expenses = purchases.iter().map(|p| Activity {
        id: p.id.clone(),
        name: p.item_name.clone(),
        description: p.supplier.clone(),
        total: p.total,
        date: p.date.clone(),
        kind: ActivityKind::Expense,
    });

    let mut merged: Vec<Activity> = sales.chain(expenses).collect();
    merged.sort_by(newest_first);
    merged.truncate(RECENT_ACTIVITY_LIMIT);
    merged
}

/// `Rp 51.000` style amount with dot thousands separators.
pub fn format_rupiah(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-Rp {grouped}")
    } else {
        format!("Rp {grouped}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::tests::sale;

    fn purchase(id: &str, date: &str, total: i64) -> Purchase {
        Purchase {
            id: id.into(),
            date: date.into(),
            item_name: "Gula".into(),
            quantity: 1,
            price: total,
            total,
            supplier: "Toko Makmur".into(),
        }
    }

    #[test]
    fn two_sales_without_purchases_balance_to_51000() {
        let sales = vec![sale("1", 2, 18000), sale("2", 1, 15000)];
        let summary = DashboardSummary::compute(&sales, &[], "2025-03-01");
        assert_eq!(summary.total_revenue, 51000);
        assert_eq!(summary.total_items, 3);
        assert_eq!(summary.total_expense, 0);
        assert_eq!(summary.balance, 51000);
        assert_eq!(summary.today_revenue, 51000);
        assert_eq!(format_rupiah(summary.balance), "Rp 51.000");
    }

    #[test]
    fn today_revenue_only_counts_matching_date_prefix() {
        let mut old = sale("1", 1, 5000);
        old.date = "2025-02-28T23:59:00.000Z".into();
        let sales = vec![old, sale("2", 1, 7000)];
        let summary =
            DashboardSummary::compute(&sales, &[purchase("p", "2025-03-01T07:00:00Z", 2000)], "2025-03-01");
        assert_eq!(summary.today_revenue, 7000);
        assert_eq!(summary.balance, 10000);
    }

    #[test]
    fn activity_is_merged_newest_first_and_capped() {
        let mut sales = Vec::new();
        for i in 0..8 {
            let mut s = sale(&format!("s{i}"), 2, 1000);
            s.date = format!("2025-03-01T10:{i:02}:00.000Z");
            sales.push(s);
        }
        let purchases = vec![
            purchase("p-late", "2025-03-01T11:00:00.000Z", 3000),
            purchase("p-early", "2025-03-01T01:00:00.000Z", 3000),
            purchase("p-mid", "2025-03-01T10:03:30.000Z", 3000),
        ];

        let activity = recent_activity(&sales, &purchases);
        assert_eq!(activity.len(), RECENT_ACTIVITY_LIMIT);
        assert_eq!(activity[0].id, "p-late");
        assert_eq!(activity[0].kind, ActivityKind::Expense);
        assert_eq!(activity[0].description, "Toko Makmur");
        assert_eq!(activity[1].description, "2 item");
        assert!(activity.iter().all(|a| a.id != "p-early"));
        let mid = activity.iter().position(|a| a.id == "p-mid").expect("mid");
        assert_eq!(activity[mid - 1].id, "s4");
    }

    #[test]
    fn rupiah_grouping() {
        assert_eq!(format_rupiah(0), "Rp 0");
        assert_eq!(format_rupiah(999), "Rp 999");
        assert_eq!(format_rupiah(1_250_000), "Rp 1.250.000");
        assert_eq!(format_rupiah(-15000), "-Rp 15.000");
    }
}
