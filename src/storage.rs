//! Data access layer.
//!
//! Every tab of the sheet has a local JSON cache. Reads prefer the web app
//! and refresh the cache on success; when no web app is configured or the
//! call fails, the cache answers instead. Writes land in the cache first
//! and are then pushed to the web app, so a failed push leaves the local
//! state updated and reports a network error to the caller.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::auth;
use crate::db::{self, DbState, CATEGORY_REMOTE};
use crate::error::{PosError, PosResult};
use crate::models::{CupItem, LedgerKind, Purchase, SettingKey, Transaction};
use crate::sheet::{self, SheetClient, SheetTab};

pub const KEY_SALES: &str = "sales";
pub const KEY_PURCHASES: &str = "purchases";
pub const KEY_PRODUCTS: &str = "products";
pub const KEY_CUPS: &str = "cups";
const KEY_WEB_APP_URL: &str = "web_app_url";

/// Where a read was answered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Remote,
    Local,
}

/// Handle to local storage plus the (optional) spreadsheet web app.
pub struct Store {
    db: Arc<DbState>,
    timeout: Duration,
}

impl Store {
    pub fn new(db: Arc<DbState>, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    pub fn db(&self) -> &DbState {
        &self.db
    }

    // -----------------------------------------------------------------------
    // Web app endpoint
    // -----------------------------------------------------------------------

    pub fn web_app_url(&self) -> PosResult<Option<String>> {
        Ok(db::read_setting(&self.db, CATEGORY_REMOTE, KEY_WEB_APP_URL)?
            .filter(|url| !url.trim().is_empty()))
    }

    pub fn is_remote_configured(&self) -> bool {
        matches!(self.web_app_url(), Ok(Some(_)))
    }

    /// Persist the web app URL. Returns the normalised URL.
    pub fn save_web_app_url(&self, url: &str) -> PosResult<String> {
        let normalized = sheet::normalize_web_app_url(url);
        if normalized.is_empty() {
            return Err(PosError::validation("Enter the web app URL"));
        }
        db::write_setting(&self.db, CATEGORY_REMOTE, KEY_WEB_APP_URL, &normalized)?;
        info!(url = %normalized, "web app URL saved");
        Ok(normalized)
    }

    /// Client for the configured web app, if any.
    pub(crate) fn remote(&self) -> PosResult<Option<SheetClient>> {
        match self.web_app_url()? {
            Some(url) => Ok(Some(SheetClient::new(&url, self.timeout)?)),
            None => Ok(None),
        }
    }

    /// Make sure an offline install starts with an empty sales ledger.
    pub fn seed_initial_data(&self) -> PosResult<()> {
        if !db::has_local(&self.db, KEY_SALES)? && !self.is_remote_configured() {
            db::write_local_json(&self.db, KEY_SALES, &Vec::<Transaction>::new())?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Generic remote-first read
    // -----------------------------------------------------------------------

    /// Read a tab from the web app and refresh `cache_key`, or fall back to
    /// the cache. `newest_first` reverses the sheet's append order.
    pub(crate) async fn load_tab<T, F>(
        &self,
        tab: SheetTab,
        cache_key: &str,
        parse: F,
        newest_first: bool,
    ) -> PosResult<(Vec<T>, DataSource)>
    where
        T: Serialize + serde::de::DeserializeOwned,
        F: Fn(&Value) -> Option<T>,
    {
        if let Some(remote) = self.remote()? {
            match remote.fetch_rows(tab).await {
                Ok(rows) => {
                    let mut items: Vec<T> = rows.iter().filter_map(&parse).collect();
                    if newest_first {
                        items.reverse();
                    }
                    db::write_local_json(&self.db, cache_key, &items)?;
                    return Ok((items, DataSource::Remote));
                }
                Err(e) => {
                    warn!(
                        tab = tab.as_str(),
                        error = %e,
                        "failed to read from web app, using local cache"
                    );
                }
            }
        }
        Ok((db::read_local_list(&self.db, cache_key)?, DataSource::Local))
    }

    /// Prepend one record to a cached list.
    fn prepend_local<T>(&self, cache_key: &str, item: &T) -> PosResult<()>
    where
        T: Serialize + serde::de::DeserializeOwned + Clone,
    {
        let mut current: Vec<T> = db::read_local_list(&self.db, cache_key)?;
        current.insert(0, item.clone());
        db::write_local_json(&self.db, cache_key, &current)
    }

    // -----------------------------------------------------------------------
    // Sales and purchases
    // -----------------------------------------------------------------------

    /// Sales, newest first.
    ///
    /// The sheet has no cup column, so cup references recorded on this
    /// device are carried over from the cache by transaction id.
    pub async fn fetch_transactions(&self) -> PosResult<Vec<Transaction>> {
        let cached_cups: HashMap<String, String> =
            db::read_local_list::<Transaction>(&self.db, KEY_SALES)?
                .into_iter()
                .filter_map(|t| t.cup_id.map(|cup| (t.id, cup)))
                .collect();

        let (mut sales, source) = self
            .load_tab(SheetTab::Sales, KEY_SALES, Transaction::from_row, true)
            .await?;
        if source == DataSource::Remote && !cached_cups.is_empty() {
            for sale in sales.iter_mut() {
                if let Some(cup) = cached_cups.get(&sale.id) {
                    sale.cup_id = Some(cup.clone());
                }
            }
            db::write_local_json(&self.db, KEY_SALES, &sales)?;
        }
        Ok(sales)
    }

    /// Purchases, newest first.
    pub async fn fetch_purchases(&self) -> PosResult<Vec<Purchase>> {
        let (purchases, _) = self
            .load_tab(SheetTab::Purchases, KEY_PURCHASES, Purchase::from_row, true)
            .await?;
        Ok(purchases)
    }

    pub async fn add_transaction(&self, transaction: &Transaction) -> PosResult<()> {
        self.prepend_local(KEY_SALES, transaction)?;
        if let Some(remote) = self.remote()? {
            remote.add_sale(transaction.to_row()).await.map_err(|e| {
                warn!(id = %transaction.id, error = %e, "failed to push sale to web app");
                e
            })?;
        }
        info!(
            id = %transaction.id,
            product = %transaction.product_name,
            total = transaction.total,
            "sale recorded"
        );
        Ok(())
    }

    pub async fn add_purchase(&self, purchase: &Purchase) -> PosResult<()> {
        self.prepend_local(KEY_PURCHASES, purchase)?;
        if let Some(remote) = self.remote()? {
            remote.add_purchase(purchase.to_row()).await.map_err(|e| {
                warn!(id = %purchase.id, error = %e, "failed to push purchase to web app");
                e
            })?;
        }
        info!(
            id = %purchase.id,
            item = %purchase.item_name,
            total = purchase.total,
            "purchase recorded"
        );
        Ok(())
    }

    /// Empty a ledger locally and on the sheet.
    pub async fn reset_data(&self, kind: LedgerKind) -> PosResult<()> {
        let key = match kind {
            LedgerKind::Sales => KEY_SALES,
            LedgerKind::Purchases => KEY_PURCHASES,
        };
        db::write_local_json(&self.db, key, &Vec::<Value>::new())?;
        warn!(ledger = kind.as_str(), "local ledger cleared");

        if let Some(remote) = self.remote()? {
            remote.reset_data(kind).await.map_err(|e| {
                warn!(ledger = kind.as_str(), error = %e, "failed to reset web app ledger");
                e
            })?;
            warn!(ledger = kind.as_str(), "web app ledger cleared");
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Cup stock
    // -----------------------------------------------------------------------

    pub async fn fetch_cups(&self) -> PosResult<Vec<CupItem>> {
        let (cups, _) = self
            .load_tab(SheetTab::Cups, KEY_CUPS, CupItem::from_row, false)
            .await?;
        Ok(cups)
    }

    /// Replace the whole cup list.
    pub async fn save_cups(&self, cups: &[CupItem]) -> PosResult<()> {
        db::write_local_json(&self.db, KEY_CUPS, cups)?;
        if let Some(remote) = self.remote()? {
            let rows = cups.iter().map(CupItem::to_row).collect();
            remote.update_cups(rows).await.map_err(|e| {
                warn!(error = %e, "failed to sync cups to web app");
                e
            })?;
        }
        info!(count = cups.len(), "cup list saved");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // PIN settings
    // -----------------------------------------------------------------------

    /// Pull both PINs from the sheet into the local hash store.
    ///
    /// Blank remote values keep the locally known PIN. Returns `Local` when
    /// there is no web app or it could not be read.
    pub async fn fetch_settings(&self) -> PosResult<DataSource> {
        let remote = match self.remote()? {
            Some(r) => r,
            None => return Ok(DataSource::Local),
        };
        let body = match remote.fetch(SheetTab::Settings).await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "failed to read settings from web app");
                return Ok(DataSource::Local);
            }
        };

        for (key, field) in [
            (SettingKey::AdminPin, "adminPin"),
            (SettingKey::CashierPin, "cashierPin"),
        ] {
            let pin = pin_cell(body.get(field));
            if !pin.is_empty() {
                auth::store_pin(&self.db, key, &pin)?;
            }
        }
        info!("PIN settings refreshed from web app");
        Ok(DataSource::Remote)
    }

    /// Store one PIN locally, then on the sheet.
    pub async fn save_setting(&self, key: SettingKey, value: &str) -> PosResult<()> {
        auth::store_pin(&self.db, key, value)?;
        if let Some(remote) = self.remote()? {
            remote
                .update_setting(key.as_str(), value)
                .await
                .map_err(|e| {
                    warn!(key = key.as_str(), error = %e, "failed to save setting to web app");
                    e
                })?;
        }
        info!(key = key.as_str(), "setting saved");
        Ok(())
    }
}

/// PIN cell as digits. Sheets may hand back a numeric PIN as `1234.0`.
fn pin_cell(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(|v| v.to_string())
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
                    .map(|f| format!("{f:.0}"))
            })
            .unwrap_or_else(|| n.to_string()),
        _ => String::new(),
    }
}
