//! Spreadsheet web app client.
//!
//! The "database" is a spreadsheet published as a web app. Reads are
//! `GET {url}?type=<tab>&t=<ms>` and answer `{status, data}`; writes are a
//! single `POST {url}` whose body names an `action`. The body is sent as
//! `text/plain` because the web app only reads the raw post contents.

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{PosError, PosResult};
use crate::models::LedgerKind;

/// Default timeout for sheet requests (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const POST_CONTENT_TYPE: &str = "text/plain;charset=utf-8";

/// Tabs the web app can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetTab {
    Sales,
    Purchases,
    Products,
    Cups,
    Settings,
}

impl SheetTab {
    pub fn as_str(&self) -> &'static str {
        match self {
            SheetTab::Sales => "sales",
            SheetTab::Purchases => "purchases",
            SheetTab::Products => "products",
            SheetTab::Cups => "cups",
            SheetTab::Settings => "settings",
        }
    }
}

impl From<LedgerKind> for SheetTab {
    fn from(kind: LedgerKind) -> Self {
        match kind {
            LedgerKind::Sales => SheetTab::Sales,
            LedgerKind::Purchases => SheetTab::Purchases,
        }
    }
}

// ---------------------------------------------------------------------------
// URL handling
// ---------------------------------------------------------------------------

/// Normalise a pasted web app URL: trim it and make sure a scheme is present
/// (https, or http for localhost).
pub fn normalize_web_app_url(url: &str) -> String {
    let url = url.trim();
    if url.is_empty() {
        return String::new();
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }
    if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
        format!("http://{url}")
    } else {
        format!("https://{url}")
    }
}

/// Build the read URL for a tab. `cache_buster` is appended as `t` so
/// intermediaries never serve a stale sheet.
pub fn read_url(base: &str, tab: SheetTab, cache_buster: i64) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}type={}&t={cache_buster}", tab.as_str())
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Convert a `reqwest::Error` into a user-friendly message.
fn friendly_error(url: &str, err: &reqwest::Error) -> PosError {
    if err.is_connect() {
        return PosError::Network(format!("Cannot reach the spreadsheet web app at {url}"));
    }
    if err.is_timeout() {
        return PosError::Network(format!("Connection to {url} timed out"));
    }
    if err.is_builder() {
        return PosError::Network(format!("Invalid web app URL: {url}"));
    }
    PosError::Network(format!("Network error communicating with {url}: {err}"))
}

/// Convert an HTTP status code into a user-friendly message.
fn status_error(status: StatusCode) -> PosError {
    let msg = match status.as_u16() {
        401 | 403 => "Web app refused access; check that it is deployed for anyone".to_string(),
        404 => "Web app URL not found".to_string(),
        s if s >= 500 => format!("Spreadsheet web app error (HTTP {s})"),
        s => format!("Unexpected response from spreadsheet web app (HTTP {s})"),
    };
    PosError::Network(msg)
}

fn response_status(body: &Value) -> Option<&str> {
    body.get("status").and_then(Value::as_str)
}

fn remote_message(body: &Value) -> String {
    body.get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("status {}", response_status(body).unwrap_or("missing")))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SheetClient {
    base_url: String,
    http: Client,
}

impl SheetClient {
    pub fn new(web_app_url: &str, timeout: Duration) -> PosResult<Self> {
        let base_url = normalize_web_app_url(web_app_url);
        if base_url.is_empty() {
            return Err(PosError::validation("Web app URL is empty"));
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PosError::Network(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Read a tab and return the whole JSON envelope after checking
    /// `status == "success"`.
    pub async fn fetch(&self, tab: SheetTab) -> PosResult<Value> {
        let url = read_url(
            &self.base_url,
            tab,
            chrono::Utc::now().timestamp_millis(),
        );
        debug!(tab = tab.as_str(), "sheet: GET");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| friendly_error(&self.base_url, &e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(status_error(status));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| PosError::Network(format!("Invalid JSON from web app: {e}")))?;
        if response_status(&body) != Some("success") {
            warn!(tab = tab.as_str(), "sheet: read answered without success status");
            return Err(PosError::Remote(remote_message(&body)));
        }
        Ok(body)
    }

    /// Read a tab's data rows (header row already removed by the web app).
    pub async fn fetch_rows(&self, tab: SheetTab) -> PosResult<Vec<Value>> {
        let body = self.fetch(tab).await?;
        match body.get("data") {
            Some(Value::Array(rows)) => Ok(rows.clone()),
            _ => Err(PosError::Remote(format!(
                "{} response has no data array",
                tab.as_str()
            ))),
        }
    }

    /// Send an action to the web app.
    ///
    /// Returns the parsed body, or `Value::Null` when the body was empty or
    /// not JSON. A JSON body with a non-success status is an error.
    pub async fn post(&self, payload: &Value) -> PosResult<Value> {
        let action = payload
            .get("action")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        debug!(action, "sheet: POST");

        let resp = self
            .http
            .post(&self.base_url)
            .header(CONTENT_TYPE, POST_CONTENT_TYPE)
            .body(payload.to_string())
            .send()
            .await
            .map_err(|e| friendly_error(&self.base_url, &e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(status_error(status));
        }

        let text = resp.text().await.unwrap_or_default();
        let body = match serde_json::from_str::<Value>(&text) {
            Ok(v) => v,
            Err(_) => return Ok(Value::Null),
        };
        match response_status(&body) {
            Some("success") | None => Ok(body),
            Some(_) => Err(PosError::Remote(remote_message(&body))),
        }
    }

    pub async fn add_sale(&self, row: Value) -> PosResult<()> {
        self.post(&serde_json::json!({ "action": "add_sale", "data": row }))
            .await
            .map(|_| ())
    }

    pub async fn add_purchase(&self, row: Value) -> PosResult<()> {
        self.post(&serde_json::json!({ "action": "add_purchase", "data": row }))
            .await
            .map(|_| ())
    }

    pub async fn update_products(&self, rows: Vec<Value>) -> PosResult<()> {
        self.post(&serde_json::json!({ "action": "update_products", "data": rows }))
            .await
            .map(|_| ())
    }

    pub async fn update_cups(&self, rows: Vec<Value>) -> PosResult<()> {
        self.post(&serde_json::json!({ "action": "update_cups", "data": rows }))
            .await
            .map(|_| ())
    }

    pub async fn update_setting(&self, key: &str, value: &str) -> PosResult<()> {
        self.post(&serde_json::json!({
            "action": "update_setting",
            "key": key,
            "value": value,
        }))
        .await
        .map(|_| ())
    }

    /// Empty a ledger tab. The web app must explicitly answer success.
    pub async fn reset_data(&self, kind: LedgerKind) -> PosResult<()> {
        let body = self
            .post(&serde_json::json!({ "action": "reset_data", "type": kind.as_str() }))
            .await?;
        if response_status(&body) == Some("success") {
            Ok(())
        } else {
            Err(PosError::Remote(format!(
                "reset of {} was not confirmed",
                kind.as_str()
            )))
        }
    }
}
