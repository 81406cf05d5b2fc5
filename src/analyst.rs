//! AI business analyst.
//!
//! Summarises the ledgers into a few headline numbers and answers free-form
//! questions about recent sales through a generative language model. The
//! model backend sits behind [`TextGenerator`]; [`GeminiClient`] talks to
//! the `generateContent` REST endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::AnalystConfig;
use crate::error::{PosError, PosResult};
use crate::models::{PaymentMethod, Purchase, Transaction};

/// Most recent sales included in a prompt.
pub const PROMPT_ROW_LIMIT: usize = 50;

pub const EMPTY_ANSWER_TEXT: &str = "Sorry, I am unable to analyse the data right now.";
pub const BACKEND_ERROR_TEXT: &str =
    "Something went wrong while contacting the AI service. Make sure the API key is valid.";

/// Starter questions offered under the input box.
pub const SUGGESTED_QUESTIONS: &[&str] = &[
    "Apa produk terlaris minggu ini?",
    "Berapa rata-rata penjualan harian?",
    "Analisa tren penjualan saya",
    "Saran untuk meningkatkan profit?",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTotal {
    pub method: PaymentMethod,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialStats {
    pub total_sales: i64,
    pub sales_count: usize,
    pub total_purchases: i64,
    pub purchase_count: usize,
    pub net_profit: i64,
    pub by_payment_method: Vec<PaymentTotal>,
}

impl FinancialStats {
    pub fn compute(transactions: &[Transaction], purchases: &[Purchase]) -> Self {
        let total_sales: i64 = transactions.iter().map(|t| t.total).sum();
        let total_purchases: i64 = purchases.iter().map(|p| p.total).sum();
        let by_payment_method = PaymentMethod::ALL
            .iter()
            .map(|&method| PaymentTotal {
                method,
                total: transactions
                    .iter()
                    .filter(|t| t.payment_method == method)
                    .map(|t| t.total)
                    .sum(),
            })
            .collect();

        Self {
            total_sales,
            sales_count: transactions.len(),
            total_purchases,
            purchase_count: purchases.len(),
            net_profit: total_sales - total_purchases,
            by_payment_method,
        }
    }
}

fn prompt_line(t: &Transaction) -> String {
    let day = t.date.split('T').next().unwrap_or_default();
    format!(
        "{day}, {}, {}, Qty:{}, Rp{}",
        t.product_name, t.category, t.quantity, t.total
    )
}

/// Build the model prompt from the newest sales (list is newest first).
pub fn build_prompt(transactions: &[Transaction], question: &str) -> String {
    let data = transactions
        .iter()
        .take(PROMPT_ROW_LIMIT)
        .map(prompt_line)
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a business analysis assistant for the \"TokoSheet\" point-of-sale app.\n\
         Below is raw sales data (at most the {PROMPT_ROW_LIMIT} latest transactions), \
         one per line as date, product, category, quantity, total:\n\
         \n\
         ---BEGIN DATA---\n\
         {data}\n\
         ---END DATA---\n\
         \n\
         The user asks: \"{question}\"\n\
         \n\
         Instructions:\n\
         1. Answer the question using only the data above.\n\
         2. Reply in Indonesian, professional but friendly.\n\
         3. If the data is empty, tell the user so.\n\
         4. Add a short insight when relevant, for example a sales trend.\n\
         \n\
         Answer in concise markdown.\n"
    )
}

/// Something that turns a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> PosResult<String>;
}

/// Google generative language API client.
pub struct GeminiClient {
    http: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &AnalystConfig, api_key: String, timeout: Duration) -> PosResult<Self> {
        if api_key.trim().is_empty() {
            return Err(PosError::validation("Analyst API key is not configured"));
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PosError::Network(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

/// Concatenate the text parts of the first candidate.
fn response_text(body: &Value) -> String {
    body.pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default()
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> PosResult<String> {
        debug!(model = %self.model, chars = prompt.len(), "analyst: generateContent");
        let resp = self
            .http
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&json!({ "contents": [{ "parts": [{ "text": prompt }] }] }))
            .send()
            .await
            .map_err(|e| PosError::Network(format!("Analyst request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(PosError::Remote(format!("analyst API returned {status}: {detail}")));
        }
        let body: Value = resp
            .json()
            .await
            .map_err(|e| PosError::Network(format!("Invalid JSON from analyst API: {e}")))?;
        Ok(response_text(&body))
    }
}

/// Ask a question about the sales ledger.
///
/// A blank question is a validation error. Backend failures and empty
/// answers come back as displayable fallback text rather than errors.
pub async fn analyze(
    generator: &dyn TextGenerator,
    transactions: &[Transaction],
    question: &str,
) -> PosResult<String> {
    let question = question.trim();
    if question.is_empty() {
        return Err(PosError::validation("Type a question first"));
    }

    let prompt = build_prompt(transactions, question);
    match generator.generate(&prompt).await {
        Ok(text) if text.trim().is_empty() => {
            warn!("analyst returned an empty answer");
            Ok(EMPTY_ANSWER_TEXT.to_string())
        }
        Ok(text) => {
            info!(rows = transactions.len().min(PROMPT_ROW_LIMIT), "analyst answered");
            Ok(text)
        }
        Err(e) => {
            error!(error = %e, "analyst request failed");
            Ok(BACKEND_ERROR_TEXT.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::tests::sale;
    use mockito::Matcher;
    use std::sync::Mutex;

    struct Canned {
        answer: PosResult<String>,
        seen: Mutex<Vec<String>>,
    }

    impl Canned {
        fn new(answer: PosResult<String>) -> Self {
            Self {
                answer,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for Canned {
        async fn generate(&self, prompt: &str) -> PosResult<String> {
            self.seen.lock().expect("lock").push(prompt.to_string());
            self.answer.clone()
        }
    }

    #[test]
    fn stats_split_by_payment_method() {
        let mut qris = sale("2", 1, 8000);
        qris.payment_method = PaymentMethod::Qris;
        let sales = vec![sale("1", 2, 5000), qris];
        let purchases = vec![Purchase {
            id: "p".into(),
            date: "2025-03-01T07:00:00Z".into(),
            item_name: "Gula".into(),
            quantity: 1,
            price: 3000,
            total: 3000,
            supplier: "-".into(),
        }];

        let stats = FinancialStats::compute(&sales, &purchases);
        assert_eq!(stats.total_sales, 18000);
        assert_eq!(stats.sales_count, 2);
        assert_eq!(stats.purchase_count, 1);
        assert_eq!(stats.net_profit, 15000);
        assert_eq!(
            stats.by_payment_method,
            vec![
                PaymentTotal { method: PaymentMethod::Cash, total: 10000 },
                PaymentTotal { method: PaymentMethod::Qris, total: 8000 },
                PaymentTotal { method: PaymentMethod::Transfer, total: 0 },
            ]
        );
    }

    #[test]
    fn prompt_keeps_fifty_newest_rows_in_compact_form() {
        let sales: Vec<Transaction> = (0..60).map(|i| sale(&i.to_string(), 2, 5000)).collect();
        let prompt = build_prompt(&sales, "Produk terlaris?");
        assert_eq!(prompt.matches("Qty:").count(), PROMPT_ROW_LIMIT);
        assert!(prompt.contains("2025-03-01, Es Teh, Teh, Qty:2, Rp10000"));
        assert!(prompt.contains("\"Produk terlaris?\""));
        assert!(prompt.contains("---BEGIN DATA---"));
    }

    #[tokio::test]
    async fn blank_question_is_rejected_before_calling_backend() {
        let backend = Canned::new(Ok("unused".into()));
        let err = analyze(&backend, &[], "   ").await.expect_err("blank");
        assert!(matches!(err, PosError::Validation(_)));
        assert!(backend.seen.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn failures_and_empty_answers_become_fallback_text() {
        let failing = Canned::new(Err(PosError::Network("offline".into())));
        assert_eq!(
            analyze(&failing, &[], "Tren?").await.expect("fallback"),
            BACKEND_ERROR_TEXT
        );

        let silent = Canned::new(Ok("  ".into()));
        assert_eq!(
            analyze(&silent, &[], "Tren?").await.expect("fallback"),
            EMPTY_ANSWER_TEXT
        );
    }

    #[tokio::test]
    async fn gemini_client_posts_prompt_and_joins_parts() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/v1beta/models/test-model:generateContent")
            .match_header("x-goog-api-key", "k-123")
            .match_body(Matcher::PartialJson(json!({
                "contents": [{ "parts": [{ "text": "hello" }] }]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "candidates": [{
                        "content": { "parts": [{ "text": "**Es Teh** " }, { "text": "laris." }] }
                    }]
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let config = AnalystConfig {
            model: "test-model".into(),
            endpoint: format!("{}/v1beta/", server.url()),
        };
        let client = GeminiClient::new(&config, "k-123".into(), Duration::from_secs(5))
            .expect("client");
        assert_eq!(client.generate("hello").await.expect("text"), "**Es Teh** laris.");
        m.assert_async().await;
    }

    #[tokio::test]
    async fn gemini_error_status_is_remote_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", Matcher::Any)
            .with_status(403)
            .with_body(r#"{"error":{"message":"API key not valid"}}"#)
            .create_async()
            .await;

        let config = AnalystConfig {
            model: "m".into(),
            endpoint: server.url(),
        };
        let client =
            GeminiClient::new(&config, "bad".into(), Duration::from_secs(5)).expect("client");
        let err = client.generate("hi").await.expect_err("forbidden");
        assert!(matches!(err, PosError::Remote(_)));
    }

    #[test]
    fn missing_api_key_is_refused() {
        assert!(GeminiClient::new(&AnalystConfig::default(), " ".into(), Duration::from_secs(1)).is_err());
    }
}
