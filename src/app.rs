//! Application context shared by every command.
//!
//! Ties the store, the login state and the navigation shell together so a
//! front end only ever calls one operation per user action (for example a
//! checkout also refreshes the ledgers and returns to the dashboard).

use anyhow::Context;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use zeroize::Zeroizing;

use crate::admin;
use crate::analyst::{self, FinancialStats, GeminiClient, TextGenerator};
use crate::auth::{self, AuthState};
use crate::checkout::{self, Cart, CheckoutReceipt};
use crate::config::AppConfig;
use crate::credentials;
use crate::dashboard::DashboardSummary;
use crate::db::{self, DbState};
use crate::error::{PosError, PosResult};
use crate::models::{LedgerKind, PaymentMethod, Purchase, Role};
use crate::purchases::{self, PurchaseDraft};
use crate::shell::AppShell;
use crate::storage::Store;

pub struct AppContext {
    pub config: AppConfig,
    pub store: Store,
    pub auth: AuthState,
    pub shell: Mutex<AppShell>,
}

impl AppContext {
    /// Open the local database under `config.data_dir` and build the context.
    pub fn bootstrap(config: AppConfig) -> anyhow::Result<Self> {
        let db = db::init(&config.data_dir).with_context(|| {
            format!("failed to open database in {}", config.data_dir.display())
        })?;
        Self::with_db(config, db)
    }

    pub fn with_db(config: AppConfig, db: DbState) -> anyhow::Result<Self> {
        let store = Store::new(Arc::new(db), config.http_timeout);
        store
            .seed_initial_data()
            .context("failed to seed local data")?;
        info!(
            remote = store.is_remote_configured(),
            "application context ready"
        );
        Ok(Self {
            config,
            store,
            auth: AuthState::new(),
            shell: Mutex::new(AppShell::new()),
        })
    }

    pub fn require_session(&self) -> PosResult<Role> {
        auth::current_role(&self.auth).ok_or_else(|| PosError::Auth("Not logged in".into()))
    }

    pub fn require_admin(&self) -> PosResult<()> {
        auth::require_admin(&self.auth)
    }

    // -----------------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------------

    /// Refresh PINs from the sheet, verify `pin`, then load the ledgers.
    pub async fn login(&self, pin: Zeroizing<String>) -> PosResult<Role> {
        self.store.fetch_settings().await?;
        let role = auth::login(self.store.db(), &self.auth, pin)?;
        let mut shell = self.shell.lock().await;
        shell.login(role);
        shell.reload(&self.store).await;
        Ok(role)
    }

    pub async fn logout(&self) {
        auth::logout(&self.auth);
        self.shell.lock().await.logout();
    }

    pub async fn reload(&self) -> PosResult<()> {
        self.require_session()?;
        self.shell.lock().await.reload(&self.store).await;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Cashier operations
    // -----------------------------------------------------------------------

    pub async fn checkout(
        &self,
        cart: &Cart,
        cup_id: Option<&str>,
        payment_method: PaymentMethod,
    ) -> PosResult<CheckoutReceipt> {
        self.require_session()?;
        let receipt = checkout::checkout(&self.store, cart, cup_id, payment_method).await?;
        self.shell.lock().await.after_checkout(&self.store).await;
        Ok(receipt)
    }

    pub async fn record_purchase(&self, draft: PurchaseDraft) -> PosResult<Purchase> {
        self.require_session()?;
        let purchase = purchases::record_purchase(&self.store, draft).await?;
        self.shell.lock().await.reload(&self.store).await;
        Ok(purchase)
    }

    pub async fn dashboard(&self) -> PosResult<DashboardSummary> {
        self.require_session()?;
        let shell = self.shell.lock().await;
        Ok(DashboardSummary::for_today(
            shell.transactions(),
            shell.purchases(),
        ))
    }

    // -----------------------------------------------------------------------
    // Admin operations
    // -----------------------------------------------------------------------

    pub async fn configure_web_app(&self, url: &str) -> PosResult<String> {
        self.require_admin()?;
        let saved = admin::configure_web_app(&self.store, url)?;
        self.shell.lock().await.reload(&self.store).await;
        Ok(saved)
    }

    pub async fn reset_ledger(&self, kind: LedgerKind, confirmed: bool) -> PosResult<()> {
        self.require_admin()?;
        admin::reset_ledger(&self.store, kind, confirmed).await?;
        self.shell.lock().await.reload(&self.store).await;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Analyst
    // -----------------------------------------------------------------------

    pub async fn analyst_stats(&self) -> PosResult<FinancialStats> {
        self.require_admin()?;
        let shell = self.shell.lock().await;
        Ok(FinancialStats::compute(shell.transactions(), shell.purchases()))
    }

    /// Answer a question with the configured model.
    pub async fn ask_analyst(&self, question: &str) -> PosResult<String> {
        self.require_admin()?;
        if question.trim().is_empty() {
            return Err(PosError::validation("Type a question first"));
        }
        let api_key = credentials::analyst_api_key()
            .ok_or_else(|| PosError::validation("Analyst API key is not configured"))?;
        let client = GeminiClient::new(&self.config.analyst, api_key, self.config.http_timeout)?;
        self.ask_with(&client, question).await
    }

    pub async fn ask_with(&self, generator: &dyn TextGenerator, question: &str) -> PosResult<String> {
        self.require_admin()?;
        let transactions = self.shell.lock().await.transactions().to_vec();
        analyst::analyze(generator, &transactions, question).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalystConfig;
    use crate::models::{CupItem, Product};
    use crate::shell::{Screen, Tab};
    use async_trait::async_trait;
    use std::time::Duration;

    fn context() -> AppContext {
        let config = AppConfig {
            data_dir: std::env::temp_dir(),
            log_dir: std::env::temp_dir(),
            analyst: AnalystConfig::default(),
            http_timeout: Duration::from_secs(5),
        };
        AppContext::with_db(config, DbState::in_memory().expect("db")).expect("context")
    }

    fn pin(p: &str) -> Zeroizing<String> {
        Zeroizing::new(p.to_string())
    }

    struct Echo;

    #[async_trait]
    impl TextGenerator for Echo {
        async fn generate(&self, prompt: &str) -> PosResult<String> {
            Ok(format!("{} rows", prompt.matches("Qty:").count()))
        }
    }

    #[tokio::test]
    async fn default_pins_pick_the_role() {
        let ctx = context();
        assert_eq!(ctx.login(pin("0000")).await.expect("cashier"), Role::Cashier);
        assert_eq!(ctx.shell.lock().await.screen(), Screen::Tab(Tab::Dashboard));

        ctx.logout().await;
        assert!(ctx.require_session().is_err());
        assert_eq!(ctx.login(pin("1234")).await.expect("admin"), Role::Admin);
        assert!(matches!(
            ctx.login(pin("9999")).await,
            Err(PosError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn cashier_is_kept_out_of_admin_operations() {
        let ctx = context();
        ctx.login(pin("0000")).await.expect("cashier");
        assert!(matches!(
            ctx.reset_ledger(LedgerKind::Sales, true).await,
            Err(PosError::Auth(_))
        ));
        assert!(ctx.configure_web_app("script.google.com/x").await.is_err());
        assert!(ctx.analyst_stats().await.is_err());
    }

    #[tokio::test]
    async fn checkout_refreshes_dashboard() {
        let ctx = context();
        ctx.store
            .save_cups(&[CupItem {
                id: "c1".into(),
                name: "Cup 16oz".into(),
                stock: 10,
            }])
            .await
            .expect("cups");
        ctx.login(pin("0000")).await.expect("login");
        ctx.shell.lock().await.select_tab(Tab::Input).expect("input tab");

        let mut cart = Cart::new();
        let teh = Product {
            id: "p1".into(),
            name: "Es Teh".into(),
            price: 18000,
            category: "Teh".into(),
        };
        cart.add(&teh);
        cart.add(&teh);
        ctx.checkout(&cart, Some("c1"), PaymentMethod::Cash)
            .await
            .expect("checkout");

        assert_eq!(ctx.shell.lock().await.active_tab(), Tab::Dashboard);
        let summary = ctx.dashboard().await.expect("summary");
        assert_eq!(summary.total_revenue, 36000);
        assert_eq!(summary.total_items, 2);
    }

    #[tokio::test]
    async fn analyst_sees_loaded_sales() {
        let ctx = context();
        ctx.login(pin("1234")).await.expect("admin");
        ctx.record_purchase(PurchaseDraft {
            item_name: "Gula".into(),
            supplier: String::new(),
            quantity: 1,
            price: 15000,
        })
        .await
        .expect("purchase");

        let stats = ctx.analyst_stats().await.expect("stats");
        assert_eq!(stats.purchase_count, 1);
        assert_eq!(stats.net_profit, -15000);
        assert_eq!(ctx.ask_with(&Echo, "Tren?").await.expect("answer"), "0 rows");
    }
}
