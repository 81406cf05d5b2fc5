//! Top-level navigation state: which screen is showing, which tabs the
//! current role may open, and the ledgers every screen reads from.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{PosError, PosResult};
use crate::models::{Purchase, Role, Transaction};
use crate::storage::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tab {
    #[default]
    Dashboard,
    Input,
    Purchase,
    Sheet,
    AiAnalysis,
    AdminPanel,
}

impl Tab {
    pub fn admin_only(&self) -> bool {
        matches!(self, Tab::AiAnalysis | Tab::AdminPanel)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tab::Dashboard => "Beranda",
            Tab::Input => "Jual",
            Tab::Purchase => "Beli",
            Tab::Sheet => "Data",
            Tab::AiAnalysis => "Analyst",
            Tab::AdminPanel => "Admin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "screen", content = "tab", rename_all = "lowercase")]
pub enum Screen {
    Login,
    Loading,
    Tab(Tab),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub tab: Tab,
    pub label: &'static str,
}

/// Tabs shown in the bottom bar for `role`, in display order.
pub fn nav_items(role: Role) -> Vec<NavItem> {
    [
        Tab::Dashboard,
        Tab::Input,
        Tab::Purchase,
        Tab::Sheet,
        Tab::AiAnalysis,
        Tab::AdminPanel,
    ]
    .into_iter()
    .filter(|tab| role == Role::Admin || !tab.admin_only())
    .map(|tab| NavItem {
        tab,
        label: tab.label(),
    })
    .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppShell {
    role: Option<Role>,
    active_tab: Tab,
    loading: bool,
    transactions: Vec<Transaction>,
    purchases: Vec<Purchase>,
}

impl Default for AppShell {
    fn default() -> Self {
        Self::new()
    }
}

impl AppShell {
    /// Starts in the loading state until the first [`AppShell::reload`].
    pub fn new() -> Self {
        Self {
            role: None,
            active_tab: Tab::Dashboard,
            loading: true,
            transactions: Vec::new(),
            purchases: Vec::new(),
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn active_tab(&self) -> Tab {
        self.active_tab
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn purchases(&self) -> &[Purchase] {
        &self.purchases
    }

    pub fn screen(&self) -> Screen {
        match self.role {
            None => Screen::Login,
            Some(_) if self.loading && self.transactions.is_empty() => Screen::Loading,
            Some(_) => Screen::Tab(self.active_tab),
        }
    }

    pub fn nav(&self) -> Vec<NavItem> {
        self.role.map(nav_items).unwrap_or_default()
    }

    pub fn login(&mut self, role: Role) {
        self.role = Some(role);
        self.active_tab = Tab::Dashboard;
    }

    pub fn logout(&mut self) {
        self.role = None;
        self.active_tab = Tab::Dashboard;
    }

    pub fn select_tab(&mut self, tab: Tab) -> PosResult<()> {
        match self.role {
            None => Err(PosError::Auth("Not logged in".into())),
            Some(Role::Cashier) if tab.admin_only() => {
                Err(PosError::Auth("Admin access required".into()))
            }
            Some(_) => {
                self.active_tab = tab;
                Ok(())
            }
        }
    }

    /// Reload both ledgers. A failed load keeps what was shown before.
    pub async fn reload(&mut self, store: &Store) {
        self.loading = true;
        let loaded = async {
            let transactions = store.fetch_transactions().await?;
            let purchases = store.fetch_purchases().await?;
            Ok::<_, PosError>((transactions, purchases))
        }
        .await;

        match loaded {
            Ok((transactions, purchases)) => {
                info!(
                    sales = transactions.len(),
                    purchases = purchases.len(),
                    "ledgers reloaded"
                );
                self.transactions = transactions;
                self.purchases = purchases;
            }
            Err(e) => warn!(error = %e, "reload failed, keeping previous data"),
        }
        self.loading = false;
    }

    /// Refresh and return to the dashboard after a completed checkout.
    pub async fn after_checkout(&mut self, store: &Store) {
        self.reload(store).await;
        self.active_tab = Tab::Dashboard;
    }
}
