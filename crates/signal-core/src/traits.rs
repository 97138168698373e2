use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{Bar, OrderConfirmation, Side};

/// Order-execution collaborator. Implementations talk to a broker; the core
/// only sees the place/cancel contract.
#[async_trait]
pub trait OrderExecutor: Send + Sync {
    /// Submit an order, returning the fill confirmation.
    async fn place_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: f64,
        price: f64,
    ) -> Result<OrderConfirmation>;

    /// Cancel a previously placed order by id.
    async fn cancel_order(&self, order_id: &str) -> Result<()>;

    /// Whether this is a paper/simulated executor
    fn is_paper(&self) -> bool;
}

/// Market-data retrieval collaborator.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Latest traded price for a symbol.
    async fn latest_price(&self, symbol: &str) -> Result<f64>;

    /// Most recent bars for a symbol, ascending by time.
    async fn recent_bars(&self, symbol: &str, limit: usize) -> Result<Vec<Bar>>;
}

/// Lifecycle events forwarded to the notification collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TradeEvent {
    PositionOpened {
        symbol: String,
        side: Side,
        quantity: f64,
        entry_price: f64,
        score: f64,
    },
    PositionClosed {
        symbol: String,
        reason: String,
        pnl: f64,
        profit_percent: f64,
    },
    SignalRejected {
        symbol: String,
        reasons: Vec<String>,
    },
    BudgetDeclined {
        symbol: String,
        reason: String,
    },
}

/// Notification channel collaborator (chat alert, email, ...).
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn notify(&self, event: &TradeEvent) -> Result<()>;

    /// Channel name for logging
    fn name(&self) -> &str;
}
