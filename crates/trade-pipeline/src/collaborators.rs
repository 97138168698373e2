use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use signal_core::{
    Bar, MarketData, NotificationChannel, OrderConfirmation, OrderExecutor, Side, TradeEvent,
};

/// Simulated executor that fills every order instantly at the requested
/// price. Stands in for a broker client in local runs and tests.
#[derive(Debug, Default)]
pub struct PaperOrderExecutor {
    next_order_id: AtomicU64,
}

impl PaperOrderExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderExecutor for PaperOrderExecutor {
    async fn place_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: f64,
        price: f64,
    ) -> Result<OrderConfirmation> {
        let id = self.next_order_id.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            "paper fill: {} {} {:.4} units @ {:.4}",
            side.label(),
            symbol,
            quantity,
            price
        );
        Ok(OrderConfirmation {
            order_id: format!("paper-{id}"),
            symbol: symbol.to_string(),
            filled_quantity: quantity,
            fill_price: price,
            filled_at: Utc::now(),
        })
    }

    async fn cancel_order(&self, order_id: &str) -> Result<()> {
        tracing::info!("paper cancel: {order_id}");
        Ok(())
    }

    fn is_paper(&self) -> bool {
        true
    }
}

/// Market-data stub that replays queued prices per symbol, for local runs and
/// monitor tests. An exhausted queue is an error, like a dead upstream feed.
#[derive(Debug, Default)]
pub struct ReplayFeed {
    prices: Mutex<HashMap<String, VecDeque<f64>>>,
}

impl ReplayFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self, symbol: &str, prices: &[f64]) {
        let mut map = self.prices.lock().expect("replay feed poisoned");
        map.entry(symbol.to_string())
            .or_default()
            .extend(prices.iter().copied());
    }

    pub fn remaining(&self, symbol: &str) -> usize {
        let map = self.prices.lock().expect("replay feed poisoned");
        map.get(symbol).map(|q| q.len()).unwrap_or(0)
    }
}

#[async_trait]
impl MarketData for ReplayFeed {
    async fn latest_price(&self, symbol: &str) -> Result<f64> {
        let mut map = self.prices.lock().expect("replay feed poisoned");
        map.get_mut(symbol)
            .and_then(|queue| queue.pop_front())
            .ok_or_else(|| anyhow::anyhow!("no price queued for {symbol}"))
    }

    async fn recent_bars(&self, symbol: &str, _limit: usize) -> Result<Vec<Bar>> {
        Err(anyhow::anyhow!("replay feed serves prices only ({symbol})"))
    }
}

/// Notification channel that writes lifecycle events to the log
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl TracingNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationChannel for TracingNotifier {
    async fn notify(&self, event: &TradeEvent) -> Result<()> {
        match event {
            TradeEvent::PositionOpened {
                symbol,
                side,
                quantity,
                entry_price,
                score,
            } => tracing::info!(
                "opened {} {} x{:.4} @ {:.4} (score {:.3})",
                side.label(),
                symbol,
                quantity,
                entry_price,
                score
            ),
            TradeEvent::PositionClosed {
                symbol,
                reason,
                pnl,
                profit_percent,
            } => tracing::info!(
                "closed {} ({}): P&L {:.2} ({:.2}%)",
                symbol,
                reason,
                pnl,
                profit_percent
            ),
            TradeEvent::SignalRejected { symbol, reasons } => {
                tracing::debug!("rejected {}: {}", symbol, reasons.join("; "))
            }
            TradeEvent::BudgetDeclined { symbol, reason } => {
                tracing::info!("declined {}: {}", symbol, reason)
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "tracing"
    }
}
