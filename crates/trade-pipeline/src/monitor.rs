use std::sync::Arc;
use std::time::Duration;

use risk_engine::RiskEngine;
use signal_core::{MarketData, NotificationChannel, TradeEvent};
use signal_validator::SignalValidator;
use tokio::sync::watch;
use tokio::time;

/// Periodic monitoring path: re-evaluates every open position against a
/// fresh price and forwards closures. Price retrieval happens outside the
/// engine's critical section; a failed fetch for one symbol never blocks the
/// others.
pub struct PositionMonitor {
    engine: Arc<RiskEngine>,
    market_data: Arc<dyn MarketData>,
    notifier: Arc<dyn NotificationChannel>,
    validator: Arc<SignalValidator>,
    interval: Duration,
}

impl PositionMonitor {
    pub fn new(
        engine: Arc<RiskEngine>,
        market_data: Arc<dyn MarketData>,
        notifier: Arc<dyn NotificationChannel>,
        validator: Arc<SignalValidator>,
        interval: Duration,
    ) -> Self {
        Self {
            engine,
            market_data,
            notifier,
            validator,
            interval,
        }
    }

    /// Run until the shutdown channel flips. The in-flight cycle always
    /// completes before the loop exits, so no position transition is left
    /// half-applied.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = time::interval(self.interval);
        tracing::info!(
            "position monitor started (interval {}s)",
            self.interval.as_secs()
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.cycle().await;
                }
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        tracing::info!("position monitor stopping");
                        break;
                    }
                }
            }
        }
    }

    /// One monitoring pass over every registered symbol
    pub async fn cycle(&self) {
        for symbol in self.engine.open_symbols() {
            let price = match self.market_data.latest_price(&symbol).await {
                Ok(price) => price,
                Err(e) => {
                    tracing::warn!("price fetch failed for {}: {}", symbol, e);
                    continue;
                }
            };

            for trade in self.engine.tick(&symbol, price) {
                self.validator
                    .record_trade_result(&trade.symbol, trade.pnl > 0.0, trade.profit_pct);

                let event = TradeEvent::PositionClosed {
                    symbol: trade.symbol.clone(),
                    reason: trade.reason.label().to_string(),
                    pnl: trade.pnl,
                    profit_percent: trade.profit_pct,
                };
                if let Err(e) = self.notifier.notify(&event).await {
                    tracing::warn!("notification via {} failed: {}", self.notifier.name(), e);
                }
            }
        }
    }
}
