use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use signal_core::{AdmissionError, OrderExecutor, Side, ValidatedSignal};

use crate::models::{CloseReason, ClosedTrade, Position, PositionStatus, RiskConfig};

/// Registry and daily counters. One mutual-exclusion domain: admission and
/// monitoring both go through this, so the concurrency cap and the loss
/// accumulator cannot race.
#[derive(Debug, Default)]
struct EngineState {
    positions: HashMap<String, Position>,
    realized_loss: f64,
    realized_pnl: f64,
    trades_closed: u32,
}

/// Enforces the daily risk budget, sizes admitted positions, and drives each
/// open position through its lifecycle on price ticks.
pub struct RiskEngine {
    config: RiskConfig,
    executor: Arc<dyn OrderExecutor>,
    state: Mutex<EngineState>,
}

impl RiskEngine {
    pub fn new(config: RiskConfig, executor: Arc<dyn OrderExecutor>) -> Self {
        Self {
            config,
            executor,
            state: Mutex::new(EngineState::default()),
        }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Admit a validated signal: run the budget checks, size the position,
    /// and execute. A `Pending` entry reserves the registry slot while the
    /// order is in flight, so the concurrency invariant holds at every
    /// instant; the lock is never held across the order placement itself.
    pub async fn admit(&self, signal: &ValidatedSignal) -> Result<Position, AdmissionError> {
        if signal.symbol.is_empty()
            || !signal.entry_price.is_finite()
            || !signal.stop_price.is_finite()
            || signal.entry_price <= 0.0
        {
            return Err(AdmissionError::InvalidSignal(format!(
                "symbol={:?} entry={} stop={}",
                signal.symbol, signal.entry_price, signal.stop_price
            )));
        }

        let pending = {
            let mut state = self.state.lock().expect("risk engine state poisoned");

            let budget = self.config.account_balance * self.config.max_daily_loss;
            if state.realized_loss >= budget {
                return Err(AdmissionError::DailyLossExceeded {
                    realized_loss: state.realized_loss,
                    budget,
                });
            }
            if state.positions.len() >= self.config.max_open_positions {
                return Err(AdmissionError::MaxPositionsReached {
                    open: state.positions.len(),
                    max: self.config.max_open_positions,
                });
            }
            if signal.score < self.config.min_confidence {
                return Err(AdmissionError::ConfidenceBelowFloor {
                    confidence: signal.score,
                    floor: self.config.min_confidence,
                });
            }
            if state.positions.contains_key(&signal.symbol) {
                return Err(AdmissionError::AlreadyOpen {
                    symbol: signal.symbol.clone(),
                });
            }

            let stop_distance = (signal.entry_price - signal.stop_price).abs();
            let quantity =
                self.config.account_balance * self.config.max_risk_per_trade / stop_distance;
            if !quantity.is_finite() || quantity <= 0.0 {
                return Err(AdmissionError::DegenerateStopDistance {
                    entry: signal.entry_price,
                    distance: stop_distance,
                });
            }

            let pending = Position {
                symbol: signal.symbol.clone(),
                side: signal.side,
                entry_price: signal.entry_price,
                quantity,
                stop_price: signal.stop_price,
                target_price: signal.target_price,
                opened_at: Utc::now(),
                status: PositionStatus::Pending,
                profit_pct: 0.0,
                peak_profit_pct: 0.0,
                close_reason: None,
                order_id: None,
            };
            state.positions.insert(signal.symbol.clone(), pending.clone());
            pending
        };

        // Order placement happens outside the critical section; the Pending
        // slot keeps concurrent admissions honest meanwhile.
        let placed = self
            .executor
            .place_order(&signal.symbol, signal.side, pending.quantity, pending.entry_price)
            .await;

        let mut state = self.state.lock().expect("risk engine state poisoned");
        match placed {
            Ok(confirmation) => {
                let mut position = state
                    .positions
                    .remove(&signal.symbol)
                    .unwrap_or_else(|| pending.clone());
                position.status = PositionStatus::Open;
                position.order_id = Some(confirmation.order_id);
                if confirmation.fill_price.is_finite() && confirmation.fill_price > 0.0 {
                    position.entry_price = confirmation.fill_price;
                }
                if confirmation.filled_quantity.is_finite() && confirmation.filled_quantity > 0.0 {
                    position.quantity = confirmation.filled_quantity;
                }
                state
                    .positions
                    .insert(signal.symbol.clone(), position.clone());

                tracing::info!(
                    "{} {} opened: {:.4} units @ {:.4}, stop {:.4}, target {:.4}",
                    position.symbol,
                    position.side.label(),
                    position.quantity,
                    position.entry_price,
                    position.stop_price,
                    position.target_price
                );
                Ok(position)
            }
            Err(e) => {
                // Pending -> Cancelled: release the slot, leave nothing behind
                if let Some(mut cancelled) = state.positions.remove(&signal.symbol) {
                    cancelled.status = PositionStatus::Cancelled;
                    tracing::warn!("{}: order placement failed, slot released", signal.symbol);
                }
                Err(AdmissionError::ExecutionFailed {
                    symbol: signal.symbol.clone(),
                    source: e,
                })
            }
        }
    }

    /// Advance the open position on `symbol` against a fresh price. Returns
    /// the closures this tick produced (at most one per symbol). Requires no
    /// external calls; a position that closed on a previous tick is gone from
    /// the registry, so re-ticking the same price cannot double-close.
    pub fn tick(&self, symbol: &str, price: f64) -> Vec<ClosedTrade> {
        let mut closed = Vec::new();

        if !price.is_finite() || price <= 0.0 {
            tracing::warn!("{}: ignoring bad tick price {}", symbol, price);
            return closed;
        }

        let mut state = self.state.lock().expect("risk engine state poisoned");

        let reason = match state.positions.get_mut(symbol) {
            Some(position) if position.status == PositionStatus::Open => {
                evaluate_position(position, price, &self.config)
            }
            _ => None,
        };

        if let Some(reason) = reason {
            if let Some(mut position) = state.positions.remove(symbol) {
                position.status = PositionStatus::Closed;
                position.close_reason = Some(reason);

                let direction = position.side.direction();
                let pnl = (price - position.entry_price) * position.quantity * direction;
                if pnl < 0.0 {
                    state.realized_loss += -pnl;
                }
                state.realized_pnl += pnl;
                state.trades_closed += 1;

                let closed_at = Utc::now();
                let trade = ClosedTrade {
                    symbol: position.symbol.clone(),
                    side: position.side,
                    quantity: position.quantity,
                    entry_price: position.entry_price,
                    exit_price: price,
                    pnl,
                    profit_pct: position.profit_pct,
                    reason,
                    opened_at: position.opened_at,
                    closed_at,
                    holding_secs: (closed_at - position.opened_at).num_seconds(),
                };

                tracing::info!(
                    "{} closed ({}): P&L {:.2} ({:.2}%), held {}s",
                    trade.symbol,
                    reason.label(),
                    trade.pnl,
                    trade.profit_pct,
                    trade.holding_secs
                );
                closed.push(trade);
            }
        }

        closed
    }

    /// Snapshot of every registered position (Pending included)
    pub fn open_positions(&self) -> Vec<Position> {
        let state = self.state.lock().expect("risk engine state poisoned");
        state.positions.values().cloned().collect()
    }

    /// Symbols with a registered position, for the monitoring loop
    pub fn open_symbols(&self) -> Vec<String> {
        let state = self.state.lock().expect("risk engine state poisoned");
        state.positions.keys().cloned().collect()
    }

    pub fn position(&self, symbol: &str) -> Option<Position> {
        let state = self.state.lock().expect("risk engine state poisoned");
        state.positions.get(symbol).cloned()
    }

    /// Cumulative realized loss this run (losses only, positive number)
    pub fn realized_loss(&self) -> f64 {
        self.state
            .lock()
            .expect("risk engine state poisoned")
            .realized_loss
    }

    /// Net realized P&L this run
    pub fn realized_pnl(&self) -> f64 {
        self.state
            .lock()
            .expect("risk engine state poisoned")
            .realized_pnl
    }

    pub fn trades_closed(&self) -> u32 {
        self.state
            .lock()
            .expect("risk engine state poisoned")
            .trades_closed
    }

    /// Reset the daily accumulators. Open positions carry over; only the
    /// counters that gate new admissions are cleared.
    pub fn reset_daily(&self) {
        let mut state = self.state.lock().expect("risk engine state poisoned");
        state.realized_loss = 0.0;
        state.realized_pnl = 0.0;
        state.trades_closed = 0;
        tracing::info!("daily risk counters reset");
    }
}

/// Update running/peak profit and decide whether the position must close.
/// Pure in-memory arithmetic; stop is checked before target, trailing last.
fn evaluate_position(position: &mut Position, price: f64, config: &RiskConfig) -> Option<CloseReason> {
    let direction = position.side.direction();
    let profit_pct = (price - position.entry_price) / position.entry_price * 100.0 * direction;
    position.profit_pct = profit_pct;
    if profit_pct > position.peak_profit_pct {
        position.peak_profit_pct = profit_pct;
    }

    let stop_hit = match position.side {
        Side::Long => price <= position.stop_price,
        Side::Short => price >= position.stop_price,
    };
    if stop_hit {
        return Some(CloseReason::StopLoss);
    }

    let target_hit = match position.side {
        Side::Long => price >= position.target_price,
        Side::Short => price <= position.target_price,
    };
    if target_hit {
        return Some(CloseReason::TakeProfit);
    }

    if config.trailing_stop_enabled && position.peak_profit_pct > 0.0 {
        let peak_price =
            position.entry_price * (1.0 + direction * position.peak_profit_pct / 100.0);
        let drop_pct = match position.side {
            Side::Long => (peak_price - price) / peak_price * 100.0,
            Side::Short => (price - peak_price) / peak_price * 100.0,
        };
        if drop_pct > config.trailing_stop_percent {
            return Some(CloseReason::TrailingStop);
        }
    }

    None
}
