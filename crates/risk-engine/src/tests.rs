use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use signal_core::{
    AdmissionError, OrderConfirmation, OrderExecutor, Side, SignalStrength, ValidatedSignal,
};

use crate::engine::RiskEngine;
use crate::models::{CloseReason, PositionStatus, RiskConfig};

/// Fills every order at the requested price
struct InstantFill;

#[async_trait]
impl OrderExecutor for InstantFill {
    async fn place_order(
        &self,
        symbol: &str,
        _side: Side,
        quantity: f64,
        price: f64,
    ) -> Result<OrderConfirmation> {
        Ok(OrderConfirmation {
            order_id: format!("fill-{symbol}"),
            symbol: symbol.to_string(),
            filled_quantity: quantity,
            fill_price: price,
            filled_at: Utc::now(),
        })
    }

    async fn cancel_order(&self, _order_id: &str) -> Result<()> {
        Ok(())
    }

    fn is_paper(&self) -> bool {
        true
    }
}

/// Yields a few times before filling, to force interleaving in concurrency
/// tests
struct SlowFill;

#[async_trait]
impl OrderExecutor for SlowFill {
    async fn place_order(
        &self,
        symbol: &str,
        _side: Side,
        quantity: f64,
        price: f64,
    ) -> Result<OrderConfirmation> {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        Ok(OrderConfirmation {
            order_id: format!("slow-{symbol}"),
            symbol: symbol.to_string(),
            filled_quantity: quantity,
            fill_price: price,
            filled_at: Utc::now(),
        })
    }

    async fn cancel_order(&self, _order_id: &str) -> Result<()> {
        Ok(())
    }

    fn is_paper(&self) -> bool {
        true
    }
}

struct AlwaysFails;

#[async_trait]
impl OrderExecutor for AlwaysFails {
    async fn place_order(
        &self,
        _symbol: &str,
        _side: Side,
        _quantity: f64,
        _price: f64,
    ) -> Result<OrderConfirmation> {
        Err(anyhow::anyhow!("exchange unavailable"))
    }

    async fn cancel_order(&self, _order_id: &str) -> Result<()> {
        Ok(())
    }

    fn is_paper(&self) -> bool {
        true
    }
}

fn signal(symbol: &str, side: Side, entry: f64, stop: f64, target: f64) -> ValidatedSignal {
    let risk_reward = (target - entry).abs() / (entry - stop).abs().max(f64::MIN_POSITIVE);
    ValidatedSignal {
        symbol: symbol.to_string(),
        side,
        entry_price: entry,
        stop_price: stop,
        target_price: target,
        score: 0.85,
        strength: SignalStrength::Strong,
        aligned_indicators: vec!["rsi".into(), "macd".into(), "momentum".into()],
        win_probability: 0.70,
        risk_reward,
        market_context_valid: true,
        timeframe_confirmed: true,
        pattern_confirmed: true,
        volume_confirmed: true,
        validated_at: Utc::now(),
    }
}

fn engine_with(config: RiskConfig) -> RiskEngine {
    RiskEngine::new(config, Arc::new(InstantFill))
}

fn small_account() -> RiskConfig {
    RiskConfig {
        account_balance: 1000.0,
        max_risk_per_trade: 0.02,
        ..RiskConfig::default()
    }
}

#[tokio::test]
async fn position_sized_from_risk_budget() {
    // balance=1000, risk=2%, stop distance=1 -> 20 units
    let engine = engine_with(small_account());
    let position = engine
        .admit(&signal("AAPL", Side::Long, 100.0, 99.0, 104.0))
        .await
        .expect("admission should succeed");

    assert!((position.quantity - 20.0).abs() < 1e-9);
    assert_eq!(position.status, PositionStatus::Open);

    let risked = position.quantity * (position.entry_price - position.stop_price).abs();
    assert!((risked - 1000.0 * 0.02).abs() < 1e-6);
}

#[tokio::test]
async fn concurrency_cap_declines_third_position() {
    let config = RiskConfig {
        max_open_positions: 2,
        ..small_account()
    };
    let engine = engine_with(config);

    engine
        .admit(&signal("AAPL", Side::Long, 100.0, 99.0, 104.0))
        .await
        .unwrap();
    engine
        .admit(&signal("MSFT", Side::Long, 200.0, 198.0, 208.0))
        .await
        .unwrap();

    let declined = engine
        .admit(&signal("NVDA", Side::Long, 50.0, 49.5, 52.0))
        .await
        .expect_err("third position must be declined at 2/2");

    assert!(matches!(declined, AdmissionError::MaxPositionsReached { open: 2, max: 2 }));
    assert!(declined.is_budget_decline());
    assert_eq!(engine.open_positions().len(), 2);
}

#[tokio::test]
async fn stop_tick_closes_exactly_once() {
    let engine = engine_with(small_account());
    engine
        .admit(&signal("AAPL", Side::Long, 100.0, 99.0, 104.0))
        .await
        .unwrap();

    // Price at the stop: close with StopLoss
    let closed = engine.tick("AAPL", 99.0);
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].reason, CloseReason::StopLoss);
    assert!((closed[0].pnl - (-20.0)).abs() < 1e-9);

    // Same tick again: the position is gone, nothing double-closes
    assert!(engine.tick("AAPL", 99.0).is_empty());
    assert!((engine.realized_loss() - 20.0).abs() < 1e-9);
    assert_eq!(engine.trades_closed(), 1);
    assert!(engine.position("AAPL").is_none());
}

#[tokio::test]
async fn target_tick_takes_profit() {
    let engine = engine_with(small_account());
    engine
        .admit(&signal("AAPL", Side::Long, 100.0, 99.0, 104.0))
        .await
        .unwrap();

    let closed = engine.tick("AAPL", 104.0);
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].reason, CloseReason::TakeProfit);
    assert!(closed[0].pnl > 0.0);
    // Wins never touch the loss accumulator
    assert!((engine.realized_loss() - 0.0).abs() < 1e-12);
}

#[tokio::test]
async fn short_position_lifecycle() {
    let engine = engine_with(small_account());
    engine
        .admit(&signal("TSLA", Side::Short, 100.0, 101.0, 96.0))
        .await
        .unwrap();

    // Favorable move, then target touch
    assert!(engine.tick("TSLA", 98.0).is_empty());
    let position = engine.position("TSLA").unwrap();
    assert!((position.profit_pct - 2.0).abs() < 1e-9);

    let closed = engine.tick("TSLA", 96.0);
    assert_eq!(closed[0].reason, CloseReason::TakeProfit);
    assert!(closed[0].pnl > 0.0);
}

#[tokio::test]
async fn trailing_stop_locks_in_gains() {
    let config = RiskConfig {
        trailing_stop_enabled: true,
        trailing_stop_percent: 1.5,
        ..small_account()
    };
    let engine = engine_with(config);
    engine
        .admit(&signal("AAPL", Side::Long, 100.0, 95.0, 110.0))
        .await
        .unwrap();

    // Run up to a 5% peak, then give back 1.9% from the peak
    assert!(engine.tick("AAPL", 105.0).is_empty());
    let closed = engine.tick("AAPL", 103.0);

    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].reason, CloseReason::TrailingStop);
    assert!(closed[0].pnl > 0.0);
}

#[tokio::test]
async fn trailing_stop_disabled_keeps_position() {
    let config = RiskConfig {
        trailing_stop_enabled: false,
        ..small_account()
    };
    let engine = engine_with(config);
    engine
        .admit(&signal("AAPL", Side::Long, 100.0, 95.0, 110.0))
        .await
        .unwrap();

    assert!(engine.tick("AAPL", 105.0).is_empty());
    assert!(engine.tick("AAPL", 103.0).is_empty());
    let position = engine.position("AAPL").unwrap();
    assert_eq!(position.status, PositionStatus::Open);
    assert!((position.peak_profit_pct - 5.0).abs() < 1e-9);
}

#[tokio::test]
async fn daily_loss_budget_blocks_until_reset() {
    let config = RiskConfig {
        max_daily_loss: 0.01, // budget = 10 on a 1000 account
        ..small_account()
    };
    let engine = engine_with(config);
    engine
        .admit(&signal("AAPL", Side::Long, 100.0, 99.0, 104.0))
        .await
        .unwrap();

    // Stop out for a 20 loss, exceeding the 10 budget
    let closed = engine.tick("AAPL", 99.0);
    assert_eq!(closed.len(), 1);

    let declined = engine
        .admit(&signal("MSFT", Side::Long, 200.0, 198.0, 208.0))
        .await
        .expect_err("budget exhausted, admission must decline");
    assert!(matches!(declined, AdmissionError::DailyLossExceeded { .. }));

    engine.reset_daily();
    engine
        .admit(&signal("MSFT", Side::Long, 200.0, 198.0, 208.0))
        .await
        .expect("fresh budget admits again");
}

#[tokio::test]
async fn low_confidence_declined() {
    let engine = engine_with(small_account());
    let mut weak = signal("AAPL", Side::Long, 100.0, 99.0, 104.0);
    weak.score = 0.40;

    let declined = engine.admit(&weak).await.expect_err("0.40 < 0.60 floor");
    assert!(matches!(declined, AdmissionError::ConfidenceBelowFloor { .. }));
    assert!(engine.open_positions().is_empty());
}

#[tokio::test]
async fn duplicate_symbol_declined() {
    let engine = engine_with(small_account());
    engine
        .admit(&signal("AAPL", Side::Long, 100.0, 99.0, 104.0))
        .await
        .unwrap();

    let declined = engine
        .admit(&signal("AAPL", Side::Long, 101.0, 100.0, 105.0))
        .await
        .expect_err("second AAPL position must be declined");
    assert!(matches!(declined, AdmissionError::AlreadyOpen { .. }));
}

#[tokio::test]
async fn degenerate_stop_distance_declined() {
    let engine = engine_with(small_account());
    let declined = engine
        .admit(&signal("AAPL", Side::Long, 100.0, 100.0, 104.0))
        .await
        .expect_err("zero stop distance cannot be sized");
    assert!(matches!(declined, AdmissionError::DegenerateStopDistance { .. }));
    assert!(engine.open_positions().is_empty());
}

#[tokio::test]
async fn execution_failure_leaves_no_orphan() {
    let engine = RiskEngine::new(small_account(), Arc::new(AlwaysFails));

    let failed = engine
        .admit(&signal("AAPL", Side::Long, 100.0, 99.0, 104.0))
        .await
        .expect_err("failing executor must surface the error");

    assert!(matches!(failed, AdmissionError::ExecutionFailed { .. }));
    assert!(!failed.is_budget_decline());
    assert!(engine.open_positions().is_empty());
    assert!(engine.tick("AAPL", 99.0).is_empty());
}

#[tokio::test]
async fn malformed_signal_declined() {
    let engine = engine_with(small_account());
    let mut bad = signal("", Side::Long, 100.0, 99.0, 104.0);
    bad.symbol = String::new();

    let declined = engine.admit(&bad).await.expect_err("empty symbol");
    assert!(matches!(declined, AdmissionError::InvalidSignal(_)));
}

#[tokio::test]
async fn bad_tick_price_is_isolated() {
    let engine = engine_with(small_account());
    engine
        .admit(&signal("AAPL", Side::Long, 100.0, 99.0, 104.0))
        .await
        .unwrap();

    // NaN and non-positive prices are ignored without touching the position
    assert!(engine.tick("AAPL", f64::NAN).is_empty());
    assert!(engine.tick("AAPL", -1.0).is_empty());
    assert_eq!(engine.position("AAPL").unwrap().status, PositionStatus::Open);

    // A later sane tick still works
    let closed = engine.tick("AAPL", 99.0);
    assert_eq!(closed.len(), 1);
}

#[tokio::test]
async fn concurrent_admissions_and_ticks_respect_cap() {
    let config = RiskConfig {
        max_open_positions: 3,
        ..small_account()
    };
    let engine = Arc::new(RiskEngine::new(config, Arc::new(SlowFill)));

    let mut handles = Vec::new();
    for i in 0..10 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            let symbol = format!("SYM{i}");
            engine
                .admit(&signal(&symbol, Side::Long, 100.0, 99.0, 104.0))
                .await
        }));
    }
    // Interleave monitoring ticks with the in-flight admissions
    for i in 0..10 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            let symbol = format!("SYM{i}");
            engine.tick(&symbol, 100.5);
            Err(AdmissionError::InvalidSignal("tick task".into()))
        }));
    }

    let mut admitted = 0;
    let mut declined = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(AdmissionError::MaxPositionsReached { .. }) => declined += 1,
            Err(_) => {}
        }
    }

    assert_eq!(admitted, 3);
    assert_eq!(declined, 7);
    assert_eq!(engine.open_positions().len(), 3);
}
