use std::sync::Arc;
use std::time::Duration;

use adaptive_strategy::AdaptiveStrategyManager;
use chrono::{Duration as ChronoDuration, Utc};
use risk_engine::RiskEngine;
use signal_core::{Bar, CandidateSignal, Side};
use signal_validator::SignalValidator;
use tokio::sync::watch;

use crate::collaborators::{PaperOrderExecutor, ReplayFeed, TracingNotifier};
use crate::config::PipelineConfig;
use crate::monitor::PositionMonitor;
use crate::pipeline::TradePipeline;

fn zigzag_uptrend(n: usize) -> Vec<Bar> {
    let mut bars = Vec::with_capacity(n);
    let mut price = 90.0;
    for i in 0..n {
        let open = price;
        let close = if i % 3 == 0 { open * 0.995 } else { open * 1.005 };
        bars.push(Bar {
            timestamp: Utc::now() - ChronoDuration::minutes((n - i) as i64),
            open,
            high: open.max(close) * 1.0005,
            low: open.min(close) * 0.9995,
            close,
            volume: if i == n - 1 { 1_500_000.0 } else { 1_000_000.0 },
        });
        price = close;
    }
    bars
}

fn candidate(symbol: &str) -> CandidateSignal {
    CandidateSignal {
        symbol: symbol.to_string(),
        side: Side::Long,
        entry_price: 100.0,
        stop_price: 99.0,
        target_price: 104.0,
        confidence: 0.8,
        generator: "test".to_string(),
    }
}

struct Harness {
    pipeline: TradePipeline,
    engine: Arc<RiskEngine>,
    validator: Arc<SignalValidator>,
    feed: Arc<ReplayFeed>,
    monitor: PositionMonitor,
}

fn harness(config: PipelineConfig) -> Harness {
    let validator = Arc::new(SignalValidator::new(config.validator_config()));
    let strategy = Arc::new(AdaptiveStrategyManager::new(config.strategy_config()));
    let engine = Arc::new(RiskEngine::new(
        config.risk_config(),
        Arc::new(PaperOrderExecutor::new()),
    ));
    let notifier = Arc::new(TracingNotifier::new());
    let feed = Arc::new(ReplayFeed::new());

    let pipeline = TradePipeline::new(
        Arc::clone(&validator),
        strategy,
        Arc::clone(&engine),
        Arc::clone(&notifier) as Arc<dyn signal_core::NotificationChannel>,
    );
    let monitor = PositionMonitor::new(
        Arc::clone(&engine),
        Arc::clone(&feed) as Arc<dyn signal_core::MarketData>,
        notifier,
        Arc::clone(&validator),
        Duration::from_millis(10),
    );

    Harness {
        pipeline,
        engine,
        validator,
        feed,
        monitor,
    }
}

#[tokio::test]
async fn candidate_flows_to_closed_trade() {
    let h = harness(PipelineConfig::default());
    let series = zigzag_uptrend(60);

    let position = h
        .pipeline
        .process_candidate(&candidate("AAPL"), &series, None)
        .await
        .expect("pipeline must not error")
        .expect("strong candidate should open a position");
    assert!(position.quantity > 0.0);
    assert_eq!(h.engine.open_positions().len(), 1);

    // One monitoring pass with a price through the stop closes the position
    // and feeds the loss back into the win-rate history
    h.feed.queue("AAPL", &[position.stop_price * 0.999]);
    h.monitor.cycle().await;

    assert!(h.engine.open_positions().is_empty());
    assert!(h.engine.realized_loss() > 0.0);
    assert!((h.validator.historical_win_rate("AAPL") - 0.0).abs() < 1e-9);
}

#[tokio::test]
async fn budget_decline_is_not_an_error() {
    let config = PipelineConfig {
        max_open_positions: 0,
        ..PipelineConfig::default()
    };
    let h = harness(config);
    let series = zigzag_uptrend(60);

    let outcome = h
        .pipeline
        .process_candidate(&candidate("AAPL"), &series, None)
        .await
        .expect("budget declines resolve to Ok");
    assert!(outcome.is_none());
    assert!(h.engine.open_positions().is_empty());
}

#[tokio::test]
async fn malformed_candidate_is_dropped() {
    let h = harness(PipelineConfig::default());
    let series = zigzag_uptrend(60);

    let mut bad = candidate("AAPL");
    bad.entry_price = f64::NAN;

    let outcome = h
        .pipeline
        .process_candidate(&bad, &series, None)
        .await
        .expect("malformed candidates are dropped, not errors");
    assert!(outcome.is_none());
}

#[tokio::test]
async fn rejected_candidate_opens_nothing() {
    let h = harness(PipelineConfig::default());
    let series = zigzag_uptrend(60);

    // Inverted levels: rejected by the validator's first layer
    let mut inverted = candidate("AAPL");
    inverted.stop_price = 101.0;
    inverted.target_price = 95.0;

    let outcome = h
        .pipeline
        .process_candidate(&inverted, &series, None)
        .await
        .expect("rejections resolve to Ok");
    assert!(outcome.is_none());
    assert!(h.engine.open_positions().is_empty());
}

#[tokio::test]
async fn monitor_stops_cleanly() {
    let h = harness(PipelineConfig::default());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let monitor = h.monitor;
    let task = tokio::spawn(async move { monitor.run(shutdown_rx).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown_tx.send(true).expect("monitor should be listening");

    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("monitor must stop promptly after shutdown")
        .expect("monitor task must not panic");
}

#[tokio::test]
async fn missing_price_feed_skips_symbol() {
    let h = harness(PipelineConfig::default());
    let series = zigzag_uptrend(60);

    h.pipeline
        .process_candidate(&candidate("AAPL"), &series, None)
        .await
        .unwrap()
        .expect("position should open");

    // Nothing queued in the feed: the cycle logs and moves on
    h.monitor.cycle().await;
    assert_eq!(h.engine.open_positions().len(), 1);
    assert_eq!(h.feed.remaining("AAPL"), 0);
}
