use std::sync::Arc;
use std::time::Duration;

use adaptive_strategy::AdaptiveStrategyManager;
use anyhow::Result;
use chrono::Utc;
use risk_engine::RiskEngine;
use signal_core::{Bar, CandidateSignal, Side};
use signal_validator::SignalValidator;
use tokio::sync::watch;
use trade_pipeline::{
    PaperOrderExecutor, PipelineConfig, PositionMonitor, ReplayFeed, TracingNotifier,
    TradePipeline,
};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load .env, init tracing
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    tracing::info!("Starting TradeGate pipeline (paper mode)");

    // 2. Load configuration
    let config = PipelineConfig::from_env()?;
    tracing::info!("  Account balance: ${:.2}", config.account_balance);
    tracing::info!("  Risk per trade: {:.1}%", config.max_risk_per_trade * 100.0);
    tracing::info!("  Daily loss budget: {:.1}%", config.max_daily_loss * 100.0);
    tracing::info!("  Max open positions: {}", config.max_open_positions);
    tracing::info!("  Acceptance score: {:.2}", config.min_acceptance_score);
    tracing::info!("  Monitor interval: {}s", config.monitor_interval_seconds);

    // 3. Wire the core with paper collaborators
    let validator = Arc::new(SignalValidator::new(config.validator_config()));
    let strategy = Arc::new(AdaptiveStrategyManager::new(config.strategy_config()));
    let executor = Arc::new(PaperOrderExecutor::new());
    let engine = Arc::new(RiskEngine::new(config.risk_config(), executor));
    let notifier: Arc<dyn signal_core::NotificationChannel> = Arc::new(TracingNotifier::new());

    let pipeline = TradePipeline::new(
        Arc::clone(&validator),
        strategy,
        Arc::clone(&engine),
        Arc::clone(&notifier),
    );

    // 4. Demo candidate over a synthetic zigzag uptrend
    let series = demo_series(60);
    let last_close = series.last().map(|b| b.close).unwrap_or(100.0);
    let candidate = CandidateSignal {
        symbol: "DEMO".to_string(),
        side: Side::Long,
        entry_price: last_close,
        stop_price: last_close * 0.99,
        target_price: last_close * 1.04,
        confidence: 0.80,
        generator: "demo".to_string(),
    };

    let feed = Arc::new(ReplayFeed::new());
    let path: Vec<f64> = (1..=8).map(|i| last_close * (1.0 + 0.005 * i as f64)).collect();
    feed.queue("DEMO", &path);

    match pipeline.process_candidate(&candidate, &series, None).await? {
        Some(position) => tracing::info!(
            "demo position opened: {:.4} units @ {:.4}",
            position.quantity,
            position.entry_price
        ),
        None => {
            tracing::info!("demo candidate did not trade; nothing to monitor");
            return Ok(());
        }
    }

    // 5. Monitor until the position resolves or shutdown is requested
    let monitor = PositionMonitor::new(
        Arc::clone(&engine),
        feed,
        notifier,
        validator,
        Duration::from_secs(config.monitor_interval_seconds),
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let monitor_task = tokio::spawn(async move { monitor.run(shutdown_rx).await });

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown requested");
                break;
            }
            _ = tokio::time::sleep(Duration::from_secs(1)) => {
                if engine.open_positions().is_empty() {
                    tracing::info!("all positions closed");
                    break;
                }
            }
        }
    }

    let _ = shutdown_tx.send(true);
    let _ = monitor_task.await;

    tracing::info!(
        "done: {} trades closed, net P&L {:.2}",
        engine.trades_closed(),
        engine.realized_pnl()
    );
    Ok(())
}

/// Zigzag uptrend: one small dip followed by two gains, repeating
fn demo_series(n: usize) -> Vec<Bar> {
    let mut bars = Vec::with_capacity(n);
    let mut price = 95.0;
    for i in 0..n {
        let open = price;
        let close = if i % 3 == 0 { open * 0.995 } else { open * 1.005 };
        bars.push(Bar {
            timestamp: Utc::now() - chrono::Duration::minutes((n - i) as i64),
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
