use std::sync::Arc;

use adaptive_strategy::AdaptiveStrategyManager;
use anyhow::Result;
use risk_engine::{Position, RiskEngine};
use signal_core::{AdmissionError, Bar, CandidateSignal, NotificationChannel, TradeEvent};
use signal_validator::SignalValidator;

/// Thin wiring from candidate signals through validation and admission.
/// Rejections and budget declines resolve to `Ok(None)`; only execution
/// failures surface as errors.
pub struct TradePipeline {
    validator: Arc<SignalValidator>,
    strategy: Arc<AdaptiveStrategyManager>,
    engine: Arc<RiskEngine>,
    notifier: Arc<dyn NotificationChannel>,
}

impl TradePipeline {
    pub fn new(
        validator: Arc<SignalValidator>,
        strategy: Arc<AdaptiveStrategyManager>,
        engine: Arc<RiskEngine>,
        notifier: Arc<dyn NotificationChannel>,
    ) -> Self {
        Self {
            validator,
            strategy,
            engine,
            notifier,
        }
    }

    pub fn validator(&self) -> &Arc<SignalValidator> {
        &self.validator
    }

    pub fn engine(&self) -> &Arc<RiskEngine> {
        &self.engine
    }

    pub fn strategy(&self) -> &Arc<AdaptiveStrategyManager> {
        &self.strategy
    }

    /// Run one candidate through the full admission path: learn from the
    /// series, validate against the symbol's adaptive thresholds, then hand
    /// the survivor to the risk engine.
    pub async fn process_candidate(
        &self,
        candidate: &CandidateSignal,
        entry_series: &[Bar],
        higher_series: Option<&[Bar]>,
    ) -> Result<Option<Position>> {
        // Malformed candidates are fatal for that signal only
        if candidate.symbol.is_empty()
            || !candidate.entry_price.is_finite()
            || !candidate.stop_price.is_finite()
            || !candidate.target_price.is_finite()
        {
            tracing::error!(
                "dropping malformed candidate from {}: symbol={:?} entry={} stop={} target={}",
                candidate.generator,
                candidate.symbol,
                candidate.entry_price,
                candidate.stop_price,
                candidate.target_price
            );
            return Ok(None);
        }

        // Learning path: every observed series refines the symbol's thresholds
        self.strategy.observe(&candidate.symbol, entry_series);
        let thresholds = self.strategy.thresholds_for(&candidate.symbol);

        let validated = match self.validator.validate(
            candidate,
            entry_series,
            higher_series,
            Some(&thresholds),
        ) {
            Ok(validated) => validated,
            Err(rejection) => {
                self.notify(TradeEvent::SignalRejected {
                    symbol: rejection.symbol.clone(),
                    reasons: rejection.reasons.iter().map(|r| r.to_string()).collect(),
                })
                .await;
                return Ok(None);
            }
        };

        match self.engine.admit(&validated).await {
            Ok(position) => {
                self.notify(TradeEvent::PositionOpened {
                    symbol: position.symbol.clone(),
                    side: position.side,
                    quantity: position.quantity,
                    entry_price: position.entry_price,
                    score: validated.score,
                })
                .await;
                Ok(Some(position))
            }
            Err(decline) if decline.is_budget_decline() => {
                self.notify(TradeEvent::BudgetDeclined {
                    symbol: validated.symbol.clone(),
                    reason: decline.to_string(),
                })
                .await;
                Ok(None)
            }
            Err(AdmissionError::ExecutionFailed { symbol, source }) => {
                tracing::error!("execution failed for {symbol}: {source:#}");
                Err(source.context(format!("order placement failed for {symbol}")))
            }
            Err(other) => {
                tracing::error!("admission error: {other}");
                Ok(None)
            }
        }
    }

    /// Feed a realized outcome back into the validator's win-rate history
    pub fn record_trade_result(&self, symbol: &str, was_profitable: bool, profit_percent: f64) {
        self.validator
            .record_trade_result(symbol, was_profitable, profit_percent);
    }

    async fn notify(&self, event: TradeEvent) {
        if let Err(e) = self.notifier.notify(&event).await {
            tracing::warn!("notification via {} failed: {}", self.notifier.name(), e);
        }
    }
}
