use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Side;

/// One enumerated reason per rejecting validation layer, carrying the numeric
/// inputs needed to reproduce the decision.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum RejectReason {
    #[error("invalid levels for {side:?}: stop={stop:.4} entry={entry:.4} target={target:.4}")]
    InvalidLevels {
        side: Side,
        entry: f64,
        stop: f64,
        target: f64,
    },

    #[error("confluence {aligned}/{evaluated} below floor {floor:.2}")]
    LowConfluence {
        aligned: usize,
        evaluated: usize,
        floor: f64,
    },

    #[error("volatility {volatility:.4} exceeds ceiling {ceiling:.4}")]
    ExcessiveVolatility { volatility: f64, ceiling: f64 },

    #[error("flat market: moving-average separation {separation:.4} below {minimum:.4}")]
    FlatMarket { separation: f64, minimum: f64 },

    #[error("candle strength {strength:.2} below floor {floor:.2}")]
    WeakCandle { strength: f64, floor: f64 },

    #[error("risk/reward {ratio:.2} below minimum {minimum:.2}")]
    PoorRiskReward { ratio: f64, minimum: f64 },

    #[error("win probability {probability:.2} below floor {floor:.2}")]
    LowWinProbability { probability: f64, floor: f64 },

    #[error("score {score:.3} below acceptance threshold {threshold:.3}")]
    ScoreBelowThreshold { score: f64, threshold: f64 },
}

/// Outcome of a failed validation: the accumulated reasons, in layer order.
/// Expected and frequent — "no trade", not a fault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalRejection {
    pub symbol: String,
    pub reasons: Vec<RejectReason>,
}

impl SignalRejection {
    pub fn new(symbol: impl Into<String>, reasons: Vec<RejectReason>) -> Self {
        Self {
            symbol: symbol.into(),
            reasons,
        }
    }

    /// True if any reason matches the given predicate.
    pub fn has(&self, pred: impl Fn(&RejectReason) -> bool) -> bool {
        self.reasons.iter().any(pred)
    }
}

impl std::fmt::Display for SignalRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} rejected: ", self.symbol)?;
        for (i, reason) in self.reasons.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{reason}")?;
        }
        Ok(())
    }
}

/// Why the risk engine declined (or failed) to open a position.
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("daily loss budget exhausted: lost {realized_loss:.2} of {budget:.2}")]
    DailyLossExceeded { realized_loss: f64, budget: f64 },

    #[error("position limit reached ({open}/{max})")]
    MaxPositionsReached { open: usize, max: usize },

    #[error("confidence {confidence:.2} below admission floor {floor:.2}")]
    ConfidenceBelowFloor { confidence: f64, floor: f64 },

    #[error("position already open for {symbol}")]
    AlreadyOpen { symbol: String },

    #[error("degenerate stop distance {distance:.6} for entry {entry:.4}")]
    DegenerateStopDistance { entry: f64, distance: f64 },

    #[error("order placement failed for {symbol}: {source}")]
    ExecutionFailed {
        symbol: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("malformed signal: {0}")]
    InvalidSignal(String),
}

impl AdmissionError {
    /// Budget-style declines are expected and non-fatal; execution failures
    /// and malformed signals are not.
    pub fn is_budget_decline(&self) -> bool {
        matches!(
            self,
            AdmissionError::DailyLossExceeded { .. }
                | AdmissionError::MaxPositionsReached { .. }
                | AdmissionError::ConfidenceBelowFloor { .. }
                | AdmissionError::AlreadyOpen { .. }
        )
    }
}
