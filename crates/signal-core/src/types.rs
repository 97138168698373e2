use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// True when the bar closed above its open.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Full high-to-low range of the bar.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Absolute open-to-close body of the bar.
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }
}

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn label(&self) -> &'static str {
        match self {
            Side::Long => "long",
            Side::Short => "short",
        }
    }

    /// Sign of a favorable price move: +1 for long, -1 for short.
    pub fn direction(&self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

/// Raw trade proposal from an upstream signal generator. Consumed once by the
/// validator; carries no authority of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSignal {
    pub symbol: String,
    pub side: Side,
    pub entry_price: f64,
    pub stop_price: f64,
    pub target_price: f64,
    /// Confidence reported by the generator (0.0 to 1.0)
    pub confidence: f64,
    /// Name of the generator that produced this candidate
    pub generator: String,
}

/// Signal strength tier derived from the final validation score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalStrength {
    Weak,
    Moderate,
    Strong,
    VeryStrong,
}

impl SignalStrength {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 0.90 => SignalStrength::VeryStrong,
            s if s >= 0.80 => SignalStrength::Strong,
            s if s >= 0.70 => SignalStrength::Moderate,
            _ => SignalStrength::Weak,
        }
    }

    /// Human-readable label for the tier
    pub fn label(&self) -> &'static str {
        match self {
            SignalStrength::Weak => "Weak",
            SignalStrength::Moderate => "Moderate",
            SignalStrength::Strong => "Strong",
            SignalStrength::VeryStrong => "Very Strong",
        }
    }
}

/// A candidate that survived all validation layers. Immutable once produced;
/// handed straight to the risk engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedSignal {
    pub symbol: String,
    pub side: Side,
    /// Finalized levels; may differ from the candidate if the validator
    /// tightened them to the adaptive band.
    pub entry_price: f64,
    pub stop_price: f64,
    pub target_price: f64,
    /// Final weighted score (0.0 to 1.0)
    pub score: f64,
    pub strength: SignalStrength,
    /// Names of the confluence indicators that agreed with the side
    pub aligned_indicators: Vec<String>,
    pub win_probability: f64,
    pub risk_reward: f64,
    pub market_context_valid: bool,
    pub timeframe_confirmed: bool,
    pub pattern_confirmed: bool,
    pub volume_confirmed: bool,
    pub validated_at: DateTime<Utc>,
}

impl ValidatedSignal {
    /// Count of confluence indicators aligned with the side
    pub fn aligned_count(&self) -> usize {
        self.aligned_indicators.len()
    }
}

/// Fill report returned by the order-execution collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderConfirmation {
    pub order_id: String,
    pub symbol: String,
    pub filled_quantity: f64,
    pub fill_price: f64,
    pub filled_at: DateTime<Utc>,
}
