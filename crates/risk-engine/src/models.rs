use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use signal_core::Side;

/// Risk parameters for one run/day. The daily boundary reset itself is an
/// external scheduling concern; see `RiskEngine::reset_daily`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    pub account_balance: f64,
    /// Fraction of the account risked between entry and stop per trade
    pub max_risk_per_trade: f64,
    /// Fraction of the account that may be lost in a day before new
    /// positions are blocked
    pub max_daily_loss: f64,
    pub max_open_positions: usize,
    /// Admission confidence floor, deliberately below the validator's
    /// acceptance threshold
    pub min_confidence: f64,
    pub trailing_stop_enabled: bool,
    /// Drop from the peak-implied price, in percent, that triggers a
    /// trailing close
    pub trailing_stop_percent: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            account_balance: 10_000.0,
            max_risk_per_trade: 0.02,
            max_daily_loss: 0.10,
            max_open_positions: 3,
            min_confidence: 0.60,
            trailing_stop_enabled: true,
            trailing_stop_percent: 1.5,
        }
    }
}

/// Lifecycle state: Pending -> Open -> Closed, or Pending -> Cancelled when
/// execution fails. A position is in exactly one status at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    Pending,
    Open,
    Closed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    StopLoss,
    TakeProfit,
    TrailingStop,
}

impl CloseReason {
    pub fn label(&self) -> &'static str {
        match self {
            CloseReason::StopLoss => "stop loss",
            CloseReason::TakeProfit => "take profit",
            CloseReason::TrailingStop => "trailing stop",
        }
    }
}

/// A registered position, mutated by the monitoring path on every tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub side: Side,
    pub entry_price: f64,
    pub quantity: f64,
    pub stop_price: f64,
    pub target_price: f64,
    pub opened_at: DateTime<Utc>,
    pub status: PositionStatus,
    /// Running profit in percent of entry, signed in the trade's favor
    pub profit_pct: f64,
    /// Best profit percent seen since open
    pub peak_profit_pct: f64,
    pub close_reason: Option<CloseReason>,
    pub order_id: Option<String>,
}

/// Record emitted when a position closes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    /// Realized profit and loss in account currency
    pub pnl: f64,
    pub profit_pct: f64,
    pub reason: CloseReason,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    pub holding_secs: i64,
}
