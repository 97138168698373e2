use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Recorded outcomes for one symbol
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SymbolStats {
    pub wins: u32,
    pub losses: u32,
    /// Sum of realized profit percentages across recorded trades
    pub cumulative_profit_pct: f64,
}

impl SymbolStats {
    pub fn trades(&self) -> u32 {
        self.wins + self.losses
    }

    pub fn win_rate(&self) -> Option<f64> {
        let total = self.trades();
        if total == 0 {
            return None;
        }
        Some(self.wins as f64 / total as f64)
    }
}

/// Per-symbol trade outcome store feeding the win-probability layer.
/// Symbols with no recorded history report the neutral 0.50 rate.
#[derive(Debug, Default)]
pub struct TradeHistory {
    records: DashMap<String, SymbolStats>,
}

impl TradeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, symbol: &str, was_profitable: bool, profit_percent: f64) {
        let mut entry = self.records.entry(symbol.to_string()).or_default();
        if was_profitable {
            entry.wins += 1;
        } else {
            entry.losses += 1;
        }
        entry.cumulative_profit_pct += profit_percent;
    }

    /// Historical win rate for a symbol, 0.50 when nothing is recorded
    pub fn win_rate(&self, symbol: &str) -> f64 {
        self.records
            .get(symbol)
            .and_then(|entry| entry.win_rate())
            .unwrap_or(0.5)
    }

    pub fn stats(&self, symbol: &str) -> Option<SymbolStats> {
        self.records.get(symbol).map(|entry| *entry.value())
    }
}
