use serde::{Deserialize, Serialize};

/// Floors, ceilings and windows for the ten validation layers. The weights
/// themselves are fixed (see `validator`); only the cutoffs are tunable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Acceptance threshold on the final score when no adaptive thresholds
    /// are supplied for the symbol
    pub min_acceptance_score: f64,
    /// Minimum fraction of evaluated confluence indicators that must agree
    pub min_confluence: f64,
    /// Short-horizon return volatility above which the market is untradable
    pub volatility_ceiling: f64,
    /// Minimum relative separation of the short/medium moving averages
    pub ma_separation_min: f64,
    /// Minimum directional body/range ratio of the latest candle
    pub min_candle_strength: f64,
    /// Volume ratio above which volume counts as confirming
    pub volume_confirm_ratio: f64,
    /// Minimum target-distance to stop-distance ratio
    pub min_risk_reward: f64,
    /// Minimum estimated win probability
    pub min_win_probability: f64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            min_acceptance_score: 0.75,
            min_confluence: 0.60,
            volatility_ceiling: 0.05,
            ma_separation_min: 0.01,
            min_candle_strength: 0.50,
            volume_confirm_ratio: 1.2,
            min_risk_reward: 1.5,
            min_win_probability: 0.65,
        }
    }
}
