use adaptive_strategy::StrategyConfig;
use anyhow::Result;
use risk_engine::RiskConfig;
use serde::{Deserialize, Serialize};
use signal_validator::ValidatorConfig;
use std::env;

/// Pipeline configuration, loaded from the environment with conservative
/// defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    // Risk parameters
    pub account_balance: f64,
    pub max_risk_per_trade: f64,   // 0.02 (2%)
    pub max_daily_loss: f64,       // 0.10 (10%)
    pub max_open_positions: usize, // 3
    pub min_admission_confidence: f64,

    // Validation parameters
    pub min_acceptance_score: f64, // 0.75

    // Trailing exits
    pub trailing_stop_enabled: bool,
    pub trailing_stop_percent: f64,

    // Monitoring
    pub monitor_interval_seconds: u64, // 5
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            account_balance: env::var("ACCOUNT_BALANCE")
                .unwrap_or_else(|_| "10000.0".to_string())
                .parse()?,
            max_risk_per_trade: env::var("MAX_RISK_PER_TRADE")
                .unwrap_or_else(|_| "0.02".to_string())
                .parse()?,
            max_daily_loss: env::var("MAX_DAILY_LOSS")
                .unwrap_or_else(|_| "0.10".to_string())
                .parse()?,
            max_open_positions: env::var("MAX_OPEN_POSITIONS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()?,
            min_admission_confidence: env::var("MIN_ADMISSION_CONFIDENCE")
                .unwrap_or_else(|_| "0.60".to_string())
                .parse()?,
            min_acceptance_score: env::var("MIN_ACCEPTANCE_SCORE")
                .unwrap_or_else(|_| "0.75".to_string())
                .parse()?,
            trailing_stop_enabled: env::var("TRAILING_STOP_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .parse()?,
            trailing_stop_percent: env::var("TRAILING_STOP_PERCENT")
                .unwrap_or_else(|_| "1.5".to_string())
                .parse()?,
            monitor_interval_seconds: env::var("MONITOR_INTERVAL")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,
        };

        Ok(config)
    }

    pub fn risk_config(&self) -> RiskConfig {
        RiskConfig {
            account_balance: self.account_balance,
            max_risk_per_trade: self.max_risk_per_trade,
            max_daily_loss: self.max_daily_loss,
            max_open_positions: self.max_open_positions,
            min_confidence: self.min_admission_confidence,
            trailing_stop_enabled: self.trailing_stop_enabled,
            trailing_stop_percent: self.trailing_stop_percent,
        }
    }

    pub fn validator_config(&self) -> ValidatorConfig {
        ValidatorConfig {
            min_acceptance_score: self.min_acceptance_score,
            ..ValidatorConfig::default()
        }
    }

    pub fn strategy_config(&self) -> StrategyConfig {
        StrategyConfig::default()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            account_balance: 10_000.0,
            max_risk_per_trade: 0.02,
            max_daily_loss: 0.10,
            max_open_positions: 3,
            min_admission_confidence: 0.60,
            min_acceptance_score: 0.75,
            trailing_stop_enabled: true,
            trailing_stop_percent: 1.5,
            monitor_interval_seconds: 5,
        }
    }
}
