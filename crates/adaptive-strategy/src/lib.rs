use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use signal_core::Bar;
use statrs::statistics::Statistics;
use technical_indicators::{momentum, relative_to_average, returns, sma};

/// Global defaults the per-symbol thresholds start from, plus the volatility
/// bands that drive adaptation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Starting minimum acceptance score, in points (0-100)
    pub base_min_score: f64,
    /// Starting stop-loss distance, percent of entry
    pub base_stop_loss_pct: f64,
    /// Starting profit-target distance, percent of entry
    pub base_profit_target_pct: f64,
    /// Realized volatility above this tightens thresholds
    pub high_volatility: f64,
    /// Realized volatility below this relaxes thresholds
    pub low_volatility: f64,
    /// Bars required before an observation may adapt thresholds
    pub min_bars: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            base_min_score: 85.0,
            base_stop_loss_pct: 1.0,
            base_profit_target_pct: 3.0,
            high_volatility: 0.03,
            low_volatility: 0.01,
            min_bars: 20,
        }
    }
}

/// Per-symbol thresholds read by the validator and risk engine. Mutated only
/// here, in response to observed volatility.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveThresholds {
    /// Minimum acceptance score in points (0-100)
    pub min_score: f64,
    /// Stop-loss distance, percent of entry
    pub stop_loss_pct: f64,
    /// Profit-target distance, percent of entry
    pub profit_target_pct: f64,
}

impl AdaptiveThresholds {
    fn from_config(config: &StrategyConfig) -> Self {
        Self {
            min_score: config.base_min_score,
            stop_loss_pct: config.base_stop_loss_pct,
            profit_target_pct: config.base_profit_target_pct,
        }
    }
}

/// Snapshot of the market features learned from one observation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketInsight {
    pub symbol: String,
    /// Standard deviation of bar-over-bar returns
    pub volatility: f64,
    /// Relative distance between the short and long moving averages
    pub trend_strength: f64,
    /// 10-bar fractional return
    pub momentum: f64,
    /// Latest volume relative to its trailing average (1.0 = flat)
    pub volume_trend: f64,
    pub sample_size: usize,
    pub observed_at: DateTime<Utc>,
}

/// Learns per-symbol market features and nudges validation thresholds over
/// time. Holds no accept/reject authority: it only supplies parameters that
/// the validator and risk engine read.
pub struct AdaptiveStrategyManager {
    config: StrategyConfig,
    thresholds: DashMap<String, AdaptiveThresholds>,
    insights: DashMap<String, MarketInsight>,
}

impl AdaptiveStrategyManager {
    pub fn new(config: StrategyConfig) -> Self {
        Self {
            config,
            thresholds: DashMap::new(),
            insights: DashMap::new(),
        }
    }

    /// Observe a fresh price series for a symbol, updating its thresholds.
    /// Series shorter than the configured minimum produce an insight but
    /// leave thresholds untouched.
    pub fn observe(&self, symbol: &str, bars: &[Bar]) -> MarketInsight {
        let insight = self.compute_insight(symbol, bars);

        if insight.sample_size >= self.config.min_bars {
            self.adapt(symbol, &insight);
        } else {
            tracing::debug!(
                "{}: {} bars below observation minimum {}, thresholds unchanged",
                symbol,
                insight.sample_size,
                self.config.min_bars
            );
        }

        self.insights.insert(symbol.to_string(), insight.clone());
        insight
    }

    /// Current thresholds for a symbol, created from global defaults on first
    /// access. Returns a snapshot copy; the store itself is never handed out.
    pub fn thresholds_for(&self, symbol: &str) -> AdaptiveThresholds {
        *self
            .thresholds
            .entry(symbol.to_string())
            .or_insert_with(|| AdaptiveThresholds::from_config(&self.config))
    }

    /// Most recent insight computed for a symbol, if any
    pub fn insight_for(&self, symbol: &str) -> Option<MarketInsight> {
        self.insights.get(symbol).map(|entry| entry.value().clone())
    }

    fn compute_insight(&self, symbol: &str, bars: &[Bar]) -> MarketInsight {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

        let window = self.config.min_bars.min(closes.len());
        let rets = returns(&closes[closes.len() - window..]);
        let volatility = if rets.len() >= 2 {
            rets.as_slice().std_dev()
        } else {
            0.0
        };

        let trend_strength = {
            let short = sma(&closes, 20);
            let long = sma(&closes, 50);
            match (short.last(), long.last()) {
                (Some(s), Some(l)) if *l > 0.0 => (s - l) / l,
                _ => 0.0,
            }
        };

        MarketInsight {
            symbol: symbol.to_string(),
            volatility,
            trend_strength,
            momentum: momentum(&closes, 10).unwrap_or(0.0),
            volume_trend: relative_to_average(&volumes, 20).unwrap_or(1.0),
            sample_size: bars.len(),
            observed_at: Utc::now(),
        }
    }

    /// Apply the volatility adaptation rule. The whole entry is updated under
    /// one shard guard, so readers never see a half-applied threshold set.
    fn adapt(&self, symbol: &str, insight: &MarketInsight) {
        let mut entry = self
            .thresholds
            .entry(symbol.to_string())
            .or_insert_with(|| AdaptiveThresholds::from_config(&self.config));

        if insight.volatility > self.config.high_volatility {
            entry.min_score = (entry.min_score + 2.0).min(95.0);
            entry.stop_loss_pct = (entry.stop_loss_pct + 0.3).min(2.0);
            entry.profit_target_pct = (entry.profit_target_pct - 0.5).max(1.5);
            tracing::debug!(
                "{}: volatility {:.4} high, tightened thresholds to {:?}",
                symbol,
                insight.volatility,
                *entry
            );
        } else if insight.volatility < self.config.low_volatility {
            // The floor is one-sided: lowering stops at 80 and never pulls a
            // smaller configured value upward.
            if entry.min_score > 80.0 {
                entry.min_score = (entry.min_score - 2.0).max(80.0);
            }
            entry.stop_loss_pct = (entry.stop_loss_pct - 0.2).max(0.5);
            entry.profit_target_pct = (entry.profit_target_pct + 0.5).min(5.0);
            tracing::debug!(
                "{}: volatility {:.4} low, relaxed thresholds to {:?}",
                symbol,
                insight.volatility,
                *entry
            );
        }
    }
}
