use adaptive_strategy::AdaptiveThresholds;
use chrono::Utc;
use signal_core::{
    Bar, CandidateSignal, RejectReason, Side, SignalRejection, SignalStrength, ValidatedSignal,
};
use statrs::statistics::Statistics;
use technical_indicators::{
    bollinger_bands, candle_strength, highest_close, lowest_close, macd, momentum,
    relative_to_average, returns, rsi, sma,
};

use crate::config::ValidatorConfig;
use crate::history::TradeHistory;

// Fixed layer weights; booleans contribute their full weight only when true.
const WEIGHT_CONFLUENCE: f64 = 0.25;
const WEIGHT_TIMEFRAME: f64 = 0.10;
const WEIGHT_PATTERN: f64 = 0.15;
const WEIGHT_VOLUME: f64 = 0.10;
const WEIGHT_WIN_PROBABILITY: f64 = 0.20;
const WEIGHT_PULLBACK: f64 = 0.05;
const WEIGHT_DIVERGENCE: f64 = 0.05;
const TOTAL_WEIGHT: f64 = WEIGHT_CONFLUENCE
    + WEIGHT_TIMEFRAME
    + WEIGHT_PATTERN
    + WEIGHT_VOLUME
    + WEIGHT_WIN_PROBABILITY
    + WEIGHT_PULLBACK
    + WEIGHT_DIVERGENCE;

// Minimum history per indicator; anything shorter is skipped, never an error.
const MIN_BARS_OSCILLATOR: usize = 14;
const MIN_BARS_DIVERGENCE_PAIR: usize = 26;
const MIN_BARS_BANDS: usize = 20;
const MIN_BARS_MA_ALIGNMENT: usize = 50;
const MIN_BARS_MOMENTUM: usize = 10;

/// Ten-layer signal validation pipeline. Pure over its inputs plus the
/// adaptive thresholds snapshot; owns only the trade-history store that
/// backs the win-probability layer.
pub struct SignalValidator {
    config: ValidatorConfig,
    history: TradeHistory,
}

impl SignalValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self {
            config,
            history: TradeHistory::new(),
        }
    }

    /// Feed a realized trade outcome into the win-rate history
    pub fn record_trade_result(&self, symbol: &str, was_profitable: bool, profit_percent: f64) {
        self.history.record(symbol, was_profitable, profit_percent);
    }

    pub fn historical_win_rate(&self, symbol: &str) -> f64 {
        self.history.win_rate(symbol)
    }

    /// Run a candidate through all ten layers. Hard rejects and floor
    /// violations accumulate into the returned rejection; only the price
    /// sanity layer short-circuits.
    pub fn validate(
        &self,
        candidate: &CandidateSignal,
        entry_series: &[Bar],
        higher_series: Option<&[Bar]>,
        thresholds: Option<&AdaptiveThresholds>,
    ) -> Result<ValidatedSignal, SignalRejection> {
        let side = candidate.side;
        let entry = candidate.entry_price;

        // Layer 1: price sanity. A candidate with inverted levels is not
        // worth scoring at all.
        if !levels_sane(side, entry, candidate.stop_price, candidate.target_price) {
            let reason = RejectReason::InvalidLevels {
                side,
                entry,
                stop: candidate.stop_price,
                target: candidate.target_price,
            };
            tracing::debug!("{}: {}", candidate.symbol, reason);
            return Err(SignalRejection::new(candidate.symbol.clone(), vec![reason]));
        }

        // Finalize levels against the adaptive band before anything that
        // depends on them (risk/reward, sizing downstream).
        let (stop, target) =
            adjust_levels(side, entry, candidate.stop_price, candidate.target_price, thresholds);

        let closes: Vec<f64> = entry_series.iter().map(|b| b.close).collect();
        let volumes: Vec<f64> = entry_series.iter().map(|b| b.volume).collect();

        let mut reasons: Vec<RejectReason> = Vec::new();

        // Layer 2: indicator confluence
        let confluence = self.evaluate_confluence(side, &closes);
        if confluence.evaluated > 0 && confluence.score() < self.config.min_confluence {
            reasons.push(RejectReason::LowConfluence {
                aligned: confluence.aligned.len(),
                evaluated: confluence.evaluated,
                floor: self.config.min_confluence,
            });
        }

        // Layer 3: higher-timeframe confirmation (missing data passes)
        let timeframe_confirmed = higher_series
            .map(|bars| timeframe_confirms(side, bars))
            .unwrap_or(true);

        // Layer 4: market context
        let market_context_valid = self.check_market_context(&closes, &mut reasons);

        // Layer 5: candle-pattern strength
        let pattern_score = match entry_series.last().and_then(|bar| candle_strength(bar, side)) {
            Some(strength) => {
                if strength < self.config.min_candle_strength {
                    reasons.push(RejectReason::WeakCandle {
                        strength,
                        floor: self.config.min_candle_strength,
                    });
                }
                strength
            }
            // No bar or a zero-range bar: nothing to judge, neutral
            None => 0.5,
        };
        let pattern_confirmed = pattern_score >= self.config.min_candle_strength;

        // Layer 6: volume confirmation (missing volume passes, neutral score)
        let (volume_confirmed, volume_score) = match relative_to_average(&volumes, MIN_BARS_BANDS)
        {
            Some(ratio) => (ratio > self.config.volume_confirm_ratio, (ratio / 2.0).min(1.0)),
            None => (true, 0.5),
        };

        // Layer 7: risk/reward on the finalized levels
        let risk_reward = (target - entry).abs() / (entry - stop).abs();
        if risk_reward < self.config.min_risk_reward {
            reasons.push(RejectReason::PoorRiskReward {
                ratio: risk_reward,
                minimum: self.config.min_risk_reward,
            });
        }

        // Layer 8: win-probability estimate
        let win_rate = self.history.win_rate(&candidate.symbol);
        let win_probability =
            (0.50 + confluence.score() * 0.20 + (win_rate - 0.50) * 0.15).clamp(0.50, 0.95);
        if win_probability < self.config.min_win_probability {
            reasons.push(RejectReason::LowWinProbability {
                probability: win_probability,
                floor: self.config.min_win_probability,
            });
        }

        // Layers 9 and 10: pullback and divergence (short data passes)
        let pullback_ok = pullback_valid(side, entry_series);
        let divergence_ok = divergence_clear(side, &closes);

        // Weighted aggregate, each sub-score clamped before weighting
        let score = (WEIGHT_CONFLUENCE * confluence.score().clamp(0.0, 1.0)
            + WEIGHT_TIMEFRAME * bool_score(timeframe_confirmed)
            + WEIGHT_PATTERN * pattern_score.clamp(0.0, 1.0)
            + WEIGHT_VOLUME * volume_score.clamp(0.0, 1.0)
            + WEIGHT_WIN_PROBABILITY * win_probability.clamp(0.0, 1.0)
            + WEIGHT_PULLBACK * bool_score(pullback_ok)
            + WEIGHT_DIVERGENCE * bool_score(divergence_ok))
            / TOTAL_WEIGHT;

        let acceptance_threshold = thresholds
            .map(|t| t.min_score / 100.0)
            .unwrap_or(self.config.min_acceptance_score);
        if score < acceptance_threshold {
            reasons.push(RejectReason::ScoreBelowThreshold {
                score,
                threshold: acceptance_threshold,
            });
        }

        if !reasons.is_empty() {
            let rejection = SignalRejection::new(candidate.symbol.clone(), reasons);
            tracing::debug!("{}", rejection);
            return Err(rejection);
        }

        let strength = SignalStrength::from_score(score);
        tracing::info!(
            "{} {} accepted: score={:.3} ({}), confluence {}/{}, R:R {:.2}, win prob {:.2}",
            candidate.symbol,
            side.label(),
            score,
            strength.label(),
            confluence.aligned.len(),
            confluence.evaluated,
            risk_reward,
            win_probability
        );

        Ok(ValidatedSignal {
            symbol: candidate.symbol.clone(),
            side,
            entry_price: entry,
            stop_price: stop,
            target_price: target,
            score,
            strength,
            aligned_indicators: confluence.aligned,
            win_probability,
            risk_reward,
            market_context_valid,
            timeframe_confirmed,
            pattern_confirmed,
            volume_confirmed,
            validated_at: Utc::now(),
        })
    }

    /// Evaluate the five confluence indicators against the proposed side.
    /// Indicators without enough history are left out of the fraction.
    fn evaluate_confluence(&self, side: Side, closes: &[f64]) -> Confluence {
        let mut result = Confluence::default();

        // Oscillator band position: headroom left in the trade direction
        if closes.len() > MIN_BARS_OSCILLATOR {
            if let Some(&last) = rsi(closes, MIN_BARS_OSCILLATOR).last() {
                let aligned = match side {
                    Side::Long => (35.0..=70.0).contains(&last),
                    Side::Short => (30.0..=65.0).contains(&last),
                };
                result.tally("rsi", aligned);
            }
        }

        // Moving-average-pair divergence sign
        if closes.len() >= MIN_BARS_DIVERGENCE_PAIR {
            if let Some(histogram) = macd(closes, 12, 26, 9).last_histogram() {
                result.tally("macd", histogram * side.direction() > 0.0);
            }
        }

        // Mean-reversion band headroom
        if closes.len() >= MIN_BARS_BANDS {
            let bands = bollinger_bands(closes, MIN_BARS_BANDS, 2.0);
            if let (Some(&upper), Some(&lower), Some(&last)) =
                (bands.upper.last(), bands.lower.last(), closes.last())
            {
                let aligned = match side {
                    Side::Long => last < upper,
                    Side::Short => last > lower,
                };
                result.tally("bollinger", aligned);
            }
        }

        // Long/short moving-average ordering
        if closes.len() >= MIN_BARS_MA_ALIGNMENT {
            let short = sma(closes, 20);
            let long = sma(closes, 50);
            if let (Some(&s), Some(&l)) = (short.last(), long.last()) {
                let aligned = match side {
                    Side::Long => s > l,
                    Side::Short => s < l,
                };
                result.tally("ma_alignment", aligned);
            }
        }

        // Short-term momentum acceleration
        if let Some(rate) = momentum(closes, MIN_BARS_MOMENTUM) {
            result.tally("momentum", rate * side.direction() > 0.0);
        }

        result
    }

    /// Layer 4 hard rejects: excessive short-horizon volatility, or short and
    /// medium moving averages too close to call a direction.
    fn check_market_context(&self, closes: &[f64], reasons: &mut Vec<RejectReason>) -> bool {
        let mut valid = true;

        if closes.len() > MIN_BARS_MOMENTUM {
            let window = &closes[closes.len() - MIN_BARS_MOMENTUM - 1..];
            let rets = returns(window);
            if rets.len() >= 2 {
                let volatility = rets.as_slice().std_dev();
                if volatility > self.config.volatility_ceiling {
                    reasons.push(RejectReason::ExcessiveVolatility {
                        volatility,
                        ceiling: self.config.volatility_ceiling,
                    });
                    valid = false;
                }
            }
        }

        if closes.len() >= 30 {
            let short = sma(closes, 10);
            let medium = sma(closes, 30);
            if let (Some(&s), Some(&m), Some(&last)) = (short.last(), medium.last(), closes.last())
            {
                if last > 0.0 {
                    let separation = (s - m).abs() / last;
                    if separation < self.config.ma_separation_min {
                        reasons.push(RejectReason::FlatMarket {
                            separation,
                            minimum: self.config.ma_separation_min,
                        });
                        valid = false;
                    }
                }
            }
        }

        valid
    }
}

/// Aligned/evaluated bookkeeping for the confluence layer
#[derive(Debug, Default)]
struct Confluence {
    aligned: Vec<String>,
    evaluated: usize,
}

impl Confluence {
    fn tally(&mut self, name: &str, aligned: bool) {
        self.evaluated += 1;
        if aligned {
            self.aligned.push(name.to_string());
        }
    }

    /// Fraction of evaluated indicators that agreed; neutral 0.5 when no
    /// indicator had enough history to vote.
    fn score(&self) -> f64 {
        if self.evaluated == 0 {
            return 0.5;
        }
        self.aligned.len() as f64 / self.evaluated as f64
    }
}

fn bool_score(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}

fn levels_sane(side: Side, entry: f64, stop: f64, target: f64) -> bool {
    match side {
        Side::Long => stop < entry && entry < target,
        Side::Short => target < entry && entry < stop,
    }
}

/// Tighten candidate levels to the adaptive band: a stop wider than the
/// adaptive stop-loss distance is pulled in, a target beyond the adaptive
/// profit-target distance is pulled in. Ordering is preserved.
fn adjust_levels(
    side: Side,
    entry: f64,
    stop: f64,
    target: f64,
    thresholds: Option<&AdaptiveThresholds>,
) -> (f64, f64) {
    let Some(t) = thresholds else {
        return (stop, target);
    };
    let stop_distance = entry * t.stop_loss_pct / 100.0;
    let target_distance = entry * t.profit_target_pct / 100.0;

    match side {
        Side::Long => (
            stop.max(entry - stop_distance),
            target.min(entry + target_distance),
        ),
        Side::Short => (
            stop.min(entry + stop_distance),
            target.max(entry - target_distance),
        ),
    }
}

/// Higher-timeframe trend and oscillator range must not contradict the side.
fn timeframe_confirms(side: Side, bars: &[Bar]) -> bool {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    if closes.len() >= MIN_BARS_MA_ALIGNMENT {
        let short = sma(&closes, 20);
        let long = sma(&closes, 50);
        if let (Some(&s), Some(&l)) = (short.last(), long.last()) {
            let contradicts = match side {
                Side::Long => s < l,
                Side::Short => s > l,
            };
            if contradicts {
                return false;
            }
        }
    }

    if closes.len() > MIN_BARS_OSCILLATOR {
        if let Some(&last) = rsi(&closes, MIN_BARS_OSCILLATOR).last() {
            let exhausted = match side {
                Side::Long => last > 75.0,
                Side::Short => last < 25.0,
            };
            if exhausted {
                return false;
            }
        }
    }

    true
}

/// Layer 9: the short window must show a retracement that has resumed in the
/// trade direction. No visible pullback, or not enough bars, passes.
fn pullback_valid(side: Side, bars: &[Bar]) -> bool {
    if bars.len() < MIN_BARS_MOMENTUM {
        return true;
    }
    let last = match bars.last() {
        Some(bar) => bar.close,
        None => return true,
    };

    match side {
        Side::Long => {
            let (Some(high), Some(low)) = (highest_close(bars, 10), lowest_close(bars, 5)) else {
                return true;
            };
            if high <= 0.0 || (high - low) / high < 0.001 {
                return true;
            }
            // Continuation means price has lifted off the pullback low
            last > low
        }
        Side::Short => {
            let (Some(low), Some(high)) = (lowest_close(bars, 10), highest_close(bars, 5)) else {
                return true;
            };
            if low <= 0.0 || (high - low) / low < 0.001 {
                return true;
            }
            last < high
        }
    }
}

/// Layer 10: the oscillator's short-window trend must not diverge hard
/// against the expected price direction. Insufficient data passes.
fn divergence_clear(side: Side, closes: &[f64]) -> bool {
    let oscillator = rsi(closes, MIN_BARS_OSCILLATOR);
    if oscillator.len() < 5 || closes.len() < 5 {
        return true;
    }

    let price_change = closes[closes.len() - 1] - closes[closes.len() - 5];
    let oscillator_change = oscillator[oscillator.len() - 1] - oscillator[oscillator.len() - 5];

    match side {
        // Price pushing up while the oscillator falls away is bearish divergence
        Side::Long => !(price_change > 0.0 && oscillator_change < -10.0),
        Side::Short => !(price_change < 0.0 && oscillator_change > 10.0),
    }
}
