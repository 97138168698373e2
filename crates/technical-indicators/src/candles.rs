use signal_core::{Bar, Side};

/// Open-to-close body signed in the trade direction: positive when the candle
/// moved with the side, negative against it.
pub fn directional_body(bar: &Bar, side: Side) -> f64 {
    (bar.close - bar.open) * side.direction()
}

/// Strength of the latest candle for the proposed side: directional body as a
/// fraction of the full range, clamped to [0, 1]. A candle closing against the
/// side scores 0. None for a zero-range bar.
pub fn candle_strength(bar: &Bar, side: Side) -> Option<f64> {
    let range = bar.range();
    if range <= 0.0 {
        return None;
    }
    Some((directional_body(bar, side) / range).clamp(0.0, 1.0))
}

/// Highest close over the trailing `window` bars
pub fn highest_close(bars: &[Bar], window: usize) -> Option<f64> {
    if bars.is_empty() || window == 0 {
        return None;
    }
    let start = bars.len().saturating_sub(window);
    bars[start..]
        .iter()
        .map(|b| b.close)
        .reduce(f64::max)
}

/// Lowest close over the trailing `window` bars
pub fn lowest_close(bars: &[Bar], window: usize) -> Option<f64> {
    if bars.is_empty() || window == 0 {
        return None;
    }
    let start = bars.len().saturating_sub(window);
    bars[start..]
        .iter()
        .map(|b| b.close)
        .reduce(f64::min)
}
