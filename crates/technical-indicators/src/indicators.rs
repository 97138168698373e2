/// Simple Moving Average
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }

    let mut result = Vec::with_capacity(data.len() - period + 1);
    let mut window_sum: f64 = data[..period].iter().sum();
    result.push(window_sum / period as f64);

    for i in period..data.len() {
        window_sum += data[i] - data[i - period];
        result.push(window_sum / period as f64);
    }
    result
}

/// Exponential Moving Average, seeded with the SMA of the first `period` values
pub fn ema(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.is_empty() {
        return vec![];
    }
    if data.len() < period {
        return vec![data.iter().sum::<f64>() / data.len() as f64];
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let seed: f64 = data[..period].iter().sum::<f64>() / period as f64;

    let mut result = Vec::with_capacity(data.len());
    result.push(seed);
    for &value in &data[1..] {
        let prev = *result.last().unwrap();
        result.push(prev + alpha * (value - prev));
    }
    result
}

/// Relative Strength Index (Wilder smoothing). Needs `period + 1` values;
/// returns one reading per bar after the warmup window.
pub fn rsi(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period + 1 {
        return vec![];
    }

    let deltas: Vec<f64> = data.windows(2).map(|w| w[1] - w[0]).collect();
    let gain = |d: &f64| d.max(0.0);
    let loss = |d: &f64| (-d).max(0.0);

    let mut avg_gain = deltas[..period].iter().map(gain).sum::<f64>() / period as f64;
    let mut avg_loss = deltas[..period].iter().map(loss).sum::<f64>() / period as f64;

    let mut result = Vec::with_capacity(deltas.len() - period + 1);
    let to_rsi = |avg_gain: f64, avg_loss: f64| {
        if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
        }
    };
    result.push(to_rsi(avg_gain, avg_loss));

    for delta in &deltas[period..] {
        avg_gain = (avg_gain * (period - 1) as f64 + gain(delta)) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss(delta)) / period as f64;
        result.push(to_rsi(avg_gain, avg_loss));
    }
    result
}

/// MACD (Moving Average Convergence Divergence)
pub struct Macd {
    pub macd_line: Vec<f64>,
    pub signal_line: Vec<f64>,
    pub histogram: Vec<f64>,
}

impl Macd {
    /// Latest histogram value, if any bars produced one.
    pub fn last_histogram(&self) -> Option<f64> {
        self.histogram.last().copied()
    }
}

pub fn macd(data: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    if fast == 0 || slow == 0 || signal == 0 || slow <= fast || data.len() < slow {
        return Macd {
            macd_line: vec![],
            signal_line: vec![],
            histogram: vec![],
        };
    }

    let ema_fast = ema(data, fast);
    let ema_slow = ema(data, slow);

    // Both EMA series have one value per input bar; difference them directly.
    let macd_line: Vec<f64> = ema_fast
        .iter()
        .zip(ema_slow.iter())
        .map(|(f, s)| f - s)
        .collect();

    let signal_line = ema(&macd_line, signal);
    let histogram: Vec<f64> = macd_line
        .iter()
        .zip(signal_line.iter())
        .map(|(m, s)| m - s)
        .collect();

    Macd {
        macd_line,
        signal_line,
        histogram,
    }
}

/// Bollinger Bands
pub struct Bands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

pub fn bollinger_bands(data: &[f64], period: usize, width: f64) -> Bands {
    if period == 0 || data.len() < period {
        return Bands {
            upper: vec![],
            middle: vec![],
            lower: vec![],
        };
    }

    let middle = sma(data, period);
    let mut upper = Vec::with_capacity(middle.len());
    let mut lower = Vec::with_capacity(middle.len());

    for (i, mean) in middle.iter().enumerate() {
        let window = &data[i..i + period];
        let variance =
            window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / period as f64;
        let band = width * variance.sqrt();
        upper.push(mean + band);
        lower.push(mean - band);
    }

    Bands {
        upper,
        middle,
        lower,
    }
}

/// N-bar rate of change: fractional return from `lookback` bars ago to the
/// latest value. None when history is too short.
pub fn momentum(data: &[f64], lookback: usize) -> Option<f64> {
    if lookback == 0 || data.len() <= lookback {
        return None;
    }
    let past = data[data.len() - 1 - lookback];
    if past == 0.0 {
        return None;
    }
    Some((data[data.len() - 1] - past) / past)
}

/// Bar-over-bar fractional returns
pub fn returns(data: &[f64]) -> Vec<f64> {
    data.windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

/// Latest value relative to the trailing `period`-bar average. None when
/// history is too short or the average is zero.
pub fn relative_to_average(data: &[f64], period: usize) -> Option<f64> {
    if period == 0 || data.len() < period + 1 {
        return None;
    }
    let latest = *data.last().unwrap();
    let trailing = &data[data.len() - 1 - period..data.len() - 1];
    let avg = trailing.iter().sum::<f64>() / period as f64;
    if avg <= 0.0 {
        return None;
    }
    Some(latest / avg)
}
