//! Momentum indicators over plain price slices.
//!
//! Every function returns a vector the same length as its input, with `NaN`
//! wherever the lookback window is not yet full.

/// Exponential moving average.
///
/// Seeded with the SMA of the first `period` defined values, then
/// `ema[t] = alpha * x[t] + (1 - alpha) * ema[t-1]` with `alpha = 2 / (period + 1)`.
/// Leading `NaN`s in `values` are skipped, so the EMA of a series that is only
/// defined from some index on starts `period - 1` bars after that index.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 {
        return result;
    }

    let Some(first) = values.iter().position(|v| !v.is_nan()) else {
        return result;
    };
    if n - first < period {
        return result;
    }

    let seed_end = first + period;
    let seed_window = &values[first..seed_end];
    if seed_window.iter().any(|v| v.is_nan()) {
        return result;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = seed_window.iter().sum::<f64>() / period as f64;
    result[seed_end - 1] = prev;

    for i in seed_end..n {
        if values[i].is_nan() {
            break;
        }
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = prev;
    }

    result
}

/// Relative strength index with Wilder smoothing. First value at index `period`.
pub fn rsi(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n < period + 1 {
        return result;
    }

    let change = |i: usize| values[i] - values[i - 1];

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let ch = change(i);
        if ch.is_nan() {
            return result;
        }
        if ch > 0.0 {
            avg_gain += ch;
        } else {
            avg_loss -= ch;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    result[period] = rsi_value(avg_gain, avg_loss);

    let alpha = 1.0 / period as f64;
    for i in (period + 1)..n {
        let ch = change(i);
        if ch.is_nan() {
            break;
        }
        avg_gain = alpha * ch.max(0.0) + (1.0 - alpha) * avg_gain;
        avg_loss = alpha * (-ch).max(0.0) + (1.0 - alpha) * avg_loss;
        result[i] = rsi_value(avg_gain, avg_loss);
    }

    result
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

/// MACD line, signal line and histogram.
#[derive(Debug, Clone)]
pub struct Macd {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// `line = ema(fast) - ema(slow)`, `signal = ema(line, signal)`, `histogram = line - signal`.
pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    let fast_ema = ema(values, fast);
    let slow_ema = ema(values, slow);

    let line: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema(&line, signal);
    let histogram = line
        .iter()
        .zip(&signal_line)
        .map(|(l, s)| l - s)
        .collect();

    Macd {
        line,
        signal: signal_line,
        histogram,
    }
}

/// MACD values at one bar. NaN where undefined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdPoint {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Indicator values aligned to a price series, as consumed by the signal filter.
#[derive(Debug, Clone)]
pub struct IndicatorSet {
    pub rsi: Vec<f64>,
    pub macd: Macd,
}

impl IndicatorSet {
    pub fn compute(
        prices: &[f64],
        rsi_period: usize,
        fast: usize,
        slow: usize,
        signal: usize,
    ) -> Self {
        Self {
            rsi: rsi(prices, rsi_period),
            macd: macd(prices, fast, slow, signal),
        }
    }

    pub fn rsi_at(&self, index: usize) -> f64 {
        self.rsi.get(index).copied().unwrap_or(f64::NAN)
    }

    pub fn macd_at(&self, index: usize) -> MacdPoint {
        let at = |values: &[f64]| values.get(index).copied().unwrap_or(f64::NAN);
        MacdPoint {
            line: at(&self.macd.line),
            signal: at(&self.macd.signal),
            histogram: at(&self.macd.histogram),
        }
    }
}
