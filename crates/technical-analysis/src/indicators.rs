//! Indicator math over plain price/return slices.
//!
//! Every function returns one entry per input entry; `None` marks values that
//! are not computable (leading window, broken domain) and is never replaced by
//! a made-up number. Entry `i` only ever depends on inputs at indices `<= i`.

use analysis_core::stats::{self, rolling, rolling_mean, sample_std_dev};
use analysis_core::Series;

/// Simple Moving Average
pub fn sma(data: &[f64], period: usize) -> Series {
    rolling_mean(data, period)
}

/// Trailing sample standard deviation
pub fn rolling_std(data: &[f64], period: usize) -> Series {
    let wrapped: Series = data.iter().copied().map(Some).collect();
    rolling(&wrapped, period, sample_std_dev)
}

/// Simple daily returns: `close[i] / close[i - 1] - 1`.
///
/// Undefined at index 0 and wherever either price is not strictly positive.
pub fn daily_returns(closes: &[f64]) -> Series {
    let mut out = Vec::with_capacity(closes.len());
    if closes.is_empty() {
        return out;
    }
    out.push(None);

    for (i, pair) in closes.windows(2).enumerate() {
        let (prev, curr) = (pair[0], pair[1]);
        if prev > 0.0 && curr > 0.0 {
            out.push(Some(curr / prev - 1.0));
        } else {
            tracing::warn!(
                "Non-positive close in return window at index {} (prev={}, curr={}), return left undefined",
                i + 1,
                prev,
                curr
            );
            out.push(None);
        }
    }
    out
}

/// Compounded returns from a daily return series.
///
/// Index 0 is 0 by definition. Once a later daily return is undefined the
/// compounding chain is broken and every following value is undefined.
pub fn cumulative_returns(daily: &[Option<f64>]) -> Series {
    let mut out = Vec::with_capacity(daily.len());
    let mut growth = Some(1.0);

    for (i, r) in daily.iter().enumerate() {
        if i > 0 {
            growth = match (growth, r) {
                (Some(g), Some(r)) => Some(g * (1.0 + r)),
                _ => None,
            };
        }
        out.push(growth.map(|g| g - 1.0));
    }
    out
}

/// Bollinger Bands
#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub upper: Series,
    pub middle: Series,
    pub lower: Series,
}

/// Bands at `middle ± k * sample_std` over the same trailing window.
///
/// A band value needs both the mean and the standard deviation; with a window
/// of one the mean exists but the bands stay undefined.
pub fn bollinger_bands(data: &[f64], period: usize, k: f64) -> BollingerBands {
    let middle = sma(data, period);
    let std = rolling_std(data, period);

    let (upper, lower): (Series, Series) = middle
        .iter()
        .zip(&std)
        .map(|(m, s)| match (m, s) {
            (Some(m), Some(s)) => (Some(m + k * s), Some(m - k * s)),
            _ => (None, None),
        })
        .unzip();

    BollingerBands { upper, middle, lower }
}

/// Relative Strength Index from simple rolling means of gains and losses.
///
/// Undefined before index `period`. A window with losses of zero and positive
/// gains is 100; a window with neither gains nor losses is undefined.
pub fn rsi(data: &[f64], period: usize) -> Series {
    let mut gains: Series = Vec::with_capacity(data.len());
    let mut losses: Series = Vec::with_capacity(data.len());

    for i in 0..data.len() {
        if i == 0 {
            gains.push(None);
            losses.push(None);
            continue;
        }
        let change = data[i] - data[i - 1];
        gains.push(Some(change.max(0.0)));
        losses.push(Some((-change).max(0.0)));
    }

    let avg_gain = rolling(&gains, period, stats::mean);
    let avg_loss = rolling(&losses, period, stats::mean);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(g, l)| match (*g, *l) {
            (Some(g), Some(l)) if l > 0.0 => {
                let rs = g / l;
                Some(100.0 - 100.0 / (1.0 + rs))
            }
            (Some(g), Some(_)) if g > 0.0 => Some(100.0),
            _ => None,
        })
        .collect()
}

/// Annualized rolling volatility: `sample_std(returns window) * sqrt(trading_days)`.
///
/// A window containing any undefined return is undefined.
pub fn rolling_volatility(returns: &[Option<f64>], period: usize, trading_days: u32) -> Series {
    let annualize = (trading_days as f64).sqrt();
    rolling(returns, period, |w| sample_std_dev(w).map(|sd| sd * annualize))
}
