//! Rolling price statistics over plain `f64` slices.
//!
//! Every function looks at the tail of `prices` (oldest first, newest last).

/// Arithmetic mean of the last `period` prices.
///
/// `None` when fewer than `period` prices are available or `period` is zero.
pub fn sma(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }
    let tail = &prices[prices.len() - period..];
    Some(tail.iter().sum::<f64>() / period as f64)
}

/// Sample standard deviation (n - 1 denominator) of `prices`.
///
/// `None` for fewer than two samples.
pub fn sample_std(prices: &[f64]) -> Option<f64> {
    let n = prices.len();
    if n < 2 {
        return None;
    }
    let mean = prices.iter().sum::<f64>() / n as f64;
    let var = prices.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    Some(var.sqrt())
}

/// Z-score of the newest price against the last `window` prices.
///
/// Returns 0.0 when fewer than `window` prices exist or the window is flat.
pub fn zscore(prices: &[f64], window: usize) -> f64 {
    if window == 0 || prices.len() < window {
        return 0.0;
    }
    let tail = &prices[prices.len() - window..];
    let (Some(mean), Some(std)) = (sma(tail, window), sample_std(tail)) else {
        return 0.0;
    };
    if std == 0.0 {
        return 0.0;
    }
    match tail.last() {
        Some(last) => (last - mean) / std,
        None => 0.0,
    }
}

/// Fractional change from the second-to-last to the last price.
pub fn pct_change(prices: &[f64]) -> Option<f64> {
    match prices {
        [.., prev, last] if *prev != 0.0 => Some((last - prev) / prev),
        _ => None,
    }
}

/// Lower Bollinger band: SMA(period) - k * sample std over the same tail.
pub fn lower_band(prices: &[f64], period: usize, k: f64) -> Option<f64> {
    let mid = sma(prices, period)?;
    let std = sample_std(&prices[prices.len() - period..])?;
    Some(mid - k * std)
}
