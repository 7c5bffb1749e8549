//! Trailing-window statistics: simple moving average, sample standard
//! deviation, and rolling extremes.

use common::Result;

use super::{require, Series};

/// Simple moving average of `values` over the trailing `window` points.
/// `None` for the first `window - 1` points.
pub fn sma(values: &[f64], window: usize) -> Result<Series> {
    require(values.len(), window)?;
    Ok(rolling(values, window, |w| w.iter().sum::<f64>() / w.len() as f64))
}

/// Rolling sample standard deviation (n - 1 denominator).
pub fn rolling_std(values: &[f64], window: usize) -> Result<Series> {
    require(values.len(), window.max(2))?;
    Ok(rolling(values, window, |w| {
        let n = w.len() as f64;
        let mean = w.iter().sum::<f64>() / n;
        let var = w.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        var.sqrt()
    }))
}

/// Lowest value over the trailing `window` points.
pub fn rolling_min(values: &[f64], window: usize) -> Result<Series> {
    require(values.len(), window)?;
    Ok(rolling(values, window, |w| {
        w.iter().copied().fold(f64::INFINITY, f64::min)
    }))
}

/// Highest value over the trailing `window` points.
pub fn rolling_max(values: &[f64], window: usize) -> Result<Series> {
    require(values.len(), window)?;
    Ok(rolling(values, window, |w| {
        w.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }))
}

fn rolling(values: &[f64], window: usize, f: impl Fn(&[f64]) -> f64) -> Series {
    let mut out = vec![None; values.len()];
    for (i, w) in values.windows(window).enumerate() {
        out[i + window - 1] = Some(f(w));
    }
    out
}
