use serde::Serialize;

use common::Result;

use super::{require, Series};

/// MACD (Moving Average Convergence/Divergence) indicator.
///
/// MACD line = EMA(fast) − EMA(slow) of close, signal = EMA(signal) of the
/// MACD line, histogram = MACD − signal.
///
/// Every EMA is seeded with the first input value and then follows
/// `ema = k·x + (1 − k)·ema` with `k = 2 / (span + 1)`, so all three series
/// are defined from index 0. `slow + signal` bars are still required so the
/// latest values sit past the warm-up.
#[derive(Debug, Clone)]
pub struct MacdIndicator {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

/// Aligned MACD output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacdSeries {
    pub macd: Series,
    pub signal: Series,
    pub histogram: Series,
}

impl MacdIndicator {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(fast < slow, "MACD fast period must be less than slow period");
        assert!(signal >= 1, "MACD signal period must be >= 1");
        Self { fast, slow, signal }
    }

    pub fn required_bars(&self) -> usize {
        self.slow + self.signal
    }

    /// Compute MACD from a slice of close prices (oldest first).
    pub fn compute(&self, closes: &[f64]) -> Result<MacdSeries> {
        require(closes.len(), self.required_bars())?;

        let fast = ema(closes, self.fast);
        let slow = ema(closes, self.slow);
        let macd: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        let signal = ema(&macd, self.signal);
        let histogram: Vec<f64> = macd.iter().zip(&signal).map(|(m, s)| m - s).collect();

        Ok(MacdSeries {
            macd: macd.into_iter().map(Some).collect(),
            signal: signal.into_iter().map(Some).collect(),
            histogram: histogram.into_iter().map(Some).collect(),
        })
    }
}

/// Exponential moving average over the whole series, seeded by the first value.
pub fn ema(data: &[f64], span: usize) -> Vec<f64> {
    let k = 2.0 / (span as f64 + 1.0);
    data.iter()
        .scan(None::<f64>, |prev, &x| {
            let next = match *prev {
                None => x,
                Some(p) => k * x + (1.0 - k) * p,
            };
            *prev = Some(next);
            Some(next)
        })
        .collect()
}
