use serde::Serialize;

use common::Bar;

/// Smoothed candle derived from the raw bar and the previous synthetic candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeikinAshiCandle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl HeikinAshiCandle {
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }
}

/// Heikin-Ashi transform.
///
/// `open[i]` depends on the previous synthetic open and close, so this is a
/// left scan over the bars and cannot be computed per bar independently.
pub fn heikin_ashi(bars: &[Bar]) -> Vec<HeikinAshiCandle> {
    bars.iter()
        .scan(None::<HeikinAshiCandle>, |prev, bar| {
            let close = (bar.open + bar.high + bar.low + bar.close) / 4.0;
            let open = match *prev {
                None => (bar.open + bar.close) / 2.0,
                Some(p) => (p.open + p.close) / 2.0,
            };
            let candle = HeikinAshiCandle {
                open,
                high: bar.high.max(open).max(close),
                low: bar.low.min(open).min(close),
                close,
            };
            *prev = Some(candle);
            Some(candle)
        })
        .collect()
}
