//! Chart-shape recognition over the most recent bars.
//!
//! Patterns are checked in a fixed priority order and the first match wins.

use common::{Bar, Bias, Pattern, PatternMatch};

/// Fewer bars than this never match anything.
pub const MIN_PATTERN_BARS: usize = 30;

/// Bars inspected by the head-and-shoulders variants, split into thirds.
const SHOULDER_WINDOW: usize = 15;

/// Flag consolidation must stay within this fraction of the latest close.
const FLAG_MAX_RANGE: f64 = 0.04;

pub fn detect(bars: &[Bar], rsi: f64) -> PatternMatch {
    if bars.len() < MIN_PATTERN_BARS {
        return PatternMatch::NONE;
    }

    if is_bull_flag(bars) {
        return PatternMatch::new(Pattern::BullFlag, 75, Bias::Buy);
    }

    if rsi < 50.0 {
        if is_morning_star(bars) {
            return PatternMatch::new(Pattern::MorningStar, 90, Bias::Buy);
        }
        let lows: Vec<f64> = tail(bars, SHOULDER_WINDOW).iter().map(|b| b.low).collect();
        if is_inverse_head_and_shoulders(&lows) {
            return PatternMatch::new(Pattern::InverseHeadAndShoulders, 80, Bias::Buy);
        }
    }

    if rsi > 50.0 {
        let highs: Vec<f64> = tail(bars, SHOULDER_WINDOW).iter().map(|b| b.high).collect();
        if is_head_and_shoulders(&highs) {
            return PatternMatch::new(Pattern::HeadAndShoulders, 85, Bias::Sell);
        }
    }

    PatternMatch::NONE
}

/// Each of the last three bars makes a strictly lower high than the bar
/// before it, and the last five bars trade in a tight range.
fn is_bull_flag(bars: &[Bar]) -> bool {
    let n = bars.len();
    let lower_highs = (n - 3..n).all(|i| bars[i].high < bars[i - 1].high);
    if !lower_highs {
        return false;
    }
    let last5 = tail(bars, 5);
    let high = max(last5.iter().map(|b| b.high));
    let low = min(last5.iter().map(|b| b.low));
    let price = bars[n - 1].close;
    high - low < price * FLAG_MAX_RANGE
}

/// Bearish candle two bars back, bullish candle now.
fn is_morning_star(bars: &[Bar]) -> bool {
    let n = bars.len();
    let first = &bars[n - 3];
    let last = &bars[n - 1];
    first.close < first.open && last.close > last.open
}

/// Lowest low sits in the middle third and the left shoulder stays above it.
fn is_inverse_head_and_shoulders(lows: &[f64]) -> bool {
    let (left, head, _) = thirds(lows);
    let head_min = min(head.iter().copied());
    min(lows.iter().copied()) == head_min && min(left.iter().copied()) > head_min
}

/// Highest high sits in the middle third and the left shoulder stays below it.
fn is_head_and_shoulders(highs: &[f64]) -> bool {
    let (left, head, _) = thirds(highs);
    let head_max = max(head.iter().copied());
    max(highs.iter().copied()) == head_max && max(left.iter().copied()) < head_max
}

fn thirds(values: &[f64]) -> (&[f64], &[f64], &[f64]) {
    let third = values.len() / 3;
    (
        &values[..third],
        &values[third..2 * third],
        &values[2 * third..],
    )
}

fn tail(bars: &[Bar], n: usize) -> &[Bar] {
    &bars[bars.len().saturating_sub(n)..]
}

fn min(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(f64::INFINITY, f64::min)
}

fn max(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(f64::NEG_INFINITY, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn bar(i: usize, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(i as i64),
            open,
            high,
            low,
            close,
            volume: 1_000.0,
        }
    }

    /// Flat, wide-ranged bars that match nothing on their own.
    fn base(n: usize) -> Vec<Bar> {
        (0..n).map(|i| bar(i, 100.0, 110.0, 90.0, 100.0)).collect()
    }

    fn set_tail_lows(bars: &mut [Bar], lows: &[f64]) {
        let start = bars.len() - lows.len();
        for (b, &l) in bars[start..].iter_mut().zip(lows) {
            b.low = l;
        }
    }

    fn set_tail_highs(bars: &mut [Bar], highs: &[f64]) {
        let start = bars.len() - highs.len();
        for (b, &h) in bars[start..].iter_mut().zip(highs) {
            b.high = h;
        }
    }

    #[test]
    fn too_few_bars_match_nothing() {
        assert_eq!(detect(&base(29), 40.0), PatternMatch::NONE);
    }

    #[test]
    fn flat_series_matches_nothing() {
        assert_eq!(detect(&base(40), 40.0), PatternMatch::NONE);
        assert_eq!(detect(&base(40), 60.0), PatternMatch::NONE);
    }

    #[test]
    fn bull_flag_detected() {
        let mut bars: Vec<Bar> = (0..40).map(|i| bar(i, 100.0, 101.0, 99.0, 100.0)).collect();
        let n = bars.len();
        // four descending highs within a 2% range
        bars[n - 4].high = 101.5;
        bars[n - 3].high = 101.2;
        bars[n - 2].high = 100.9;
        bars[n - 1].high = 100.6;
        let m = detect(&bars, 60.0);
        assert_eq!(m, PatternMatch::new(Pattern::BullFlag, 75, Bias::Buy));
    }

    #[test]
    fn wide_range_is_not_a_flag() {
        let mut bars = base(40);
        let n = bars.len();
        bars[n - 4].high = 113.0;
        bars[n - 3].high = 112.0;
        bars[n - 2].high = 111.0;
        bars[n - 1].high = 110.5;
        assert_ne!(detect(&bars, 55.0).pattern, Some(Pattern::BullFlag));
    }

    #[test]
    fn morning_star_requires_low_rsi() {
        let mut bars = base(40);
        let n = bars.len();
        bars[n - 3].close = 95.0; // bearish
        bars[n - 1].close = 105.0; // bullish
        assert_eq!(
            detect(&bars, 45.0),
            PatternMatch::new(Pattern::MorningStar, 90, Bias::Buy)
        );
        assert_eq!(detect(&bars, 55.0).pattern, None);
    }

    #[test]
    fn inverse_head_and_shoulders_detected() {
        let mut bars = base(40);
        set_tail_lows(
            &mut bars,
            &[95.0, 94.0, 93.0, 94.0, 95.0, 92.0, 90.0, 85.0, 90.0, 92.0, 94.0, 93.0, 92.0, 93.0, 94.0],
        );
        assert_eq!(
            detect(&bars, 40.0),
            PatternMatch::new(Pattern::InverseHeadAndShoulders, 80, Bias::Buy)
        );
    }

    #[test]
    fn head_and_shoulders_top_detected() {
        let mut bars = base(40);
        set_tail_highs(
            &mut bars,
            &[105.0, 106.0, 107.0, 106.0, 105.0, 108.0, 110.0, 115.0, 110.0, 108.0, 106.0, 107.0, 108.0, 107.0, 106.0],
        );
        assert_eq!(
            detect(&bars, 60.0),
            PatternMatch::new(Pattern::HeadAndShoulders, 85, Bias::Sell)
        );
        // sell shape is only checked when RSI is above 50
        assert_eq!(detect(&bars, 50.0).pattern, None);
    }

    #[test]
    fn flag_takes_priority_over_morning_star() {
        let mut bars: Vec<Bar> = (0..40).map(|i| bar(i, 100.0, 101.0, 99.0, 100.0)).collect();
        let n = bars.len();
        bars[n - 4].high = 101.5;
        bars[n - 3].high = 101.2;
        bars[n - 2].high = 100.9;
        bars[n - 1].high = 100.6;
        bars[n - 3].close = 99.5;
        bars[n - 1].close = 100.5;
        assert_eq!(detect(&bars, 30.0).pattern, Some(Pattern::BullFlag));
    }
}
