pub mod band;
pub mod heikin_ashi;
pub mod ma;
pub mod macd;
pub mod rci;
pub mod rsi;

use std::collections::BTreeMap;

use serde::Serialize;

use common::{Bar, Error, IndicatorSnapshot, Result};

pub use band::FloorCeilingBand;
pub use heikin_ashi::HeikinAshiCandle;
pub use macd::{MacdIndicator, MacdSeries};
pub use rci::RciIndicator;
pub use rsi::RsiIndicator;

use crate::config::IndicatorParams;

/// A derived series aligned to the bar index; `None` during warm-up.
pub type Series = Vec<Option<f64>>;

/// Every indicator derived from one bar series, aligned to its index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSet {
    /// Simple moving averages keyed by window.
    pub moving_averages: BTreeMap<usize, Series>,
    pub rsi: Series,
    pub macd: MacdSeries,
    pub rci_short: Series,
    pub rci_long: Series,
    pub heikin_ashi: Vec<HeikinAshiCandle>,
    /// Rolling sample std of close over the band window.
    pub band_std: Series,
    /// Rolling min of low / max of high over the extreme window.
    pub lowest_low: Series,
    pub highest_high: Series,
    pub bands: Vec<Option<FloorCeilingBand>>,
}

impl IndicatorSet {
    pub fn moving_average(&self, window: usize) -> Option<&Series> {
        self.moving_averages.get(&window)
    }

    pub fn latest_ma(&self, window: usize) -> Option<f64> {
        self.moving_average(window).and_then(latest)
    }

    pub fn latest_rsi(&self) -> Option<f64> {
        latest(&self.rsi)
    }

    pub fn latest_histogram(&self) -> Option<f64> {
        latest(&self.macd.histogram)
    }

    pub fn latest_band(&self) -> Option<FloorCeilingBand> {
        self.bands.last().copied().flatten()
    }

    pub fn snapshot(&self) -> IndicatorSnapshot {
        let band = self.latest_band();
        IndicatorSnapshot {
            rsi: self.latest_rsi(),
            macd_histogram: self.latest_histogram(),
            rci_short: latest(&self.rci_short),
            rci_long: latest(&self.rci_long),
            heikin_ashi_bullish: self.heikin_ashi.last().map(HeikinAshiCandle::is_bullish),
            floor: band.map(|b| b.floor),
            ceiling: band.map(|b| b.ceiling),
        }
    }
}

/// Computes a full [`IndicatorSet`] from a bar series. Pure: no I/O, no state.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    params: IndicatorParams,
    rsi: RsiIndicator,
    macd: MacdIndicator,
    rci_short: RciIndicator,
    rci_long: RciIndicator,
}

impl IndicatorEngine {
    /// `params` must have passed [`IndicatorParams::validate`].
    pub fn new(params: IndicatorParams) -> Self {
        Self {
            rsi: RsiIndicator::new(params.rsi_period),
            macd: MacdIndicator::new(params.macd_fast, params.macd_slow, params.macd_signal),
            rci_short: RciIndicator::new(params.rci_short),
            rci_long: RciIndicator::new(params.rci_long),
            params,
        }
    }

    pub fn params(&self) -> &IndicatorParams {
        &self.params
    }

    /// Shortest series every configured indicator can be computed on.
    pub fn required_bars(&self) -> usize {
        let p = &self.params;
        p.ma_windows
            .iter()
            .copied()
            .chain([
                self.rsi.required_bars(),
                self.macd.required_bars(),
                self.rci_short.required_bars(),
                self.rci_long.required_bars(),
                p.band_window,
                p.extreme_window,
            ])
            .max()
            .unwrap_or(1)
    }

    pub fn compute(&self, bars: &[Bar]) -> Result<IndicatorSet> {
        ensure_chronological(bars)?;
        require(bars.len(), self.required_bars())?;

        let p = &self.params;
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();

        let mut moving_averages = BTreeMap::new();
        for &window in p.ma_windows.iter().chain(std::iter::once(&p.band_window)) {
            if !moving_averages.contains_key(&window) {
                moving_averages.insert(window, ma::sma(&closes, window)?);
            }
        }

        let band_std = ma::rolling_std(&closes, p.band_window)?;
        let lowest_low = ma::rolling_min(&lows, p.extreme_window)?;
        let highest_high = ma::rolling_max(&highs, p.extreme_window)?;
        let bands = band::floor_ceiling(
            &moving_averages[&p.band_window],
            &band_std,
            &lowest_low,
            &highest_high,
            p.band_sigma,
        );

        Ok(IndicatorSet {
            rsi: self.rsi.compute(&closes)?,
            macd: self.macd.compute(&closes)?,
            rci_short: self.rci_short.compute(&closes)?,
            rci_long: self.rci_long.compute(&closes)?,
            heikin_ashi: heikin_ashi::heikin_ashi(bars),
            moving_averages,
            band_std,
            lowest_low,
            highest_high,
            bands,
        })
    }
}

/// Reject series that are out of order or repeat a timestamp.
pub fn ensure_chronological(bars: &[Bar]) -> Result<()> {
    for (i, pair) in bars.windows(2).enumerate() {
        if pair[1].timestamp <= pair[0].timestamp {
            return Err(Error::InvalidBars(format!(
                "bar {} at {} does not follow {}",
                i + 1,
                pair[1].timestamp,
                pair[0].timestamp
            )));
        }
    }
    Ok(())
}

pub(crate) fn require(available: usize, required: usize) -> Result<()> {
    if available < required {
        return Err(Error::InsufficientData {
            required,
            available,
        });
    }
    Ok(())
}

fn latest(series: &Series) -> Option<f64> {
    series.last().copied().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                timestamp: start + Duration::days(i as i64),
                open: c,
                high: c * 1.01,
                low: c * 0.99,
                close: c,
                volume: 10_000.0,
            })
            .collect()
    }

    fn wave(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 1000.0 + 50.0 * (i as f64 / 7.0).sin() + i as f64)
            .collect()
    }

    #[test]
    fn required_bars_is_longest_window() {
        let engine = IndicatorEngine::new(IndicatorParams::default());
        assert_eq!(engine.required_bars(), 75);
    }

    #[test]
    fn short_series_is_rejected_not_padded() {
        let engine = IndicatorEngine::new(IndicatorParams::default());
        let err = engine.compute(&bars_from_closes(&wave(74))).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientData { required: 75, available: 74 }
        ));
    }

    #[test]
    fn duplicate_timestamps_are_rejected() {
        let engine = IndicatorEngine::new(IndicatorParams::default());
        let mut bars = bars_from_closes(&wave(100));
        bars[50].timestamp = bars[49].timestamp;
        assert!(matches!(engine.compute(&bars), Err(Error::InvalidBars(_))));
    }

    #[test]
    fn unordered_bars_are_rejected() {
        let mut bars = bars_from_closes(&wave(10));
        bars.swap(3, 4);
        assert!(ensure_chronological(&bars).is_err());
    }

    #[test]
    fn all_series_are_aligned_to_bars() {
        let engine = IndicatorEngine::new(IndicatorParams::default());
        let bars = bars_from_closes(&wave(120));
        let set = engine.compute(&bars).unwrap();
        assert_eq!(set.rsi.len(), 120);
        assert_eq!(set.macd.histogram.len(), 120);
        assert_eq!(set.rci_long.len(), 120);
        assert_eq!(set.heikin_ashi.len(), 120);
        assert_eq!(set.bands.len(), 120);
        for series in set.moving_averages.values() {
            assert_eq!(series.len(), 120);
        }
        // band needs the 60-bar extreme window
        assert!(set.bands[58].is_none());
        assert!(set.bands[59].is_some());
    }

    #[test]
    fn recomputation_is_identical() {
        let engine = IndicatorEngine::new(IndicatorParams::default());
        let bars = bars_from_closes(&wave(200));
        assert_eq!(engine.compute(&bars).unwrap(), engine.compute(&bars).unwrap());
    }

    #[test]
    fn snapshot_reports_latest_values() {
        let engine = IndicatorEngine::new(IndicatorParams::default());
        let set = engine.compute(&bars_from_closes(&wave(150))).unwrap();
        let snap = set.snapshot();
        assert_eq!(snap.rsi, set.rsi[149]);
        assert_eq!(snap.floor, set.bands[149].map(|b| b.floor));
        assert!(snap.heikin_ashi_bullish.is_some());
    }
}
