use common::Result;

use super::{require, Series};

/// RSI (Relative Strength Index) indicator.
///
/// Average gain and loss are simple rolling means of the positive and
/// negative close-to-close changes over `period` changes (not Wilder's
/// recursive smoothing). The first defined value is at index `period`.
#[derive(Debug, Clone)]
pub struct RsiIndicator {
    pub period: usize,
}

impl RsiIndicator {
    pub fn new(period: usize) -> Self {
        assert!(period >= 2, "RSI period must be >= 2");
        Self { period }
    }

    /// Bars needed before the first value: `period` changes need `period + 1` closes.
    pub fn required_bars(&self) -> usize {
        self.period + 1
    }

    /// Compute the RSI series from close prices (oldest first).
    pub fn compute(&self, closes: &[f64]) -> Result<Series> {
        require(closes.len(), self.required_bars())?;

        let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
        let mut out = vec![None; closes.len()];

        for (i, window) in changes.windows(self.period).enumerate() {
            let gain = window.iter().filter(|&&c| c > 0.0).sum::<f64>() / self.period as f64;
            let loss = window
                .iter()
                .filter(|&&c| c < 0.0)
                .map(|c| c.abs())
                .sum::<f64>()
                / self.period as f64;
            // changes[j] ends at close j + 1
            out[i + self.period] = Some(rsi_value(gain, loss));
        }

        Ok(out)
    }
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Error;

    #[test]
    fn rsi_errors_when_insufficient_data() {
        let rsi = RsiIndicator::new(14);
        // Need at least period+1 = 15 values
        let prices = vec![100.0; 14];
        assert!(matches!(
            rsi.compute(&prices),
            Err(Error::InsufficientData { required: 15, available: 14 })
        ));
    }

    #[test]
    fn rsi_first_value_at_period_index() {
        let rsi = RsiIndicator::new(14);
        let prices: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let series = rsi.compute(&prices).unwrap();
        assert!(series[13].is_none());
        assert!(series[14].is_some());
    }

    #[test]
    fn rsi_all_gains_returns_100() {
        let rsi = RsiIndicator::new(3);
        let prices = vec![10.0, 11.0, 12.0, 13.0, 14.0];
        let value = rsi.compute(&prices).unwrap()[4].unwrap();
        assert!((value - 100.0).abs() < 1e-9, "Expected 100, got {value}");
    }

    #[test]
    fn rsi_flat_series_returns_100() {
        // Zero loss average wins over zero gain average
        let rsi = RsiIndicator::new(3);
        let value = rsi.compute(&[10.0; 6]).unwrap()[5].unwrap();
        assert_eq!(value, 100.0);
    }

    #[test]
    fn rsi_all_losses_returns_0() {
        let rsi = RsiIndicator::new(3);
        let prices = vec![14.0, 13.0, 12.0, 11.0, 10.0];
        let value = rsi.compute(&prices).unwrap()[4].unwrap();
        assert!(value.abs() < 1e-9, "Expected 0, got {value}");
    }

    #[test]
    fn rsi_known_value() {
        // Changes over the window: +2, -1, +1 -> gain 1.0, loss 1/3 -> RS 3 -> RSI 75
        let rsi = RsiIndicator::new(3);
        let prices = vec![10.0, 12.0, 11.0, 12.0];
        let value = rsi.compute(&prices).unwrap()[3].unwrap();
        assert!((value - 75.0).abs() < 1e-9, "Expected 75, got {value}");
    }
}
