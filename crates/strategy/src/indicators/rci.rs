use common::Result;

use super::{require, Series};

/// RCI (Rank Correlation Index): Spearman rank correlation between time and
/// price over the trailing `period` closes, scaled to [-100, 100].
///
/// Time rank is 1 for the oldest bar in the window. Price rank is 1 for the
/// lowest close. Equal closes share the average of the ranks they span, so
/// three closes tied for ranks 4..=6 all get rank 5.
#[derive(Debug, Clone)]
pub struct RciIndicator {
    pub period: usize,
}

impl RciIndicator {
    pub fn new(period: usize) -> Self {
        assert!(period >= 2, "RCI period must be >= 2");
        Self { period }
    }

    pub fn required_bars(&self) -> usize {
        self.period
    }

    pub fn compute(&self, closes: &[f64]) -> Result<Series> {
        require(closes.len(), self.required_bars())?;

        let n = self.period as f64;
        let denom = n * (n * n - 1.0);
        let mut out = vec![None; closes.len()];

        for (i, window) in closes.windows(self.period).enumerate() {
            let price_ranks = average_ranks(window);
            let sum_d2: f64 = price_ranks
                .iter()
                .enumerate()
                .map(|(t, p)| ((t + 1) as f64 - p).powi(2))
                .sum();
            let rci = (1.0 - 6.0 * sum_d2 / denom) * 100.0;
            out[i + self.period - 1] = Some(rci.clamp(-100.0, 100.0));
        }

        Ok(out)
    }
}

/// 1-based ascending ranks; ties receive the mean of their rank positions.
fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end hold ranks start+1 ..= end
        let rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        start = end;
    }
    ranks
}
