use serde::Serialize;

use super::Series;

/// Statistically probable reversal zone for the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FloorCeilingBand {
    pub floor: f64,
    pub ceiling: f64,
}

/// Combine the band inputs point by point:
///
/// `floor   = round((MA − k·σ + lowest_low)  / 2)`
/// `ceiling = round((MA + k·σ + highest_high) / 2)`
///
/// A point is `None` until every input is defined.
pub fn floor_ceiling(
    ma: &Series,
    std: &Series,
    lowest_low: &Series,
    highest_high: &Series,
    sigma: f64,
) -> Vec<Option<FloorCeilingBand>> {
    ma.iter()
        .zip(std)
        .zip(lowest_low.iter().zip(highest_high))
        .map(|((ma, sd), (lo, hi))| {
            let (ma, sd, lo, hi) = ((*ma)?, (*sd)?, (*lo)?, (*hi)?);
            Some(FloorCeilingBand {
                floor: ((ma - sigma * sd + lo) / 2.0).round(),
                ceiling: ((ma + sigma * sd + hi) / 2.0).round(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_averages_bollinger_edge_with_extreme() {
        let band = floor_ceiling(
            &vec![Some(1000.0)],
            &vec![Some(25.0)],
            &vec![Some(920.0)],
            &vec![Some(1100.0)],
            2.0,
        );
        // (1000 - 50 + 920) / 2 = 935, (1000 + 50 + 1100) / 2 = 1075
        assert_eq!(
            band[0],
            Some(FloorCeilingBand { floor: 935.0, ceiling: 1075.0 })
        );
    }

    #[test]
    fn band_rounds_half_away_from_zero() {
        let band = floor_ceiling(
            &vec![Some(100.0)],
            &vec![Some(0.0)],
            &vec![Some(99.0)],
            &vec![Some(102.0)],
            2.0,
        );
        // 199 / 2 = 99.5 -> 100, 202 / 2 = 101
        assert_eq!(band[0].unwrap().floor, 100.0);
        assert_eq!(band[0].unwrap().ceiling, 101.0);
    }

    #[test]
    fn band_undefined_until_all_inputs_defined() {
        let band = floor_ceiling(
            &vec![Some(100.0), Some(100.0)],
            &vec![Some(1.0), Some(1.0)],
            &vec![None, Some(95.0)],
            &vec![None, Some(105.0)],
            2.0,
        );
        assert!(band[0].is_none());
        assert!(band[1].is_some());
    }
}
