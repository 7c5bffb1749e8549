use common::{Bar, Direction, PatternMatch, ScoreResult};

use crate::config::ScoringRules;
use crate::indicators::IndicatorSet;

/// Score at or above which a result is a strong buy.
pub const STRONG_BUY_MIN: i32 = 60;
/// Score at or above which a result is worth considering as a buy.
pub const CONSIDER_BUY_MIN: i32 = 20;
/// Score at or below which a result is worth considering as a sell.
pub const CONSIDER_SELL_MAX: i32 = -20;
/// Score at or below which a result is a strong sell.
pub const STRONG_SELL_MAX: i32 = -60;

/// Map a score to its direction. Total over `i32`; the ranges do not overlap.
pub fn direction_for(score: i32) -> Direction {
    match score {
        s if s >= STRONG_BUY_MIN => Direction::StrongBuy,
        s if s >= CONSIDER_BUY_MIN => Direction::ConsiderBuy,
        s if s > CONSIDER_SELL_MAX => Direction::Watch,
        s if s > STRONG_SELL_MAX => Direction::ConsiderSell,
        _ => Direction::StrongSell,
    }
}

/// Turns an [`IndicatorSet`] into a signed score, a direction, and suggested prices.
#[derive(Debug, Clone)]
pub struct ScoreClassifier {
    rules: ScoringRules,
}

impl ScoreClassifier {
    pub fn new(rules: ScoringRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ScoringRules {
        &self.rules
    }

    /// Sum the weights of every condition that holds on the latest bar.
    /// Returns the score and one rationale line per condition that fired.
    pub fn score(&self, price: f64, indicators: &IndicatorSet) -> (i32, Vec<String>) {
        let w = &self.rules.weights;
        let mut score: i32 = 0;
        let mut rationale = Vec::new();

        let mut apply = |weight: i32, reason: String| {
            if weight != 0 {
                score = score.saturating_add(weight);
                rationale.push(format!("{reason} ({weight:+})"));
            }
        };

        if let Some(band) = indicators.latest_band() {
            if price <= band.floor * (1.0 + self.rules.floor_tolerance) {
                apply(w.near_floor, format!("price {price:.0} at floor {:.0}", band.floor));
            }
            if price >= band.ceiling * (1.0 - self.rules.ceiling_tolerance) {
                apply(
                    w.near_ceiling,
                    format!("price {price:.0} at ceiling {:.0}", band.ceiling),
                );
            }
        }

        if let Some(rsi) = indicators.latest_rsi() {
            if rsi < self.rules.rsi_oversold {
                apply(w.rsi_oversold, format!("RSI {rsi:.1} oversold"));
            }
            if rsi > self.rules.rsi_overbought {
                apply(w.rsi_overbought, format!("RSI {rsi:.1} overbought"));
            }
        }

        if let Some(hist) = indicators.latest_histogram() {
            if hist > 0.0 {
                apply(w.macd_bullish, "MACD above signal".to_string());
            }
            if hist < 0.0 {
                apply(w.macd_bearish, "MACD below signal".to_string());
            }
        }

        (score, rationale)
    }

    /// Build the full result for one symbol. `bars` must be the series the
    /// indicators were computed from (non-empty).
    pub fn classify(
        &self,
        symbol: &str,
        name: &str,
        bars: &[Bar],
        indicators: &IndicatorSet,
        pattern: PatternMatch,
    ) -> Option<ScoreResult> {
        let last = bars.last()?;
        let price = last.close;
        let (score, mut rationale) = self.score(price, indicators);
        let direction = direction_for(score);

        if let Some(p) = pattern.pattern {
            rationale.push(format!("pattern {p} ({}, confidence {})", pattern.bias, pattern.weight));
        }

        let band = indicators.latest_band();
        let buying = score >= 0;
        let (entry, stop) = match band {
            Some(b) if buying => (Some(b.floor), Some(b.floor * (1.0 - self.rules.stop_pct))),
            Some(b) => (Some(b.ceiling), Some(b.ceiling * (1.0 + self.rules.stop_pct))),
            None => (None, None),
        };
        let targets = self
            .rules
            .target_windows
            .iter()
            .filter_map(|&w| indicators.latest_ma(w))
            .collect();

        Some(ScoreResult {
            symbol: symbol.to_string(),
            name: name.to_string(),
            price,
            score,
            direction,
            rationale,
            entry,
            targets,
            stop,
            color: direction.color(),
            pattern,
            indicators: indicators.snapshot(),
            as_of: last.timestamp,
            earnings: None,
        })
    }

    pub fn is_notable(&self, result: &ScoreResult) -> bool {
        self.rules.is_notable(result.score)
    }
}
