//! Signal-scoring pipeline: indicators, chart patterns, and score classification.

pub mod config;
pub mod earnings;
pub mod indicators;
pub mod patterns;
pub mod scoring;

pub use config::{IndicatorParams, Preset, ScanFileConfig, ScoreWeights, ScoringRules};
pub use indicators::{IndicatorEngine, IndicatorSet};
pub use scoring::{direction_for, ScoreClassifier};

use tracing::debug;

use common::{Bar, Result, ScoreResult};

/// Indicators, pattern detection, and classification in one pass over a bar series.
#[derive(Debug, Clone)]
pub struct Pipeline {
    engine: IndicatorEngine,
    classifier: ScoreClassifier,
}

impl Pipeline {
    /// The moving averages the rules use as targets are always computed, even
    /// when `params` does not list them.
    pub fn new(params: IndicatorParams, rules: ScoringRules) -> Self {
        let params = params.with_ma_windows(&rules.target_windows);
        Self {
            engine: IndicatorEngine::new(params),
            classifier: ScoreClassifier::new(rules),
        }
    }

    pub fn from_config(cfg: &ScanFileConfig) -> Self {
        Self::new(cfg.indicators.clone(), cfg.scoring_rules())
    }

    pub fn classifier(&self) -> &ScoreClassifier {
        &self.classifier
    }

    pub fn required_bars(&self) -> usize {
        self.engine.required_bars()
    }

    /// Evaluate one symbol. Fails with `InsufficientData` / `InvalidBars`
    /// when the series cannot support the configured indicators.
    pub fn evaluate(&self, symbol: &str, name: &str, bars: &[Bar]) -> Result<ScoreResult> {
        let indicators = self.engine.compute(bars)?;
        // RSI is defined on the last bar once compute() succeeded
        let rsi = indicators.latest_rsi().unwrap_or(50.0);
        let pattern = patterns::detect(bars, rsi);
        if let Some(p) = pattern.pattern {
            debug!(symbol, pattern = %p, weight = pattern.weight, "Pattern detected");
        }
        self.classifier
            .classify(symbol, name, bars, &indicators, pattern)
            .ok_or(common::Error::InsufficientData {
                required: self.required_bars(),
                available: bars.len(),
            })
    }
}
