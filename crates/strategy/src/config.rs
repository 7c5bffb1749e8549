use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use common::{Error, Result};

/// Scan config file (TOML).
///
/// Example `config/scan.toml`:
/// ```toml
/// [indicators]
/// ma_windows = [5, 25, 75]
/// extreme_window = 60
///
/// [scoring]
/// preset = "strict"
/// notability_threshold = 30
///
/// [scoring.weights]
/// near_floor = 40
/// rsi_oversold = 30
/// macd_bullish = 20
/// near_ceiling = -40
/// rsi_overbought = -30
/// macd_bearish = -20
///
/// [names]
/// "7203.T" = "トヨタ"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScanFileConfig {
    #[serde(default)]
    pub indicators: IndicatorParams,
    #[serde(default)]
    pub scoring: ScoringSection,
    /// Static ticker -> display name table. Absent means "use the built-in table";
    /// an explicitly empty table stays empty.
    #[serde(default)]
    pub names: Option<BTreeMap<String, String>>,
}

impl ScanFileConfig {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read scan config at '{path}': {e}")))?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("scan config at '{path}': {e}")))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        cfg.indicators.validate()?;
        cfg.scoring.rules().validate()?;
        Ok(cfg)
    }

    /// Indicator parameters, widened so every moving average the scoring
    /// rules need for targets is computed.
    pub fn indicator_params(&self) -> IndicatorParams {
        self.indicators
            .clone()
            .with_ma_windows(&self.scoring.rules().target_windows)
    }

    pub fn scoring_rules(&self) -> ScoringRules {
        self.scoring.rules()
    }
}

/// Windows and periods for every indicator.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct IndicatorParams {
    pub ma_windows: Vec<usize>,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub rci_short: usize,
    pub rci_long: usize,
    /// Moving-average / standard-deviation window of the floor/ceiling band.
    pub band_window: usize,
    /// σ multiplier of the floor/ceiling band.
    pub band_sigma: f64,
    /// Trailing window of the low/high extreme averaged into the band.
    pub extreme_window: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            ma_windows: vec![5, 20, 25, 60, 75],
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            rci_short: 9,
            rci_long: 26,
            band_window: 20,
            band_sigma: 2.0,
            extreme_window: 60,
        }
    }
}

impl IndicatorParams {
    /// Add `extra` to the moving-average windows, sorted and deduplicated.
    pub fn with_ma_windows(mut self, extra: &[usize]) -> Self {
        self.ma_windows.extend_from_slice(extra);
        self.ma_windows.sort_unstable();
        self.ma_windows.dedup();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.ma_windows.iter().any(|&w| w == 0) {
            return Err(Error::Config("moving-average windows must be >= 1".into()));
        }
        if self.rsi_period < 2 {
            return Err(Error::Config("rsi_period must be >= 2".into()));
        }
        if self.macd_fast == 0 || self.macd_fast >= self.macd_slow || self.macd_signal == 0 {
            return Err(Error::Config(
                "MACD periods must satisfy 0 < fast < slow and signal >= 1".into(),
            ));
        }
        if self.rci_short < 2 || self.rci_long < 2 {
            return Err(Error::Config("RCI periods must be >= 2".into()));
        }
        if self.band_window < 2 || self.extreme_window == 0 {
            return Err(Error::Config(
                "band_window must be >= 2 and extreme_window >= 1".into(),
            ));
        }
        if !(self.band_sigma.is_finite() && self.band_sigma >= 0.0) {
            return Err(Error::Config("band_sigma must be a non-negative number".into()));
        }
        Ok(())
    }
}

/// Named RSI threshold sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    #[default]
    Canonical,
    /// RSI 30/70, notability 20.
    Strict,
    /// RSI 40/60, notability 10.
    Loose,
}

impl Preset {
    pub fn rules(self) -> ScoringRules {
        let canonical = ScoringRules::default();
        match self {
            Preset::Canonical => canonical,
            Preset::Strict => ScoringRules {
                rsi_oversold: 30.0,
                rsi_overbought: 70.0,
                notability_threshold: 20,
                ..canonical
            },
            Preset::Loose => ScoringRules {
                rsi_oversold: 40.0,
                rsi_overbought: 60.0,
                notability_threshold: 10,
                ..canonical
            },
        }
    }
}

/// `[scoring]` section: a preset plus optional overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScoringSection {
    #[serde(default)]
    pub preset: Preset,
    pub rsi_oversold: Option<f64>,
    pub rsi_overbought: Option<f64>,
    pub notability_threshold: Option<i32>,
    pub stop_pct: Option<f64>,
    pub weights: Option<ScoreWeights>,
}

impl ScoringSection {
    pub fn rules(&self) -> ScoringRules {
        let mut rules = self.preset.rules();
        if let Some(v) = self.rsi_oversold {
            rules.rsi_oversold = v;
        }
        if let Some(v) = self.rsi_overbought {
            rules.rsi_overbought = v;
        }
        if let Some(v) = self.notability_threshold {
            rules.notability_threshold = v;
        }
        if let Some(v) = self.stop_pct {
            rules.stop_pct = v;
        }
        if let Some(w) = &self.weights {
            rules.weights = w.clone();
        }
        rules
    }
}

/// Signed contribution of each scoring condition. Zero disables a condition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub near_floor: i32,
    pub rsi_oversold: i32,
    pub macd_bullish: i32,
    pub near_ceiling: i32,
    pub rsi_overbought: i32,
    pub macd_bearish: i32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            near_floor: 40,
            rsi_oversold: 30,
            macd_bullish: 20,
            near_ceiling: -40,
            rsi_overbought: -30,
            macd_bearish: -20,
        }
    }
}

impl ScoreWeights {
    /// Largest magnitude a single weight may have.
    pub const MAX_ABS: i32 = 1_000;

    fn all(&self) -> [(&'static str, i32); 6] {
        [
            ("near_floor", self.near_floor),
            ("rsi_oversold", self.rsi_oversold),
            ("macd_bullish", self.macd_bullish),
            ("near_ceiling", self.near_ceiling),
            ("rsi_overbought", self.rsi_overbought),
            ("macd_bearish", self.macd_bearish),
        ]
    }

    pub fn validate(&self) -> Result<()> {
        match self.all().into_iter().find(|(_, w)| w.abs() > Self::MAX_ABS) {
            Some((name, w)) => Err(Error::Config(format!(
                "weight {name} = {w} is outside ±{}",
                Self::MAX_ABS
            ))),
            None => Ok(()),
        }
    }

    /// Only the momentum conditions (RSI and MACD); band proximity disabled.
    pub fn momentum_only() -> Self {
        Self {
            near_floor: 0,
            near_ceiling: 0,
            ..Self::default()
        }
    }
}

/// Thresholds and weights the score classifier applies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringRules {
    pub weights: ScoreWeights,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    /// Price within this fraction above the floor counts as "at the floor".
    pub floor_tolerance: f64,
    /// Price within this fraction below the ceiling counts as "at the ceiling".
    pub ceiling_tolerance: f64,
    /// Results with |score| below this are not notified.
    pub notability_threshold: i32,
    /// Stop distance beyond the entry band edge.
    pub stop_pct: f64,
    /// Moving-average windows used as successive profit targets.
    pub target_windows: Vec<usize>,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            rsi_oversold: 35.0,
            rsi_overbought: 65.0,
            floor_tolerance: 0.015,
            ceiling_tolerance: 0.015,
            notability_threshold: 20,
            stop_pct: 0.03,
            target_windows: vec![20, 60],
        }
    }
}

impl ScoringRules {
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        if self.rsi_oversold >= self.rsi_overbought {
            return Err(Error::Config(format!(
                "rsi_oversold ({}) must be below rsi_overbought ({})",
                self.rsi_oversold, self.rsi_overbought
            )));
        }
        if self.notability_threshold < 0 {
            return Err(Error::Config("notability_threshold must be >= 0".into()));
        }
        if !(0.0..1.0).contains(&self.stop_pct) {
            return Err(Error::Config("stop_pct must be in [0, 1)".into()));
        }
        if self.target_windows.iter().any(|&w| w == 0) {
            return Err(Error::Config("target windows must be >= 1".into()));
        }
        Ok(())
    }

    /// Whether a result is strong enough to notify.
    pub fn is_notable(&self, score: i32) -> bool {
        i64::from(score).abs() >= i64::from(self.notability_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_weights_are_rejected() {
        let err = ScanFileConfig::from_toml_str(
            r#"
            [scoring.weights]
            near_floor = 2147483647
            rsi_oversold = 2147483647
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("near_floor")));

        let cfg = ScanFileConfig::from_toml_str(
            r#"
            [scoring.weights]
            near_floor = 1000
            near_ceiling = -1000
            "#,
        )
        .unwrap();
        assert_eq!(cfg.scoring_rules().weights.near_floor, 1000);
    }

    #[test]
    fn empty_file_uses_canonical_defaults() {
        let cfg = ScanFileConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.scoring_rules(), ScoringRules::default());
        assert_eq!(cfg.indicators, IndicatorParams::default());
        assert!(cfg.names.is_none());
    }

    #[test]
    fn preset_with_override() {
        let cfg = ScanFileConfig::from_toml_str(
            r#"
            [scoring]
            preset = "loose"
            notability_threshold = 15
            "#,
        )
        .unwrap();
        let rules = cfg.scoring_rules();
        assert_eq!(rules.rsi_oversold, 40.0);
        assert_eq!(rules.rsi_overbought, 60.0);
        assert_eq!(rules.notability_threshold, 15);
    }

    #[test]
    fn partial_weight_table_keeps_other_defaults() {
        let cfg = ScanFileConfig::from_toml_str(
            r#"
            [scoring.weights]
            near_floor = 0
            near_ceiling = 0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.scoring_rules().weights, ScoreWeights::momentum_only());
    }

    #[test]
    fn explicit_empty_names_table_is_kept() {
        let cfg = ScanFileConfig::from_toml_str("[names]\n").unwrap();
        assert_eq!(cfg.names, Some(BTreeMap::new()));
    }

    #[test]
    fn target_windows_are_added_to_ma_windows() {
        let cfg = ScanFileConfig::from_toml_str(
            r#"
            [indicators]
            ma_windows = [5, 25]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.indicator_params().ma_windows, vec![5, 20, 25, 60]);
    }

    #[test]
    fn invalid_macd_periods_are_rejected() {
        let err = ScanFileConfig::from_toml_str(
            r#"
            [indicators]
            macd_fast = 26
            macd_slow = 12
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn inverted_rsi_thresholds_are_rejected() {
        let err = ScanFileConfig::from_toml_str(
            r#"
            [scoring]
            rsi_oversold = 70.0
            rsi_overbought = 30.0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn shipped_sample_config_parses() {
        let cfg = ScanFileConfig::from_toml_str(include_str!("../../../config/scan.toml")).unwrap();
        assert_eq!(cfg.indicator_params(), IndicatorParams::default());
        assert_eq!(cfg.scoring_rules(), ScoringRules::default());
        assert_eq!(cfg.names.as_ref().map(|n| n.len()), Some(12));
    }
}
