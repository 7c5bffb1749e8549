use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One trading-period observation. Series are ordered oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Descriptive per-ticker data a provider may expose alongside bars.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickerMetadata {
    /// Price/earnings ratio.
    pub per: Option<f64>,
    /// Price/book ratio.
    pub pbr: Option<f64>,
    pub market_cap: Option<f64>,
}

/// Directional judgment derived from a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    StrongBuy,
    ConsiderBuy,
    Watch,
    ConsiderSell,
    StrongSell,
}

impl Direction {
    pub const ALL: [Direction; 5] = [
        Direction::StrongBuy,
        Direction::ConsiderBuy,
        Direction::Watch,
        Direction::ConsiderSell,
        Direction::StrongSell,
    ];

    /// Embed/display color as 0xRRGGBB.
    pub fn color(&self) -> u32 {
        match self {
            Direction::StrongBuy => 0x00C853,
            Direction::ConsiderBuy => 0x64DD17,
            Direction::Watch => 0x9E9E9E,
            Direction::ConsiderSell => 0xFF6D00,
            Direction::StrongSell => 0xD50000,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Direction::StrongBuy => "🚀",
            Direction::ConsiderBuy => "📈",
            Direction::Watch => "👀",
            Direction::ConsiderSell => "📉",
            Direction::StrongSell => "🛑",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::StrongBuy => write!(f, "strong buy"),
            Direction::ConsiderBuy => write!(f, "consider buy"),
            Direction::Watch => write!(f, "watch"),
            Direction::ConsiderSell => write!(f, "consider sell"),
            Direction::StrongSell => write!(f, "strong sell"),
        }
    }
}

/// Which side a chart pattern leans toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Bias {
    Buy,
    Sell,
    #[default]
    Neutral,
}

impl std::fmt::Display for Bias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bias::Buy => write!(f, "buy"),
            Bias::Sell => write!(f, "sell"),
            Bias::Neutral => write!(f, "neutral"),
        }
    }
}

/// Recognized chart shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    BullFlag,
    MorningStar,
    InverseHeadAndShoulders,
    HeadAndShoulders,
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pattern::BullFlag => write!(f, "🚩 bull flag"),
            Pattern::MorningStar => write!(f, "🌅 morning star"),
            Pattern::InverseHeadAndShoulders => write!(f, "💎 inverse head and shoulders"),
            Pattern::HeadAndShoulders => write!(f, "💀 head and shoulders top"),
        }
    }
}

/// Outcome of pattern detection: at most one pattern, with confidence and bias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PatternMatch {
    pub pattern: Option<Pattern>,
    pub weight: u8,
    pub bias: Bias,
}

impl PatternMatch {
    pub const NONE: PatternMatch = PatternMatch {
        pattern: None,
        weight: 0,
        bias: Bias::Neutral,
    };

    pub fn new(pattern: Pattern, weight: u8, bias: Bias) -> Self {
        Self {
            pattern: Some(pattern),
            weight,
            bias,
        }
    }
}

/// Latest values of the indicators a result was derived from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub rsi: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub rci_short: Option<f64>,
    pub rci_long: Option<f64>,
    /// True when the latest Heikin-Ashi candle closed above its open.
    pub heikin_ashi_bullish: Option<bool>,
    pub floor: Option<f64>,
    pub ceiling: Option<f64>,
}

/// One symbol's evaluation for one scan cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub score: i32,
    pub direction: Direction,
    pub rationale: Vec<String>,
    pub entry: Option<f64>,
    /// Successive profit-taking levels (MA20, then MA60).
    pub targets: Vec<f64>,
    pub stop: Option<f64>,
    pub color: u32,
    pub pattern: PatternMatch,
    pub indicators: IndicatorSnapshot,
    pub as_of: DateTime<Utc>,
    /// Set when an earnings calendar knows the next announcement.
    #[serde(default)]
    pub earnings: Option<EarningsRisk>,
}

/// Proximity of a symbol's next earnings announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarningsRisk {
    pub date: NaiveDate,
    pub days_until: i64,
    /// Announcement close enough that no new position should be opened.
    pub blackout: bool,
    /// Overbought going into the announcement.
    pub short_setup: bool,
}

impl ScoreResult {
    /// Ticker with the market suffix removed, e.g. "7203.T" -> "7203".
    pub fn code(&self) -> &str {
        self.symbol
            .split_once('.')
            .map(|(code, _)| code)
            .unwrap_or(&self.symbol)
    }
}

/// A symbol to evaluate in a scan run, with its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub ticker: String,
    pub name: String,
}

impl WatchlistEntry {
    pub fn new(ticker: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            name: name.into(),
        }
    }
}

/// One row read from an external roster (spreadsheet export or exchange listing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterRow {
    pub code: String,
    pub name: Option<String>,
}

/// Structured outbound message. Sinks decide how to render it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub title: String,
    pub body: String,
    pub color: Option<u32>,
    pub fields: Vec<(String, String)>,
    pub footer: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Counts reported at the end of a scan run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub run_id: uuid::Uuid,
    /// Watchlist size.
    pub total: usize,
    /// Symbols evaluated without error.
    pub scanned: usize,
    /// Results that passed the notability threshold.
    pub matched: usize,
    /// Symbols dropped by a per-symbol failure.
    pub skipped: usize,
    /// Symbols excluded by the metadata filter.
    pub filtered: usize,
    /// Alerts delivered successfully.
    pub notified: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}
