use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::debug;

use common::{Bar, EarningsCalendar, Error, MarketDataProvider, Result, TickerMetadata};
use watchlist::ticker_code;

const METADATA_FILE: &str = "metadata.csv";

/// Offline provider reading `<dir>/<code>.csv` files with the columns
/// `timestamp,open,high,low,close,volume`.
///
/// Timestamps may be RFC 3339 or plain `YYYY-MM-DD` dates. The requested
/// range and interval are ignored: the file is the series. An optional
/// `<dir>/metadata.csv` (`code,per,pbr,market_cap[,next_earnings]`) backs
/// `metadata()` and the earnings calendar.
pub struct ReplayProvider {
    dir: PathBuf,
    metadata: HashMap<String, TickerMetadata>,
    earnings: HashMap<String, NaiveDate>,
}

impl ReplayProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(Error::Config(format!(
                "replay directory {} does not exist",
                dir.display()
            )));
        }
        let metadata_path = dir.join(METADATA_FILE);
        let (metadata, earnings) = if metadata_path.is_file() {
            load_metadata(&metadata_path)?
        } else {
            Default::default()
        };
        Ok(Self {
            dir,
            metadata,
            earnings,
        })
    }

    fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", ticker_code(ticker)))
    }
}

#[async_trait]
impl MarketDataProvider for ReplayProvider {
    async fn bars(&self, ticker: &str, _range: &str, _interval: &str) -> Result<Vec<Bar>> {
        let path = self.path_for(ticker);
        let raw = tokio::fs::read(&path).await.map_err(|e| {
            Error::DataProvider(format!("{ticker}: cannot read {}: {e}", path.display()))
        })?;
        let bars = parse_bars(raw.as_slice())
            .map_err(|e| Error::DataProvider(format!("{ticker}: {}: {e}", path.display())))?;
        debug!(ticker, bars = bars.len(), "Replayed bars");
        Ok(bars)
    }

    async fn metadata(&self, ticker: &str) -> Result<Option<TickerMetadata>> {
        Ok(self.metadata.get(&ticker_code(ticker)).cloned())
    }
}

#[async_trait]
impl EarningsCalendar for ReplayProvider {
    fn describe(&self) -> String {
        format!("replay earnings {}", self.dir.join(METADATA_FILE).display())
    }

    async fn next_earnings(&self, ticker: &str) -> Result<Option<NaiveDate>> {
        Ok(self.earnings.get(&ticker_code(ticker)).copied())
    }
}

#[derive(Deserialize)]
struct BarRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: Option<f64>,
}

#[derive(Deserialize)]
struct MetadataRow {
    code: String,
    #[serde(default)]
    per: Option<f64>,
    #[serde(default)]
    pbr: Option<f64>,
    #[serde(default)]
    market_cap: Option<f64>,
    /// `YYYY-MM-DD`.
    #[serde(default)]
    next_earnings: Option<String>,
}

/// Parse a bar CSV. Row order is preserved; ordering is validated later by
/// the indicator engine.
pub fn parse_bars<R: std::io::Read>(reader: R) -> std::result::Result<Vec<Bar>, String> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    rdr.deserialize::<BarRow>()
        .enumerate()
        .map(|(i, row)| {
            let row = row.map_err(|e| format!("row {}: {e}", i + 1))?;
            Ok(Bar {
                timestamp: parse_timestamp(&row.timestamp)
                    .ok_or_else(|| format!("row {}: bad timestamp '{}'", i + 1, row.timestamp))?,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume.unwrap_or(0.0),
            })
        })
        .collect()
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

type MetadataTables = (HashMap<String, TickerMetadata>, HashMap<String, NaiveDate>);

fn load_metadata(path: &Path) -> Result<MetadataTables> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
    let mut metadata = HashMap::new();
    let mut earnings = HashMap::new();
    for row in rdr.deserialize::<MetadataRow>() {
        let row = row.map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        let code = ticker_code(&row.code);
        if let Some(raw) = row.next_earnings.filter(|s| !s.is_empty()) {
            let date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| {
                Error::Config(format!("{}: {code}: bad next_earnings '{raw}': {e}", path.display()))
            })?;
            earnings.insert(code.clone(), date);
        }
        metadata.insert(
            code,
            TickerMetadata {
                per: row.per,
                pbr: row.pbr,
                market_cap: row.market_cap,
            },
        );
    }
    Ok((metadata, earnings))
}
