use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use common::{Bar, Error, MarketDataProvider, Result};

use crate::throttle::RequestThrottle;

const BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Daily/intraday bars from the public v8 chart endpoint.
pub struct YahooChartClient {
    base_url: String,
    http: Client,
    throttle: Arc<RequestThrottle>,
}

impl YahooChartClient {
    pub fn new(timeout: Duration, throttle: Arc<RequestThrottle>) -> Result<Self> {
        Self::with_base_url(BASE_URL, timeout, throttle)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        timeout: Duration,
        throttle: Arc<RequestThrottle>,
    ) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .user_agent("Mozilla/5.0")
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            http,
            throttle,
        })
    }
}

#[async_trait]
impl MarketDataProvider for YahooChartClient {
    async fn bars(&self, ticker: &str, range: &str, interval: &str) -> Result<Vec<Bar>> {
        let url = format!("{}/v8/finance/chart/{ticker}", self.base_url);

        self.throttle.acquire().await;
        debug!(ticker, range, interval, "Fetching chart");
        let resp = self
            .http
            .get(&url)
            .query(&[("range", range), ("interval", interval)])
            .send()
            .await
            .map_err(|e| Error::DataProvider(format!("{ticker}: request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::DataProvider(format!("{ticker}: body unreadable: {e}")))?;

        // unknown symbols come back as a 404 carrying a JSON error payload
        match (status.is_success(), parse_chart(&body)) {
            (true, Ok(bars)) => Ok(bars),
            (_, Err(Error::DataProvider(msg))) => {
                Err(Error::DataProvider(format!("{ticker}: {msg}")))
            }
            (false, _) => Err(Error::DataProvider(format!("{ticker}: HTTP {status}"))),
            (true, Err(e)) => Err(Error::DataProvider(format!("{ticker}: {e}"))),
        }
    }
}

/// Decode a chart response into bars, dropping rows with any missing OHLC
/// value. A missing volume is read as zero.
pub fn parse_chart(body: &str) -> Result<Vec<Bar>> {
    let resp: ChartResponse = serde_json::from_str(body)?;

    if let Some(err) = resp.chart.error {
        return Err(Error::DataProvider(format!("{}: {}", err.code, err.description)));
    }
    let result = resp
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| Error::DataProvider("chart response has no result".to_string()))?;
    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .unwrap_or_default();

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let at = |v: &Vec<Option<f64>>| v.get(i).copied().flatten();
        let (Some(open), Some(high), Some(low), Some(close)) =
            (at(&quote.open), at(&quote.high), at(&quote.low), at(&quote.close))
        else {
            continue;
        };
        let timestamp = DateTime::from_timestamp(ts, 0)
            .ok_or_else(|| Error::DataProvider(format!("timestamp {ts} out of range")))?;
        bars.push(Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume: at(&quote.volume).unwrap_or(0.0),
        });
    }
    Ok(bars)
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Deserialize, Default)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}
