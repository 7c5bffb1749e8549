use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use reqwest::Client;
use tracing::debug;

use common::{EarningsCalendar, Error, Result};
use watchlist::ticker_code;

use crate::throttle::RequestThrottle;

const BASE_URL: &str = "https://kabutan.jp";
/// Label preceding the scheduled date on the finance page.
const MARKER: &str = "決算発表予定日";
/// The date must appear within this many characters after the marker.
const SEARCH_WINDOW: usize = 200;

/// Next earnings date scraped from the kabutan.jp finance page of a code.
pub struct KabutanCalendar {
    base_url: String,
    http: Client,
    throttle: Arc<RequestThrottle>,
    date: Regex,
}

impl KabutanCalendar {
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
        let date = Regex::new(r"(\d{2}|\d{4})/(\d{1,2})/(\d{1,2})")
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            http,
            throttle,
            date,
        })
    }

    /// First `yy/mm/dd` or `yyyy/mm/dd` date shortly after the marker.
    pub fn parse_page(&self, html: &str) -> Option<NaiveDate> {
        let start = html.find(MARKER)? + MARKER.len();
        let window: String = html[start..].chars().take(SEARCH_WINDOW).collect();
        let caps = self.date.captures(&window)?;
        let mut year: i32 = caps[1].parse().ok()?;
        if year < 100 {
            year += 2000;
        }
        NaiveDate::from_ymd_opt(year, caps[2].parse().ok()?, caps[3].parse().ok()?)
    }
}

#[async_trait]
impl EarningsCalendar for KabutanCalendar {
    fn describe(&self) -> String {
        format!("earnings calendar {}", self.base_url)
    }

    async fn next_earnings(&self, ticker: &str) -> Result<Option<NaiveDate>> {
        let code = ticker_code(ticker);
        self.throttle.acquire().await;
        debug!(ticker, "Fetching earnings date");
        let resp = self
            .http
            .get(format!("{}/stock/finance", self.base_url))
            .query(&[("code", code.as_str())])
            .send()
            .await
            .map_err(|e| Error::DataProvider(format!("{ticker}: earnings request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::DataProvider(format!(
                "{ticker}: earnings page returned HTTP {status}"
            )));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| Error::DataProvider(format!("{ticker}: earnings page unreadable: {e}")))?;
        Ok(self.parse_page(&body))
    }
}
