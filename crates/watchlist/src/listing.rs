use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use common::{Error, Result, RosterRow, WatchlistSource};

use crate::roster::{parse_roster_bytes, SegmentFilter};

/// Exchange-published listing of every issue (the `.xls` workbook or a CSV
/// export of it), narrowed to one market segment (e.g. "プライム").
pub struct ExchangeListingSource {
    url: String,
    filter: SegmentFilter,
    http: Client,
}

impl ExchangeListingSource {
    pub fn new(url: impl Into<String>, filter: SegmentFilter, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .user_agent("Mozilla/5.0")
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            filter,
            http,
        })
    }
}

#[async_trait]
impl WatchlistSource for ExchangeListingSource {
    fn describe(&self) -> String {
        format!("exchange listing {} [{}]", self.url, self.filter.contains)
    }

    async fn load(&self) -> Result<Vec<RosterRow>> {
        debug!(url = %self.url, "Fetching exchange listing");
        let resp = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::WatchlistSource(format!("listing request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::WatchlistSource(format!(
                "listing returned HTTP {status}"
            )));
        }
        let body = resp
            .bytes()
            .await
            .map_err(|e| Error::WatchlistSource(format!("listing body unreadable: {e}")))?;

        let rows = parse_roster_bytes(&body, Some(&self.filter))?;
        info!(segment = %self.filter.contains, rows = rows.len(), "Exchange listing loaded");
        Ok(rows)
    }
}
