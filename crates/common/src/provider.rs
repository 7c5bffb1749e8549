use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{Bar, NotificationMessage, Result, RosterRow, TickerMetadata};

/// Source of historical price bars.
///
/// `YahooChartClient` implements this against the public chart endpoint.
/// `ReplayProvider` implements this over local CSV files.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch bars for `ticker` covering `range` (e.g. "1y") at `interval` (e.g. "1d").
    /// Bars are returned oldest first.
    async fn bars(&self, ticker: &str, range: &str, interval: &str) -> Result<Vec<Bar>>;

    /// Descriptive data used as a secondary filter. Providers without it return `None`.
    async fn metadata(&self, _ticker: &str) -> Result<Option<TickerMetadata>> {
        Ok(None)
    }
}

/// Scheduled earnings announcements.
#[async_trait]
pub trait EarningsCalendar: Send + Sync {
    fn describe(&self) -> String;

    /// Next announcement date for `ticker`, `None` when none is scheduled or
    /// the calendar does not cover it.
    async fn next_earnings(&self, ticker: &str) -> Result<Option<NaiveDate>>;
}

/// External roster of symbols (spreadsheet export, exchange listing).
#[async_trait]
pub trait WatchlistSource: Send + Sync {
    /// Short label used in logs.
    fn describe(&self) -> String;

    async fn load(&self) -> Result<Vec<RosterRow>>;
}

/// Outbound chat delivery.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one message. Bodies over the sink's limit are split into
    /// several deliveries by the implementation.
    async fn deliver(&self, message: &NotificationMessage) -> Result<()>;
}
