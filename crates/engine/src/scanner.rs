use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as DateDuration, NaiveDate, Utc};
use futures_util::{stream, StreamExt};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use alerts::format;
use common::{
    Config, EarningsCalendar, Error, MarketDataProvider, NotificationSink, Result, ScanSummary,
    ScoreResult, WatchlistEntry,
};
use strategy::{earnings, Pipeline};
use watchlist::WatchlistResolver;

/// Run-level knobs taken from the environment config.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub range: String,
    pub interval: String,
    pub concurrency: usize,
    /// Skip symbols whose P/E ratio is known and above this value.
    pub max_per: Option<f64>,
    pub notify_delay: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            range: "1y".to_string(),
            interval: "1d".to_string(),
            concurrency: 4,
            max_per: None,
            notify_delay: Duration::from_secs(1),
        }
    }
}

impl ScanOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            range: cfg.fetch_range.clone(),
            interval: cfg.fetch_interval.clone(),
            concurrency: cfg.scan_concurrency.max(1),
            max_per: cfg.max_per,
            notify_delay: cfg.notify_delay,
        }
    }
}

/// Outcome of evaluating one symbol that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    Scored(ScoreResult),
    /// Excluded by the P/E filter.
    Filtered { per: f64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSymbol {
    pub ticker: String,
    pub reason: String,
}

/// Results of evaluating a whole watchlist, in watchlist order.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub results: Vec<ScoreResult>,
    pub skipped: Vec<SkippedSymbol>,
    pub filtered: usize,
    /// Skips caused by the market-data provider itself.
    pub provider_failures: usize,
}

impl BatchOutcome {
    /// True when symbols were attempted and every one failed at the provider.
    pub fn provider_unreachable(&self) -> bool {
        self.provider_failures > 0
            && self.provider_failures == self.skipped.len()
            && self.results.is_empty()
            && self.filtered == 0
    }
}

/// One batch pass: resolve the watchlist, evaluate every symbol, and notify
/// on the notable ones.
pub struct Scanner {
    provider: Arc<dyn MarketDataProvider>,
    sink: Arc<dyn NotificationSink>,
    pipeline: Pipeline,
    resolver: WatchlistResolver,
    options: ScanOptions,
    earnings: Option<Arc<dyn EarningsCalendar>>,
}

impl Scanner {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        sink: Arc<dyn NotificationSink>,
        pipeline: Pipeline,
        resolver: WatchlistResolver,
        options: ScanOptions,
    ) -> Self {
        Self {
            provider,
            sink,
            pipeline,
            resolver,
            options,
            earnings: None,
        }
    }

    /// Check every scored symbol against an earnings calendar.
    pub fn with_earnings(mut self, calendar: Arc<dyn EarningsCalendar>) -> Self {
        self.earnings = Some(calendar);
        self
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub async fn resolve_watchlist(&self) -> Result<Vec<WatchlistEntry>> {
        self.resolver.resolve().await
    }

    /// Fetch, filter, and score one symbol. Errors are returned as values for
    /// the batch loop to record.
    pub async fn evaluate(&self, entry: &WatchlistEntry) -> Result<Evaluation> {
        let bars = self
            .provider
            .bars(&entry.ticker, &self.options.range, &self.options.interval)
            .await?;

        if let Some(max_per) = self.options.max_per {
            match self.provider.metadata(&entry.ticker).await {
                Ok(Some(meta)) => {
                    if let Some(per) = meta.per.filter(|per| *per > max_per) {
                        debug!(ticker = %entry.ticker, per, max_per, "Filtered by P/E");
                        return Ok(Evaluation::Filtered { per });
                    }
                }
                Ok(None) => {}
                Err(e) => debug!(ticker = %entry.ticker, error = %e, "Metadata unavailable"),
            }
        }

        let mut result = self.pipeline.evaluate(&entry.ticker, &entry.name, &bars)?;
        self.check_earnings(&mut result).await;
        debug!(ticker = %entry.ticker, score = result.score, direction = %result.direction, "Scored");
        Ok(Evaluation::Scored(result))
    }

    /// Evaluate every entry with bounded concurrency. Per-symbol failures are
    /// logged here and reported as skipped.
    pub async fn evaluate_all(&self, entries: &[WatchlistEntry]) -> BatchOutcome {
        // entries are owned by each future; a borrowed stream item makes the
        // batch future non-Send
        let tasks: Vec<_> = entries
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, entry)| async move {
                let outcome = self.evaluate(&entry).await;
                (i, outcome)
            })
            .collect();
        let mut outcomes: Vec<(usize, Result<Evaluation>)> = stream::iter(tasks)
            .buffer_unordered(self.options.concurrency.max(1))
            .collect()
            .await;
        outcomes.sort_by_key(|(i, _)| *i);

        let mut batch = BatchOutcome::default();
        for (i, outcome) in outcomes {
            let ticker = &entries[i].ticker;
            match outcome {
                Ok(Evaluation::Scored(result)) => batch.results.push(result),
                Ok(Evaluation::Filtered { .. }) => batch.filtered += 1,
                Err(e) => {
                    warn!(ticker = %ticker, error = %e, "Skipping symbol");
                    batch.provider_failures += usize::from(matches!(e, Error::DataProvider(_)));
                    batch.skipped.push(SkippedSymbol {
                        ticker: ticker.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        batch
    }

    /// Score a single user-supplied code. No filter, no notification.
    pub async fn lookup(&self, code: &str) -> Result<ScoreResult> {
        let entry = self
            .resolver
            .entry_for(code)
            .ok_or_else(|| Error::DataProvider(format!("'{code}' is not a ticker code")))?;
        let bars = self
            .provider
            .bars(&entry.ticker, &self.options.range, &self.options.interval)
            .await?;
        let mut result = self.pipeline.evaluate(&entry.ticker, &entry.name, &bars)?;
        self.check_earnings(&mut result).await;
        Ok(result)
    }

    /// Calendar failures leave the result unannotated.
    async fn check_earnings(&self, result: &mut ScoreResult) {
        let Some(calendar) = &self.earnings else {
            return;
        };
        match calendar.next_earnings(&result.symbol).await {
            Ok(Some(next)) => earnings::annotate(result, next, market_today()),
            Ok(None) => {}
            Err(e) => debug!(ticker = %result.symbol, error = %e, "Earnings date unavailable"),
        }
    }

    /// Run one full batch pass.
    ///
    /// Two failures are fatal, each sending one abort alert before the error
    /// is returned: an unresolvable watchlist, and a provider that failed for
    /// every symbol. Delivery failures are logged and counted out of
    /// `notified`.
    pub async fn run(&self) -> Result<ScanSummary> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%run_id, "Scan starting");

        let entries = match self.resolver.resolve().await {
            Ok(entries) => entries,
            Err(e) => return Err(self.abort(run_id, e).await),
        };

        let batch = self.evaluate_all(&entries).await;
        if batch.provider_unreachable() {
            let reason = batch
                .skipped
                .first()
                .map(|s| s.reason.as_str())
                .unwrap_or_default();
            let e = Error::DataProvider(format!(
                "no provider reachable ({} of {} symbols failed; first: {reason})",
                batch.skipped.len(),
                entries.len()
            ));
            return Err(self.abort(run_id, e).await);
        }
        let scanned = batch.results.len();

        let classifier = self.pipeline.classifier();
        let mut notable: Vec<ScoreResult> = batch
            .results
            .into_iter()
            .filter(|r| classifier.is_notable(r))
            .collect();
        // stable: equal magnitudes keep watchlist order
        notable.sort_by_key(|r| Reverse(r.score.unsigned_abs()));

        let mut notified = 0;
        for (i, result) in notable.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.options.notify_delay).await;
            }
            match self.sink.deliver(&format::score_alert(result)).await {
                Ok(()) => {
                    notified += 1;
                    info!(ticker = %result.symbol, score = result.score, direction = %result.direction, "Alert sent");
                }
                Err(e) => warn!(ticker = %result.symbol, error = %e, "Alert delivery failed"),
            }
        }

        let summary = ScanSummary {
            run_id,
            total: entries.len(),
            scanned,
            matched: notable.len(),
            skipped: batch.skipped.len(),
            filtered: batch.filtered,
            notified,
            started_at,
            finished_at: Utc::now(),
        };

        if !notable.is_empty() {
            tokio::time::sleep(self.options.notify_delay).await;
        }
        if let Err(e) = self.sink.deliver(&format::summary(&summary, &notable)).await {
            warn!(error = %e, "Summary delivery failed");
        }

        info!(
            %run_id,
            total = summary.total,
            scanned = summary.scanned,
            matched = summary.matched,
            skipped = summary.skipped,
            filtered = summary.filtered,
            notified = summary.notified,
            "Scan finished"
        );
        Ok(summary)
    }

    async fn abort(&self, run_id: Uuid, e: Error) -> Error {
        error!(%run_id, error = %e, "Scan aborted");
        if let Err(send) = self.sink.deliver(&format::abort_alert(&e.to_string())).await {
            warn!(error = %send, "Failed to deliver abort alert");
        }
        e
    }
}

/// Calendar date on the Tokyo exchange (UTC+9).
pub fn market_today() -> NaiveDate {
    (Utc::now() + DateDuration::hours(9)).date_naive()
}
