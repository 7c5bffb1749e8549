use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use alerts::{DiscordWebhookSink, FanoutSink, LogSink, TelegramSink};
use common::{
    Config, DataSource, EarningsCalendar, MarketDataProvider, NotificationSink, WatchlistSource,
};
use engine::{
    KabutanCalendar, ReplayProvider, RequestThrottle, ScanOptions, Scanner, YahooChartClient,
};
use strategy::{Pipeline, ScanFileConfig};
use watchlist::{builtin_names, RosterFileSource, ExchangeListingSource, SegmentFilter, WatchlistResolver};

const USAGE: &str = "usage: kabuscan [scan | serve | lookup <code>]";

enum Command {
    Scan,
    Serve,
    Lookup(String),
}

fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    match args {
        [] => Ok(Command::Scan),
        [cmd] if cmd == "scan" => Ok(Command::Scan),
        [cmd] if cmd == "serve" => Ok(Command::Serve),
        [cmd, code] if cmd == "lookup" => Ok(Command::Lookup(code.clone())),
        _ => bail!("{USAGE}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_args(&args)?;

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    let scan_file = match &cfg.scan_config_path {
        Some(path) => ScanFileConfig::load(path)?,
        None => ScanFileConfig::default(),
    };
    let pipeline = Pipeline::from_config(&scan_file);
    info!(
        required_bars = pipeline.required_bars(),
        source = ?cfg.data_source,
        "kabuscan starting"
    );

    let (provider, calendar) = build_sources(&cfg)?;
    let mut scanner = Scanner::new(
        provider,
        build_sink(&cfg)?,
        pipeline,
        build_resolver(&cfg, &scan_file)?,
        ScanOptions::from_config(&cfg),
    );
    if let Some(calendar) = calendar {
        info!(calendar = %calendar.describe(), "Earnings check enabled");
        scanner = scanner.with_earnings(calendar);
    }
    let scanner = Arc::new(scanner);

    match command {
        Command::Scan => {
            let summary = scanner.run().await.context("scan aborted")?;
            info!(
                run_id = %summary.run_id,
                matched = summary.matched,
                notified = summary.notified,
                "Done"
            );
        }
        Command::Lookup(code) => {
            let result = scanner
                .lookup(&code)
                .await
                .with_context(|| format!("lookup of '{code}' failed"))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Serve => {
            api::serve(api::AppState::new(scanner), cfg.api_port)
                .await
                .context("lookup API stopped")?;
        }
    }
    Ok(())
}

// ── Wiring ────────────────────────────────────────────────────────────────────

type Sources = (Arc<dyn MarketDataProvider>, Option<Arc<dyn EarningsCalendar>>);

/// Bar provider plus the earnings calendar matching the data source.
fn build_sources(cfg: &Config) -> anyhow::Result<Sources> {
    match &cfg.data_source {
        DataSource::Yahoo => {
            let throttle = Arc::new(RequestThrottle::new(cfg.request_delay));
            let provider: Arc<dyn MarketDataProvider> =
                Arc::new(YahooChartClient::new(cfg.request_timeout, throttle)?);
            let calendar: Option<Arc<dyn EarningsCalendar>> = if cfg.earnings_check {
                let throttle = Arc::new(RequestThrottle::new(cfg.request_delay));
                Some(Arc::new(KabutanCalendar::new(cfg.request_timeout, throttle)?))
            } else {
                None
            };
            Ok((provider, calendar))
        }
        DataSource::Replay(dir) => {
            info!(dir = %dir, "Replaying bars from disk");
            let replay = Arc::new(ReplayProvider::new(dir)?);
            let calendar = cfg
                .earnings_check
                .then(|| replay.clone() as Arc<dyn EarningsCalendar>);
            let provider: Arc<dyn MarketDataProvider> = replay;
            Ok((provider, calendar))
        }
    }
}

/// Every configured chat sink behind one fanout; the log when none is set.
fn build_sink(cfg: &Config) -> anyhow::Result<Arc<dyn NotificationSink>> {
    let mut sinks: Vec<Box<dyn NotificationSink>> = Vec::new();
    if let Some(url) = &cfg.discord_webhook_url {
        sinks.push(Box::new(
            DiscordWebhookSink::new(url, cfg.request_timeout)?.with_part_delay(cfg.notify_delay),
        ));
    }
    if let Some(token) = &cfg.telegram_token {
        sinks.push(Box::new(TelegramSink::new(token, &cfg.telegram_chat_ids)?));
    }
    if sinks.is_empty() {
        warn!("No DISCORD_WEBHOOK_URL or TELEGRAM_TOKEN set, alerts go to the log only");
        sinks.push(Box::new(LogSink));
    }
    Ok(Arc::new(FanoutSink::new(sinks)))
}

fn build_resolver(cfg: &Config, scan_file: &ScanFileConfig) -> anyhow::Result<WatchlistResolver> {
    let source: Option<Box<dyn WatchlistSource>> = match (&cfg.watchlist_path, &cfg.roster_url) {
        (Some(path), _) => Some(Box::new(RosterFileSource::new(path))),
        (None, Some(url)) => Some(Box::new(ExchangeListingSource::new(
            url,
            SegmentFilter {
                column: cfg.roster_segment_column.clone(),
                contains: cfg.roster_segment.clone(),
            },
            cfg.request_timeout,
        )?)),
        (None, None) => None,
    };
    if let Some(s) = &source {
        info!(source = %s.describe(), "Watchlist roster configured");
    }
    let names = scan_file.names.clone().unwrap_or_else(builtin_names);
    Ok(WatchlistResolver::new(&cfg.market_suffix, names, source))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn subcommands() {
        assert!(matches!(parse_args(&args(&[])), Ok(Command::Scan)));
        assert!(matches!(parse_args(&args(&["scan"])), Ok(Command::Scan)));
        assert!(matches!(parse_args(&args(&["serve"])), Ok(Command::Serve)));
        assert!(matches!(parse_args(&args(&["lookup", "7203"])), Ok(Command::Lookup(c)) if c == "7203"));
        assert!(parse_args(&args(&["lookup"])).is_err());
        assert!(parse_args(&args(&["backtest"])).is_err());
    }
}
