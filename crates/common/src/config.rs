use std::time::Duration;

/// Where bar history comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// Public chart HTTP endpoint.
    Yahoo,
    /// Local CSV files, one per ticker code, under the given directory.
    Replay(String),
}

/// All process configuration loaded from environment variables at startup.
/// Invalid values cause an immediate panic with a clear message.
#[derive(Debug, Clone)]
pub struct Config {
    // Notification sinks (all optional; with none set alerts go to the log)
    pub discord_webhook_url: Option<String>,
    pub telegram_token: Option<String>,
    pub telegram_chat_ids: Vec<i64>,

    // Watchlist
    pub watchlist_path: Option<String>,
    pub roster_url: Option<String>,
    pub roster_segment: String,
    pub roster_segment_column: String,
    pub market_suffix: String,

    // Indicator/scoring config file path
    pub scan_config_path: Option<String>,

    // Market data
    pub data_source: DataSource,
    pub fetch_range: String,
    pub fetch_interval: String,
    pub request_delay: Duration,
    pub request_timeout: Duration,
    pub scan_concurrency: usize,
    /// Skip symbols whose P/E ratio is known and above this value.
    pub max_per: Option<f64>,
    /// Annotate results with the next earnings date.
    pub earnings_check: bool,

    // Notifications
    pub notify_delay: Duration,

    // Lookup API
    pub api_port: u16,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let data_source = match optional_env("DATA_SOURCE")
            .unwrap_or_else(|| "yahoo".to_string())
            .to_lowercase()
            .as_str()
        {
            "yahoo" => DataSource::Yahoo,
            "replay" => DataSource::Replay(
                optional_env("REPLAY_DIR").unwrap_or_else(|| "data/bars".to_string()),
            ),
            other => panic!("ERROR: DATA_SOURCE must be 'yahoo' or 'replay', got: '{other}'"),
        };

        let telegram_chat_ids = optional_env("TELEGRAM_CHAT_IDS")
            .map(|raw| {
                raw.split(',')
                    .filter(|s| !s.trim().is_empty())
                    .map(|s| {
                        s.trim().parse::<i64>().unwrap_or_else(|_| {
                            panic!("TELEGRAM_CHAT_IDS contains non-numeric ID: '{}'", s.trim())
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Config {
            discord_webhook_url: optional_env("DISCORD_WEBHOOK_URL"),
            telegram_token: optional_env("TELEGRAM_TOKEN"),
            telegram_chat_ids,
            watchlist_path: optional_env("WATCHLIST_PATH"),
            roster_url: optional_env("ROSTER_URL"),
            roster_segment: optional_env("ROSTER_SEGMENT")
                .unwrap_or_else(|| "プライム".to_string()),
            roster_segment_column: optional_env("ROSTER_SEGMENT_COLUMN")
                .unwrap_or_else(|| "市場・商品区分".to_string()),
            market_suffix: optional_env("MARKET_SUFFIX").unwrap_or_else(|| ".T".to_string()),
            scan_config_path: optional_env("SCAN_CONFIG_PATH"),
            data_source,
            fetch_range: optional_env("FETCH_RANGE").unwrap_or_else(|| "1y".to_string()),
            fetch_interval: optional_env("FETCH_INTERVAL").unwrap_or_else(|| "1d".to_string()),
            request_delay: Duration::from_millis(parsed_env("REQUEST_DELAY_MS").unwrap_or(500)),
            request_timeout: Duration::from_secs(parsed_env("REQUEST_TIMEOUT_SECS").unwrap_or(10)),
            scan_concurrency: parsed_env("SCAN_CONCURRENCY").unwrap_or(4).max(1),
            max_per: parsed_env("MAX_PER"),
            earnings_check: parsed_env("EARNINGS_CHECK").unwrap_or(true),
            notify_delay: Duration::from_millis(parsed_env("NOTIFY_DELAY_MS").unwrap_or(1000)),
            api_port: parsed_env("API_PORT").unwrap_or(8080),
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    optional_env(key).map(|v| {
        v.trim()
            .parse()
            .unwrap_or_else(|_| panic!("Environment variable '{key}' has an invalid value: '{v}'"))
    })
}
