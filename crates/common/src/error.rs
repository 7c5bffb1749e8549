use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Bar series shorter than the longest window an indicator needs.
    #[error("Insufficient data: need {required} bars, have {available}")]
    InsufficientData { required: usize, available: usize },

    /// Bars not strictly chronological (out of order or duplicate timestamps).
    #[error("Invalid bar series: {0}")]
    InvalidBars(String),

    #[error("Data provider error: {0}")]
    DataProvider(String),

    #[error("Watchlist source error: {0}")]
    WatchlistSource(String),

    #[error("Watchlist is empty: no usable symbols from roster or static table")]
    WatchlistEmpty,

    #[error("Notification delivery failed: {0}")]
    NotificationDelivery(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
