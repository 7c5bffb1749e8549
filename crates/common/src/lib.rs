pub mod config;
pub mod error;
pub mod provider;
pub mod types;

pub use config::{Config, DataSource};
pub use error::{Error, Result};
pub use provider::{EarningsCalendar, MarketDataProvider, NotificationSink, WatchlistSource};
pub use types::*;
