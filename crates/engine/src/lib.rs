//! Batch scan orchestration and the market-data providers behind it.

pub mod earnings;
pub mod replay;
pub mod scanner;
pub mod throttle;
pub mod yahoo;

pub use earnings::KabutanCalendar;
pub use replay::ReplayProvider;
pub use scanner::{market_today, BatchOutcome, Evaluation, ScanOptions, Scanner, SkippedSymbol};
pub use throttle::RequestThrottle;
pub use yahoo::YahooChartClient;
