//! Watchlist sourcing: roster files, the exchange listing, and name resolution.

pub mod listing;
pub mod resolver;
pub mod roster;

pub use listing::ExchangeListingSource;
pub use resolver::{builtin_names, normalize_ticker, ticker_code, WatchlistResolver};
pub use roster::{parse_roster, parse_roster_bytes, parse_workbook, RosterFileSource, RosterFormat, SegmentFilter};
