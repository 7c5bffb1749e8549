use std::collections::{BTreeMap, HashSet};

use tracing::{info, warn};

use common::{Error, Result, WatchlistEntry, WatchlistSource};

/// Personal watchlist used when no static name table is configured.
pub fn builtin_names() -> BTreeMap<String, String> {
    [
        ("6701.T", "NEC"),
        ("4901.T", "富士フイルム"),
        ("5406.T", "神戸鋼"),
        ("7049.T", "識学"),
        ("8306.T", "三菱UFJ"),
        ("7203.T", "トヨタ"),
        ("9984.T", "SBG"),
        ("8035.T", "東エレク"),
        ("6330.T", "東洋エンジ"),
        ("4063.T", "信越化学"),
        ("7974.T", "任天堂"),
        ("8151.T", "東陽テク"),
    ]
    .into_iter()
    .map(|(t, n)| (t.to_string(), n.to_string()))
    .collect()
}

/// Bare code of a raw ticker: cut at the first '.', keep ASCII alphanumerics,
/// uppercase. `"9101.T"`, `" 9101 "` and `"9101.0"` all give `"9101"`.
pub fn ticker_code(raw: &str) -> String {
    let head = raw.trim().split('.').next().unwrap_or("");
    head.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Normalized ticker with the market suffix; `None` when no code remains.
pub fn normalize_ticker(raw: &str, suffix: &str) -> Option<String> {
    let code = ticker_code(raw);
    (!code.is_empty()).then(|| format!("{code}{suffix}"))
}

/// Builds the ticker -> display name mapping for one scan run.
///
/// Name priority per ticker: roster row name, static table, `symbol:<code>`.
/// Without usable roster rows the whole static table is the watchlist.
pub struct WatchlistResolver {
    market_suffix: String,
    /// Keyed by normalized ticker.
    static_names: BTreeMap<String, String>,
    source: Option<Box<dyn WatchlistSource>>,
}

impl WatchlistResolver {
    pub fn new(
        market_suffix: impl Into<String>,
        static_names: BTreeMap<String, String>,
        source: Option<Box<dyn WatchlistSource>>,
    ) -> Self {
        let market_suffix = market_suffix.into();
        let static_names = static_names
            .into_iter()
            .filter_map(|(t, n)| normalize_ticker(&t, &market_suffix).map(|t| (t, n)))
            .collect();
        Self {
            market_suffix,
            static_names,
            source,
        }
    }

    pub fn market_suffix(&self) -> &str {
        &self.market_suffix
    }

    /// Resolve a single code typed by a user, with the same name priority
    /// minus the roster.
    pub fn entry_for(&self, raw: &str) -> Option<WatchlistEntry> {
        let ticker = normalize_ticker(raw, &self.market_suffix)?;
        let name = self
            .static_names
            .get(&ticker)
            .cloned()
            .unwrap_or_else(|| placeholder(&ticker_code(raw)));
        Some(WatchlistEntry::new(ticker, name))
    }

    pub async fn resolve(&self) -> Result<Vec<WatchlistEntry>> {
        let rows = match &self.source {
            Some(source) => match source.load().await {
                Ok(rows) => rows,
                Err(e) => {
                    warn!(source = %source.describe(), error = %e, "Roster unavailable, falling back to static table");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for row in rows {
            let Some(ticker) = normalize_ticker(&row.code, &self.market_suffix) else {
                continue;
            };
            if !seen.insert(ticker.clone()) {
                continue;
            }
            let name = row
                .name
                .filter(|n| !n.trim().is_empty())
                .or_else(|| self.static_names.get(&ticker).cloned())
                .unwrap_or_else(|| placeholder(&ticker_code(&row.code)));
            entries.push(WatchlistEntry::new(ticker, name));
        }

        if entries.is_empty() {
            if self.source.is_some() {
                warn!("Roster yielded no usable symbols, using static name table");
            }
            entries = self
                .static_names
                .iter()
                .map(|(t, n)| WatchlistEntry::new(t.clone(), n.clone()))
                .collect();
        }

        if entries.is_empty() {
            return Err(Error::WatchlistEmpty);
        }

        info!(symbols = entries.len(), "Watchlist resolved");
        Ok(entries)
    }
}

fn placeholder(code: &str) -> String {
    format!("symbol:{code}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::RosterRow;

    struct FixedSource(Result<Vec<RosterRow>, String>);

    #[async_trait]
    impl WatchlistSource for FixedSource {
        fn describe(&self) -> String {
            "fixed".into()
        }

        async fn load(&self) -> Result<Vec<RosterRow>> {
            self.0.clone().map_err(Error::WatchlistSource)
        }
    }

    fn row(code: &str, name: Option<&str>) -> RosterRow {
        RosterRow {
            code: code.into(),
            name: name.map(Into::into),
        }
    }

    fn names(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(t, n)| (t.to_string(), n.to_string()))
            .collect()
    }

    #[test]
    fn normalization_strips_suffix_and_noise() {
        assert_eq!(normalize_ticker("9101", ".T").as_deref(), Some("9101.T"));
        assert_eq!(normalize_ticker("9101.T", ".T").as_deref(), Some("9101.T"));
        assert_eq!(normalize_ticker(" 9101.0 ", ".T").as_deref(), Some("9101.T"));
        assert_eq!(normalize_ticker("285a", ".T").as_deref(), Some("285A.T"));
        assert_eq!(normalize_ticker(".T", ".T"), None);
    }

    #[tokio::test]
    async fn roster_name_takes_priority() {
        let resolver = WatchlistResolver::new(
            ".T",
            names(&[("9101.T", "Fallback Corp")]),
            Some(Box::new(FixedSource(Ok(vec![row("9101", Some("Test Corp"))])))),
        );
        let entries = resolver.resolve().await.unwrap();
        assert_eq!(entries, vec![WatchlistEntry::new("9101.T", "Test Corp")]);
    }

    #[tokio::test]
    async fn roster_file_name_beats_static_table() {
        let path = std::env::temp_dir().join(format!("kabuscan-roster-{}.csv", std::process::id()));
        std::fs::write(&path, "code,name\n9101,Test Corp\n").unwrap();

        let resolver = WatchlistResolver::new(
            ".T",
            names(&[("9101.T", "Fallback Corp")]),
            Some(Box::new(crate::RosterFileSource::new(&path))),
        );
        let entries = resolver.resolve().await.unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(entries, vec![WatchlistEntry::new("9101.T", "Test Corp")]);
    }

    #[tokio::test]
    async fn static_name_then_placeholder() {
        let resolver = WatchlistResolver::new(
            ".T",
            names(&[("7203", "トヨタ")]),
            Some(Box::new(FixedSource(Ok(vec![
                row("7203.T", None),
                row("1234", Some("  ")),
            ])))),
        );
        let entries = resolver.resolve().await.unwrap();
        assert_eq!(
            entries,
            vec![
                WatchlistEntry::new("7203.T", "トヨタ"),
                WatchlistEntry::new("1234.T", "symbol:1234"),
            ]
        );
    }

    #[tokio::test]
    async fn duplicate_roster_rows_keep_first() {
        let resolver = WatchlistResolver::new(
            ".T",
            BTreeMap::new(),
            Some(Box::new(FixedSource(Ok(vec![
                row("6701", Some("NEC")),
                row("6701.T", Some("日本電気")),
            ])))),
        );
        let entries = resolver.resolve().await.unwrap();
        assert_eq!(entries, vec![WatchlistEntry::new("6701.T", "NEC")]);
    }

    #[tokio::test]
    async fn failing_source_falls_back_to_static_table() {
        let resolver = WatchlistResolver::new(
            ".T",
            names(&[("8306.T", "三菱UFJ"), ("7974.T", "任天堂")]),
            Some(Box::new(FixedSource(Err("boom".into())))),
        );
        let entries = resolver.resolve().await.unwrap();
        // static fallback is emitted in key order
        assert_eq!(
            entries,
            vec![
                WatchlistEntry::new("7974.T", "任天堂"),
                WatchlistEntry::new("8306.T", "三菱UFJ"),
            ]
        );
    }

    #[tokio::test]
    async fn empty_roster_and_empty_table_is_an_error() {
        let resolver = WatchlistResolver::new(
            ".T",
            BTreeMap::new(),
            Some(Box::new(FixedSource(Ok(vec![])))),
        );
        assert!(matches!(resolver.resolve().await, Err(Error::WatchlistEmpty)));
    }

    #[tokio::test]
    async fn no_source_uses_builtin_table() {
        let resolver = WatchlistResolver::new(".T", builtin_names(), None);
        let entries = resolver.resolve().await.unwrap();
        assert_eq!(entries.len(), 12);
    }

    #[test]
    fn entry_for_user_input() {
        let resolver = WatchlistResolver::new(".T", builtin_names(), None);
        assert_eq!(
            resolver.entry_for("7203"),
            Some(WatchlistEntry::new("7203.T", "トヨタ"))
        );
        assert_eq!(
            resolver.entry_for("1111.T"),
            Some(WatchlistEntry::new("1111.T", "symbol:1111"))
        );
        assert_eq!(resolver.entry_for("  "), None);
    }
}
