//! Rendering of scan results and run events into `NotificationMessage`s.

use common::{Direction, NotificationMessage, ScanSummary, ScoreResult};

const FOOTER: &str = "kabuscan";
const ABORT_COLOR: u32 = 0xD50000;

/// Yen prices are shown whole; fractional prices below 100 keep one decimal.
pub fn price(value: f64) -> String {
    if value.abs() < 100.0 && value.fract() != 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value:.0}")
    }
}

fn optional(value: Option<f64>, digits: usize) -> String {
    value
        .map(|v| format!("{v:.digits$}"))
        .unwrap_or_else(|| "n/a".to_string())
}

/// One alert for a notable symbol.
pub fn score_alert(result: &ScoreResult) -> NotificationMessage {
    let mut title = format!(
        "{} {} {} {}",
        result.direction.emoji(),
        result.direction,
        result.code(),
        result.name
    );
    if let Some(earnings) = result.earnings.filter(|e| e.blackout) {
        title.push_str(&format!(" ⚠️ earnings in {}d", earnings.days_until));
    }

    let mut body: Vec<String> = result.rationale.iter().map(|r| format!("• {r}")).collect();
    if let Some(pattern) = result.pattern.pattern {
        body.push(format!(
            "Pattern: {pattern} ({}, {})",
            result.pattern.weight, result.pattern.bias
        ));
    }

    let ind = &result.indicators;
    let mut fields = vec![
        ("Price".to_string(), price(result.price)),
        ("Score".to_string(), format!("{:+}", result.score)),
    ];
    if let Some(entry) = result.entry {
        fields.push(("Entry".to_string(), price(entry)));
    }
    if !result.targets.is_empty() {
        let targets: Vec<String> = result.targets.iter().map(|t| price(*t)).collect();
        fields.push(("Targets".to_string(), targets.join(" / ")));
    }
    if let Some(stop) = result.stop {
        fields.push(("Stop".to_string(), price(stop)));
    }
    fields.push(("RSI".to_string(), optional(ind.rsi, 1)));
    fields.push(("MACD hist".to_string(), optional(ind.macd_histogram, 2)));
    fields.push((
        "RCI 9/26".to_string(),
        format!("{} / {}", optional(ind.rci_short, 0), optional(ind.rci_long, 0)),
    ));
    if let Some(bullish) = ind.heikin_ashi_bullish {
        let trend = if bullish { "up" } else { "down" };
        fields.push(("Heikin-Ashi".to_string(), trend.to_string()));
    }
    if let Some(earnings) = &result.earnings {
        fields.push((
            "Earnings".to_string(),
            format!("{} (in {}d)", earnings.date, earnings.days_until),
        ));
    }

    NotificationMessage {
        title,
        body: body.join("\n"),
        color: Some(result.color),
        fields,
        footer: Some(FOOTER.to_string()),
        timestamp: Some(result.as_of),
    }
}

/// End-of-run report listing the notable symbols per direction.
pub fn summary(summary: &ScanSummary, notable: &[ScoreResult]) -> NotificationMessage {
    let mut lines = vec![format!(
        "{} of {} symbols scanned, {} notable, {} skipped, {} filtered.",
        summary.scanned, summary.total, summary.matched, summary.skipped, summary.filtered
    )];
    for direction in Direction::ALL {
        let hits: Vec<String> = notable
            .iter()
            .filter(|r| r.direction == direction)
            .map(|r| format!("{} {} ({:+})", r.code(), r.name, r.score))
            .collect();
        if !hits.is_empty() {
            lines.push(format!("{} {}: {}", direction.emoji(), direction, hits.join(", ")));
        }
    }

    let elapsed = summary.finished_at - summary.started_at;
    NotificationMessage {
        title: "Scan complete".to_string(),
        body: lines.join("\n"),
        color: None,
        fields: vec![
            ("Run".to_string(), summary.run_id.to_string()),
            ("Elapsed".to_string(), format!("{}s", elapsed.num_seconds())),
        ],
        footer: Some(FOOTER.to_string()),
        timestamp: Some(summary.finished_at),
    }
}

/// Single alert sent when a run cannot start.
pub fn abort_alert(reason: &str) -> NotificationMessage {
    NotificationMessage {
        title: "🛑 Scan aborted".to_string(),
        body: reason.to_string(),
        color: Some(ABORT_COLOR),
        footer: Some(FOOTER.to_string()),
        ..Default::default()
    }
}

/// Flat text rendering for sinks without rich embeds.
pub fn plain_text(message: &NotificationMessage) -> String {
    let mut out = message.title.clone();
    if !message.body.is_empty() {
        out.push('\n');
        out.push_str(&message.body);
    }
    for (name, value) in &message.fields {
        out.push_str(&format!("\n{name}: {value}"));
    }
    if let Some(footer) = &message.footer {
        out.push_str(&format!("\n[{footer}]"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use common::{Bias, EarningsRisk, IndicatorSnapshot, Pattern, PatternMatch};

    fn result(direction: Direction, score: i32) -> ScoreResult {
        ScoreResult {
            symbol: "7203.T".into(),
            name: "トヨタ".into(),
            price: 2841.6,
            score,
            direction,
            rationale: vec!["Price near floor 2790".into(), "RSI 31.2 oversold".into()],
            entry: Some(2790.0),
            targets: vec![2950.0, 3010.4],
            stop: Some(2706.3),
            color: direction.color(),
            pattern: PatternMatch::new(Pattern::MorningStar, 75, Bias::Buy),
            indicators: IndicatorSnapshot {
                rsi: Some(31.24),
                macd_histogram: Some(-1.5),
                rci_short: Some(-62.0),
                rci_long: Some(-20.0),
                heikin_ashi_bullish: Some(false),
                floor: Some(2790.0),
                ceiling: Some(3100.0),
            },
            as_of: Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap(),
            earnings: None,
        }
    }

    #[test]
    fn score_alert_fields() {
        let msg = score_alert(&result(Direction::StrongBuy, 70));
        assert_eq!(msg.title, "🚀 strong buy 7203 トヨタ");
        assert_eq!(msg.color, Some(0x00C853));
        assert!(msg.body.starts_with("• Price near floor 2790"));
        assert!(msg.body.contains("morning star (75, buy)"));

        let field = |name: &str| {
            msg.fields
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(field("Price"), Some("2842"));
        assert_eq!(field("Score"), Some("+70"));
        assert_eq!(field("Targets"), Some("2950 / 3010"));
        assert_eq!(field("Stop"), Some("2706"));
        assert_eq!(field("RSI"), Some("31.2"));
        assert_eq!(field("RCI 9/26"), Some("-62 / -20"));
        assert_eq!(field("Heikin-Ashi"), Some("down"));
    }

    #[test]
    fn earnings_blackout_marks_the_title() {
        let mut r = result(Direction::StrongBuy, 70);
        r.earnings = Some(EarningsRisk {
            date: NaiveDate::from_ymd_opt(2024, 3, 3).unwrap(),
            days_until: 2,
            blackout: true,
            short_setup: false,
        });
        let msg = score_alert(&r);
        assert_eq!(msg.title, "🚀 strong buy 7203 トヨタ ⚠️ earnings in 2d");
        assert!(msg
            .fields
            .contains(&("Earnings".to_string(), "2024-03-03 (in 2d)".to_string())));

        r.earnings = r.earnings.map(|e| EarningsRisk { days_until: 10, blackout: false, ..e });
        assert_eq!(score_alert(&r).title, "🚀 strong buy 7203 トヨタ");
    }

    #[test]
    fn summary_groups_by_direction() {
        let started = Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap();
        let s = ScanSummary {
            run_id: uuid::Uuid::nil(),
            total: 3,
            scanned: 2,
            matched: 2,
            skipped: 1,
            filtered: 0,
            notified: 2,
            started_at: started,
            finished_at: started + chrono::Duration::seconds(42),
        };
        let notable = vec![
            result(Direction::StrongBuy, 70),
            result(Direction::ConsiderSell, -30),
        ];
        let msg = summary(&s, &notable);
        assert!(msg.body.starts_with("2 of 3 symbols scanned, 2 notable, 1 skipped, 0 filtered."));
        assert!(msg.body.contains("🚀 strong buy: 7203 トヨタ (+70)"));
        assert!(msg.body.contains("📉 consider sell: 7203 トヨタ (-30)"));
        assert!(!msg.body.contains("watch"));
        assert!(msg.fields.contains(&("Elapsed".to_string(), "42s".to_string())));
    }

    #[test]
    fn abort_alert_is_red() {
        let msg = abort_alert("watchlist is empty");
        assert_eq!(msg.color, Some(ABORT_COLOR));
        assert_eq!(msg.body, "watchlist is empty");
    }

    #[test]
    fn plain_text_lists_fields() {
        let msg = NotificationMessage {
            title: "T".into(),
            body: "B".into(),
            fields: vec![("k".into(), "v".into())],
            ..Default::default()
        };
        assert_eq!(plain_text(&msg), "T\nB\nk: v");
    }

    #[test]
    fn small_prices_keep_a_decimal() {
        assert_eq!(price(98.46), "98.5");
        assert_eq!(price(98.0), "98");
        assert_eq!(price(1234.6), "1235");
    }
}
