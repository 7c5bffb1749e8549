//! Earnings-proximity checks layered on top of a scored result.

use chrono::NaiveDate;

use common::{EarningsRisk, ScoreResult};

/// Announcements this many days away or closer block new positions.
pub const BLACKOUT_DAYS: i64 = 3;
/// Window in which an overbought symbol is flagged as a short setup.
pub const SHORT_WINDOW_DAYS: i64 = 14;
pub const SHORT_SETUP_RSI: f64 = 70.0;

/// `None` when the announcement is already past.
pub fn assess(next: NaiveDate, today: NaiveDate, rsi: Option<f64>) -> Option<EarningsRisk> {
    let days_until = (next - today).num_days();
    if days_until < 0 {
        return None;
    }
    Some(EarningsRisk {
        date: next,
        days_until,
        blackout: days_until <= BLACKOUT_DAYS,
        short_setup: days_until <= SHORT_WINDOW_DAYS && rsi.is_some_and(|r| r > SHORT_SETUP_RSI),
    })
}

/// Attach the earnings check to `result`. The score is left as is; the
/// blackout and short setup each add a rationale line.
pub fn annotate(result: &mut ScoreResult, next: NaiveDate, today: NaiveDate) {
    let Some(risk) = assess(next, today, result.indicators.rsi) else {
        return;
    };
    if risk.blackout {
        result.rationale.push(format!(
            "earnings {} in {}d: no new positions",
            risk.date, risk.days_until
        ));
    }
    if risk.short_setup {
        result.rationale.push(format!(
            "earnings {} in {}d with RSI above {SHORT_SETUP_RSI:.0}: short setup",
            risk.date, risk.days_until
        ));
    }
    result.earnings = Some(risk);
}
