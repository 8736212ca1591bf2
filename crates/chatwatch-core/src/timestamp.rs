//! Resolution of the last-message time printed at the end of a chat row.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// `21.09.2025 10:20:06` at the very end of the row text.
static FULL_DATE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]{2})\.([0-9]{2})\.([0-9]{4})\s+([0-9]{2}):([0-9]{2}):([0-9]{2})$")
        .expect("valid date-time pattern")
});

/// `9:05` or `23:55` at the very end of the row text.
static TRAILING_CLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]{1,2}):([0-9]{2})$").expect("valid clock pattern"));

/// Parse the time of the last message from a row's visible text.
///
/// Only the end of the text counts, so dates quoted in the message preview
/// are ignored. A trailing `DD.MM.YYYY HH:MM:SS` is taken as-is. A bare
/// trailing `HH:MM` is placed on `now`'s date, or on the previous day if that would put it in
/// the future. Returns `None` when neither form is present or the fields are
/// out of range.
pub fn parse_message_time(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let text = text.trim_end();
    if let Some(caps) = FULL_DATE_TIME.captures(text) {
        let field = |i: usize| caps[i].parse::<u32>().ok();
        let year = caps[3].parse::<i32>().ok()?;
        return NaiveDate::from_ymd_opt(year, field(2)?, field(1)?)?.and_hms_opt(
            field(4)?,
            field(5)?,
            field(6)?,
        );
    }

    let caps = TRAILING_CLOCK.captures(text)?;
    let hour = caps[1].parse::<u32>().ok()?;
    let minute = caps[2].parse::<u32>().ok()?;
    resolve_clock(hour, minute, now)
}

/// Place a time of day on the most recent date where it is not in the future.
pub fn resolve_clock(hour: u32, minute: u32, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let today = now.date().and_hms_opt(hour, minute, 0)?;
    if today > now {
        // crossed midnight since the message was sent
        Some(today - Duration::days(1))
    } else {
        Some(today)
    }
}
