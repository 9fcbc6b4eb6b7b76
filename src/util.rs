use crate::error::{CountError, Result};
use crate::model::DateRange;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::time::{Duration, SystemTime};

/// Build a `DateRange` from raw CLI strings, rejecting an inverted window
/// before any network call is made.
pub fn resolve_range(since: Option<&str>, until: Option<&str>) -> Result<DateRange> {
    let mut range = DateRange::new();

    let since_dt = since.map(parse_date).transpose()?;
    let until_dt = until.map(parse_date).transpose()?;

    if let (Some(s), Some(u)) = (since_dt, until_dt) {
        if s > u {
            return Err(CountError::Config(format!(
                "Invalid range: since ({}) is after until ({})",
                s, u
            )));
        }
    }

    if let Some(s) = since_dt {
        range = range.with_since(s);
    }
    if let Some(u) = until_dt {
        range = range.with_until(u);
    }

    Ok(range)
}

pub fn parse_date(input: &str) -> Result<DateTime<Utc>> {
    // RFC3339
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    // YYYY-MM-DD
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(datetime) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&datetime));
        }
    }

    // Relative duration (e.g., "2 weeks ago")
    if let Some(duration) = parse_natural_duration(input) {
        let now = SystemTime::now();
        let target = now
            .checked_sub(duration)
            .ok_or_else(|| CountError::InvalidDate(format!("Duration overflow for '{input}'")))?;
        return Ok(DateTime::<Utc>::from(target));
    }

    Err(CountError::InvalidDate(format!(
        "Unrecognized date '{input}' (expected RFC3339, YYYY-MM-DD, or e.g. '30 days ago')"
    )))
}

fn parse_natural_duration(input: &str) -> Option<Duration> {
    let input = input.trim().to_lowercase();

    if let Some(days) = input.strip_suffix(" days ago") {
        if let Ok(n) = days.trim().parse::<u64>() {
            return Some(Duration::from_secs(n * 86400));
        }
    }

    if let Some(weeks) = input.strip_suffix(" weeks ago") {
        if let Ok(n) = weeks.trim().parse::<u64>() {
            return Some(Duration::from_secs(n * 7 * 86400));
        }
    }

    if let Some(months) = input.strip_suffix(" months ago") {
        if let Ok(n) = months.trim().parse::<u64>() {
            return Some(Duration::from_secs(n * 30 * 86400));
        }
    }

    None
}

pub fn trim_slashes(input: &str) -> &str {
    input.trim_matches('/')
}
