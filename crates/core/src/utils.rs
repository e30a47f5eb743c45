use crate::domain::BillingPeriod;
use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Parses a bill timestamp into a naive date-time.
/// Supports various formats: ISO 8601 with or without offset and fractional
/// seconds, "YYYY-MM-DD HH:MM:SS", and a bare date (midnight).
///
/// Timestamps carrying an offset keep the wall-clock time they were written
/// with; they are not shifted into the local timezone.
pub fn parse_timestamp(timestamp_str: &str) -> Option<NaiveDateTime> {
    let timestamp_str = timestamp_str.trim();
    if timestamp_str.is_empty() {
        return None;
    }

    // e.g. "2025-12-16T10:30:00Z" or "2025-12-16T10:30:00+05:30"
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp_str) {
        return Some(dt.naive_local());
    }

    // e.g. "2025-12-16T10:30:00" or "2025-12-16T10:30:00.123456"
    if let Ok(naive_dt) = NaiveDateTime::parse_from_str(timestamp_str, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive_dt);
    }

    // e.g. "2025-12-16 10:30:00"
    if let Ok(naive_dt) = NaiveDateTime::parse_from_str(timestamp_str, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive_dt);
    }

    // e.g. "2025-12-16"
    NaiveDate::parse_from_str(timestamp_str, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Derives the billing period (month and year) a timestamp falls in.
pub fn extract_period(timestamp: &str) -> Option<BillingPeriod> {
    let dt = parse_timestamp(timestamp)?;
    BillingPeriod::new(dt.month(), dt.year())
}

/// Formats a timestamp for display as "YYYY-MM-DD HH:MM:SS".
/// Returns the original string when it cannot be parsed.
pub fn format_timestamp_for_display(timestamp_str: &str) -> String {
    match parse_timestamp(timestamp_str) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => timestamp_str.to_string(),
    }
}

/// Current local time as an ISO 8601 timestamp without offset, the format new
/// bill entries are written with.
pub fn now_timestamp() -> String {
    Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string()
}

/// English name of a month number (1-12).
pub fn month_name(month: u32) -> Option<&'static str> {
    let index = usize::try_from(month).ok()?.checked_sub(1)?;
    MONTH_NAMES.get(index).copied()
}

/// Parses a month given as a number ("3", "03"), a full English name
/// ("March") or a three-letter abbreviation ("mar"). Case-insensitive.
pub fn parse_month(input: &str) -> Option<u32> {
    let input = input.trim();
    if input.chars().all(|c| c.is_ascii_digit()) && !input.is_empty() {
        let month: u32 = input.parse().ok()?;
        return (1..=12).contains(&month).then_some(month);
    }

    let lower = input.to_lowercase();
    if lower.len() < 3 {
        return None;
    }
    MONTH_NAMES
        .iter()
        .position(|name| {
            let name = name.to_lowercase();
            name == lower || (lower.len() == 3 && name.starts_with(&lower))
        })
        .map(|index| index as u32 + 1)
}

/// Parses a billing period from "YYYY-MM", "MM/YYYY" or "<month> YYYY"
/// (e.g. "March 2024", "mar 2024").
pub fn parse_period(input: &str) -> Option<BillingPeriod> {
    let input = input.trim();

    if let Some((year, month)) = input.split_once('-') {
        if year.len() == 4 {
            return BillingPeriod::new(parse_month(month)?, year.parse().ok()?);
        }
    }

    if let Some((month, year)) = input.split_once('/') {
        return BillingPeriod::new(parse_month(month)?, year.trim().parse().ok()?);
    }

    let mut parts = input.split_whitespace();
    let month = parts.next()?;
    let year = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    BillingPeriod::new(parse_month(month)?, year.parse().ok()?)
}

/// Encodes a record key as a file name stem. Only ASCII alphanumerics and
/// `-_.~` pass through; everything else, `%` and path separators included,
/// is percent-encoded. The mapping is one-to-one, so distinct keys never
/// share a file, and no key can name a path outside the storage directory.
pub fn encode_key(key: &str) -> String {
    urlencoding::encode(key).into_owned()
}

/// Reverses [`encode_key`]. Returns `None` for stems that are not valid
/// UTF-8 once decoded.
pub fn decode_key(stem: &str) -> Option<String> {
    urlencoding::decode(stem).ok().map(|key| key.into_owned())
}
