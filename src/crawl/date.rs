use std::sync::OnceLock;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognised date: {0:?}")]
pub struct DateParseError(pub String);

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

// Tried on the normalized label. %p takes AM/PM in either case.
const CLOCK_FORMATS: &[&str] = &[
    "%B %d %Y %I:%M %p",
    "%d %B %Y %I:%M %p",
    "%Y-%m-%d %I:%M %p",
    "%m/%d/%Y %I:%M %p",
    "%B %d %Y %H:%M",
    "%d %B %Y %H:%M",
];

// chrono's %B also accepts abbreviated month names. Month-first slashes win
// over day-first ones; the latter only apply when the first field exceeds 12.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d %B %Y",
    "%B %d %Y",
    "%Y %B %d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%d-%B-%Y",
];

/// Parse the publication date from a listing tile's date label.
///
/// Only the last line of the label is the date; the rest is decoration.
pub fn parse_publication_date(raw: &str) -> Result<DateTime<Utc>, DateParseError> {
    let line = raw.rsplit('\n').next().unwrap_or(raw);
    parse_date(line)
}

/// Parse a single date label. Years must have four digits; a bare month and
/// year takes its day from today.
pub fn parse_date(input: &str) -> Result<DateTime<Utc>, DateParseError> {
    parse_date_on(input, Utc::now().date_naive())
}

fn parse_date_on(input: &str, today: NaiveDate) -> Result<DateTime<Utc>, DateParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DateParseError(input.to_string()));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            if full_year(dt.date()) {
                return Ok(dt.and_utc());
            }
        }
    }

    let cleaned = normalize(trimmed);
    for fmt in CLOCK_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&cleaned, fmt) {
            if full_year(dt.date()) {
                return Ok(dt.and_utc());
            }
        }
    }
    if let Some(d) = month_and_year(&cleaned, today) {
        return Ok(midnight(d));
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(&cleaned, fmt) {
            if full_year(d) {
                return Ok(midnight(d));
            }
        }
    }
    Err(DateParseError(input.to_string()))
}

// chrono's %Y reads "24" as year 24, and "%d %Y" splits "2024" into 20 and 24.
fn full_year(d: NaiveDate) -> bool {
    d.year() >= 1000
}

fn midnight(d: NaiveDate) -> DateTime<Utc> {
    d.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()
}

/// "March 2024" → 2024-03-<today's day>, clamped to the month's last day.
fn month_and_year(cleaned: &str, today: NaiveDate) -> Option<NaiveDate> {
    static MONTH_YEAR: OnceLock<Regex> = OnceLock::new();
    let month_year = MONTH_YEAR.get_or_init(|| Regex::new(r"^([A-Za-z]{3,}) (\d{4})$").unwrap());

    let caps = month_year.captures(cleaned)?;
    let first = NaiveDate::parse_from_str(&format!("1 {} {}", &caps[1], &caps[2]), "%d %B %Y").ok()?;
    (1..=today.day())
        .rev()
        .find_map(|day| NaiveDate::from_ymd_opt(first.year(), first.month(), day))
}

/// Drop a leading weekday, ordinal suffixes, commas and abbreviation dots;
/// spell "Sept" the way chrono reads it; collapse whitespace.
fn normalize(s: &str) -> String {
    static WEEKDAY: OnceLock<Regex> = OnceLock::new();
    static ORDINAL: OnceLock<Regex> = OnceLock::new();
    static ABBREV_DOT: OnceLock<Regex> = OnceLock::new();
    static SEPT: OnceLock<Regex> = OnceLock::new();
    let weekday = WEEKDAY
        .get_or_init(|| Regex::new(r"(?i)^(mon|tue|wed|thu|fri|sat|sun)[a-z]*\.?,?\s+").unwrap());
    let ordinal = ORDINAL.get_or_init(|| Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b").unwrap());
    let abbrev_dot = ABBREV_DOT.get_or_init(|| Regex::new(r"([A-Za-z]{3,})\.").unwrap());
    let sept = SEPT.get_or_init(|| Regex::new(r"(?i)\bsept\b").unwrap());

    let s = weekday.replace(s, "");
    let s = ordinal.replace_all(&s, "$1");
    let s = abbrev_dot.replace_all(&s, "$1");
    let s = sept.replace_all(&s, "Sep");
    s.replace(',', " ").split_whitespace().collect::<Vec<_>>().join(" ")
}
