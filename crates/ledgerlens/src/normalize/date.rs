//! Calendar date normalization for spreadsheet date conventions.

use chrono::{Datelike, Days, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::schema::RawValue;

/// Largest Excel serial (9999-12-31).
pub const EXCEL_SERIAL_MAX: i64 = 2_958_465;

/// Day zero of the 1900 date system. Starting on Dec 30 absorbs Excel's
/// phantom 1900-02-29 for every serial from 61 on.
static EXCEL_EPOCH: Lazy<NaiveDate> =
    Lazy::new(|| NaiveDate::from_ymd_opt(1899, 12, 30).unwrap());

static SLASH_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").unwrap());
static ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").unwrap());
static DAY_MON_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})-([A-Za-z]{3})-(\d{4})$").unwrap());
static MONTH_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Za-z]+)[ -](\d{4})$").unwrap());
static QUARTER_SHORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^Q([1-4])\s*[-\s]?\s*(\d{2}|\d{4})$").unwrap());
static QUARTER_LONG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^Quarter ([1-4]) (\d{4})$").unwrap());

const MONTHS: [(&str, &str); 12] = [
    ("jan", "january"),
    ("feb", "february"),
    ("mar", "march"),
    ("apr", "april"),
    ("may", "may"),
    ("jun", "june"),
    ("jul", "july"),
    ("aug", "august"),
    ("sep", "september"),
    ("oct", "october"),
    ("nov", "november"),
    ("dec", "december"),
];

/// String date conventions, tried top-down.
const TEXT_DATE_PARSERS: &[fn(&str) -> Option<NaiveDate>] = &[
    parse_slash_date,
    parse_iso_date,
    parse_day_mon_year,
    parse_month_year,
    parse_quarter_short,
    parse_quarter_long,
];

/// Convert an Excel serial day number into a calendar date.
pub fn excel_serial_to_date(serial: i64) -> Option<NaiveDate> {
    if !(1..=EXCEL_SERIAL_MAX).contains(&serial) {
        return None;
    }
    EXCEL_EPOCH.checked_add_days(Days::new(serial as u64))
}

/// Month number for a three-letter abbreviation or full English month name.
pub fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.to_ascii_lowercase();
    MONTHS
        .iter()
        .position(|(abbr, full)| lower == *abbr || lower == *full)
        .map(|idx| idx as u32 + 1)
}

/// Parse a raw cell into a calendar date. `None` means unparseable.
pub fn parse_date(raw: &RawValue) -> Option<NaiveDate> {
    match raw {
        RawValue::Null => None,
        RawValue::Integer(serial) => excel_serial_to_date(*serial),
        RawValue::Float(_) => parse_date_str(&raw.canonical_text()?),
        RawValue::Text(s) => parse_date_str(s.trim()),
    }
}

/// Parse a trimmed string into a calendar date.
pub fn parse_date_str(value: &str) -> Option<NaiveDate> {
    if value.is_empty() {
        return None;
    }

    if value.bytes().all(|b| b.is_ascii_digit()) {
        if let Some(date) = value.parse::<i64>().ok().and_then(excel_serial_to_date) {
            return Some(date);
        }
    }

    TEXT_DATE_PARSERS.iter().find_map(|parse| parse(value))
}

/// `M/D/YYYY`, flipped to `D/M/YYYY` only when the first group cannot be a month.
fn parse_slash_date(value: &str) -> Option<NaiveDate> {
    let caps = SLASH_DATE.captures(value)?;
    let first: u32 = caps[1].parse().ok()?;
    let second: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;

    let (month, day) = if first > 12 {
        (second, first)
    } else {
        (first, second)
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let caps = ISO_DATE.captures(value)?;
    NaiveDate::from_ymd_opt(
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    )
}

fn parse_day_mon_year(value: &str) -> Option<NaiveDate> {
    let caps = DAY_MON_YEAR.captures(value)?;
    let month = month_from_name(&caps[2])?;
    NaiveDate::from_ymd_opt(caps[3].parse().ok()?, month, caps[1].parse().ok()?)
}

/// `Mar 2024` / `March 2024` resolve to the first of the month.
fn parse_month_year(value: &str) -> Option<NaiveDate> {
    let caps = MONTH_YEAR.captures(value)?;
    let month = month_from_name(&caps[1])?;
    NaiveDate::from_ymd_opt(caps[2].parse().ok()?, month, 1)
}

/// `Q1-24`, `Q4 2023`: first day of the quarter. Two-digit years pivot at 50.
fn parse_quarter_short(value: &str) -> Option<NaiveDate> {
    let caps = QUARTER_SHORT.captures(value)?;
    let quarter: u32 = caps[1].parse().ok()?;
    let digits = &caps[2];
    let mut year: i32 = digits.parse().ok()?;
    if digits.len() == 2 {
        year += if year < 50 { 2000 } else { 1900 };
    }
    quarter_start(year, quarter)
}

fn parse_quarter_long(value: &str) -> Option<NaiveDate> {
    let caps = QUARTER_LONG.captures(value)?;
    quarter_start(caps[2].parse().ok()?, caps[1].parse().ok()?)
}

fn quarter_start(year: i32, quarter: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, (quarter - 1) * 3 + 1, 1)
}

/// Year of an Excel serial, if it is in range.
pub(crate) fn excel_serial_year(serial: i64) -> Option<i32> {
    excel_serial_to_date(serial).map(|d| d.year())
}
