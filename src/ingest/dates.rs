//! Date-column detection and normalization.
//!
//! A column is tried against each `DateEncoding` in precedence order. The
//! first encoding under which enough entries parse wins; the others are not
//! consulted, so a column of ISO text is never reinterpreted as epochs or
//! spreadsheet serials.
//!
//! Numeric encodings are only accepted inside a plausibility window. Without
//! it, any small integer would "parse" as a 1970 epoch second and spreadsheet
//! serials would never be reached.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};

use crate::domain::{Cell, month_end, parse_number};

/// Minimum share of entries that must parse for an encoding to be accepted.
pub const MIN_PARSE_SHARE: f64 = 0.25;
/// Minimum absolute number of parsed entries (capped by column length).
pub const MIN_PARSE_COUNT: usize = 5;

/// Spreadsheet serial-day origin.
const SERIAL_ORIGIN: (i32, u32, u32) = (1899, 12, 30);
/// Serial range accepted as dates (1954-10-03 .. 2064-04-08).
const SERIAL_MIN: f64 = 20_000.0;
const SERIAL_MAX: f64 = 60_000.0;

/// How a column encodes its dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateEncoding {
    IsoText,
    UnixSeconds,
    UnixMillis,
    UnixNanos,
    SpreadsheetSerial,
}

impl DateEncoding {
    /// Order in which encodings are tried.
    pub const PRECEDENCE: [DateEncoding; 5] = [
        DateEncoding::IsoText,
        DateEncoding::UnixSeconds,
        DateEncoding::UnixMillis,
        DateEncoding::UnixNanos,
        DateEncoding::SpreadsheetSerial,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DateEncoding::IsoText => "text",
            DateEncoding::UnixSeconds => "unix seconds",
            DateEncoding::UnixMillis => "unix milliseconds",
            DateEncoding::UnixNanos => "unix nanoseconds",
            DateEncoding::SpreadsheetSerial => "spreadsheet serial",
        }
    }

    /// Interpret one cell under this encoding.
    pub fn parse_cell(self, cell: &Cell) -> Option<NaiveDateTime> {
        match self {
            DateEncoding::IsoText => match cell {
                Cell::Text(s) => parse_text_date(s),
                _ => None,
            },
            DateEncoding::UnixSeconds => from_unix(cell.as_number()?, 1.0),
            DateEncoding::UnixMillis => from_unix(cell.as_number()?, 1e3),
            DateEncoding::UnixNanos => from_unix(cell.as_number()?, 1e9),
            DateEncoding::SpreadsheetSerial => from_serial(cell.as_number()?),
        }
    }
}

/// A column successfully classified as dates.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDates {
    pub encoding: DateEncoding,
    /// One entry per input cell; `None` where the cell did not parse.
    pub values: Vec<Option<NaiveDateTime>>,
}

impl ParsedDates {
    pub fn parsed_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn parsed_fraction(&self) -> f64 {
        if self.values.is_empty() {
            0.0
        } else {
            self.parsed_count() as f64 / self.values.len() as f64
        }
    }

    /// Parsed values mapped to the end of their month.
    pub fn month_ends(&self) -> Vec<Option<NaiveDate>> {
        self.values
            .iter()
            .map(|v| v.map(|dt| month_end(dt.date())))
            .collect()
    }
}

/// Number of parsed entries an encoding needs for a column of length `n`.
///
/// `max(5, floor(n / 4))`, then capped at `n`: a column shorter than five
/// entries qualifies only when every entry parses. Never less than 1, so an
/// empty column never qualifies.
pub fn required_matches(n: usize) -> usize {
    let share = (n as f64 * MIN_PARSE_SHARE).floor() as usize;
    share.max(MIN_PARSE_COUNT).min(n).max(1)
}

/// Classify a column as dates, or `None` if no encoding qualifies.
pub fn parse_date_column(cells: &[Cell]) -> Option<ParsedDates> {
    let required = required_matches(cells.len());
    DateEncoding::PRECEDENCE.into_iter().find_map(|encoding| {
        let values: Vec<Option<NaiveDateTime>> =
            cells.iter().map(|c| encoding.parse_cell(c)).collect();
        let parsed = values.iter().filter(|v| v.is_some()).count();
        (parsed >= required).then_some(ParsedDates { encoding, values })
    })
}

const DATETIME_FORMATS: [&str; 8] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: [&str; 10] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

/// Month-only spellings, parsed against the first of the month.
const MONTH_FORMATS: [&str; 5] = ["%Y-%m", "%Y/%m", "%b %Y", "%B %Y", "%b-%Y"];

/// Parse free-form date text.
///
/// Purely numeric strings are rejected here; they belong to the epoch and
/// serial encodings.
pub fn parse_text_date(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() || parse_number(s).is_some() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    for fmt in MONTH_FORMATS {
        let with_day = format!("{s} 01");
        let fmt_with_day = format!("{fmt} %d");
        if let Ok(d) = NaiveDate::parse_from_str(&with_day, &fmt_with_day) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

fn epoch_window() -> (NaiveDateTime, NaiveDateTime) {
    let lo = NaiveDate::from_ymd_opt(1971, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0));
    let hi = NaiveDate::from_ymd_opt(2262, 4, 11).and_then(|d| d.and_hms_opt(23, 59, 59));
    (
        lo.unwrap_or(NaiveDateTime::MIN),
        hi.unwrap_or(NaiveDateTime::MAX),
    )
}

/// `value` counted in units of `1 / per_second` seconds since 1970-01-01.
fn from_unix(value: f64, per_second: f64) -> Option<NaiveDateTime> {
    if !value.is_finite() {
        return None;
    }
    let seconds = value / per_second;
    if seconds.abs() > 1e13 {
        return None;
    }
    let whole = seconds.floor();
    let nanos = (((seconds - whole) * 1e9).round() as u32).min(999_999_999);
    let dt = DateTime::from_timestamp(whole as i64, nanos)?.naive_utc();

    let (lo, hi) = epoch_window();
    (lo..=hi).contains(&dt).then_some(dt)
}

/// Spreadsheet serial day (fraction = time of day) since 1899-12-30.
fn from_serial(value: f64) -> Option<NaiveDateTime> {
    if !(SERIAL_MIN..=SERIAL_MAX).contains(&value) {
        return None;
    }
    let (y, m, d) = SERIAL_ORIGIN;
    let origin = NaiveDate::from_ymd_opt(y, m, d)?.and_hms_opt(0, 0, 0)?;
    let days = value.floor();
    let seconds = ((value - days) * 86_400.0).round() as i64;
    origin.checked_add_signed(Duration::days(days as i64) + Duration::seconds(seconds))
}
