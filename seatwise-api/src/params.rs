use chrono::{DateTime, NaiveDate, NaiveDateTime};
use seatwise_core::ClassType;
use serde_json::Value;

pub const MIN_TRAVELLERS: i64 = 1;
pub const MAX_TRAVELLERS: i64 = 9;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y"];

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// Unknown or missing class names fall back to economy.
pub fn class_or_default(input: Option<&str>) -> ClassType {
    input.and_then(ClassType::parse).unwrap_or(ClassType::Economy)
}

/// Leading integer of `input`, `0` when there is none (`"3 adults"` -> 3).
/// Digit runs too long for an `i64` saturate.
pub fn leading_integer(input: &str) -> i64 {
    let trimmed = input.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    let digits = &digits[..end];
    if digits.is_empty() {
        return 0;
    }

    let magnitude = digits.parse::<i64>().unwrap_or(i64::MAX);
    if negative {
        -magnitude
    } else {
        magnitude
    }
}

/// Traveller count from a query or JSON value; anything below one becomes one.
pub fn travellers_count(value: Option<&Value>) -> i64 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0),
        Some(Value::String(s)) => leading_integer(s),
        _ => 0,
    };
    raw.max(MIN_TRAVELLERS)
}

pub fn travellers_from_query(value: Option<&str>) -> i64 {
    value.map_or(0, leading_integer).max(MIN_TRAVELLERS)
}

pub fn travellers_in_range(count: i64) -> bool {
    (MIN_TRAVELLERS..=MAX_TRAVELLERS).contains(&count)
}

pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(input, format).ok())
}

/// Local departure date and time. An explicit offset is dropped, keeping
/// the wall-clock time as written.
pub fn parse_datetime(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
        return Some(parsed.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
}

/// String view of a JSON field; numbers and booleans are not strings here.
pub fn json_str<'a>(object: &'a Value, field: &str) -> Option<&'a str> {
    object.get(field).and_then(Value::as_str)
}
