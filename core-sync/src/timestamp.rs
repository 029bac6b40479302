//! # Timestamp Normalizer
//!
//! Turns client-asserted clipboard times into UTC instants.
//!
//! ## Overview
//!
//! Clients on different platforms serialize times differently: Dart emits
//! naive microsecond strings, browsers emit RFC 3339 with milliseconds and a
//! `Z`, shell scripts send epoch seconds. [`normalize`] walks a fixed,
//! ordered list of patterns and takes the first one that parses. Values
//! without an offset are read as UTC.
//!
//! An absent or blank value means "no timestamp supplied"; the caller
//! substitutes the server clock.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// A non-empty timestamp that matched none of the known patterns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot parse timestamp '{input}': tried {attempted} formats, last error: {last_error}")]
pub struct UnparseableTimestamp {
    pub input: String,
    pub attempted: usize,
    pub last_error: String,
}

#[derive(Debug, Clone, Copy)]
enum Pattern {
    /// No offset in the input; interpreted as UTC
    Naive(&'static str),
    /// Offset carried by the input
    Zoned(&'static str),
    Rfc3339,
    /// Epoch seconds, optionally followed by exactly this many fraction digits
    Epoch(Option<usize>),
    DateOnly(&'static str),
}

/// Patterns in the order they are attempted.
const PATTERNS: &[Pattern] = &[
    // Fractional naive forms, most common from mobile clients
    Pattern::Naive("%Y-%m-%dT%H:%M:%S%.6f"),
    Pattern::Naive("%Y-%m-%dT%H:%M:%S%.3f"),
    Pattern::Naive("%Y-%m-%dT%H:%M:%S%.6fZ"),
    Pattern::Naive("%Y-%m-%dT%H:%M:%S%.3fZ"),
    Pattern::Naive("%Y-%m-%dT%H:%M:%S%.9f"),
    Pattern::Naive("%Y-%m-%dT%H:%M:%S%.9fZ"),
    // Standard ISO 8601
    Pattern::Rfc3339,
    Pattern::Naive("%Y-%m-%dT%H:%M:%SZ"),
    Pattern::Naive("%Y-%m-%dT%H:%M:%S"),
    Pattern::Naive("%Y%m%dT%H%M%SZ"),
    // Explicit offsets
    Pattern::Zoned("%Y-%m-%dT%H:%M:%S%.6f%:z"),
    Pattern::Zoned("%Y-%m-%dT%H:%M:%S%.3f%:z"),
    Pattern::Zoned("%Y-%m-%dT%H:%M:%S%:z"),
    Pattern::Zoned("%Y-%m-%dT%H:%M:%S%.6f%z"),
    Pattern::Zoned("%Y-%m-%dT%H:%M:%S%.3f%z"),
    Pattern::Zoned("%Y-%m-%dT%H:%M:%S%z"),
    // Space and slash delimited
    Pattern::Naive("%Y-%m-%d %H:%M:%S%.6f"),
    Pattern::Naive("%Y-%m-%d %H:%M:%S%.3f"),
    Pattern::Naive("%Y-%m-%d %H:%M:%S"),
    Pattern::Naive("%Y/%m/%d %H:%M:%S%.6f"),
    Pattern::Naive("%Y/%m/%d %H:%M:%S%.3f"),
    Pattern::Naive("%Y/%m/%d %H:%M:%S"),
    // Unix epoch
    Pattern::Epoch(Some(6)),
    Pattern::Epoch(Some(3)),
    Pattern::Epoch(None),
    Pattern::DateOnly("%Y-%m-%d"),
];

/// Number of patterns [`normalize`] tries before giving up.
pub fn pattern_count() -> usize {
    PATTERNS.len()
}

/// Parse a client-supplied timestamp.
///
/// Returns `Ok(None)` for an absent or blank value.
///
/// ```
/// use core_sync::timestamp::normalize;
///
/// let a = normalize(Some("2024-01-01T12:00:00.000000Z")).unwrap().unwrap();
/// let b = normalize(Some("1704110400")).unwrap().unwrap();
/// assert_eq!(a, b);
/// assert!(normalize(None).unwrap().is_none());
/// ```
pub fn normalize(input: Option<&str>) -> Result<Option<DateTime<Utc>>, UnparseableTimestamp> {
    let raw = match input.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(raw) => raw,
    };

    let mut last_error = String::new();
    for pattern in PATTERNS {
        match attempt(*pattern, raw) {
            Ok(instant) => return Ok(Some(instant)),
            Err(err) => last_error = err,
        }
    }

    Err(UnparseableTimestamp {
        input: raw.to_string(),
        attempted: PATTERNS.len(),
        last_error,
    })
}

/// Canonical output form: RFC 3339, microsecond precision, `Z` suffix.
pub fn format(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Serde helper for raw timestamp fields: accepts a string, an epoch number or
/// null, and defers parsing to [`normalize`].
pub fn deserialize_raw<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        None => None,
        Some(Raw::Text(s)) => Some(s),
        Some(Raw::Integer(n)) => Some(n.to_string()),
        Some(Raw::Float(f)) => Some(format!("{:.6}", f)),
    })
}

fn attempt(pattern: Pattern, raw: &str) -> Result<DateTime<Utc>, String> {
    match pattern {
        Pattern::Naive(fmt) => NaiveDateTime::parse_from_str(raw, fmt)
            .map(|naive| naive.and_utc())
            .map_err(|e| e.to_string()),
        Pattern::Zoned(fmt) => DateTime::parse_from_str(raw, fmt)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| e.to_string()),
        Pattern::Rfc3339 => DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| e.to_string()),
        Pattern::Epoch(fraction_digits) => parse_epoch(raw, fraction_digits),
        Pattern::DateOnly(fmt) => NaiveDate::parse_from_str(raw, fmt)
            .map_err(|e| e.to_string())
            .and_then(|date| {
                date.and_hms_opt(0, 0, 0)
                    .map(|naive| naive.and_utc())
                    .ok_or_else(|| "invalid midnight".to_string())
            }),
    }
}

fn parse_epoch(raw: &str, fraction_digits: Option<usize>) -> Result<DateTime<Utc>, String> {
    let (whole, fraction) = match (raw.split_once('.'), fraction_digits) {
        (Some((whole, fraction)), Some(digits)) if fraction.len() == digits => (whole, fraction),
        (None, None) => (raw, ""),
        _ => return Err("epoch shape mismatch".to_string()),
    };

    let digits = whole.strip_prefix('-').unwrap_or(whole);
    if digits.is_empty()
        || !digits.bytes().all(|b| b.is_ascii_digit())
        || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err("not an epoch number".to_string());
    }

    let secs: i64 = whole.parse().map_err(|e: std::num::ParseIntError| e.to_string())?;
    let nanos: u32 = if fraction.is_empty() {
        0
    } else {
        let scale = 10u32.pow(9 - fraction.len() as u32);
        fraction
            .parse::<u32>()
            .map_err(|e| e.to_string())?
            * scale
    };

    DateTime::from_timestamp(secs, nanos).ok_or_else(|| "epoch out of range".to_string())
}
