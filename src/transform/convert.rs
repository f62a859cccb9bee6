//! Lenient scalar conversions shared by every entity mapper.
//!
//! The source sends numbers either as JSON numbers or as numeric strings and
//! leaves unset fields empty, null or absent. Every helper here collapses the
//! "unset" spellings to `None` and turns anything else that does not parse
//! into a [`ValidationError`] naming the field.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::warn;

use crate::error::ValidationError;

/// Minor units per major unit is fixed at 100 (two decimal places).
const MONEY_SCALE: u32 = 2;

/// Largest magnitude a `DECIMAL(14,2)` column holds, in minor units.
pub const MAX_MINOR_UNITS: i64 = 99_999_999_999_999;

/// Widths of the bounded text columns.
pub const CODE_LEN: usize = 32;
pub const ID_LEN: usize = 64;
pub const WIDE_ID_LEN: usize = 128;
pub const NICKNAME_LEN: usize = 255;
pub const NAME_LEN: usize = 512;

/// Spellings the source uses for "no timestamp".
const SENTINEL_TIMESTAMPS: &[&str] = &[
    "",
    "0000-00-00",
    "0000-00-00 00:00:00",
    "-0001-11-30 00:00:00",
    "1970-01-01 00:00:00",
    "1970-01-01 08:00:00",
];

/// Accepted wall-clock formats, tried in order. Read in the source offset.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
];

/// Accepted formats that carry their own offset, tried after RFC 3339.
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%z"];

/// Exact conversion of an integer minor-unit amount (cents) to a decimal.
pub fn minor_units_to_decimal(minor: i64) -> Decimal {
    Decimal::new(minor, MONEY_SCALE)
}

/// Inverse of [`minor_units_to_decimal`]; `None` when `value` has sub-cent
/// precision or does not fit.
pub fn decimal_to_minor_units(value: Decimal) -> Option<i64> {
    if value.round_dp(MONEY_SCALE) != value {
        return None;
    }
    let mut scaled = value;
    scaled.rescale(MONEY_SCALE);
    i64::try_from(scaled.mantissa()).ok()
}

fn is_unset(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Non-empty string, or a number rendered as text.
pub fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Identifier that must fit its column; a longer one rejects the record.
pub fn bounded(
    field: &'static str,
    value: Option<String>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match value {
        Some(s) if s.chars().count() > max => Err(ValidationError::TooLong {
            field,
            max,
            len: s.chars().count(),
        }),
        other => Ok(other),
    }
}

/// Descriptive text cut to its column width.
pub fn clipped(field: &'static str, value: Option<String>, max: usize) -> Option<String> {
    value.map(|s| {
        let len = s.chars().count();
        if len <= max {
            return s;
        }
        warn!(field, len, max, "truncating text to column width");
        s.chars().take(max).collect()
    })
}

/// Integral `f64` that converts to `i64` without saturating.
fn exact_i64(f: f64) -> Option<i64> {
    // i64::MIN and i64::MAX + 1 are both exact powers of two as f64.
    (f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64).then_some(f as i64)
}

/// Like [`text`], but nested objects and arrays are kept as compact JSON.
pub fn text_or_json(value: Option<&Value>) -> Option<String> {
    match value? {
        v @ (Value::Object(_) | Value::Array(_)) => Some(v.to_string()),
        _ => text(value),
    }
}

pub fn integer(field: &'static str, value: Option<&Value>) -> Result<Option<i64>, ValidationError> {
    if is_unset(value) {
        return Ok(None);
    }
    let Some(raw) = value else { return Ok(None) };
    let invalid = || ValidationError::InvalidNumber {
        field,
        value: display(raw),
    };
    match raw {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(exact_i64))
            .map(Some)
            .ok_or_else(invalid),
        Value::String(s) => s.trim().parse::<i64>().map(Some).map_err(|_| invalid()),
        Value::Bool(b) => Ok(Some(i64::from(*b))),
        _ => Err(invalid()),
    }
}

pub fn int32(field: &'static str, value: Option<&Value>) -> Result<Option<i32>, ValidationError> {
    match integer(field, value)? {
        None => Ok(None),
        Some(n) => i32::try_from(n).map(Some).map_err(|_| ValidationError::InvalidNumber {
            field,
            value: n.to_string(),
        }),
    }
}

/// `1`/`true` is set, anything else (including absence) is not.
pub fn flag(field: &'static str, value: Option<&Value>) -> Result<bool, ValidationError> {
    Ok(integer(field, value)? == Some(1))
}

/// A minor-unit amount as an exact two-place decimal.
pub fn money(field: &'static str, value: Option<&Value>) -> Result<Option<Decimal>, ValidationError> {
    if is_unset(value) {
        return Ok(None);
    }
    let Some(raw) = value else { return Ok(None) };
    let invalid = || ValidationError::InvalidAmount {
        field,
        value: display(raw),
    };

    let minor = match raw {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(exact_i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<Decimal>()
                    .ok()
                    .filter(|d| d.fract().is_zero())
                    .and_then(|d| i64::try_from(d).ok())
            })
        }
        _ => None,
    };
    minor
        .filter(|m| m.unsigned_abs() <= MAX_MINOR_UNITS.unsigned_abs())
        .map(|m| Some(minor_units_to_decimal(m)))
        .ok_or_else(invalid)
}

/// Parse a source timestamp. Sentinels and the epoch are `None`; anything
/// else that matches no accepted format is an error.
pub fn parse_timestamp(
    field: &'static str,
    raw: &str,
    offset: FixedOffset,
) -> Result<Option<DateTime<Utc>>, ValidationError> {
    let trimmed = raw.trim();
    if SENTINEL_TIMESTAMPS.contains(&trimmed) {
        return Ok(None);
    }

    let parsed = parse_with_formats(trimmed, offset).ok_or_else(|| ValidationError::InvalidTimestamp {
        field,
        value: raw.to_string(),
    })?;
    Ok((parsed.timestamp() != 0).then_some(parsed))
}

fn parse_with_formats(raw: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(at) = DateTime::parse_from_str(raw, format) {
            return Some(at.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return local_to_utc(naive, offset);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return local_to_utc(date.and_hms_opt(0, 0, 0)?, offset);
    }
    None
}

fn local_to_utc(naive: NaiveDateTime, offset: FixedOffset) -> Option<DateTime<Utc>> {
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|at| at.with_timezone(&Utc))
}

/// Timestamp field that may be a formatted string or epoch seconds.
pub fn timestamp(
    field: &'static str,
    value: Option<&Value>,
    offset: FixedOffset,
) -> Result<Option<DateTime<Utc>>, ValidationError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if !s.trim().is_empty() && s.trim().bytes().all(|b| b.is_ascii_digit()) => {
            epoch_seconds(field, s.trim())
        }
        Some(Value::String(s)) => parse_timestamp(field, s, offset),
        Some(Value::Number(n)) => epoch_seconds(field, &n.to_string()),
        Some(other) => Err(ValidationError::InvalidTimestamp {
            field,
            value: other.to_string(),
        }),
    }
}

fn epoch_seconds(field: &'static str, raw: &str) -> Result<Option<DateTime<Utc>>, ValidationError> {
    let invalid = || ValidationError::InvalidTimestamp {
        field,
        value: raw.to_string(),
    };
    let secs: i64 = raw.parse().map_err(|_| invalid())?;
    if secs == 0 {
        return Ok(None);
    }
    DateTime::from_timestamp(secs, 0).map(Some).ok_or_else(invalid)
}
