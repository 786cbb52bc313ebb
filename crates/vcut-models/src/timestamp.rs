//! Timestamp parsing.
//!
//! Accepted forms are `HH:MM:SS[.fff]`, `MM:SS[.fff]` and bare seconds.
//! [`parse_timestamp`] is strict and reports what went wrong.
//! [`timestamp_to_seconds`] is the lenient form the cut validator uses:
//! anything unparseable becomes `0.0`, while negative values are passed
//! through so the validator can reject them.

use thiserror::Error;

/// Timestamp parsing error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimestampError {
    #[error("Timestamp cannot be empty")]
    Empty,

    #[error("Timestamp cannot be negative")]
    Negative,

    #[error("Invalid {0} value: {1}")]
    InvalidValue(&'static str, String),

    #[error("Invalid timestamp format '{0}'. Use HH:MM:SS, MM:SS or seconds")]
    InvalidFormat(String),
}

fn parse_component(name: &'static str, raw: &str) -> Result<f64, TimestampError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| TimestampError::InvalidValue(name, raw.to_string()))?;
    if !value.is_finite() {
        return Err(TimestampError::InvalidValue(name, raw.to_string()));
    }
    Ok(value)
}

/// Sum the components of `ts` without a sign check.
fn signed_seconds(ts: &str) -> Result<f64, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let parts: Vec<&str> = ts.split(':').collect();
    match parts.as_slice() {
        [secs] => parse_component("seconds", secs),
        [mins, secs] => {
            Ok(parse_component("minutes", mins)? * 60.0 + parse_component("seconds", secs)?)
        }
        [hours, mins, secs] => Ok(parse_component("hours", hours)? * 3600.0
            + parse_component("minutes", mins)? * 60.0
            + parse_component("seconds", secs)?),
        _ => Err(TimestampError::InvalidFormat(ts.to_string())),
    }
}

/// Parse a timestamp string to total seconds.
///
/// # Examples
/// ```
/// use vcut_models::timestamp::parse_timestamp;
/// assert_eq!(parse_timestamp("01:30:00").unwrap(), 5400.0);
/// assert_eq!(parse_timestamp("05:30").unwrap(), 330.0);
/// assert_eq!(parse_timestamp("90").unwrap(), 90.0);
/// ```
pub fn parse_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let ts = ts.trim();
    if ts.split(':').any(|part| part.trim().starts_with('-')) {
        return Err(TimestampError::Negative);
    }
    signed_seconds(ts)
}

/// Lenient timestamp conversion. Any parse failure yields `0.0`; a
/// negative component is kept, so `"-5"` is `-5.0`.
pub fn timestamp_to_seconds(ts: &str) -> f64 {
    signed_seconds(ts).unwrap_or(0.0)
}
