//! Decoding of `startedat` markers and whole-hour age arithmetic.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::domain::errors::MarkerParseError;

/// The single format a `startedat` marker is written in (UTC, second
/// precision, literal `Z`)
pub const STARTED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

// `d` stands for any ASCII digit.
const STARTED_AT_SHAPE: &[u8; 20] = b"dddd-dd-ddTdd:dd:ddZ";

/// Parse the full content of a marker object.
///
/// The content must be exactly one timestamp: no surrounding whitespace,
/// no fractional seconds, no offset other than `Z`.
pub fn parse_started_at(bytes: &[u8]) -> Result<DateTime<Utc>, MarkerParseError> {
    let text = std::str::from_utf8(bytes).map_err(|_| MarkerParseError::NotUtf8)?;

    if !has_started_at_shape(text.as_bytes()) {
        return Err(MarkerParseError::UnexpectedShape {
            value: text.to_string(),
        });
    }

    NaiveDateTime::parse_from_str(text, STARTED_AT_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|source| MarkerParseError::InvalidTimestamp {
            value: text.to_string(),
            source,
        })
}

/// Render a timestamp the way the registry writes it into a marker
pub fn format_started_at(at: DateTime<Utc>) -> String {
    at.format(STARTED_AT_FORMAT).to_string()
}

/// Whole hours between `since` and `now`, truncated toward zero.
/// Negative when `since` lies in the future.
pub fn elapsed_hours(since: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - since).num_hours()
}

fn has_started_at_shape(bytes: &[u8]) -> bool {
    bytes.len() == STARTED_AT_SHAPE.len()
        && bytes
            .iter()
            .zip(STARTED_AT_SHAPE.iter())
            .all(|(byte, expected)| match expected {
                b'd' => byte.is_ascii_digit(),
                literal => byte == literal,
            })
}
