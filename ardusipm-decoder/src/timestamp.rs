//! Frame timestamp handling
//!
//! The acquisition program prefixes each serial line with the local time as
//! `YYMMDDHHMMSS.ffffff`. Tables store it as that number (the `UNIXTIME`
//! column); durations are computed by reading it back as a calendar time.

use chrono::{Duration, NaiveDateTime};

/// Pattern of the time prefix written after the `u` marker
pub const FRAME_TIME_FORMAT: &str = "%y%m%d%H%M%S%.6f";

/// Whole-second part of [`FRAME_TIME_FORMAT`]
const WHOLE_SECONDS_FORMAT: &str = "%y%m%d%H%M%S";

/// Characters in a complete time prefix
pub const FRAME_TIME_WIDTH: usize = 19;

/// Read the timestamp region of a frame as a number
///
/// Returns `None` for an empty region or text that is not a finite,
/// non-negative number.
pub fn parse_frame_time(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
}

/// Interpret a stored timestamp as a calendar time
///
/// Sub-microsecond precision is lost: the stored value carries 18 significant
/// digits, more than an `f64` holds.
pub fn to_datetime(stamp: f64) -> Option<NaiveDateTime> {
    if !stamp.is_finite() || stamp < 1.0 {
        return None;
    }
    let whole = stamp.trunc();
    if whole >= 1e12 {
        return None;
    }
    let micros = ((stamp - whole) * 1_000_000.0).round() as i64;
    let digits = format!("{:012}", whole as u64);
    let base = NaiveDateTime::parse_from_str(&digits, WHOLE_SECONDS_FORMAT).ok()?;
    Some(base + Duration::microseconds(micros))
}

/// Render a calendar time as the frame prefix text
pub fn format_frame_time(time: &NaiveDateTime) -> String {
    time.format(FRAME_TIME_FORMAT).to_string()
}

/// Convert a calendar time to the stored numeric form
pub fn from_datetime(time: &NaiveDateTime) -> f64 {
    format_frame_time(time).parse().unwrap_or(0.0)
}
