//! Fixed UTC offsets parsed from `+HH:MM` / `-HH:MM` strings.

use crate::error::{Error, Result};
use chrono::FixedOffset;
use regex::Regex;
use std::sync::OnceLock;

fn offset_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([+\-])([0-9]{1,2}):([0-9]{1,2})$").expect("static timezone regex")
    })
}

/// Parse a UTC offset such as `"+08:00"` or `"-5:30"`
///
/// # Errors
///
/// Returns `Error::InvalidTimezone` for anything that is not `[+-]H{1,2}:M{1,2}`
/// or lies outside the representable range.
pub fn parse_utc_offset(s: &str) -> Result<FixedOffset> {
    let normalized = s.trim().to_uppercase();
    let bad = || Error::InvalidTimezone(s.to_string());

    let caps = offset_regex().captures(&normalized).ok_or_else(bad)?;
    let hours: i32 = caps[2].parse().map_err(|_| bad())?;
    let minutes: i32 = caps[3].parse().map_err(|_| bad())?;
    let mut seconds = hours * 3600 + minutes * 60;
    if &caps[1] == "-" {
        seconds = -seconds;
    }
    FixedOffset::east_opt(seconds).ok_or_else(bad)
}

/// The `+00:00` offset
#[must_use]
pub fn utc_zero() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap_or_else(|| unreachable!("zero offset is always valid"))
}
