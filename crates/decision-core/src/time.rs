//! Relative time expressions such as `24 hours` or `1 day 2h`.
//!
//! Task deadlines in the catalog are written relative to the moment the graph
//! is built. The grammar follows the queue's own client libraries: an optional
//! sign followed by any of years, months, weeks, days, hours, minutes and
//! seconds, in that order. A year counts as 365 days and a month as 30.

use crate::{Error, Result};
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use regex::Regex;
use std::sync::LazyLock;

static EXPR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)^
        (?:\s*(?P<sign>[-+]))?
        (?:\s*(?P<years>\d+)\s*(?:years|year|yr|y))?
        (?:\s*(?P<months>\d+)\s*(?:months|month|mo))?
        (?:\s*(?P<weeks>\d+)\s*(?:weeks|week|wk|w))?
        (?:\s*(?P<days>\d+)\s*(?:days|day|d))?
        (?:\s*(?P<hours>\d+)\s*(?:hours|hour|hr|h))?
        (?:\s*(?P<minutes>\d+)\s*(?:minutes|minute|min|m))?
        (?:\s*(?P<seconds>\d+)\s*(?:seconds|second|sec|s))?
        \s*$",
    )
    .expect("relative time regex is valid")
});

/// Parse a relative time expression into a signed duration.
pub fn parse_relative(expr: &str) -> Result<TimeDelta> {
    let caps = EXPR
        .captures(expr)
        .ok_or_else(|| Error::Serialization(format!("invalid time expression: {:?}", expr)))?;

    let field = |name: &str| -> Result<i64> {
        caps.name(name)
            .map(|m| m.as_str().parse::<i64>())
            .transpose()
            .map(|v| v.unwrap_or(0))
            .map_err(|e| Error::Serialization(format!("invalid time expression {:?}: {}", expr, e)))
    };

    let out_of_range = || Error::Serialization(format!("time expression out of range: {:?}", expr));

    let units = [
        ("years", 365 * 86_400),
        ("months", 30 * 86_400),
        ("weeks", 7 * 86_400),
        ("days", 86_400),
        ("hours", 3_600),
        ("minutes", 60),
        ("seconds", 1),
    ];
    let mut seconds: i64 = 0;
    for (name, scale) in units {
        seconds = field(name)?
            .checked_mul(scale)
            .and_then(|part| seconds.checked_add(part))
            .ok_or_else(out_of_range)?;
    }

    let delta = TimeDelta::try_seconds(seconds).ok_or_else(out_of_range)?;

    match caps.name("sign").map(|m| m.as_str()) {
        Some("-") => Ok(-delta),
        _ => Ok(delta),
    }
}

/// Resolve a relative expression against `now`.
pub fn from_now(expr: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let delta = parse_relative(expr)?;
    now.checked_add_signed(delta)
        .ok_or_else(|| Error::Serialization(format!("time expression out of range: {:?}", expr)))
}

/// Format a timestamp the way the queue expects it.
pub fn to_json_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
