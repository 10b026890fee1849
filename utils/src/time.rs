//! Duration formatting and parsing helpers.

use thiserror::Error;

/// Format a duration in seconds to a human-readable string.
pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationParseError {
    #[error("empty duration")]
    Empty,
    #[error("invalid duration {0:?}: expected e.g. 30m, 2h, 1d12h")]
    Invalid(String),
    #[error("duration {0:?} is too long")]
    Overflow(String),
}

/// Parse durations like `90s`, `10m`, `2h`, `7d` or `1d12h`.
/// A bare number is read as minutes.
pub fn parse_duration(raw: &str) -> Result<u64, DurationParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(DurationParseError::Empty);
    }
    if let Ok(minutes) = raw.parse::<u64>() {
        return minutes
            .checked_mul(60)
            .ok_or_else(|| DurationParseError::Overflow(raw.to_string()));
    }

    let mut total: u64 = 0;
    let mut digits = String::new();
    for c in raw.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let unit = match c.to_ascii_lowercase() {
            's' => 1,
            'm' => 60,
            'h' => 3600,
            'd' => 86400,
            'w' => 604_800,
            _ => return Err(DurationParseError::Invalid(raw.to_string())),
        };
        let value: u64 = digits
            .parse()
            .map_err(|_| DurationParseError::Invalid(raw.to_string()))?;
        digits.clear();
        total = value
            .checked_mul(unit)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(|| DurationParseError::Overflow(raw.to_string()))?;
    }
    if !digits.is_empty() {
        return Err(DurationParseError::Invalid(raw.to_string()));
    }
    Ok(total)
}
