//! Conversion between duration strings and [`std::time::Duration`].
//!
//! Parsing accepts compact forms such as `5m`, `1h30m`, `7d` or `250ms`.
//! Formatting always produces the PromQL range-selector form.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid duration '{input}': {reason}")]
pub struct DurationError {
    pub input: String,
    pub reason: String,
}

/// Parse a duration string like `5m` or `1h30m`.
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DurationError {
            input: input.to_string(),
            reason: "empty duration".to_string(),
        });
    }

    let duration = humantime::parse_duration(trimmed).map_err(|e| DurationError {
        input: input.to_string(),
        reason: e.to_string(),
    })?;

    if duration.is_zero() {
        return Err(DurationError {
            input: input.to_string(),
            reason: "duration must be positive".to_string(),
        });
    }

    Ok(duration)
}

const UNITS: [(&str, u128); 5] = [
    ("d", 86_400_000),
    ("h", 3_600_000),
    ("m", 60_000),
    ("s", 1_000),
    ("ms", 1),
];

/// Format a duration for a PromQL range selector: `5m`, `1h30m`, `7d`.
///
/// Sub-millisecond precision is dropped.
pub fn format_duration(duration: Duration) -> String {
    let mut remaining = duration.as_millis();
    if remaining == 0 {
        return "0s".to_string();
    }

    let mut out = String::new();
    for (suffix, unit_ms) in UNITS {
        let count = remaining / unit_ms;
        if count > 0 {
            out.push_str(&count.to_string());
            out.push_str(suffix);
            remaining -= count * unit_ms;
        }
    }
    out
}
