//! Display helpers shared by every view of the data.

use crate::models::SampleValue;
use chrono::{DateTime, NaiveDateTime, Utc};

/// Placeholder for absent values
pub const NOT_AVAILABLE: &str = "N/A";

/// Default preview width for sample fields
pub const DEFAULT_TRUNCATE_AT: usize = 100;

/// Render a 0..1 score as a percentage with one decimal, e.g. `0.82` -> `82.0%`
pub fn format_score(score: Option<f64>) -> String {
    match score {
        Some(score) if score.is_finite() => format!("{:.1}%", score * 100.0),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Render a duration in seconds as `45.0s`, `2m 5s` or `1h 2m`
pub fn format_duration(seconds: Option<f64>) -> String {
    let seconds = match seconds {
        Some(s) if s.is_finite() && s >= 0.0 => s,
        _ => return NOT_AVAILABLE.to_string(),
    };

    if seconds < 60.0 {
        return format!("{seconds:.1}s");
    }

    let total = seconds.round() as u64;
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m {secs}s")
    }
}

/// Render a stored timestamp as `YYYY-MM-DD HH:MM:SS`.
/// Timestamps with an offset are shown in UTC; anything unparseable is returned as is.
pub fn format_date(timestamp: &str) -> String {
    const DISPLAY: &str = "%Y-%m-%d %H:%M:%S";

    if let Ok(parsed) = DateTime::parse_from_rfc3339(timestamp) {
        return parsed.with_timezone(&Utc).format(DISPLAY).to_string();
    }
    for pattern in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
    ] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(timestamp, pattern) {
            return parsed.format(DISPLAY).to_string();
        }
    }
    timestamp.to_string()
}

/// Optional timestamp variant of [`format_date`]
pub fn format_optional_date(timestamp: Option<&str>) -> String {
    timestamp
        .map(format_date)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Flatten a sample field to text
pub fn render_value(value: &SampleValue) -> String {
    match value {
        SampleValue::Text(text) => text.clone(),
        SampleValue::TextList(items) => items.join(", "),
        SampleValue::Record(record) => {
            serde_json::to_string_pretty(record).unwrap_or_else(|_| format!("{record:?}"))
        }
        SampleValue::Opaque(value) => match value {
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        },
    }
}

/// Cut `text` to `max_chars` characters, appending `...` when shortened
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
