//! Human-readable time formatting
//!
//! Provides consistent duration and date display across the player views.

use chrono::{DateTime, Utc};

/// Placeholder shown when a track's duration is unknown
pub const UNKNOWN_DURATION: &str = "--:--";

/// Format seconds as `M:SS` for transport/clock displays.
///
/// Negative and non-finite inputs render as `0:00`; fractional seconds are
/// truncated.
///
/// # Examples
///
/// ```
/// use capsule_common::human_time::format_clock;
///
/// assert_eq!(format_clock(0.0), "0:00");
/// assert_eq!(format_clock(65.9), "1:05");
/// assert_eq!(format_clock(3600.0), "60:00");
/// ```
pub fn format_clock(seconds: f64) -> String {
    let whole = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", whole / 60, whole % 60)
}

/// Format a track duration, distinguishing unknown from zero.
///
/// # Examples
///
/// ```
/// use capsule_common::human_time::format_duration;
///
/// assert_eq!(format_duration(None), "--:--");
/// assert_eq!(format_duration(Some(0.0)), "0:00");
/// assert_eq!(format_duration(Some(212.4)), "3:32");
/// ```
pub fn format_duration(seconds: Option<f64>) -> String {
    match seconds {
        Some(s) if s.is_finite() && s >= 0.0 => format_clock(s),
        _ => UNKNOWN_DURATION.to_string(),
    }
}

/// Format an ISO-8601 timestamp relative to `now`.
///
/// - same day: `Today`
/// - 1 day: `Yesterday`
/// - under a week: `Nd ago`
/// - under a month: `Nw ago`
/// - under a year: `Nmo ago`
/// - otherwise: abbreviated month and two-digit year, e.g. `Mar 24`
///
/// Returns an empty string when the timestamp is absent or unparseable.
pub fn format_relative_date(created_at: Option<&str>, now: DateTime<Utc>) -> String {
    let Some(parsed) = created_at.and_then(|s| DateTime::parse_from_rfc3339(s).ok()) else {
        return String::new();
    };
    let date = parsed.with_timezone(&Utc);
    let days = (now - date).num_days();

    match days {
        d if d <= 0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        d if d < 7 => format!("{}d ago", d),
        d if d < 30 => format!("{}w ago", d / 7),
        d if d < 365 => format!("{}mo ago", d / 30),
        _ => date.format("%b %y").to_string(),
    }
}
