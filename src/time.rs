//! Time and timestamp helpers.

use chrono::Utc;

/// Formats a playback position in seconds as a zero-padded `HH:MM:SS` string.
///
/// Fractions are truncated. Negative and non-finite values format as
/// `00:00:00`. Hours are not capped, so 100 hours render as `100:00:00`.
///
/// # Examples
///
/// ```
/// use clipper_tasks::format_time;
///
/// assert_eq!(format_time(3723.0), "01:02:03");
/// assert_eq!(format_time(0.0), "00:00:00");
/// assert_eq!(format_time(59.9), "00:00:59");
/// ```
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

/// Returns the current Unix timestamp in whole seconds.
///
/// Used as the fallback id for tasks created before the server assigns one.
pub fn current_timestamp() -> i64 {
    Utc::now().timestamp()
}
