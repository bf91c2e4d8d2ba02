//! Timestamp helpers.
//!
//! Timestamps are stored as unix milliseconds and rendered in server-local
//! time without a zone suffix.

use chrono::{DateTime, Local, TimeZone, Utc};

const ACTIVITY_FORMAT: &str = "%Y-%m-%d %H:%M";
const TIME_OF_DAY_FORMAT: &str = "%H:%M";

/// Current time in unix milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn local(ms: i64) -> Option<DateTime<Local>> {
    Local.timestamp_millis_opt(ms).earliest()
}

/// Render a thread's last activity as `YYYY-MM-DD HH:MM`.
pub fn format_activity_time(ms: i64) -> String {
    local(ms)
        .map(|dt| dt.format(ACTIVITY_FORMAT).to_string())
        .unwrap_or_default()
}

/// Render a message timestamp as `HH:MM`.
pub fn format_time_of_day(ms: i64) -> String {
    local(ms)
        .map(|dt| dt.format(TIME_OF_DAY_FORMAT).to_string())
        .unwrap_or_default()
}
