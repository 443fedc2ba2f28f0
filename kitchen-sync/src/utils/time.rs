//! Time helpers (all timestamps are Unix millis)

/// Current wall-clock time in Unix millis
#[inline]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Human-readable age, e.g. "26h 5m"
pub fn format_age(age_millis: i64) -> String {
    let minutes = age_millis.max(0) / 60_000;
    let hours = minutes / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else {
        format!("{}m", minutes)
    }
}
