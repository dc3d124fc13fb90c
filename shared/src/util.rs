use chrono::{Months, TimeZone, Utc};

pub const DAY_MS: i64 = 86_400_000;

/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Add calendar months to a millisecond timestamp (clamped to month end,
/// e.g. Jan 31 + 1 month = Feb 28/29). Falls back to 30-day months when the
/// timestamp is outside chrono's range.
pub fn add_months_millis(ts: i64, months: u32) -> i64 {
    Utc.timestamp_millis_opt(ts)
        .single()
        .and_then(|dt| dt.checked_add_months(Months::new(months)))
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(ts + i64::from(months) * 30 * DAY_MS)
}
