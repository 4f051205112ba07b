use chrono::{DateTime, SubsecRound, TimeZone, Utc};

/// Current time truncated to whole milliseconds, the precision sessions are
/// stored at.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

pub fn from_millis(value: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(value).single()
}
