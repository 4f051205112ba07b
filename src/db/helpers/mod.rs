use std::convert::TryFrom;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};

use crate::utils::time::from_millis;

pub fn to_i64(value: usize) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn parse_millis(value: i64, field: &str) -> Result<DateTime<Utc>> {
    from_millis(value).ok_or_else(|| anyhow!("{field} contains out-of-range timestamp {value}"))
}
