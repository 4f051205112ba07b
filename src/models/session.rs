//! Recording session data models.
//!
//! All timestamps are kept at millisecond precision and serialize as
//! milliseconds since the Unix epoch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::BeaconAdvertisement;

/// A single accepted observation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeaconRead {
    pub id: String,
    pub uuid: String,
    pub major: u16,
    pub minor: u16,
    pub rssi: i16,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl BeaconRead {
    pub fn from_advertisement(advertisement: &BeaconAdvertisement, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: read_id(timestamp),
            uuid: advertisement.uuid.clone(),
            major: advertisement.major,
            minor: advertisement.minor,
            rssi: advertisement.rssi,
            timestamp,
        }
    }
}

/// `<millis>-<random>`; the random suffix keeps ids distinct for reads
/// created within the same millisecond.
fn read_id(timestamp: DateTime<Utc>) -> String {
    format!("{}-{:08x}", timestamp.timestamp_millis(), rand::random::<u32>())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub name: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub beacon_reads: Vec<BeaconRead>,
}

impl Session {
    pub fn is_finalized(&self) -> bool {
        self.end_time.is_some()
    }

    pub fn last_read_at(&self) -> Option<DateTime<Utc>> {
        self.beacon_reads.last().map(|read| read.timestamp)
    }
}

/// Session without its reads, for status replies and listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,
    pub name: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub end_time: Option<DateTime<Utc>>,
    pub read_count: usize,
}

impl From<&Session> for SessionInfo {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id.clone(),
            name: session.name.clone(),
            start_time: session.start_time,
            end_time: session.end_time,
            read_count: session.beacon_reads.len(),
        }
    }
}
