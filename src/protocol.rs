//! NDJSON protocol spoken on stdin/stdout by the `beacon-recorder` binary.
//!
//! Every input line is one [`HostCommand`]; every command gets exactly one
//! [`DeviceMessage`] reply line.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    models::{FilterCriteria, Session, SessionInfo},
    recorder::RecorderSnapshot,
    scanner::ScanStats,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Commands sent by the host driving the recorder.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum HostCommand {
    StartScan,
    StopScan,
    /// Manufacturer data of one discovery, hex encoded.
    Advertisement {
        device_id: String,
        data: String,
        rssi: i16,
    },
    /// Whole advertising payload (AD structures), hex encoded.
    AdvertisementPayload {
        device_id: String,
        payload: String,
        rssi: i16,
    },
    StartSession {
        #[serde(default)]
        name: Option<String>,
    },
    SaveSession {
        name: String,
    },
    DiscardSession,
    GetStatus,
    GetCriteria,
    SetCriteria {
        target_uuid: String,
        rssi_threshold: i16,
    },
    ListSessions,
    DeleteSession {
        id: String,
    },
}

/// Replies written back to the host.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceMessage {
    Ok {
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    Error {
        message: String,
    },
    Status {
        scanning: bool,
        recorder: RecorderSnapshot,
        #[serde(skip_serializing_if = "Option::is_none")]
        criteria: Option<FilterCriteria>,
        version: &'static str,
    },
    Criteria {
        criteria: FilterCriteria,
    },
    Session {
        session: Session,
    },
    SessionSummary {
        session: SessionInfo,
    },
    Sessions {
        sessions: Vec<SessionInfo>,
    },
    ScanStopped {
        stats: ScanStats,
    },
}

impl DeviceMessage {
    pub fn ok() -> Self {
        DeviceMessage::Ok { detail: None }
    }

    pub fn ok_with(detail: impl Into<String>) -> Self {
        DeviceMessage::Ok {
            detail: Some(detail.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        DeviceMessage::Error {
            message: message.into(),
        }
    }
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<HostCommand>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .context("invalid command")
}

/// Serialize a reply as a single NDJSON line, newline included.
pub fn serialize_message(message: &DeviceMessage) -> Result<String> {
    let mut line = serde_json::to_string(message).context("failed to serialize reply")?;
    line.push('\n');
    Ok(line)
}
