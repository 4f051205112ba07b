use chrono::{DateTime, Utc};
use thiserror::Error;

use super::RecorderStatus;

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("cannot {operation} while recorder is {}", .status.as_str())]
    InvalidState {
        operation: &'static str,
        status: RecorderStatus,
    },

    #[error("session name must not be blank")]
    BlankName,

    #[error("read taken at {read_at} predates session start {started_at}")]
    ReadBeforeStart {
        read_at: DateTime<Utc>,
        started_at: DateTime<Utc>,
    },

    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}

impl RecorderError {
    /// True for failures that were rejected before anything was touched.
    pub fn is_precondition(&self) -> bool {
        !matches!(self, RecorderError::Persistence(_))
    }
}
