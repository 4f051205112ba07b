use serde::{Deserialize, Serialize};

use crate::models::{BeaconRead, Session};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RecorderStatus {
    #[default]
    Idle,
    Active,
}

impl RecorderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecorderStatus::Idle => "idle",
            RecorderStatus::Active => "active",
        }
    }
}

/// In-memory recorder state. `session` is `Some` exactly when the status is
/// `Active`; the transition methods keep the two in step.
#[derive(Debug, Clone, Default)]
pub struct RecorderState {
    status: RecorderStatus,
    session: Option<Session>,
}

impl RecorderState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> RecorderStatus {
        self.status
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn begin_session(&mut self, session: Session) {
        *self = Self {
            status: RecorderStatus::Active,
            session: Some(session),
        };
    }

    /// Append a read and hand back the session so it can be persisted.
    pub fn push_read(&mut self, read: BeaconRead) -> Option<&Session> {
        let session = self.session.as_mut()?;
        session.beacon_reads.push(read);
        Some(session)
    }

    /// Undo the most recent [`push_read`](Self::push_read).
    pub fn pop_read(&mut self) -> Option<BeaconRead> {
        self.session.as_mut()?.beacon_reads.pop()
    }

    pub fn end_session(&mut self) -> Option<Session> {
        let session = self.session.take();
        self.status = RecorderStatus::Idle;
        session
    }
}
