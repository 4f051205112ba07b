use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Local, Utc};
use log::{error, info, warn};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    models::{BeaconRead, Session, SessionInfo},
    store::SessionStore,
    utils::time::now_millis,
};

use super::{RecorderError, RecorderState, RecorderStatus};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderSnapshot {
    pub status: RecorderStatus,
    pub session: Option<SessionInfo>,
}

/// Owner of the one active session.
///
/// Every operation takes the state lock and holds it until its persistence
/// call has finished, so operations are applied one at a time in the order
/// they acquire the lock. In-memory state only changes once the store has
/// accepted the write.
#[derive(Clone)]
pub struct SessionRecorder {
    state: Arc<Mutex<RecorderState>>,
    store: Arc<dyn SessionStore>,
}

impl SessionRecorder {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            state: Arc::new(Mutex::new(RecorderState::new())),
            store,
        }
    }

    pub async fn status(&self) -> RecorderStatus {
        self.state.lock().await.status()
    }

    pub async fn snapshot(&self) -> RecorderSnapshot {
        let state = self.state.lock().await;
        RecorderSnapshot {
            status: state.status(),
            session: state.session().map(SessionInfo::from),
        }
    }

    pub async fn current_session(&self) -> Option<Session> {
        self.state.lock().await.session().cloned()
    }

    /// Pick up an in-progress session left in the store by a previous run.
    pub async fn restore(&self) -> Result<Option<SessionInfo>, RecorderError> {
        let mut state = self.state.lock().await;
        ensure_idle(&state, "restore")?;

        let stored = self
            .store
            .load_current_session()
            .await
            .context("failed to load current session")?;

        let Some(session) = stored else {
            return Ok(None);
        };

        if session.is_finalized() {
            warn!(
                "Stored current session {} already has an end time; clearing it",
                session.id
            );
            self.store
                .save_current_session(None)
                .await
                .context("failed to clear stale current session")?;
            return Ok(None);
        }

        info!(
            "Resumed session {} ('{}') with {} reads",
            session.id,
            session.name,
            session.beacon_reads.len()
        );
        let summary = SessionInfo::from(&session);
        state.begin_session(session);
        Ok(Some(summary))
    }

    /// Open a new session. A missing or blank name gets a generated one.
    pub async fn start(&self, name: Option<&str>) -> Result<Session, RecorderError> {
        let mut state = self.state.lock().await;
        ensure_idle(&state, "start")?;

        let started_at = now_millis();
        let name = name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| default_session_name(started_at));

        let session = Session {
            id: Uuid::new_v4().to_string(),
            name,
            start_time: started_at,
            end_time: None,
            beacon_reads: Vec::new(),
        };

        self.store
            .save_current_session(Some(&session))
            .await
            .context("failed to persist new session")?;

        info!("Started session {} ('{}')", session.id, session.name);
        state.begin_session(session.clone());
        Ok(session)
    }

    /// Append a read to the active session. Returns the new read count.
    ///
    /// If the store rejects the read it is removed again and the error
    /// returned, so memory never runs ahead of storage.
    pub async fn record(&self, read: BeaconRead) -> Result<usize, RecorderError> {
        let mut state = self.state.lock().await;
        let started_at = active_session(&state, "record")?.start_time;

        if read.timestamp < started_at {
            return Err(RecorderError::ReadBeforeStart {
                read_at: read.timestamp,
                started_at,
            });
        }

        let stored = read.clone();
        let outcome = {
            let status = state.status();
            let session = state.push_read(read).ok_or(RecorderError::InvalidState {
                operation: "record",
                status,
            })?;
            let count = session.beacon_reads.len();
            self.store
                .append_current_read(&session.id, &stored)
                .await
                .map(|()| count)
        };

        match outcome {
            Ok(count) => Ok(count),
            Err(err) => {
                state.pop_read();
                error!(
                    "Failed to persist beacon read {}; rolled back: {err:#}",
                    stored.id
                );
                Err(RecorderError::Persistence(
                    err.context("failed to persist beacon read"),
                ))
            }
        }
    }

    /// Finalize the active session under `final_name` and archive it.
    pub async fn save(&self, final_name: &str) -> Result<Session, RecorderError> {
        let mut state = self.state.lock().await;
        let session = active_session(&state, "save")?;

        let name = final_name.trim();
        if name.is_empty() {
            return Err(RecorderError::BlankName);
        }

        let mut finalized = session.clone();
        let now = now_millis();
        // Clock steps backwards must not leave reads after the end time.
        let end_time = finalized
            .last_read_at()
            .map_or(now, |last| last.max(now))
            .max(finalized.start_time);
        finalized.end_time = Some(end_time);
        finalized.name = name.to_owned();

        self.store
            .save_saved_session(&finalized)
            .await
            .context("failed to archive session")?;
        if let Err(err) = self.store.save_current_session(None).await {
            // Leave nothing archived while the session is still in progress.
            return Err(match self.store.delete_saved_session(&finalized.id).await {
                Ok(()) => {
                    error!(
                        "Failed to clear in-progress marker for {}; archive withdrawn: {err:#}",
                        finalized.id
                    );
                    RecorderError::Persistence(
                        err.context("failed to clear in-progress marker; archive withdrawn"),
                    )
                }
                Err(undo) => {
                    error!(
                        "Failed to clear in-progress marker for {} and to withdraw its archive: {undo:#}",
                        finalized.id
                    );
                    RecorderError::Persistence(err.context(format!(
                        "failed to clear in-progress marker; archive could not be withdrawn: {undo:#}"
                    )))
                }
            });
        }

        state.end_session();
        info!(
            "Saved session {} ('{}') with {} reads",
            finalized.id,
            finalized.name,
            finalized.beacon_reads.len()
        );
        Ok(finalized)
    }

    /// Drop the active session and all of its reads. Not reversible.
    pub async fn discard(&self) -> Result<SessionInfo, RecorderError> {
        let mut state = self.state.lock().await;
        let summary = SessionInfo::from(active_session(&state, "discard")?);

        // A save that failed halfway may have left an archived copy behind.
        self.store
            .delete_saved_session(&summary.id)
            .await
            .context("failed to remove archived copy of discarded session")?;
        self.store
            .save_current_session(None)
            .await
            .context("failed to clear discarded session")?;

        state.end_session();
        info!(
            "Discarded session {} ({} reads dropped)",
            summary.id, summary.read_count
        );
        Ok(summary)
    }
}

fn ensure_idle(state: &RecorderState, operation: &'static str) -> Result<(), RecorderError> {
    match state.status() {
        RecorderStatus::Idle => Ok(()),
        status => Err(RecorderError::InvalidState { operation, status }),
    }
}

fn active_session<'a>(
    state: &'a RecorderState,
    operation: &'static str,
) -> Result<&'a Session, RecorderError> {
    state.session().ok_or(RecorderError::InvalidState {
        operation,
        status: state.status(),
    })
}

fn default_session_name(started_at: DateTime<Utc>) -> String {
    format!(
        "Session {}",
        started_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    )
}
