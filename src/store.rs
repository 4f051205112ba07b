//! Persistence boundary for sessions.
//!
//! Every call is atomic on its own and may fail; callers never assume partial
//! success. Retry policy, if any, belongs to the implementation.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{BeaconRead, Session};

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The in-progress session left behind by a previous run, if any.
    async fn load_current_session(&self) -> Result<Option<Session>>;

    /// Replace the in-progress session. `None` clears the marker.
    async fn save_current_session(&self, session: Option<&Session>) -> Result<()>;

    /// Append one read to the in-progress session `session_id`. Fails if that
    /// session is not the one currently stored.
    async fn append_current_read(&self, session_id: &str, read: &BeaconRead) -> Result<()>;

    /// Finalized sessions, most recent first.
    async fn list_saved_sessions(&self) -> Result<Vec<Session>>;

    /// Insert or replace a finalized session by id.
    async fn save_saved_session(&self, session: &Session) -> Result<()>;

    async fn delete_saved_session(&self, session_id: &str) -> Result<()>;
}
