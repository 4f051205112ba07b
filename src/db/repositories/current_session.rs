use anyhow::{bail, Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::sessions::row_to_read;
use crate::db::{connection::Database, helpers::to_i64};
use crate::models::{BeaconRead, Session};

fn insert_read(conn: &Connection, session_id: &str, seq: i64, read: &BeaconRead) -> Result<()> {
    let mut insert = conn.prepare_cached(
        "INSERT INTO current_reads (session_id, seq, id, uuid, major, minor, rssi, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;
    insert
        .execute(params![
            session_id,
            seq,
            read.id,
            read.uuid,
            read.major,
            read.minor,
            read.rssi,
            read.timestamp.timestamp_millis(),
        ])
        .with_context(|| format!("failed to insert beacon read {}", read.id))?;
    Ok(())
}

impl Database {
    pub async fn get_current_session(&self) -> Result<Option<Session>> {
        self.execute(|conn| {
            let payload: Option<String> = conn
                .query_row(
                    "SELECT payload FROM current_session WHERE slot = 1",
                    [],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(raw) = payload else {
                return Ok(None);
            };

            let mut session: Session = serde_json::from_str(&raw)
                .context("failed to parse current session payload")?;
            let mut stmt = conn.prepare_cached(
                "SELECT id, uuid, major, minor, rssi, timestamp
                 FROM current_reads
                 WHERE session_id = ?1
                 ORDER BY seq ASC",
            )?;
            let mut rows = stmt.query(params![session.id])?;
            while let Some(row) = rows.next()? {
                session.beacon_reads.push(row_to_read(row)?);
            }
            Ok(Some(session))
        })
        .await
    }

    /// Replace the in-progress slot with `session`, header and reads together.
    pub async fn put_current_session(&self, session: &Session) -> Result<()> {
        let header = Session {
            id: session.id.clone(),
            name: session.name.clone(),
            start_time: session.start_time,
            end_time: session.end_time,
            beacon_reads: Vec::new(),
        };
        let payload =
            serde_json::to_string(&header).context("failed to serialize current session")?;
        let reads = session.beacon_reads.clone();

        self.execute(move |conn| {
            let tx = conn.transaction()?;

            tx.execute("DELETE FROM current_reads", [])?;
            tx.execute(
                "INSERT INTO current_session (slot, session_id, payload, updated_at)
                 VALUES (1, ?1, ?2, ?3)
                 ON CONFLICT(slot) DO UPDATE SET
                     session_id = excluded.session_id,
                     payload = excluded.payload,
                     updated_at = excluded.updated_at",
                params![header.id, payload, Utc::now().to_rfc3339()],
            )
            .context("failed to write current session")?;
            for (seq, read) in reads.iter().enumerate() {
                insert_read(&tx, &header.id, to_i64(seq)?, read)?;
            }

            tx.commit().context("failed to commit current session")?;
            Ok(())
        })
        .await
    }

    /// Add one read to the end of the in-progress session `session_id`.
    pub async fn append_current_read(&self, session_id: &str, read: &BeaconRead) -> Result<()> {
        let session_id = session_id.to_string();
        let read = read.clone();

        self.execute(move |conn| {
            let tx = conn.transaction()?;

            let current: Option<String> = tx
                .query_row(
                    "SELECT session_id FROM current_session WHERE slot = 1",
                    [],
                    |row| row.get(0),
                )
                .optional()?;
            if current.as_deref() != Some(session_id.as_str()) {
                bail!("session {session_id} is not the in-progress session");
            }

            let seq: i64 = tx.query_row(
                "SELECT COALESCE(MAX(seq) + 1, 0) FROM current_reads WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )?;
            insert_read(&tx, &session_id, seq, &read)?;
            tx.execute(
                "UPDATE current_session SET updated_at = ?1 WHERE slot = 1",
                params![Utc::now().to_rfc3339()],
            )?;

            tx.commit().context("failed to commit beacon read")?;
            Ok(())
        })
        .await
    }

    pub async fn clear_current_session(&self) -> Result<()> {
        self.execute(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM current_reads", [])?;
            tx.execute("DELETE FROM current_session", [])
                .context("failed to clear current session")?;
            tx.commit().context("failed to commit cleared session")?;
            Ok(())
        })
        .await
    }
}
