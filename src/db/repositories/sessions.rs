use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_millis, to_i64},
};
use crate::models::{BeaconRead, Session};

fn row_to_session(row: &Row) -> Result<Session> {
    let start_time: i64 = row.get("start_time")?;
    let end_time: i64 = row.get("end_time")?;

    Ok(Session {
        id: row.get("id")?,
        name: row.get("name")?,
        start_time: parse_millis(start_time, "start_time")?,
        end_time: Some(parse_millis(end_time, "end_time")?),
        beacon_reads: Vec::new(),
    })
}

pub(super) fn row_to_read(row: &Row) -> Result<BeaconRead> {
    let timestamp: i64 = row.get("timestamp")?;

    Ok(BeaconRead {
        id: row.get("id")?,
        uuid: row.get("uuid")?,
        major: row.get("major")?,
        minor: row.get("minor")?,
        rssi: row.get("rssi")?,
        timestamp: parse_millis(timestamp, "timestamp")?,
    })
}

fn load_reads(conn: &Connection, session: &mut Session) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, uuid, major, minor, rssi, timestamp
         FROM beacon_reads
         WHERE session_id = ?1
         ORDER BY seq ASC",
    )?;

    let mut rows = stmt.query(params![session.id])?;
    while let Some(row) = rows.next()? {
        session.beacon_reads.push(row_to_read(row)?);
    }
    Ok(())
}

impl Database {
    /// Insert or replace a finalized session together with its reads.
    pub async fn upsert_saved_session(&self, session: &Session) -> Result<()> {
        let record = session.clone();
        let end_time = record
            .end_time
            .ok_or_else(|| anyhow!("session {} has no end time and cannot be saved", record.id))?;

        self.execute(move |conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO saved_sessions (id, name, start_time, end_time, saved_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                     name = excluded.name,
                     start_time = excluded.start_time,
                     end_time = excluded.end_time,
                     saved_at = excluded.saved_at",
                params![
                    record.id,
                    record.name,
                    record.start_time.timestamp_millis(),
                    end_time.timestamp_millis(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("failed to upsert saved session")?;

            tx.execute(
                "DELETE FROM beacon_reads WHERE session_id = ?1",
                params![record.id],
            )?;

            {
                let mut insert = tx.prepare(
                    "INSERT INTO beacon_reads (id, session_id, seq, uuid, major, minor, rssi, timestamp)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )?;
                for (seq, read) in record.beacon_reads.iter().enumerate() {
                    insert
                        .execute(params![
                            read.id,
                            record.id,
                            to_i64(seq)?,
                            read.uuid,
                            read.major,
                            read.minor,
                            read.rssi,
                            read.timestamp.timestamp_millis(),
                        ])
                        .with_context(|| format!("failed to insert beacon read {}", read.id))?;
                }
            }

            tx.commit().context("failed to commit saved session")?;
            Ok(())
        })
        .await
    }

    pub async fn get_saved_session(&self, session_id: &str) -> Result<Option<Session>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, start_time, end_time
                 FROM saved_sessions
                 WHERE id = ?1",
            )?;

            let session = stmt
                .query_row(params![session_id], |row| Ok(row_to_session(row)))
                .optional()?
                .transpose()?;

            match session {
                Some(mut session) => {
                    load_reads(conn, &mut session)?;
                    Ok(Some(session))
                }
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn list_saved_sessions(&self) -> Result<Vec<Session>> {
        self.execute(|conn| {
            let mut sessions = Vec::new();
            {
                let mut stmt = conn.prepare(
                    "SELECT id, name, start_time, end_time
                     FROM saved_sessions
                     ORDER BY end_time DESC, start_time DESC",
                )?;

                let mut rows = stmt.query([])?;
                while let Some(row) = rows.next()? {
                    sessions.push(row_to_session(row)?);
                }
            }

            for session in &mut sessions {
                load_reads(conn, session)?;
            }

            Ok(sessions)
        })
        .await
    }

    /// Delete a saved session and its reads. Deleting an unknown id is not
    /// an error.
    pub async fn delete_saved_session(&self, session_id: &str) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "DELETE FROM beacon_reads WHERE session_id = ?1",
                params![session_id],
            )?;
            tx.execute(
                "DELETE FROM saved_sessions WHERE id = ?1",
                params![session_id],
            )?;

            tx.commit()?;
            Ok(())
        })
        .await
    }
}
