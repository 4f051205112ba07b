mod current_session;
mod sessions;

use anyhow::Result;
use async_trait::async_trait;

use crate::db::connection::Database;
use crate::models::{BeaconRead, Session};
use crate::store::SessionStore;

#[async_trait]
impl SessionStore for Database {
    async fn load_current_session(&self) -> Result<Option<Session>> {
        self.get_current_session().await
    }

    async fn save_current_session(&self, session: Option<&Session>) -> Result<()> {
        match session {
            Some(session) => self.put_current_session(session).await,
            None => self.clear_current_session().await,
        }
    }

    async fn append_current_read(&self, session_id: &str, read: &BeaconRead) -> Result<()> {
        Database::append_current_read(self, session_id, read).await
    }

    async fn list_saved_sessions(&self) -> Result<Vec<Session>> {
        Database::list_saved_sessions(self).await
    }

    async fn save_saved_session(&self, session: &Session) -> Result<()> {
        self.upsert_saved_session(session).await
    }

    async fn delete_saved_session(&self, session_id: &str) -> Result<()> {
        Database::delete_saved_session(self, session_id).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::models::{BeaconAdvertisement, BeaconRead};
    use crate::utils::time::now_millis;

    fn open(dir: &tempfile::TempDir) -> Database {
        Database::new(dir.path().join("beacons.sqlite3")).unwrap()
    }

    fn session(id: &str, reads: usize, ended: bool) -> Session {
        let start = now_millis();
        let advertisement = BeaconAdvertisement {
            uuid: "E101B392-ADA3-2224-2316-05EF58774925".into(),
            major: 1,
            minor: 2,
            rssi: -61,
            tx_power: -59,
        };
        let beacon_reads: Vec<BeaconRead> = (0..reads)
            .map(|i| {
                BeaconRead::from_advertisement(&advertisement, start + Duration::milliseconds(i as i64))
            })
            .collect();
        Session {
            id: id.into(),
            name: format!("session {id}"),
            start_time: start,
            end_time: ended.then(|| start + Duration::seconds(5)),
            beacon_reads,
        }
    }

    #[tokio::test]
    async fn current_session_round_trips_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir);
        let store: &dyn SessionStore = &db;

        assert_eq!(store.load_current_session().await.unwrap(), None);

        let mut current = session("cur", 2, false);
        store.save_current_session(Some(&current)).await.unwrap();
        assert_eq!(store.load_current_session().await.unwrap(), Some(current.clone()));

        current.beacon_reads.truncate(1);
        store.save_current_session(Some(&current)).await.unwrap();
        assert_eq!(store.load_current_session().await.unwrap(), Some(current));

        store.save_current_session(None).await.unwrap();
        assert_eq!(store.load_current_session().await.unwrap(), None);
    }

    #[tokio::test]
    async fn appended_reads_reload_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir);
        let store: &dyn SessionStore = &db;

        let mut current = session("cur", 0, false);
        store.save_current_session(Some(&current)).await.unwrap();
        let extra = session("cur", 200, false).beacon_reads;
        for read in &extra {
            store.append_current_read("cur", read).await.unwrap();
            current.beacon_reads.push(read.clone());
        }
        assert_eq!(store.load_current_session().await.unwrap(), Some(current.clone()));

        // Reads live in their own rows, not in the header payload.
        let (payload, rows): (String, i64) = db
            .execute(|conn| {
                let payload: String = conn.query_row(
                    "SELECT payload FROM current_session WHERE slot = 1",
                    [],
                    |row| row.get(0),
                )?;
                let rows: i64 = conn.query_row("SELECT COUNT(*) FROM current_reads", [], |row| {
                    row.get(0)
                })?;
                Ok((payload, rows))
            })
            .await
            .unwrap();
        assert!(!payload.contains(&extra[0].id));
        assert_eq!(rows, 200);

        drop(db);
        let db = open(&dir);
        assert_eq!(db.load_current_session().await.unwrap(), Some(current));
    }

    #[tokio::test]
    async fn append_requires_the_in_progress_session() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir);
        let store: &dyn SessionStore = &db;
        let read = session("x", 1, false).beacon_reads.remove(0);

        assert!(store.append_current_read("cur", &read).await.is_err());

        store.save_current_session(Some(&session("cur", 0, false))).await.unwrap();
        assert!(store.append_current_read("other", &read).await.is_err());
        assert!(store.load_current_session().await.unwrap().unwrap().beacon_reads.is_empty());
    }

    #[tokio::test]
    async fn replacing_current_session_drops_old_reads() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir);
        let store: &dyn SessionStore = &db;

        store.save_current_session(Some(&session("old", 4, false))).await.unwrap();
        let fresh = session("new", 1, false);
        store.save_current_session(Some(&fresh)).await.unwrap();
        assert_eq!(store.load_current_session().await.unwrap(), Some(fresh));

        store.save_current_session(None).await.unwrap();
        let rows: i64 = db
            .execute(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM current_reads", [], |row| row.get(0))?)
            })
            .await
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[tokio::test]
    async fn saved_sessions_keep_read_order_and_upsert_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir);
        let store: &dyn SessionStore = &db;

        let mut saved = session("a", 5, true);
        store.save_saved_session(&saved).await.unwrap();

        saved.name = "renamed".into();
        saved.beacon_reads.truncate(3);
        store.save_saved_session(&saved).await.unwrap();

        let listed = store.list_saved_sessions().await.unwrap();
        assert_eq!(listed, vec![saved.clone()]);
        assert_eq!(db.get_saved_session("a").await.unwrap(), Some(saved));
    }

    #[tokio::test]
    async fn listing_is_most_recent_first() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir);

        let mut older = session("older", 1, true);
        older.end_time = Some(older.start_time + Duration::seconds(1));
        let mut newer = session("newer", 1, true);
        newer.end_time = Some(newer.start_time + Duration::seconds(60));

        db.save_saved_session(&older).await.unwrap();
        db.save_saved_session(&newer).await.unwrap();

        let ids: Vec<String> = SessionStore::list_saved_sessions(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["newer".to_string(), "older".to_string()]);
    }

    #[tokio::test]
    async fn unfinished_sessions_cannot_be_archived() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir);
        assert!(db.save_saved_session(&session("open", 1, false)).await.is_err());
        assert!(SessionStore::list_saved_sessions(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_removes_session_and_reads() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir);

        db.save_saved_session(&session("gone", 3, true)).await.unwrap();
        SessionStore::delete_saved_session(&db, "gone").await.unwrap();
        SessionStore::delete_saved_session(&db, "never-existed").await.unwrap();

        assert_eq!(db.get_saved_session("gone").await.unwrap(), None);
        let orphaned: i64 = db
            .execute(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM beacon_reads", [], |row| row.get(0))?)
            })
            .await
            .unwrap();
        assert_eq!(orphaned, 0);
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let saved = session("kept", 2, true);
        let current = session("open", 1, false);
        {
            let db = open(&dir);
            db.save_saved_session(&saved).await.unwrap();
            db.save_current_session(Some(&current)).await.unwrap();
        }

        let db = open(&dir);
        assert_eq!(db.get_saved_session("kept").await.unwrap(), Some(saved));
        assert_eq!(db.load_current_session().await.unwrap(), Some(current));
    }
}
