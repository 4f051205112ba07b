//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use anyhow::{bail, Result};
use async_trait::async_trait;
use beacon_recorder::{
    models::{BeaconAdvertisement, BeaconRead, Session},
    store::SessionStore,
    utils::time::now_millis,
};

pub const TARGET_UUID: &str = "E101B392-ADA3-2224-2316-05EF58774925";

pub const TARGET_UUID_BYTES: [u8; 16] = [
    0xE1, 0x01, 0xB3, 0x92, 0xAD, 0xA3, 0x22, 0x24, 0x23, 0x16, 0x05, 0xEF, 0x58, 0x77, 0x49, 0x25,
];

/// In-memory store whose writes can be made to fail on demand.
#[derive(Default)]
pub struct MemoryStore {
    current: Mutex<Option<Session>>,
    saved: Mutex<Vec<Session>>,
    fail_current_writes: AtomicBool,
    fail_saved_writes: AtomicBool,
    fail_deletes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail every write from now on.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_current_writes.store(fail, Ordering::SeqCst);
        self.fail_saved_writes.store(fail, Ordering::SeqCst);
    }

    /// Fail only writes to the in-progress slot.
    pub fn fail_current_writes(&self, fail: bool) {
        self.fail_current_writes.store(fail, Ordering::SeqCst);
    }

    /// Fail only deletions from the saved collection.
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn current(&self) -> Option<Session> {
        self.current.lock().unwrap().clone()
    }

    pub fn saved(&self) -> Vec<Session> {
        self.saved.lock().unwrap().clone()
    }

    /// Successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load_current_session(&self) -> Result<Option<Session>> {
        Ok(self.current())
    }

    async fn save_current_session(&self, session: Option<&Session>) -> Result<()> {
        // Give other tasks a chance to run mid-write.
        tokio::task::yield_now().await;
        if self.fail_current_writes.load(Ordering::SeqCst) {
            bail!("injected failure writing current session");
        }
        *self.current.lock().unwrap() = session.cloned();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn append_current_read(&self, session_id: &str, read: &BeaconRead) -> Result<()> {
        tokio::task::yield_now().await;
        if self.fail_current_writes.load(Ordering::SeqCst) {
            bail!("injected failure appending beacon read");
        }
        let mut current = self.current.lock().unwrap();
        match current.as_mut() {
            Some(session) if session.id == session_id => session.beacon_reads.push(read.clone()),
            _ => bail!("session {session_id} is not the in-progress session"),
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_saved_sessions(&self) -> Result<Vec<Session>> {
        let mut sessions = self.saved();
        sessions.sort_by(|a, b| b.end_time.cmp(&a.end_time));
        Ok(sessions)
    }

    async fn save_saved_session(&self, session: &Session) -> Result<()> {
        tokio::task::yield_now().await;
        if self.fail_saved_writes.load(Ordering::SeqCst) {
            bail!("injected failure archiving session");
        }
        let mut saved = self.saved.lock().unwrap();
        saved.retain(|existing| existing.id != session.id);
        saved.push(session.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_saved_session(&self, session_id: &str) -> Result<()> {
        if self.fail_saved_writes.load(Ordering::SeqCst) || self.fail_deletes.load(Ordering::SeqCst)
        {
            bail!("injected failure deleting session");
        }
        self.saved
            .lock()
            .unwrap()
            .retain(|existing| existing.id != session_id);
        Ok(())
    }
}

pub fn read(minor: u16, rssi: i16) -> BeaconRead {
    let advertisement = BeaconAdvertisement {
        uuid: TARGET_UUID.to_string(),
        major: 1,
        minor,
        rssi,
        tx_power: -59,
    };
    BeaconRead::from_advertisement(&advertisement, now_millis())
}

/// 25-byte iBeacon manufacturer-data frame.
pub fn ibeacon_frame(uuid: [u8; 16], major: u16, minor: u16) -> Vec<u8> {
    let mut frame = vec![0x4C, 0x00, 0x02, 0x15];
    frame.extend_from_slice(&uuid);
    frame.extend_from_slice(&major.to_be_bytes());
    frame.extend_from_slice(&minor.to_be_bytes());
    frame.push(0xC5);
    frame
}
