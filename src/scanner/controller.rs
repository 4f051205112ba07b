use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::{info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::models::{DiscoveryEvent, FilterCriteria};
use crate::recorder::SessionRecorder;

use super::loop_worker::{scan_loop, ScanStats};

/// Starts and stops the scan task that feeds the recorder.
///
/// Stopping only cancels the task; the active session is left exactly as the
/// recorder last persisted it.
pub struct ScanController {
    handle: Option<JoinHandle<ScanStats>>,
    cancel_token: Option<CancellationToken>,
    criteria: Option<FilterCriteria>,
}

impl Default for ScanController {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
            criteria: None,
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Criteria the running scan was started with.
    pub fn criteria(&self) -> Option<&FilterCriteria> {
        self.criteria.as_ref()
    }

    /// Spawn the scan loop. `criteria` stay fixed for the whole scan.
    pub fn start_scanning(
        &mut self,
        events: mpsc::Receiver<DiscoveryEvent>,
        criteria: FilterCriteria,
        recorder: SessionRecorder,
    ) -> Result<()> {
        if self.is_scanning() {
            bail!("scan already running");
        }

        info!(
            "Starting scan for {} at >= {}dBm",
            criteria.target_uuid, criteria.rssi_threshold
        );

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(scan_loop(
            events,
            criteria.clone(),
            recorder,
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        self.criteria = Some(criteria);
        Ok(())
    }

    /// Cancel the scan loop and wait for it to exit. Returns `None` when no
    /// scan was running.
    pub async fn stop_scanning(&mut self) -> Result<Option<ScanStats>> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        self.criteria = None;

        let stats = self.join().await?;
        if stats.is_some() {
            info!("Scan stopped");
        }
        Ok(stats)
    }

    /// Let the scan loop drain what is already queued and exit on its own,
    /// which happens once every sender of the event channel is gone. Falls
    /// back to cancelling if it has not finished within `grace`.
    pub async fn finish(&mut self, grace: Duration) -> Result<Option<ScanStats>> {
        let Some(handle) = self.handle.as_mut() else {
            return Ok(None);
        };

        match tokio::time::timeout(grace, handle).await {
            Ok(joined) => {
                self.handle = None;
                self.cancel_token = None;
                self.criteria = None;
                let stats = joined.context("scan loop task failed to join")?;
                info!("Scan finished");
                Ok(Some(stats))
            }
            Err(_) => {
                warn!("Scan loop still busy after {grace:?}; cancelling");
                self.stop_scanning().await
            }
        }
    }

    async fn join(&mut self) -> Result<Option<ScanStats>> {
        match self.handle.take() {
            Some(handle) => {
                let stats = handle.await.context("scan loop task failed to join")?;
                self.cancel_token = None;
                self.criteria = None;
                Ok(Some(stats))
            }
            None => Ok(None),
        }
    }
}
