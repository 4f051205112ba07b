use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    beacon::{decode_ibeacon, evaluate, FilterDecision},
    models::{BeaconRead, DiscoveryEvent, FilterCriteria},
    recorder::{RecorderError, SessionRecorder},
    utils::time::now_millis,
};

// Set to false to silence per-event logging from the scan loop
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Counters for one scan run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStats {
    pub events: u64,
    pub decoded: u64,
    pub accepted: u64,
    pub recorded: u64,
    /// Accepted while no session was active.
    pub dropped_idle: u64,
    pub failed: u64,
}

/// Decode, filter and record discovery events until the source closes or the
/// token is cancelled. Events are handled one at a time in arrival order.
pub async fn scan_loop(
    mut events: mpsc::Receiver<DiscoveryEvent>,
    criteria: FilterCriteria,
    recorder: SessionRecorder,
    cancel_token: CancellationToken,
) -> ScanStats {
    let mut stats = ScanStats::default();

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("scan loop cancelled");
                break;
            }
            event = events.recv() => {
                let Some(event) = event else {
                    log_info!("scan source closed");
                    break;
                };
                process_event(&event, &criteria, &recorder, &mut stats).await;
            }
        }
    }

    log_info!(
        "scan finished: {} events, {} decoded, {} accepted, {} recorded",
        stats.events,
        stats.decoded,
        stats.accepted,
        stats.recorded
    );
    stats
}

async fn process_event(
    event: &DiscoveryEvent,
    criteria: &FilterCriteria,
    recorder: &SessionRecorder,
    stats: &mut ScanStats,
) {
    stats.events += 1;

    let advertisement = match decode_ibeacon(&event.manufacturer_data, event.rssi) {
        Ok(advertisement) => advertisement,
        Err(reason) => {
            log::trace!("ignoring {}: {reason}", event.device_id);
            return;
        }
    };
    stats.decoded += 1;

    let decision = evaluate(&advertisement, criteria);
    if decision != FilterDecision::Accepted {
        log_debug!(
            "filtered {} {}/{} rssi={} ({})",
            event.device_id,
            advertisement.major,
            advertisement.minor,
            advertisement.rssi,
            decision.as_str()
        );
        return;
    }
    stats.accepted += 1;

    let read = BeaconRead::from_advertisement(&advertisement, now_millis());
    match recorder.record(read).await {
        Ok(count) => {
            stats.recorded += 1;
            log_debug!(
                "recorded {}/{} rssi={} from {} (session now has {count} reads)",
                advertisement.major,
                advertisement.minor,
                advertisement.rssi,
                event.device_id
            );
        }
        Err(RecorderError::InvalidState { .. }) => {
            stats.dropped_idle += 1;
            log_debug!("no active session; dropped read from {}", event.device_id);
        }
        Err(err @ RecorderError::ReadBeforeStart { .. }) => {
            stats.failed += 1;
            log_warn!("dropped read from {}: {err}", event.device_id);
        }
        Err(err) => {
            stats.failed += 1;
            log_error!("failed to record read from {}: {err:#}", event.device_id);
        }
    }
}
