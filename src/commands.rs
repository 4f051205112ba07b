use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::{
    beacon::manufacturer_data,
    models::{DiscoveryEvent, FilterCriteria, SessionInfo},
    protocol::{parse_command, serialize_message, DeviceMessage, HostCommand, VERSION},
    scanner::ScanStats,
    AppState,
};

/// How long a stopping scan may spend draining queued discoveries.
const SCAN_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Read commands line by line until EOF, answering each with one reply line.
/// A running scan is stopped before returning.
pub async fn serve<R, W>(state: &AppState, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines
        .next_line()
        .await
        .context("failed to read command")?
    {
        let reply = match parse_command(&line) {
            Ok(Some(command)) => handle_command(state, command).await,
            Ok(None) => continue,
            Err(err) => {
                warn!("Rejected input line: {err:#}");
                DeviceMessage::error(format!("{err:#}"))
            }
        };

        let encoded = serialize_message(&reply)?;
        writer
            .write_all(encoded.as_bytes())
            .await
            .context("failed to write reply")?;
        writer.flush().await.context("failed to flush reply")?;
    }

    info!("Input closed; shutting down");
    if stop_scan(state).await?.is_some() {
        debug!("Stopped scan on shutdown");
    }
    Ok(())
}

/// Run one command. Failures become an `error` reply.
pub async fn handle_command(state: &AppState, command: HostCommand) -> DeviceMessage {
    let result = match command {
        HostCommand::StartScan => start_scan(state).await,
        HostCommand::StopScan => stop_scan(state).await.and_then(|stats| {
            stats
                .map(|stats| DeviceMessage::ScanStopped { stats })
                .ok_or_else(|| anyhow!("no scan is running"))
        }),
        HostCommand::Advertisement {
            device_id,
            data,
            rssi,
        } => advertisement(state, device_id, &data, rssi).await,
        HostCommand::AdvertisementPayload {
            device_id,
            payload,
            rssi,
        } => advertisement_payload(state, device_id, &payload, rssi).await,
        HostCommand::StartSession { name } => start_session(state, name.as_deref()).await,
        HostCommand::SaveSession { name } => save_session(state, &name).await,
        HostCommand::DiscardSession => discard_session(state).await,
        HostCommand::GetStatus => Ok(get_status(state).await),
        HostCommand::GetCriteria => Ok(DeviceMessage::Criteria {
            criteria: state.settings.load_criteria(),
        }),
        HostCommand::SetCriteria {
            target_uuid,
            rssi_threshold,
        } => set_criteria(
            state,
            FilterCriteria {
                target_uuid,
                rssi_threshold,
            },
        ),
        HostCommand::ListSessions => list_sessions(state).await,
        HostCommand::DeleteSession { id } => delete_session(state, &id).await,
    };

    result.unwrap_or_else(|err| DeviceMessage::error(format!("{err:#}")))
}

async fn start_scan(state: &AppState) -> Result<DeviceMessage> {
    let mut scanner = state.scanner.lock().await;
    let criteria = state.settings.load_criteria();

    let (sender, receiver) = mpsc::channel(state.scan_buffer);
    scanner.start_scanning(receiver, criteria.clone(), state.recorder.clone())?;
    *state.discoveries.lock().await = Some(sender);

    Ok(DeviceMessage::Criteria { criteria })
}

/// Close the discovery queue and wait for the loop to drain it.
async fn stop_scan(state: &AppState) -> Result<Option<ScanStats>> {
    let mut scanner = state.scanner.lock().await;
    state.discoveries.lock().await.take();
    scanner.finish(SCAN_DRAIN_GRACE).await
}

async fn advertisement(
    state: &AppState,
    device_id: String,
    data: &str,
    rssi: i16,
) -> Result<DeviceMessage> {
    let manufacturer_data = hex::decode(data.trim()).context("advertisement data is not hex")?;
    forward(state, DiscoveryEvent::new(device_id, manufacturer_data, rssi)).await
}

async fn advertisement_payload(
    state: &AppState,
    device_id: String,
    payload: &str,
    rssi: i16,
) -> Result<DeviceMessage> {
    let payload = hex::decode(payload.trim()).context("advertisement payload is not hex")?;
    let Some(data) = manufacturer_data(&payload) else {
        return Ok(DeviceMessage::ok_with("no manufacturer data"));
    };
    forward(state, DiscoveryEvent::new(device_id, data.to_vec(), rssi)).await
}

async fn forward(state: &AppState, event: DiscoveryEvent) -> Result<DeviceMessage> {
    let sender = state.discoveries.lock().await.clone();
    let Some(sender) = sender else {
        debug!("Not scanning; dropped advertisement from {}", event.device_id);
        return Ok(DeviceMessage::ok_with("not scanning"));
    };

    sender
        .send(event)
        .await
        .map_err(|_| anyhow!("scan loop is no longer running"))?;
    Ok(DeviceMessage::ok())
}

async fn start_session(state: &AppState, name: Option<&str>) -> Result<DeviceMessage> {
    let session = state.recorder.start(name).await?;
    Ok(DeviceMessage::SessionSummary {
        session: SessionInfo::from(&session),
    })
}

async fn save_session(state: &AppState, name: &str) -> Result<DeviceMessage> {
    let session = state.recorder.save(name).await?;
    Ok(DeviceMessage::Session { session })
}

async fn discard_session(state: &AppState) -> Result<DeviceMessage> {
    let session = state.recorder.discard().await?;
    Ok(DeviceMessage::SessionSummary { session })
}

async fn get_status(state: &AppState) -> DeviceMessage {
    let scanner = state.scanner.lock().await;
    DeviceMessage::Status {
        scanning: scanner.is_scanning(),
        recorder: state.recorder.snapshot().await,
        criteria: scanner.criteria().cloned(),
        version: VERSION,
    }
}

fn set_criteria(state: &AppState, criteria: FilterCriteria) -> Result<DeviceMessage> {
    let criteria = state.settings.save_criteria(&criteria)?;
    Ok(DeviceMessage::Criteria { criteria })
}

async fn list_sessions(state: &AppState) -> Result<DeviceMessage> {
    let sessions = state
        .store
        .list_saved_sessions()
        .await
        .context("failed to list saved sessions")?;
    Ok(DeviceMessage::Sessions {
        sessions: sessions.iter().map(SessionInfo::from).collect(),
    })
}

async fn delete_session(state: &AppState, session_id: &str) -> Result<DeviceMessage> {
    state
        .store
        .delete_saved_session(session_id)
        .await
        .with_context(|| format!("failed to delete session {session_id}"))?;
    Ok(DeviceMessage::ok())
}
