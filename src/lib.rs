pub mod beacon;
pub mod commands;
pub mod config;
pub mod db;
pub mod models;
pub mod protocol;
pub mod recorder;
pub mod scanner;
pub mod settings;
pub mod store;
pub mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::io::BufReader;
use tokio::sync::{mpsc, Mutex};

use config::AppConfig;
use db::Database;
use models::DiscoveryEvent;
use recorder::SessionRecorder;
use scanner::ScanController;
use settings::SettingsStore;
use store::SessionStore;

/// Everything a command handler can reach.
pub struct AppState {
    pub(crate) store: Arc<dyn SessionStore>,
    pub(crate) recorder: SessionRecorder,
    pub(crate) settings: SettingsStore,
    pub(crate) scanner: Mutex<ScanController>,
    /// Sending half of the running scan's queue. Always locked after `scanner`.
    pub(crate) discoveries: Mutex<Option<mpsc::Sender<DiscoveryEvent>>>,
    pub(crate) scan_buffer: usize,
}

impl AppState {
    pub fn new(store: Arc<dyn SessionStore>, settings: SettingsStore, scan_buffer: usize) -> Self {
        Self {
            recorder: SessionRecorder::new(store.clone()),
            store,
            settings,
            scanner: Mutex::new(ScanController::new()),
            discoveries: Mutex::new(None),
            scan_buffer: scan_buffer.max(1),
        }
    }

    pub fn recorder(&self) -> &SessionRecorder {
        &self.recorder
    }
}

/// Open storage under `config.data_dir` and pick up any session that was in
/// progress when the previous run ended.
pub async fn open_app(config: &AppConfig) -> Result<AppState> {
    std::fs::create_dir_all(&config.data_dir).with_context(|| {
        format!(
            "failed to create data directory {}",
            config.data_dir.display()
        )
    })?;

    let database = Database::new(config.database_path())?;
    let settings = SettingsStore::new(config.settings_path())?;
    let state = AppState::new(Arc::new(database), settings, config.scan_buffer);

    if let Some(session) = state.recorder.restore().await? {
        warn!(
            "Recovered in-progress session {} ('{}') with {} reads",
            session.id, session.name, session.read_count
        );
    }

    Ok(state)
}

pub fn run() -> Result<()> {
    let config = AppConfig::from_env();

    // RUST_LOG still wins over the configured level
    env_logger::Builder::new()
        .filter_level(config.log_level())
        .parse_default_env()
        .init();

    info!("beacon-recorder {} starting up...", protocol::VERSION);
    info!("Data directory: {}", config.data_dir.display());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async move {
        let state = open_app(&config).await?;
        let stdin = BufReader::new(tokio::io::stdin());
        commands::serve(&state, stdin, tokio::io::stdout()).await
    })
}
