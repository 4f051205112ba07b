use std::path::PathBuf;

use directories::ProjectDirs;
use log::warn;

pub const DATA_DIR_ENV: &str = "BEACON_RECORDER_DATA_DIR";
pub const DEBUG_ENV: &str = "BEACON_RECORDER_DEBUG";
pub const SCAN_BUFFER_ENV: &str = "BEACON_RECORDER_SCAN_BUFFER";

pub const DEFAULT_SCAN_BUFFER: usize = 64;
const FALLBACK_DATA_DIR: &str = "./beacon-recorder-data";

pub const DATABASE_FILE: &str = "beacons.sqlite3";
pub const SETTINGS_FILE: &str = "settings.json";

/// Runtime configuration, resolved once at startup from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub debug: bool,
    /// Capacity of the discovery queue between the host and the scan loop.
    pub scan_buffer: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = lookup(DATA_DIR_ENV)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let debug = lookup(DEBUG_ENV)
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let scan_buffer = match lookup(SCAN_BUFFER_ENV) {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(size) if size >= 1 => size,
                _ => {
                    warn!(
                        "Ignoring {SCAN_BUFFER_ENV}={raw:?}; using {DEFAULT_SCAN_BUFFER}"
                    );
                    DEFAULT_SCAN_BUFFER
                }
            },
            None => DEFAULT_SCAN_BUFFER,
        };

        Self {
            data_dir,
            debug,
            scan_buffer,
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILE)
    }

    pub fn log_level(&self) -> log::LevelFilter {
        if self.debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }
}

fn default_data_dir() -> PathBuf {
    ProjectDirs::from("", "", "beacon-recorder")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(FALLBACK_DATA_DIR))
}
