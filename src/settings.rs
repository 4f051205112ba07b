use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::models::FilterCriteria;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserSettings {
    #[serde(default)]
    criteria: FilterCriteria,
}

/// JSON-file backed settings. Criteria are validated on the way in, and
/// anything unreadable on the way out falls back to defaults.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            parse_settings(&contents)
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn load_criteria(&self) -> FilterCriteria {
        self.read().criteria.clone()
    }

    /// Validate, normalize and persist new criteria. Invalid criteria leave
    /// both the file and the in-memory copy untouched.
    pub fn save_criteria(&self, criteria: &FilterCriteria) -> Result<FilterCriteria> {
        let normalized = criteria.normalized()?;
        {
            let mut guard = self.write();
            let mut updated = guard.clone();
            updated.criteria = normalized.clone();
            self.persist(&updated)?;
            *guard = updated;
        }

        info!(
            "Filter criteria updated: uuid={} threshold={}dBm",
            normalized.target_uuid, normalized.rssi_threshold
        );
        Ok(normalized)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn parse_settings(contents: &str) -> UserSettings {
    let settings: UserSettings = match serde_json::from_str(contents) {
        Ok(settings) => settings,
        Err(err) => {
            warn!("Settings file is unreadable, using defaults: {err}");
            return UserSettings::default();
        }
    };

    match settings.criteria.normalized() {
        Ok(criteria) => UserSettings { criteria },
        Err(err) => {
            warn!("Stored filter criteria are invalid, using defaults: {err}");
            UserSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::criteria::{DEFAULT_RSSI_THRESHOLD, DEFAULT_TARGET_UUID};

    fn store_in(dir: &tempfile::TempDir) -> SettingsStore {
        SettingsStore::new(dir.path().join("settings.json")).unwrap()
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let criteria = store_in(&dir).load_criteria();
        assert_eq!(criteria.target_uuid, DEFAULT_TARGET_UUID);
        assert_eq!(criteria.rssi_threshold, DEFAULT_RSSI_THRESHOLD);
    }

    #[test]
    fn saved_criteria_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let saved = store_in(&dir)
            .save_criteria(&FilterCriteria {
                target_uuid: "aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee".into(),
                rssi_threshold: -85,
            })
            .unwrap();
        assert_eq!(saved.target_uuid, "AAAAAAAA-BBBB-CCCC-DDDD-EEEEEEEEEEEE");

        assert_eq!(store_in(&dir).load_criteria(), saved);
    }

    #[test]
    fn invalid_criteria_are_rejected_without_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let out_of_range = FilterCriteria {
            target_uuid: DEFAULT_TARGET_UUID.into(),
            rssi_threshold: 5,
        };
        assert!(store.save_criteria(&out_of_range).is_err());

        let malformed = FilterCriteria {
            target_uuid: "not-a-uuid".into(),
            rssi_threshold: -60,
        };
        assert!(store.save_criteria(&malformed).is_err());

        assert_eq!(store.load_criteria(), FilterCriteria::default());
        assert!(!dir.path().join("settings.json").exists());
    }

    #[test]
    fn corrupt_or_invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        fs::write(&path, "{ not json").unwrap();
        assert_eq!(store_in(&dir).load_criteria(), FilterCriteria::default());

        fs::write(
            &path,
            r#"{"criteria":{"targetUuid":"E101B392-ADA3-2224-2316-05EF58774925","rssiThreshold":-150}}"#,
        )
        .unwrap();
        assert_eq!(store_in(&dir).load_criteria(), FilterCriteria::default());
    }
}
