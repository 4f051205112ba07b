//! Operator-configured filter criteria.
//!
//! Criteria are validated where they are written (see
//! [`SettingsStore::save_criteria`](crate::settings::SettingsStore::save_criteria));
//! the filter engine assumes it only ever sees validated values.

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TARGET_UUID: &str = "E101B392-ADA3-2224-2316-05EF58774925";
pub const DEFAULT_RSSI_THRESHOLD: i16 = -70;

pub const MIN_RSSI_THRESHOLD: i16 = -100;
pub const MAX_RSSI_THRESHOLD: i16 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    pub target_uuid: String,
    pub rssi_threshold: i16,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            target_uuid: DEFAULT_TARGET_UUID.into(),
            rssi_threshold: DEFAULT_RSSI_THRESHOLD,
        }
    }
}

impl FilterCriteria {
    /// Validates both fields and returns a copy with the UUID uppercased.
    pub fn normalized(&self) -> Result<Self> {
        validation::validate_uuid(&self.target_uuid)?;
        validation::validate_rssi_threshold(self.rssi_threshold)?;

        Ok(Self {
            target_uuid: self.target_uuid.to_ascii_uppercase(),
            rssi_threshold: self.rssi_threshold,
        })
    }
}

pub mod validation {
    use anyhow::{bail, Result};

    use super::{MAX_RSSI_THRESHOLD, MIN_RSSI_THRESHOLD};

    const GROUP_LENGTHS: [usize; 5] = [8, 4, 4, 4, 12];

    /// Accepts only the 8-4-4-4-12 hyphenated form. Braced, URN and
    /// hyphen-less spellings are rejected.
    pub fn validate_uuid(value: &str) -> Result<()> {
        let groups: Vec<&str> = value.split('-').collect();
        if groups.len() != GROUP_LENGTHS.len() {
            bail!("Invalid UUID '{value}'. Expected 8-4-4-4-12 hexadecimal groups");
        }

        for (group, expected_len) in groups.iter().zip(GROUP_LENGTHS) {
            if group.len() != expected_len || !group.chars().all(|c| c.is_ascii_hexdigit()) {
                bail!("Invalid UUID '{value}'. Expected 8-4-4-4-12 hexadecimal groups");
            }
        }

        Ok(())
    }

    pub fn validate_rssi_threshold(threshold: i16) -> Result<()> {
        if !(MIN_RSSI_THRESHOLD..=MAX_RSSI_THRESHOLD).contains(&threshold) {
            bail!(
                "Invalid RSSI threshold {threshold}. Must be between {MIN_RSSI_THRESHOLD} and {MAX_RSSI_THRESHOLD} dBm"
            );
        }
        Ok(())
    }
}
