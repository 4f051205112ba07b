use serde::{Deserialize, Serialize};

/// A decoded iBeacon frame. Ephemeral: it is filtered and then either turned
/// into a [`BeaconRead`](super::BeaconRead) or dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeaconAdvertisement {
    /// Canonical hyphenated uppercase form, e.g. `E101B392-ADA3-2224-2316-05EF58774925`.
    pub uuid: String,
    pub major: u16,
    pub minor: u16,
    /// Received signal strength in dBm, as reported by the scan source.
    pub rssi: i16,
    /// Calibrated transmit power at 1m. Not used for filtering.
    pub tx_power: i8,
}

/// One raw discovery reported by the scan source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryEvent {
    pub device_id: String,
    pub manufacturer_data: Vec<u8>,
    pub rssi: i16,
}

impl DiscoveryEvent {
    pub fn new(device_id: impl Into<String>, manufacturer_data: Vec<u8>, rssi: i16) -> Self {
        Self {
            device_id: device_id.into(),
            manufacturer_data,
            rssi,
        }
    }
}
