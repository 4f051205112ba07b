//! iBeacon frame decoding.
//!
//! Manufacturer data layout (25 bytes, multi-byte fields big-endian except
//! the company id):
//!
//! ```text
//!   0..2   company id 0x004C, little-endian (4C 00)
//!   2      beacon type 0x02
//!   3      remaining length 0x15
//!   4..20  proximity UUID
//!   20..22 major
//!   22..24 minor
//!   24     calibrated tx power (signed, dBm at 1m)
//! ```
//!
//! Decoding never fails hard: anything that is not an iBeacon frame yields a
//! [`NotIBeacon`] reason the caller is free to ignore.

use thiserror::Error;
use uuid::Uuid;

use crate::models::BeaconAdvertisement;

/// Bluetooth SIG company identifier the iBeacon format is registered under.
pub const IBEACON_COMPANY_ID: u16 = 0x004C;
pub const IBEACON_TYPE: u8 = 0x02;
pub const IBEACON_REMAINING_LEN: u8 = 0x15;
pub const IBEACON_FRAME_LEN: usize = 25;

/// AD structure type for manufacturer specific data.
const AD_TYPE_MANUFACTURER_DATA: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NotIBeacon {
    #[error("frame too short: {0} bytes")]
    TooShort(usize),
    #[error("company id {0:#06x} is not the iBeacon vendor")]
    WrongCompany(u16),
    #[error("beacon type/length {0:#04x} {1:#04x} is not an iBeacon marker")]
    WrongMarker(u8, u8),
}

/// Decode a manufacturer-data field into an advertisement, attaching `rssi`
/// unchanged. Bytes past the 25-byte frame are ignored.
pub fn decode_ibeacon(data: &[u8], rssi: i16) -> Result<BeaconAdvertisement, NotIBeacon> {
    let frame: &[u8; IBEACON_FRAME_LEN] = data
        .get(..IBEACON_FRAME_LEN)
        .and_then(|head| head.try_into().ok())
        .ok_or(NotIBeacon::TooShort(data.len()))?;

    let company_id = u16::from_le_bytes([frame[0], frame[1]]);
    if company_id != IBEACON_COMPANY_ID {
        return Err(NotIBeacon::WrongCompany(company_id));
    }

    if frame[2] != IBEACON_TYPE || frame[3] != IBEACON_REMAINING_LEN {
        return Err(NotIBeacon::WrongMarker(frame[2], frame[3]));
    }

    let mut uuid_bytes = [0u8; 16];
    uuid_bytes.copy_from_slice(&frame[4..20]);

    Ok(BeaconAdvertisement {
        uuid: format_uuid(&uuid_bytes),
        major: u16::from_be_bytes([frame[20], frame[21]]),
        minor: u16::from_be_bytes([frame[22], frame[23]]),
        rssi,
        tx_power: frame[24] as i8,
    })
}

/// Render 16 bytes as `XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX`.
pub fn format_uuid(bytes: &[u8; 16]) -> String {
    Uuid::from_bytes(*bytes)
        .hyphenated()
        .to_string()
        .to_ascii_uppercase()
}

/// Find the first manufacturer-specific field in a raw advertising payload.
///
/// AD structure format: `[length] [type] [data...]`, where `length` covers
/// the type byte and the data. A zero length or a structure running past the
/// end of the payload stops the walk.
pub fn manufacturer_data(ad_payload: &[u8]) -> Option<&[u8]> {
    let mut pos = 0;
    while pos < ad_payload.len() {
        let len = ad_payload[pos] as usize;
        if len == 0 || pos + 1 + len > ad_payload.len() {
            return None;
        }

        let ad_type = ad_payload[pos + 1];
        if ad_type == AD_TYPE_MANUFACTURER_DATA {
            return Some(&ad_payload[pos + 2..pos + 1 + len]);
        }

        pos += 1 + len;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE_UUID: [u8; 16] = [
        0xE1, 0x01, 0xB3, 0x92, 0xAD, 0xA3, 0x22, 0x24, 0x23, 0x16, 0x05, 0xEF, 0x58, 0x77, 0x49,
        0x25,
    ];

    fn fixture_frame(major: u16, minor: u16, tx_power: i8) -> Vec<u8> {
        let mut frame = vec![0x4C, 0x00, 0x02, 0x15];
        frame.extend_from_slice(&FIXTURE_UUID);
        frame.extend_from_slice(&major.to_be_bytes());
        frame.extend_from_slice(&minor.to_be_bytes());
        frame.push(tx_power as u8);
        frame
    }

    #[test]
    fn decodes_fixture_frame() {
        let adv = decode_ibeacon(&fixture_frame(0x0102, 0xBEEF, -59), -64).unwrap();
        assert_eq!(adv.uuid, "E101B392-ADA3-2224-2316-05EF58774925");
        assert_eq!(adv.major, 0x0102);
        assert_eq!(adv.minor, 0xBEEF);
        assert_eq!(adv.rssi, -64);
        assert_eq!(adv.tx_power, -59);
    }

    #[test]
    fn major_and_minor_are_big_endian() {
        let adv = decode_ibeacon(&fixture_frame(1, 65535, 0), -50).unwrap();
        assert_eq!(adv.major, 1);
        assert_eq!(adv.minor, 65535);
    }

    #[test]
    fn every_short_prefix_is_rejected() {
        let frame = fixture_frame(1, 2, -59);
        for len in 0..IBEACON_FRAME_LEN {
            assert_eq!(
                decode_ibeacon(&frame[..len], -60),
                Err(NotIBeacon::TooShort(len)),
                "prefix of {len} bytes"
            );
        }
    }

    #[test]
    fn rejects_other_vendors() {
        let mut frame = fixture_frame(1, 2, -59);
        frame[0] = 0x59;
        assert_eq!(
            decode_ibeacon(&frame, -60),
            Err(NotIBeacon::WrongCompany(0x0059))
        );

        // Byte-swapped company id is a different vendor, not Apple.
        let mut swapped = fixture_frame(1, 2, -59);
        swapped[0] = 0x00;
        swapped[1] = 0x4C;
        assert!(matches!(
            decode_ibeacon(&swapped, -60),
            Err(NotIBeacon::WrongCompany(_))
        ));
    }

    #[test]
    fn rejects_wrong_marker() {
        for (index, value) in [(2usize, 0x10u8), (3, 0x05)] {
            let mut frame = fixture_frame(1, 2, -59);
            frame[index] = value;
            assert!(matches!(
                decode_ibeacon(&frame, -60),
                Err(NotIBeacon::WrongMarker(_, _))
            ));
        }
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut frame = fixture_frame(7, 8, -59);
        frame.extend_from_slice(&[0xAA, 0xBB]);
        let adv = decode_ibeacon(&frame, -70).unwrap();
        assert_eq!((adv.major, adv.minor), (7, 8));
    }

    #[test]
    fn uuid_is_uppercase_hyphenated() {
        let uuid = format_uuid(&FIXTURE_UUID);
        assert_eq!(uuid.len(), 36);
        assert_eq!(uuid, "E101B392-ADA3-2224-2316-05EF58774925");
    }

    #[test]
    fn finds_manufacturer_data_in_payload() {
        let frame = fixture_frame(3, 4, -59);
        // Flags structure, then the manufacturer data structure.
        let mut payload = vec![0x02, 0x01, 0x06, (frame.len() + 1) as u8, 0xFF];
        payload.extend_from_slice(&frame);

        let data = manufacturer_data(&payload).unwrap();
        assert_eq!(data, frame.as_slice());
        assert_eq!(decode_ibeacon(data, -55).unwrap().minor, 4);
    }

    #[test]
    fn truncated_payload_yields_nothing() {
        assert_eq!(manufacturer_data(&[]), None);
        assert_eq!(manufacturer_data(&[0x00, 0xFF]), None);
        assert_eq!(manufacturer_data(&[0x1A, 0xFF, 0x4C, 0x00]), None);
        assert_eq!(manufacturer_data(&[0x02, 0x01, 0x06]), None);
    }
}
