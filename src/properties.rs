//! ReadOnlyProperties Parsing
//!
//! This module decodes the ASHA ReadOnlyProperties characteristic, a fixed
//! 17-byte read-only record advertised by the hearing device. The record
//! describes which ear the device sits in, whether it is half of a binaural
//! set, its HiSyncId, feature flags, render delay, and supported codecs.
//!
//! Record layout (all multi-byte fields little-endian):
//!
//! | Bytes  | Field                               |
//! |--------|-------------------------------------|
//! | 0      | Version                             |
//! | 1      | Device capabilities (bitfield)      |
//! | 2..=9  | HiSyncId (2-byte mfg id + 6-byte set id) |
//! | 10     | Feature map (bitfield)              |
//! | 11..=12| Render delay in ms                  |
//! | 13..=14| Reserved                            |
//! | 15..=16| Supported codec IDs (bitfield)      |

use crate::constants::READ_ONLY_PROPERTIES_LENGTH;

/// ReadOnlyProperties parsing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertiesError {
    /// Record is not exactly 17 bytes long
    InvalidLength,
}

impl core::fmt::Display for PropertiesError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidLength => write!(f, "ReadOnlyProperties record must be 17 bytes"),
        }
    }
}

/// Which ear the device is fitted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum DeviceSide {
    /// Left ear device
    Left,
    /// Right ear device
    Right,
}

/// Whether the device is standalone or half of a binaural pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum BinauralType {
    /// Single standalone device
    Monaural,
    /// One device of a left/right set
    Binaural,
}

/// Device capabilities bitfield (record byte 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCapabilities {
    /// Which ear the device is fitted to (bit 0)
    pub device_side: DeviceSide,
    /// Monaural or binaural deployment (bit 1)
    pub binaural_type: BinauralType,
    /// Coordinated Set Identification Service support (bit 2)
    pub supports_csis: bool,
    /// Remaining bits, kept verbatim
    pub reserved: u8,
}

impl DeviceCapabilities {
    /// Decode the capabilities bitfield from record byte 1
    #[must_use]
    pub fn from_byte(byte: u8) -> Self {
        Self {
            device_side: if byte & 0b0000_0001 != 0 {
                DeviceSide::Right
            } else {
                DeviceSide::Left
            },
            binaural_type: if byte & 0b0000_0010 != 0 {
                BinauralType::Binaural
            } else {
                BinauralType::Monaural
            },
            supports_csis: byte & 0b0000_0100 != 0,
            reserved: byte & 0b1111_1000,
        }
    }
}

/// HiSyncId - identifies the binaural set a device belongs to
///
/// Both devices of a pair carry the same HiSyncId. The first two bytes
/// are the manufacturer identifier, the remaining six the set identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HiSyncId {
    /// Company identifier of the device manufacturer
    pub manufacturer_id: u16,
    /// 48-bit identifier shared by both devices of a set
    pub hearing_aid_set_id: u64,
}

impl HiSyncId {
    /// Decode the HiSyncId from record bytes 2..=9
    #[must_use]
    pub fn from_bytes(bytes: &[u8; 8]) -> Self {
        let manufacturer_id = u16::from_le_bytes([bytes[0], bytes[1]]);
        let mut set_id = [0u8; 8];
        set_id[..6].copy_from_slice(&bytes[2..8]);
        Self {
            manufacturer_id,
            hearing_aid_set_id: u64::from_le_bytes(set_id),
        }
    }
}

/// Feature map bitfield (record byte 10)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureMap {
    /// LE connection-oriented channel (CoC) audio output support (bit 0)
    pub le_coc_supported: bool,
    /// Remaining bits, kept verbatim
    pub reserved: u8,
}

impl FeatureMap {
    /// Decode the feature map from record byte 10
    #[must_use]
    pub fn from_byte(byte: u8) -> Self {
        Self {
            le_coc_supported: byte & 0b0000_0001 != 0,
            reserved: byte & 0b1111_1110,
        }
    }
}

/// Decoded ReadOnlyProperties record
///
/// Created once per successful capability read and held for the session
/// lifetime. Decoding is a pure function of the input bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOnlyProperties {
    /// Protocol version advertised by the device
    pub version: u8,
    /// Device capabilities bitfield
    pub device_capabilities: DeviceCapabilities,
    /// Binaural set identifier
    pub hi_sync_id: HiSyncId,
    /// Feature map bitfield
    pub feature_map: FeatureMap,
    /// Render delay in milliseconds the device applies before playback
    pub render_delay_ms: u16,
    /// Reserved bytes 13..=14, kept verbatim
    pub reserved: u16,
    /// Supported codec IDs bitfield
    pub supported_codec_ids: u16,
    /// G.722 @ 16 kHz support (bit 1 of the codec bitfield)
    pub g722_at_16khz_supported: bool,
}

impl ReadOnlyProperties {
    /// Parse a ReadOnlyProperties record from a characteristic value
    ///
    /// The record has a fixed 17-byte layout; truncated or padded input is
    /// rejected outright rather than partially decoded.
    ///
    /// # Errors
    /// Returns `PropertiesError::InvalidLength` if the input is not exactly
    /// 17 bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PropertiesError> {
        if bytes.len() != READ_ONLY_PROPERTIES_LENGTH {
            return Err(PropertiesError::InvalidLength);
        }

        let mut sync_id = [0u8; 8];
        sync_id.copy_from_slice(&bytes[2..10]);

        let supported_codec_ids = u16::from_le_bytes([bytes[15], bytes[16]]);

        Ok(Self {
            version: bytes[0],
            device_capabilities: DeviceCapabilities::from_byte(bytes[1]),
            hi_sync_id: HiSyncId::from_bytes(&sync_id),
            feature_map: FeatureMap::from_byte(bytes[10]),
            render_delay_ms: u16::from_le_bytes([bytes[11], bytes[12]]),
            reserved: u16::from_le_bytes([bytes[13], bytes[14]]),
            supported_codec_ids,
            g722_at_16khz_supported: supported_codec_ids & (1 << 1) != 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: [u8; 17] = [
        0x01, // version
        0x03, // capabilities: right, binaural, no CSIS
        0xAA, 0xBB, // manufacturer id
        0x01, 0x02, 0x03, 0x04, 0x05, 0x06, // set id
        0x01, // feature map: LE CoC
        0x10, 0x00, // render delay = 16 ms
        0x00, 0x00, // reserved
        0x02, 0x00, // codec ids: bit 1 = G.722 @ 16 kHz
    ];

    #[test]
    fn test_decode_full_record() {
        let props = ReadOnlyProperties::from_bytes(&RECORD).unwrap();

        assert_eq!(props.version, 1);
        assert_eq!(props.device_capabilities.device_side, DeviceSide::Right);
        assert_eq!(
            props.device_capabilities.binaural_type,
            BinauralType::Binaural
        );
        assert!(!props.device_capabilities.supports_csis);
        assert_eq!(props.hi_sync_id.manufacturer_id, 0xBBAA);
        assert_eq!(props.hi_sync_id.hearing_aid_set_id, 0x0000_0605_0403_0201);
        assert!(props.feature_map.le_coc_supported);
        assert_eq!(props.render_delay_ms, 16);
        assert_eq!(props.reserved, 0);
        assert_eq!(props.supported_codec_ids, 0x0002);
        assert!(props.g722_at_16khz_supported);
    }

    #[test]
    fn test_decode_with_csis_bit() {
        let mut record = RECORD;
        record[1] = 0x07;
        let props = ReadOnlyProperties::from_bytes(&record).unwrap();
        assert!(props.device_capabilities.supports_csis);
        assert_eq!(props.device_capabilities.reserved, 0);
    }

    #[test]
    fn test_decode_left_monaural() {
        let mut record = RECORD;
        record[1] = 0x00;
        let props = ReadOnlyProperties::from_bytes(&record).unwrap();
        assert_eq!(props.device_capabilities.device_side, DeviceSide::Left);
        assert_eq!(
            props.device_capabilities.binaural_type,
            BinauralType::Monaural
        );
    }

    #[test]
    fn test_decode_preserves_reserved_bits() {
        let mut record = RECORD;
        record[1] = 0xF8; // only reserved bits set
        record[10] = 0xFE; // only reserved bits set
        record[13] = 0x34;
        record[14] = 0x12;
        let props = ReadOnlyProperties::from_bytes(&record).unwrap();
        assert_eq!(props.device_capabilities.reserved, 0xF8);
        assert_eq!(props.feature_map.reserved, 0xFE);
        assert_eq!(props.reserved, 0x1234);
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        assert_eq!(
            ReadOnlyProperties::from_bytes(&[]),
            Err(PropertiesError::InvalidLength)
        );
        assert_eq!(
            ReadOnlyProperties::from_bytes(&RECORD[..16]),
            Err(PropertiesError::InvalidLength)
        );

        let mut padded = [0u8; 18];
        padded[..17].copy_from_slice(&RECORD);
        assert_eq!(
            ReadOnlyProperties::from_bytes(&padded),
            Err(PropertiesError::InvalidLength)
        );
    }

    #[test]
    fn test_decode_is_deterministic() {
        let a = ReadOnlyProperties::from_bytes(&RECORD).unwrap();
        let b = ReadOnlyProperties::from_bytes(&RECORD).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_g722_unsupported_when_bit_clear() {
        let mut record = RECORD;
        record[15] = 0x01; // bit 0 only
        let props = ReadOnlyProperties::from_bytes(&record).unwrap();
        assert_eq!(props.supported_codec_ids, 0x0001);
        assert!(!props.g722_at_16khz_supported);
    }
}
