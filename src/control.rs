//! AudioControlPoint Command Codec
//!
//! This module encodes the commands written to the ASHA AudioControlPoint
//! characteristic and decodes the values the device reports back: the signed
//! status byte notified on the AudioStatus characteristic and the little-endian
//! PSM advertised on the `LE_PSM_OUT` characteristic.
//!
//! Every command serializes to a fixed-order byte sequence: one opcode byte
//! followed by one byte per field. There is no length prefix on the wire.

use crate::constants::PSM_VALUE_LENGTH;
use heapless::Vec;

/// Control codec errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlError {
    /// Characteristic value is too short to decode
    InsufficientData,
}

impl core::fmt::Display for ControlError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InsufficientData => write!(f, "Insufficient data for characteristic value"),
        }
    }
}

/// Audio type carried in a `Start` command
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
#[repr(u8)]
pub enum AudioType {
    /// Unspecified audio
    Unknown = 0x00,
    /// Ringtone audio
    Ringtone = 0x01,
    /// Phone call audio
    Phonecall = 0x02,
    /// Media playback audio
    Media = 0x03,
}

/// Codec selector carried in a `Start` command
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
#[repr(u8)]
pub enum CodecId {
    /// Codec outside the ASHA-defined set
    Other = 0x00,
    /// G.722 at 16 kHz
    G722At16kHz = 0x01,
}

/// Connection state of the other device of a binaural set
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
#[repr(u8)]
pub enum OtherState {
    /// The other device is not connected
    Disconnected = 0x00,
    /// The other device is connected
    Connected = 0x01,
}

/// Status payload of a `Status` command (opcode 0x03)
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
#[repr(u8)]
pub enum ConnectedStatus {
    /// The other device of the set disconnected
    OtherDisconnected = 0x00,
    /// The other device of the set connected
    OtherConnected = 0x01,
    /// Connection parameters were updated
    ConnectionParameterUpdate = 0x02,
}

/// Commands written to the AudioControlPoint characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Begin audio streaming (opcode 0x01)
    Start {
        /// Codec the central will stream with
        codec: CodecId,
        /// Kind of audio about to be streamed
        audio_type: AudioType,
        /// Volume in [-127, 127]; 127 means unknown
        volume: i8,
        /// Whether the other device of the set is connected
        other_state: OtherState,
    },
    /// Cease audio streaming (opcode 0x02)
    Stop,
    /// Report a connection status change (opcode 0x03)
    Status {
        /// What changed
        connected: ConnectedStatus,
        /// Negotiated connection interval code
        interval: u8,
    },
}

/// Maximum encoded length of a control command (`Start`: 5 bytes)
pub const MAX_COMMAND_LENGTH: usize = 5;

impl ControlCommand {
    /// `Start` opcode
    pub const OPCODE_START: u8 = 0x01;
    /// `Stop` opcode
    pub const OPCODE_STOP: u8 = 0x02;
    /// `Status` opcode
    pub const OPCODE_STATUS: u8 = 0x03;

    /// Encode the command for the AudioControlPoint characteristic
    ///
    /// Output is the opcode byte followed by the command fields in wire
    /// order, one byte each. Volume is stored as its raw two's-complement
    /// byte.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8, MAX_COMMAND_LENGTH> {
        let mut bytes = Vec::new();
        match *self {
            Self::Start {
                codec,
                audio_type,
                volume,
                other_state,
            } => {
                bytes.push(Self::OPCODE_START).ok();
                bytes.push(codec as u8).ok();
                bytes.push(audio_type as u8).ok();
                bytes.push(volume as u8).ok();
                bytes.push(other_state as u8).ok();
            }
            Self::Stop => {
                bytes.push(Self::OPCODE_STOP).ok();
            }
            Self::Status {
                connected,
                interval,
            } => {
                bytes.push(Self::OPCODE_STATUS).ok();
                bytes.push(connected as u8).ok();
                bytes.push(interval).ok();
            }
        }
        bytes
    }
}

/// Status reported on the AudioStatus characteristic
///
/// Decoded from the first byte of the notification, interpreted as a
/// signed integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum AudioStatus {
    /// Command accepted (0)
    Ok,
    /// Device did not recognize the command (-1)
    UnknownCommand,
    /// Device rejected the command parameters (-2)
    IllegalParameters,
}

impl AudioStatus {
    /// Decode a status notification
    ///
    /// Only the first byte is inspected. Returns `None` for an empty value
    /// or an undocumented status code - unknown accessory firmware may emit
    /// codes outside the profile, and the caller decides whether that is
    /// fatal.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes.first().map(|&b| b as i8) {
            Some(0) => Some(Self::Ok),
            Some(-1) => Some(Self::UnknownCommand),
            Some(-2) => Some(Self::IllegalParameters),
            _ => None,
        }
    }
}

/// Decode the PSM advertised on the `LE_PSM_OUT` characteristic
///
/// The PSM is a little-endian 16-bit value in the first two bytes of the
/// characteristic value.
///
/// # Errors
/// Returns `ControlError::InsufficientData` if fewer than two bytes are
/// present
pub fn decode_psm(bytes: &[u8]) -> Result<u16, ControlError> {
    if bytes.len() < PSM_VALUE_LENGTH {
        return Err(ControlError::InsufficientData);
    }
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}
