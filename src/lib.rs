#![no_std]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![allow(dead_code, clippy::unused_async, clippy::too_many_lines)]

mod address;
pub mod codec;
pub mod constants;
pub mod control;
pub mod flow;
pub mod frame;
pub mod properties;
pub mod runner;
pub mod session;
pub mod transport;

use crate::constants::VOLUME_UNKNOWN;
use crate::control::{AudioStatus, AudioType, OtherState};
use crate::properties::ReadOnlyProperties;

pub use address::DeviceAddress;
pub use codec::G722Encoder;
pub use session::StreamingSession;
pub use transport::{SessionEvent, Transport};

/// Errors that can terminate or reject a session operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum AshaError {
    /// A caller-supplied value is malformed
    InvalidParameter,
    /// The operation is not valid in the current session state
    InvalidState,
    /// The ReadOnlyProperties record could not be parsed
    MalformedRecord,
    /// The `LE_PSM_OUT` value could not be parsed
    MalformedPsm,
    /// The device rejected the `Start` parameters
    RejectedParameters,
    /// The audio channel could not be opened, retries included
    ChannelOpenFailed,
    /// The transport connection dropped
    TransportDisconnected,
    /// A transport operation failed
    Transport,
    /// The G.722 encoder failed
    Codec,
}

impl core::fmt::Display for AshaError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidParameter => write!(f, "Invalid parameter"),
            Self::InvalidState => write!(f, "Operation invalid in current state"),
            Self::MalformedRecord => write!(f, "Malformed ReadOnlyProperties record"),
            Self::MalformedPsm => write!(f, "Malformed LE_PSM_OUT value"),
            Self::RejectedParameters => write!(f, "Device rejected start parameters"),
            Self::ChannelOpenFailed => write!(f, "Audio channel open failed"),
            Self::TransportDisconnected => write!(f, "Transport disconnected"),
            Self::Transport => write!(f, "Transport operation failed"),
            Self::Codec => write!(f, "Audio encoder failed"),
        }
    }
}

/// Session lifecycle states
///
/// States advance monotonically along the happy path; `Closed` and
/// `Failed` are terminal and a session is never reused after reaching
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum SessionState {
    /// Created, nothing started
    Idle,
    /// Scanning for an ASHA peripheral
    Discovering,
    /// Device connection established
    Connected,
    /// ReadOnlyProperties parsed and stored
    CapabilitiesKnown,
    /// `Start` written, waiting for the audio channel
    ChannelNegotiating,
    /// Audio channel open, waiting for the device status
    ChannelOpen,
    /// Audio frames are flowing
    Streaming,
    /// `Stop` written, flushing the output queue
    Stopping,
    /// Ended in an orderly fashion
    Closed,
    /// Ended with an error
    Failed(AshaError),
}

impl SessionState {
    /// Whether the session has ended
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed(_))
    }
}

/// Streaming parameters fixed at session creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct SessionOptions {
    /// Audio type announced in the `Start` command
    pub audio_type: AudioType,
    /// Initial volume in [-127, 127]; 127 means unknown
    pub volume: i8,
    /// Whether the other device of a binaural set is connected
    pub other_state: OtherState,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            audio_type: AudioType::Media,
            volume: VOLUME_UNKNOWN,
            other_state: OtherState::Disconnected,
        }
    }
}

/// Read-only view of a session for observers
///
/// Published by [`runner::run`] on every state change; carrying the data
/// by value keeps observers off the session's mutation path.
#[derive(Debug, Clone, Copy)]
pub struct SessionSnapshot {
    /// Current lifecycle state
    pub state: SessionState,
    /// Device capabilities, once read
    pub properties: Option<ReadOnlyProperties>,
    /// Most recent recognized status notification
    pub last_status: Option<AudioStatus>,
    /// Audio channel PSM, once negotiated
    pub psm: Option<u16>,
}

#[cfg(test)]
#[defmt::global_logger]
struct TestLogger;

#[cfg(test)]
unsafe impl defmt::Logger for TestLogger {
    fn acquire() {}
    unsafe fn flush() {}
    unsafe fn release() {}
    unsafe fn write(_bytes: &[u8]) {}
}

#[cfg(test)]
defmt::timestamp!("");

#[cfg(test)]
#[defmt::panic_handler]
fn defmt_panic() -> ! {
    panic!()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(SessionState::Closed.is_terminal());
        assert!(SessionState::Failed(AshaError::Transport).is_terminal());
        for state in [
            SessionState::Idle,
            SessionState::Discovering,
            SessionState::Connected,
            SessionState::CapabilitiesKnown,
            SessionState::ChannelNegotiating,
            SessionState::ChannelOpen,
            SessionState::Streaming,
            SessionState::Stopping,
        ] {
            assert!(!state.is_terminal());
        }
    }

    #[test]
    fn test_default_session_options() {
        let options = SessionOptions::default();
        assert_eq!(options.audio_type, AudioType::Media);
        assert_eq!(options.volume, VOLUME_UNKNOWN);
        assert_eq!(options.other_state, OtherState::Disconnected);
    }
}
