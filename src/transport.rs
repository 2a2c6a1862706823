//! Transport Seam and Inbound Events
//!
//! The platform Bluetooth stack (GATT client and L2CAP CoC socket) lives
//! outside this crate and is driven through the [`Transport`] trait.
//! Everything the platform reports back - connection events, characteristic
//! values, channel lifecycle, write readiness - plus PCM blocks from the
//! capture side is re-expressed as one [`SessionEvent`] enum. A single
//! consumer feeds those events into the session state machine, so state
//! mutation never scatters across platform callbacks.

use crate::address::DeviceAddress;
use crate::constants::{MAX_CHARACTERISTIC_VALUE, PCM_BLOCK_SAMPLES};
use heapless::Vec;

/// ASHA GATT characteristics the engine touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum Characteristic {
    /// 17-byte capability record (read)
    ReadOnlyProperties,
    /// Start/Stop/Status command sink (write)
    AudioControlPoint,
    /// Signed status byte (notify)
    AudioStatus,
    /// Volume control (write without response)
    Volume,
    /// PSM for the audio CoC channel (read)
    LePsmOut,
}

impl Characteristic {
    /// The 128-bit UUID string for this characteristic
    #[must_use]
    pub const fn uuid(&self) -> &'static str {
        match self {
            Self::ReadOnlyProperties => crate::constants::READ_ONLY_PROPERTIES_UUID,
            Self::AudioControlPoint => crate::constants::AUDIO_CONTROL_POINT_UUID,
            Self::AudioStatus => crate::constants::AUDIO_STATUS_UUID,
            Self::Volume => crate::constants::VOLUME_UUID,
            Self::LePsmOut => crate::constants::LE_PSM_OUT_UUID,
        }
    }
}

/// Acknowledgement mode for characteristic writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum WriteMode {
    /// Write with response
    WithResponse,
    /// Write without response
    WithoutResponse,
}

/// Platform Bluetooth stack collaborator
///
/// All methods are event-driven: reads and subscriptions complete by the
/// transport later delivering a [`SessionEvent`], not by returning data.
/// `write_channel` returns the number of bytes the channel accepted; the
/// transport signals renewed write capacity with
/// [`SessionEvent::WriteReady`].
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Transport-specific error type
    type Error: core::fmt::Debug;

    /// Start scanning for ASHA peripherals
    ///
    /// # Errors
    /// Returns the transport error if scanning cannot start
    async fn scan(&mut self) -> Result<(), Self::Error>;

    /// Connect to a discovered device
    ///
    /// # Errors
    /// Returns the transport error if the connection attempt cannot start
    async fn connect(&mut self, device: DeviceAddress) -> Result<(), Self::Error>;

    /// Request a characteristic read; the value arrives as
    /// [`SessionEvent::CharacteristicValue`]
    ///
    /// # Errors
    /// Returns the transport error if the read cannot be issued
    async fn read_characteristic(
        &mut self,
        characteristic: Characteristic,
    ) -> Result<(), Self::Error>;

    /// Write a characteristic value
    ///
    /// # Errors
    /// Returns the transport error if the write fails
    async fn write_characteristic(
        &mut self,
        characteristic: Characteristic,
        value: &[u8],
        mode: WriteMode,
    ) -> Result<(), Self::Error>;

    /// Subscribe to notifications on a characteristic
    ///
    /// # Errors
    /// Returns the transport error if the subscription fails
    async fn subscribe(&mut self, characteristic: Characteristic) -> Result<(), Self::Error>;

    /// Open the L2CAP CoC audio channel on the given PSM; completion is
    /// reported as [`SessionEvent::ChannelOpened`] or
    /// [`SessionEvent::ChannelOpenFailed`]
    ///
    /// # Errors
    /// Returns the transport error if the open cannot be issued
    async fn open_channel(&mut self, psm: u16) -> Result<(), Self::Error>;

    /// Write bytes to the audio channel, returning how many were accepted
    ///
    /// # Errors
    /// Returns the transport error if the channel write fails outright
    async fn write_channel(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Close the audio channel
    ///
    /// # Errors
    /// Returns the transport error if the close fails
    async fn close_channel(&mut self) -> Result<(), Self::Error>;
}

/// One block of 16 kHz mono 16-bit PCM from the capture collaborator
pub type PcmBlock = Vec<i16, PCM_BLOCK_SAMPLES>;

/// Raw characteristic value as delivered by the transport
pub type CharacteristicValue = Vec<u8, MAX_CHARACTERISTIC_VALUE>;

/// Inbound events consumed by the session state machine
///
/// Transport callbacks and capture-thread PCM blocks are funneled through
/// a single channel of these events, giving the session one synchronized
/// mutation path.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Scan found an ASHA peripheral
    DeviceDiscovered(DeviceAddress),
    /// The transport established the device connection
    Connected,
    /// A characteristic read or notification delivered a value
    CharacteristicValue {
        /// Which characteristic the value belongs to
        characteristic: Characteristic,
        /// The raw value bytes
        value: CharacteristicValue,
    },
    /// The L2CAP audio channel opened
    ChannelOpened,
    /// The L2CAP audio channel failed to open
    ChannelOpenFailed,
    /// The channel reports renewed write capacity
    WriteReady,
    /// A PCM block from the audio source
    Pcm(PcmBlock),
    /// The audio source is exhausted (finite sources only)
    PcmFinished,
    /// The caller requests the stream to stop
    StopRequested,
    /// The transport connection dropped
    Disconnected,
}
