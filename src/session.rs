//! Streaming Session State Machine
//!
//! One [`StreamingSession`] instance owns one physical connection: its
//! transport handle, encoder state, frame sequencer, and output queue.
//! The session is single-writer - every transport callback and PCM block
//! arrives as a [`SessionEvent`] through one synchronized path, and no
//! other context mutates session state.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle -> Discovering -> Connected -> CapabilitiesKnown
//!      -> ChannelNegotiating -> ChannelOpen -> Streaming
//!      -> Stopping -> Closed
//! ```
//!
//! `Failed` is reachable from every non-terminal state and carries the
//! originating error kind. The session never reconnects on its own; that
//! is caller policy.

use crate::codec::G722Encoder;
use crate::constants::{CHANNEL_OPEN_RETRIES, STOP_DRAIN_BUDGET};
use crate::control::{self, AudioStatus, CodecId, ConnectedStatus, ControlCommand};
use crate::flow::{FlowError, OutputFlowController};
use crate::frame::FrameSequencer;
use crate::properties::ReadOnlyProperties;
use crate::transport::{Characteristic, SessionEvent, Transport, WriteMode};
use crate::{AshaError, SessionOptions, SessionSnapshot, SessionState};

fn transport_err<E: core::fmt::Debug>(e: &E) -> AshaError {
    defmt::error!("[SESSION] Transport error: {:?}", defmt::Debug2Format(e));
    AshaError::Transport
}

/// ASHA streaming session over one device connection
///
/// Owns the transport and encoder collaborators for its lifetime. Drive it
/// by calling [`StreamingSession::begin`] once and then feeding every
/// inbound [`SessionEvent`] to [`StreamingSession::handle_event`] from a
/// single consumer (see [`crate::runner`]).
#[derive(Debug)]
pub struct StreamingSession<T: Transport, C: G722Encoder> {
    transport: T,
    encoder: C,
    options: SessionOptions,
    state: SessionState,
    properties: Option<ReadOnlyProperties>,
    last_status: Option<AudioStatus>,
    psm: Option<u16>,
    sequencer: FrameSequencer,
    flow: OutputFlowController,
    channel_open_attempts: u8,
    stop_budget: u8,
    dropped_frames: u32,
}

impl<T: Transport, C: G722Encoder> StreamingSession<T, C> {
    /// Create a new session in `Idle`
    #[must_use]
    pub fn new(transport: T, encoder: C, options: SessionOptions) -> Self {
        Self {
            transport,
            encoder,
            options,
            state: SessionState::Idle,
            properties: None,
            last_status: None,
            psm: None,
            sequencer: FrameSequencer::new(),
            flow: OutputFlowController::new(),
            channel_open_attempts: 0,
            stop_budget: STOP_DRAIN_BUDGET,
            dropped_frames: 0,
        }
    }

    /// Current session state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Read-only snapshot for the presentation layer
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            properties: self.properties,
            last_status: self.last_status,
            psm: self.psm,
        }
    }

    /// Capability record from the last successful read, if any
    #[must_use]
    pub fn properties(&self) -> Option<&ReadOnlyProperties> {
        self.properties.as_ref()
    }

    /// Most recent recognized status notification
    #[must_use]
    pub fn last_status(&self) -> Option<AudioStatus> {
        self.last_status
    }

    /// PSM decoded during channel negotiation, if any
    #[must_use]
    pub fn psm(&self) -> Option<u16> {
        self.psm
    }

    /// Frames dropped by the queue-overflow policy
    #[must_use]
    pub fn dropped_frames(&self) -> u32 {
        self.dropped_frames
    }

    /// Begin the session: start scanning for an ASHA peripheral
    ///
    /// # Errors
    /// Returns `AshaError::InvalidState` unless the session is `Idle`, or
    /// `AshaError::Transport` if scanning cannot start (the session moves
    /// to `Failed`)
    pub async fn begin(&mut self) -> Result<(), AshaError> {
        if self.state != SessionState::Idle {
            return Err(AshaError::InvalidState);
        }
        self.set_state(SessionState::Discovering);
        if let Err(e) = self.transport.scan().await {
            let kind = transport_err(&e);
            self.fail(kind);
            return Err(kind);
        }
        Ok(())
    }

    /// Handle one inbound event, returning the resulting state
    ///
    /// Events arriving after a terminal state are ignored. Fatal errors
    /// move the session to `Failed` with the originating error kind.
    pub async fn handle_event(&mut self, event: SessionEvent) -> SessionState {
        if self.state.is_terminal() {
            defmt::debug!("[SESSION] Event after terminal state ignored");
            return self.state;
        }
        if let Err(kind) = self.dispatch(event).await {
            self.fail(kind);
        }
        self.state
    }

    /// Request the stream to stop
    ///
    /// Effective from `Streaming` (writes a `Stop` command and flushes the
    /// queue within the teardown budget) and from any earlier non-terminal
    /// state (closes out immediately).
    ///
    /// # Errors
    /// Returns `AshaError::InvalidState` in a terminal state
    pub async fn stop(&mut self) -> Result<(), AshaError> {
        if self.state.is_terminal() {
            return Err(AshaError::InvalidState);
        }
        if let Err(kind) = self.dispatch(SessionEvent::StopRequested).await {
            self.fail(kind);
            return Err(kind);
        }
        Ok(())
    }

    /// Write the device volume (raw two's-complement byte, write without
    /// response)
    ///
    /// # Errors
    /// Returns `AshaError::InvalidState` before a device is connected or
    /// after the session ended, `AshaError::Transport` on a failed write
    pub async fn set_volume(&mut self, volume: i8) -> Result<(), AshaError> {
        if !self.is_device_connected() {
            return Err(AshaError::InvalidState);
        }
        self.transport
            .write_characteristic(
                Characteristic::Volume,
                &[volume as u8],
                WriteMode::WithoutResponse,
            )
            .await
            .map_err(|e| transport_err(&e))
    }

    /// Send an out-of-band `Status` command (opcode 0x03)
    ///
    /// Used to tell the device about the other side of a binaural set or a
    /// connection parameter update.
    ///
    /// # Errors
    /// Returns `AshaError::InvalidState` before a device is connected or
    /// after the session ended, `AshaError::Transport` on a failed write
    pub async fn send_status_change(
        &mut self,
        connected: ConnectedStatus,
        interval: u8,
    ) -> Result<(), AshaError> {
        if !self.is_device_connected() {
            return Err(AshaError::InvalidState);
        }
        let command = ControlCommand::Status {
            connected,
            interval,
        };
        self.write_control(command).await
    }

    fn is_device_connected(&self) -> bool {
        matches!(
            self.state,
            SessionState::Connected
                | SessionState::CapabilitiesKnown
                | SessionState::ChannelNegotiating
                | SessionState::ChannelOpen
                | SessionState::Streaming
                | SessionState::Stopping
        )
    }

    async fn dispatch(&mut self, event: SessionEvent) -> Result<(), AshaError> {
        match event {
            SessionEvent::DeviceDiscovered(addr) => {
                if self.state == SessionState::Discovering {
                    defmt::info!("[SESSION] Connecting to {}", addr);
                    self.transport
                        .connect(addr)
                        .await
                        .map_err(|e| transport_err(&e))?;
                } else {
                    defmt::debug!("[SESSION] Device discovered outside discovery, ignored");
                }
                Ok(())
            }
            SessionEvent::Connected => {
                if self.state == SessionState::Discovering {
                    self.set_state(SessionState::Connected);
                    self.transport
                        .subscribe(Characteristic::AudioStatus)
                        .await
                        .map_err(|e| transport_err(&e))?;
                    self.transport
                        .read_characteristic(Characteristic::ReadOnlyProperties)
                        .await
                        .map_err(|e| transport_err(&e))?;
                }
                Ok(())
            }
            SessionEvent::CharacteristicValue {
                characteristic,
                value,
            } => self.on_characteristic_value(characteristic, &value).await,
            SessionEvent::ChannelOpened => {
                if self.state == SessionState::ChannelNegotiating {
                    self.set_state(SessionState::ChannelOpen);
                    self.flow.set_writable(true);
                }
                Ok(())
            }
            SessionEvent::ChannelOpenFailed => self.on_channel_open_failed().await,
            SessionEvent::WriteReady => self.on_write_ready().await,
            SessionEvent::Pcm(block) => {
                if self.state == SessionState::Streaming {
                    self.pump_audio(&block).await
                } else {
                    defmt::debug!("[SESSION] PCM outside streaming, discarded");
                    Ok(())
                }
            }
            SessionEvent::PcmFinished => {
                if self.state == SessionState::Streaming {
                    self.flush_final_slice().await?;
                    self.initiate_stop().await
                } else {
                    Ok(())
                }
            }
            SessionEvent::StopRequested => match self.state {
                SessionState::Streaming => self.initiate_stop().await,
                SessionState::ChannelOpen | SessionState::Stopping => self.teardown().await,
                _ => {
                    self.set_state(SessionState::Closed);
                    Ok(())
                }
            },
            SessionEvent::Disconnected => Err(AshaError::TransportDisconnected),
        }
    }

    async fn on_characteristic_value(
        &mut self,
        characteristic: Characteristic,
        value: &[u8],
    ) -> Result<(), AshaError> {
        match characteristic {
            Characteristic::ReadOnlyProperties => {
                if self.state != SessionState::Connected {
                    return Ok(());
                }
                let properties = ReadOnlyProperties::from_bytes(value)
                    .map_err(|_| AshaError::MalformedRecord)?;
                if !properties.g722_at_16khz_supported {
                    defmt::warn!("[SESSION] Device does not advertise G.722 @ 16 kHz");
                }
                self.properties = Some(properties);
                self.set_state(SessionState::CapabilitiesKnown);
                self.negotiate_channel().await
            }
            Characteristic::LePsmOut => {
                if self.state != SessionState::ChannelNegotiating || self.psm.is_some() {
                    return Ok(());
                }
                let psm = control::decode_psm(value).map_err(|_| AshaError::MalformedPsm)?;
                defmt::info!("[SESSION] Audio PSM: {=u16:#x}", psm);
                self.psm = Some(psm);
                self.transport
                    .open_channel(psm)
                    .await
                    .map_err(|e| transport_err(&e))
            }
            Characteristic::AudioStatus => self.on_status_value(value).await,
            Characteristic::Volume | Characteristic::AudioControlPoint => {
                defmt::debug!("[SESSION] Unhandled characteristic value: {}", characteristic);
                Ok(())
            }
        }
    }

    async fn on_status_value(&mut self, value: &[u8]) -> Result<(), AshaError> {
        let Some(status) = AudioStatus::from_bytes(value) else {
            // Unknown firmware may emit undocumented codes; keep waiting
            defmt::warn!("[SESSION] Unrecognized status byte, ignored");
            return Ok(());
        };
        self.last_status = Some(status);

        match self.state {
            SessionState::ChannelOpen => match status {
                AudioStatus::Ok => {
                    self.set_state(SessionState::Streaming);
                    Ok(())
                }
                // Replaying the same Start deterministically fails again;
                // the caller must pick different parameters
                AudioStatus::UnknownCommand | AudioStatus::IllegalParameters => {
                    Err(AshaError::RejectedParameters)
                }
            },
            SessionState::Streaming => match status {
                AudioStatus::Ok => Ok(()),
                AudioStatus::UnknownCommand | AudioStatus::IllegalParameters => {
                    defmt::warn!("[SESSION] Device asked to cease streaming: {}", status);
                    self.initiate_stop().await
                }
            },
            _ => Ok(()),
        }
    }

    /// `CapabilitiesKnown` -> `ChannelNegotiating`: write `Start`, then
    /// read and subscribe the PSM characteristic
    async fn negotiate_channel(&mut self) -> Result<(), AshaError> {
        let command = ControlCommand::Start {
            codec: CodecId::G722At16kHz,
            audio_type: self.options.audio_type,
            volume: self.options.volume,
            other_state: self.options.other_state,
        };
        self.write_control(command).await?;
        self.set_state(SessionState::ChannelNegotiating);

        self.transport
            .subscribe(Characteristic::LePsmOut)
            .await
            .map_err(|e| transport_err(&e))?;
        self.transport
            .read_characteristic(Characteristic::LePsmOut)
            .await
            .map_err(|e| transport_err(&e))
    }

    async fn on_channel_open_failed(&mut self) -> Result<(), AshaError> {
        if self.state != SessionState::ChannelNegotiating {
            return Ok(());
        }
        let psm = self.psm.ok_or(AshaError::ChannelOpenFailed)?;
        if self.channel_open_attempts < CHANNEL_OPEN_RETRIES {
            self.channel_open_attempts += 1;
            defmt::warn!(
                "[SESSION] Channel open failed, retry {}/{}",
                self.channel_open_attempts,
                CHANNEL_OPEN_RETRIES
            );
            self.transport
                .open_channel(psm)
                .await
                .map_err(|e| transport_err(&e))
        } else {
            Err(AshaError::ChannelOpenFailed)
        }
    }

    async fn on_write_ready(&mut self) -> Result<(), AshaError> {
        self.flow.set_writable(true);
        self.drain_channel().await?;

        if self.state == SessionState::Stopping {
            self.stop_budget = self.stop_budget.saturating_sub(1);
            if self.flow.is_empty() {
                return self.teardown().await;
            }
            if self.stop_budget == 0 {
                defmt::warn!(
                    "[SESSION] Teardown budget exhausted, discarding {} bytes",
                    self.flow.queued_bytes()
                );
                self.flow.clear();
                return self.teardown().await;
            }
        }
        Ok(())
    }

    async fn pump_audio(&mut self, pcm: &[i16]) -> Result<(), AshaError> {
        if self.sequencer.push(pcm).is_err() {
            // Accumulator only overflows if the capture side outruns the
            // 20 ms cadence badly; dropping the block keeps latency bounded
            defmt::warn!("[SESSION] PCM accumulator full, block dropped");
            return Ok(());
        }
        while let Some(slice) = self.sequencer.next_slice() {
            self.encode_and_offer(&slice).await?;
        }
        Ok(())
    }

    async fn flush_final_slice(&mut self) -> Result<(), AshaError> {
        if let Some(slice) = self.sequencer.take_remainder() {
            self.encode_and_offer(&slice).await?;
        }
        Ok(())
    }

    async fn encode_and_offer(&mut self, slice: &[i16]) -> Result<(), AshaError> {
        let payload = self.encoder.encode(slice).map_err(|_| AshaError::Codec)?;
        if payload.is_empty() {
            return Ok(());
        }
        let frame = self.sequencer.tag(payload);
        match self.flow.enqueue(&frame) {
            Ok(()) => {}
            Err(FlowError::QueueFull) => {
                self.dropped_frames += 1;
                defmt::warn!(
                    "[SESSION] Output queue full, frame {} dropped ({} total)",
                    frame.sequence,
                    self.dropped_frames
                );
                return Ok(());
            }
        }
        self.drain_channel().await
    }

    async fn drain_channel(&mut self) -> Result<(), AshaError> {
        self.flow
            .drain(&mut self.transport)
            .await
            .map(|_| ())
            .map_err(|e| transport_err(&e))
    }

    /// `Streaming` -> `Stopping`: write `Stop` and flush the queue within
    /// the teardown budget
    async fn initiate_stop(&mut self) -> Result<(), AshaError> {
        self.write_control(ControlCommand::Stop).await?;
        self.set_state(SessionState::Stopping);
        self.stop_budget = STOP_DRAIN_BUDGET;
        self.drain_channel().await?;
        if self.flow.is_empty() {
            return self.teardown().await;
        }
        Ok(())
    }

    async fn teardown(&mut self) -> Result<(), AshaError> {
        if let Err(e) = self.transport.close_channel().await {
            defmt::warn!(
                "[SESSION] Channel close failed: {:?}",
                defmt::Debug2Format(&e)
            );
        }
        self.set_state(SessionState::Closed);
        Ok(())
    }

    async fn write_control(&mut self, command: ControlCommand) -> Result<(), AshaError> {
        let bytes = command.to_bytes();
        self.transport
            .write_characteristic(
                Characteristic::AudioControlPoint,
                &bytes,
                WriteMode::WithResponse,
            )
            .await
            .map_err(|e| transport_err(&e))
    }

    fn set_state(&mut self, state: SessionState) {
        defmt::debug!("[SESSION] {} -> {}", self.state, state);
        self.state = state;
    }

    fn fail(&mut self, kind: AshaError) {
        defmt::error!("[SESSION] Failed: {}", kind);
        self.set_state(SessionState::Failed(kind));
    }
}
