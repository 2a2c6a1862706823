//! `Ashaline` Constants
//!
//! This module contains all the constants used throughout the `Ashaline` library.
//! These constants define the ASHA GATT identifiers, audio framing parameters,
//! and various limits used in the implementation.

/// ASHA GATT service UUID (16-bit)
pub const ASHA_SERVICE_UUID: u16 = 0xFDF0;

/// ReadOnlyProperties characteristic UUID
pub const READ_ONLY_PROPERTIES_UUID: &str = "6333651e-c481-4a3e-9169-7c902aad37bb";

/// AudioControlPoint characteristic UUID
pub const AUDIO_CONTROL_POINT_UUID: &str = "f0d4de7e-4a88-476c-9d9f-1937b0996cc0";

/// AudioStatus characteristic UUID
pub const AUDIO_STATUS_UUID: &str = "38663f1a-e711-4cac-b641-326b56404837";

/// Volume characteristic UUID
pub const VOLUME_UUID: &str = "00e4ca9e-ab14-41e4-8823-f9e70c7e91df";

/// `LE_PSM_OUT` characteristic UUID
pub const LE_PSM_OUT_UUID: &str = "2d410339-82b6-42aa-b34e-e2e01df8cc1a";

/// ReadOnlyProperties record length in bytes (fixed layout)
pub const READ_ONLY_PROPERTIES_LENGTH: usize = 17;

/// Length of the PSM characteristic value in bytes
pub const PSM_VALUE_LENGTH: usize = 2;

/// PCM sample rate in Hz
pub const SAMPLE_RATE_HZ: u32 = 16_000;

/// Duration of one audio slice in milliseconds
pub const SLICE_DURATION_MS: u32 = 20;

/// PCM samples per 20 ms slice at 16 kHz mono
pub const SAMPLES_PER_SLICE: usize = 320;

/// G.722 payload bytes produced from one full slice (64 kbit/s, 2:1)
pub const G722_FRAME_BYTES: usize = 160;

/// Maximum on-wire frame size (1 sequence byte + payload)
pub const MAX_FRAME_BYTES: usize = 1 + G722_FRAME_BYTES;

/// Maximum PCM samples delivered in one capture block
pub const PCM_BLOCK_SAMPLES: usize = 320;

/// Capacity of the frame sequencer's sample accumulator
pub const PCM_ACCUMULATOR_SAMPLES: usize = 2 * SAMPLES_PER_SLICE;

/// Output queue capacity in bytes (~25 full frames, ~0.5 s of audio)
pub const OUTPUT_QUEUE_CAPACITY: usize = 4096;

/// Maximum characteristic value length accepted from the transport
pub const MAX_CHARACTERISTIC_VALUE: usize = 32;

/// Number of L2CAP channel-open retries before failing the session
pub const CHANNEL_OPEN_RETRIES: u8 = 1;

/// Readiness cycles granted to flush the queue during teardown
pub const STOP_DRAIN_BUDGET: u8 = 8;

/// Volume value meaning "unknown" in a `Start` command
pub const VOLUME_UNKNOWN: i8 = 127;
