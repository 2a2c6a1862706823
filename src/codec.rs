//! Audio Codec Seam
//!
//! The G.722 compression math lives outside this crate; the engine drives
//! it through the [`G722Encoder`] trait. An implementation is stateful
//! across calls - ASHA streams one continuous G.722 bitstream per session,
//! so the encoder state must never be reset mid-session.

use crate::constants::G722_FRAME_BYTES;
use heapless::Vec;

/// Codec errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// The encoder could not compress the slice
    EncodeFailed,
}

impl core::fmt::Display for CodecError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::EncodeFailed => write!(f, "G.722 encoder failed"),
        }
    }
}

/// Stateful G.722 encoder collaborator
///
/// `encode` receives one PCM slice (16 kHz mono, 16-bit signed, at most
/// 320 samples) and returns the compressed payload. A full 20 ms slice
/// compresses to 160 bytes at 64 kbit/s; the final slice of a finite
/// source may be shorter.
pub trait G722Encoder {
    /// Compress one PCM slice
    ///
    /// # Errors
    /// Returns `CodecError::EncodeFailed` if compression fails; the session
    /// treats this as fatal since streaming cannot continue uncompressed
    fn encode(&mut self, pcm: &[i16]) -> Result<Vec<u8, G722_FRAME_BYTES>, CodecError>;
}
