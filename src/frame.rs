//! Audio Frame Sequencing
//!
//! This module turns compressed audio into ordered, counter-tagged frames.
//! PCM samples accumulate until a full 20 ms slice (320 samples at 16 kHz
//! mono) is available; each encoded slice is prefixed with a one-byte
//! sequence counter that wraps modulo 256 and increments exactly once per
//! frame regardless of payload size.
//!
//! A partial slice is never encoded mid-stream. The only exception is the
//! final slice of a finite source, which the session flushes through
//! [`FrameSequencer::take_remainder`] so trailing audio is not dropped.

use crate::constants::{
    G722_FRAME_BYTES, MAX_FRAME_BYTES, PCM_ACCUMULATOR_SAMPLES, SAMPLES_PER_SLICE,
};
use heapless::{Deque, Vec};

/// Frame sequencer errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerError {
    /// The sample accumulator is full; the caller pushed faster than it
    /// drained full slices
    AccumulatorFull,
}

impl core::fmt::Display for SequencerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AccumulatorFull => write!(f, "PCM accumulator is full"),
        }
    }
}

/// One sequence-tagged unit of compressed audio
///
/// On the wire a frame is the sequence byte immediately followed by the
/// payload; there is no extra framing or length prefix - boundaries are
/// implicit from the fixed per-slice payload length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    /// Wrapping frame counter (0..=255)
    pub sequence: u8,
    /// Compressed payload (160 bytes for a full slice)
    pub payload: Vec<u8, G722_FRAME_BYTES>,
}

impl AudioFrame {
    /// Total on-wire length (sequence byte + payload)
    #[must_use]
    pub fn wire_len(&self) -> usize {
        1 + self.payload.len()
    }

    /// Serialize the frame for the audio channel
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8, MAX_FRAME_BYTES> {
        let mut bytes = Vec::new();
        bytes.push(self.sequence).ok();
        bytes.extend_from_slice(&self.payload).ok();
        bytes
    }
}

/// Accumulates PCM into fixed slices and tags encoded payloads
///
/// The sequencer itself does not call the codec; the session pops full
/// slices, runs them through the encoder collaborator, and hands the
/// payload back to [`FrameSequencer::tag`] for numbering.
#[derive(Debug)]
pub struct FrameSequencer {
    pending: Deque<i16, PCM_ACCUMULATOR_SAMPLES>,
    sequence: u8,
}

impl FrameSequencer {
    /// Create a new sequencer with the counter at zero
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Deque::new(),
            sequence: 0,
        }
    }

    /// Append PCM samples to the accumulator
    ///
    /// # Errors
    /// Returns `SequencerError::AccumulatorFull` if the samples do not fit;
    /// nothing is appended in that case
    pub fn push(&mut self, pcm: &[i16]) -> Result<(), SequencerError> {
        if self.pending.len() + pcm.len() > PCM_ACCUMULATOR_SAMPLES {
            return Err(SequencerError::AccumulatorFull);
        }
        for &sample in pcm {
            // Capacity checked above
            self.pending.push_back(sample).ok();
        }
        Ok(())
    }

    /// Pop the next full 20 ms slice, if one has accumulated
    pub fn next_slice(&mut self) -> Option<Vec<i16, SAMPLES_PER_SLICE>> {
        if self.pending.len() < SAMPLES_PER_SLICE {
            return None;
        }
        let mut slice = Vec::new();
        for _ in 0..SAMPLES_PER_SLICE {
            if let Some(sample) = self.pending.pop_front() {
                slice.push(sample).ok();
            }
        }
        Some(slice)
    }

    /// Drain whatever remains as a final partial slice
    ///
    /// Returns `None` when nothing is pending, so a source that ends on a
    /// slice boundary produces no trailing frame.
    pub fn take_remainder(&mut self) -> Option<Vec<i16, SAMPLES_PER_SLICE>> {
        if self.pending.is_empty() {
            return None;
        }
        let mut slice = Vec::new();
        while let Some(sample) = self.pending.pop_front() {
            slice.push(sample).ok();
        }
        Some(slice)
    }

    /// Tag an encoded payload with the current counter and advance it
    #[must_use]
    pub fn tag(&mut self, payload: Vec<u8, G722_FRAME_BYTES>) -> AudioFrame {
        let frame = AudioFrame {
            sequence: self.sequence,
            payload,
        };
        self.sequence = self.sequence.wrapping_add(1);
        frame
    }

    /// The counter the next frame will carry
    #[must_use]
    pub fn sequence(&self) -> u8 {
        self.sequence
    }

    /// Number of samples waiting for a full slice
    #[must_use]
    pub fn pending_samples(&self) -> usize {
        self.pending.len()
    }
}

impl Default for FrameSequencer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(len: usize) -> Vec<u8, G722_FRAME_BYTES> {
        let mut p = Vec::new();
        for i in 0..len {
            p.push((i & 0xFF) as u8).unwrap();
        }
        p
    }

    #[test]
    fn test_no_slice_until_full() {
        let mut sequencer = FrameSequencer::new();
        sequencer.push(&[0i16; 319]).unwrap();
        assert!(sequencer.next_slice().is_none());
        assert_eq!(sequencer.pending_samples(), 319);

        sequencer.push(&[1i16]).unwrap();
        let slice = sequencer.next_slice().unwrap();
        assert_eq!(slice.len(), SAMPLES_PER_SLICE);
        assert_eq!(slice[319], 1);
        assert_eq!(sequencer.pending_samples(), 0);
    }

    #[test]
    fn test_slices_preserve_sample_order() {
        let mut sequencer = FrameSequencer::new();
        let block: heapless::Vec<i16, 640> = (0..640).map(|i| i as i16).collect();
        sequencer.push(&block).unwrap();

        let first = sequencer.next_slice().unwrap();
        let second = sequencer.next_slice().unwrap();
        assert_eq!(first[0], 0);
        assert_eq!(first[319], 319);
        assert_eq!(second[0], 320);
        assert_eq!(second[319], 639);
        assert!(sequencer.next_slice().is_none());
    }

    #[test]
    fn test_push_rejects_overflow() {
        let mut sequencer = FrameSequencer::new();
        sequencer.push(&[0i16; PCM_ACCUMULATOR_SAMPLES]).unwrap();
        assert_eq!(
            sequencer.push(&[0i16; 1]),
            Err(SequencerError::AccumulatorFull)
        );
        // Nothing was appended
        assert_eq!(sequencer.pending_samples(), PCM_ACCUMULATOR_SAMPLES);
    }

    #[test]
    fn test_take_remainder() {
        let mut sequencer = FrameSequencer::new();
        assert!(sequencer.take_remainder().is_none());

        sequencer.push(&[7i16; 100]).unwrap();
        let remainder = sequencer.take_remainder().unwrap();
        assert_eq!(remainder.len(), 100);
        assert!(remainder.iter().all(|&s| s == 7));
        assert!(sequencer.take_remainder().is_none());
    }

    #[test]
    fn test_remainder_empty_on_slice_boundary() {
        let mut sequencer = FrameSequencer::new();
        sequencer.push(&[0i16; SAMPLES_PER_SLICE]).unwrap();
        let _ = sequencer.next_slice().unwrap();
        assert!(sequencer.take_remainder().is_none());
    }

    #[test]
    fn test_sequence_increments_once_per_frame() {
        let mut sequencer = FrameSequencer::new();

        let full = sequencer.tag(payload(G722_FRAME_BYTES));
        assert_eq!(full.sequence, 0);

        // A short payload still advances the counter by exactly one
        let short = sequencer.tag(payload(10));
        assert_eq!(short.sequence, 1);
        assert_eq!(sequencer.sequence(), 2);
    }

    #[test]
    fn test_sequence_wraps_at_256() {
        let mut sequencer = FrameSequencer::new();
        for expected in 0..=255u8 {
            let frame = sequencer.tag(payload(1));
            assert_eq!(frame.sequence, expected);
        }
        // The 257th frame carries the same counter as the 1st
        let wrapped = sequencer.tag(payload(1));
        assert_eq!(wrapped.sequence, 0);
    }

    #[test]
    fn test_frame_wire_format() {
        let mut sequencer = FrameSequencer::new();
        sequencer.sequence = 42;

        let frame = sequencer.tag(payload(3));
        assert_eq!(frame.wire_len(), 4);

        let bytes = frame.to_bytes();
        assert_eq!(bytes.as_slice(), &[42, 0, 1, 2]);
    }
}
