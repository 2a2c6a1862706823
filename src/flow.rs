//! Output Flow Control
//!
//! This module owns the ordered byte queue between the frame sequencer and
//! the L2CAP audio channel. Frames are appended whole; draining writes as
//! much as the transport accepts per call and keeps the unwritten remainder
//! at the front of the queue. When the transport accepts fewer bytes than
//! offered the controller marks itself not-writable and waits for the next
//! readiness event instead of busy-spinning.
//!
//! Back-pressure therefore delays audio, it never reorders or silently
//! drops it. The queue is bounded as a deployment cap: a frame that does
//! not fit is rejected whole with [`FlowError::QueueFull`] and the caller
//! chooses what to do with it.

use crate::constants::OUTPUT_QUEUE_CAPACITY;
use crate::frame::AudioFrame;
use crate::transport::Transport;
use heapless::Deque;

/// Flow controller errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowError {
    /// The frame does not fit in the remaining queue capacity
    QueueFull,
}

impl core::fmt::Display for FlowError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::QueueFull => write!(f, "Output queue is full"),
        }
    }
}

/// Readiness-gated byte queue feeding the audio channel
#[derive(Debug)]
pub struct OutputFlowController {
    queue: Deque<u8, OUTPUT_QUEUE_CAPACITY>,
    writable: bool,
}

impl OutputFlowController {
    /// Create an empty controller; not writable until the channel reports
    /// readiness
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: Deque::new(),
            writable: false,
        }
    }

    /// Append a frame to the queue
    ///
    /// All-or-nothing: on `QueueFull` the queue contents are untouched.
    ///
    /// # Errors
    /// Returns `FlowError::QueueFull` if the frame's wire bytes do not fit
    pub fn enqueue(&mut self, frame: &AudioFrame) -> Result<(), FlowError> {
        if self.queue.len() + frame.wire_len() > OUTPUT_QUEUE_CAPACITY {
            return Err(FlowError::QueueFull);
        }
        // Capacity checked above
        self.queue.push_back(frame.sequence).ok();
        for &byte in &frame.payload {
            self.queue.push_back(byte).ok();
        }
        Ok(())
    }

    /// Drain queued bytes into the transport while it reports capacity
    ///
    /// Returns the number of bytes written in this drain. A short write
    /// clears the writable flag; the remainder stays queued until the next
    /// [`crate::SessionEvent::WriteReady`].
    ///
    /// # Errors
    /// Propagates the transport error from a failed channel write
    pub async fn drain<T: Transport>(&mut self, transport: &mut T) -> Result<usize, T::Error> {
        let mut written = 0;
        while self.writable && !self.queue.is_empty() {
            let (front, _) = self.queue.as_slices();
            let offered = front.len();
            let accepted = transport.write_channel(front).await?;
            for _ in 0..accepted {
                self.queue.pop_front();
            }
            written += accepted;
            if accepted < offered {
                self.writable = false;
            }
        }
        if written > 0 {
            defmt::debug!("[FLOW] Drained {} bytes, {} queued", written, self.queue.len());
        }
        Ok(written)
    }

    /// Record transport-reported write readiness
    pub fn set_writable(&mut self, writable: bool) {
        self.writable = writable;
    }

    /// Whether the transport currently reports write capacity
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Bytes currently queued
    #[must_use]
    pub fn queued_bytes(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Discard all queued bytes (teardown timeout policy)
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

impl Default for OutputFlowController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::DeviceAddress;
    use crate::constants::G722_FRAME_BYTES;
    use crate::transport::{Characteristic, WriteMode};
    use embassy_futures::block_on;
    use heapless::Vec;

    /// Channel sink that accepts at most `accept_limit` bytes per write
    struct SinkTransport {
        accepted: Vec<u8, OUTPUT_QUEUE_CAPACITY>,
        accept_limit: usize,
        write_calls: usize,
    }

    impl SinkTransport {
        fn new(accept_limit: usize) -> Self {
            Self {
                accepted: Vec::new(),
                accept_limit,
                write_calls: 0,
            }
        }
    }

    impl Transport for SinkTransport {
        type Error = ();

        async fn scan(&mut self) -> Result<(), ()> {
            Ok(())
        }

        async fn connect(&mut self, _device: DeviceAddress) -> Result<(), ()> {
            Ok(())
        }

        async fn read_characteristic(&mut self, _c: Characteristic) -> Result<(), ()> {
            Ok(())
        }

        async fn write_characteristic(
            &mut self,
            _c: Characteristic,
            _value: &[u8],
            _mode: WriteMode,
        ) -> Result<(), ()> {
            Ok(())
        }

        async fn subscribe(&mut self, _c: Characteristic) -> Result<(), ()> {
            Ok(())
        }

        async fn open_channel(&mut self, _psm: u16) -> Result<(), ()> {
            Ok(())
        }

        async fn write_channel(&mut self, data: &[u8]) -> Result<usize, ()> {
            self.write_calls += 1;
            let n = data.len().min(self.accept_limit);
            self.accepted.extend_from_slice(&data[..n]).unwrap();
            Ok(n)
        }

        async fn close_channel(&mut self) -> Result<(), ()> {
            Ok(())
        }
    }

    fn frame(sequence: u8, len: usize) -> AudioFrame {
        let mut payload = Vec::new();
        for i in 0..len {
            payload.push((i & 0xFF) as u8).unwrap();
        }
        AudioFrame { sequence, payload }
    }

    #[test]
    fn test_enqueue_and_full_drain() {
        let mut flow = OutputFlowController::new();
        let mut transport = SinkTransport::new(usize::MAX);

        flow.enqueue(&frame(0, G722_FRAME_BYTES)).unwrap();
        flow.enqueue(&frame(1, G722_FRAME_BYTES)).unwrap();
        assert_eq!(flow.queued_bytes(), 2 * (1 + G722_FRAME_BYTES));

        flow.set_writable(true);
        let written = block_on(flow.drain(&mut transport)).unwrap();
        assert_eq!(written, 2 * (1 + G722_FRAME_BYTES));
        assert!(flow.is_empty());

        // Frames left the queue in order, sequence byte first
        assert_eq!(transport.accepted[0], 0);
        assert_eq!(transport.accepted[1 + G722_FRAME_BYTES], 1);
    }

    #[test]
    fn test_drain_waits_for_readiness() {
        let mut flow = OutputFlowController::new();
        let mut transport = SinkTransport::new(usize::MAX);

        flow.enqueue(&frame(0, 10)).unwrap();
        let written = block_on(flow.drain(&mut transport)).unwrap();
        assert_eq!(written, 0);
        assert_eq!(transport.write_calls, 0);
        assert_eq!(flow.queued_bytes(), 11);
    }

    #[test]
    fn test_partial_write_retains_remainder() {
        let mut flow = OutputFlowController::new();
        let mut transport = SinkTransport::new(4);

        flow.enqueue(&frame(9, 10)).unwrap();
        flow.set_writable(true);

        let written = block_on(flow.drain(&mut transport)).unwrap();
        assert_eq!(written, 4);
        // Short write clears readiness; no busy re-attempt
        assert_eq!(transport.write_calls, 1);
        assert!(!flow.is_writable());
        assert_eq!(flow.queued_bytes(), 7);

        // Readiness returns; the remainder goes out from the front
        flow.set_writable(true);
        transport.accept_limit = usize::MAX;
        let written = block_on(flow.drain(&mut transport)).unwrap();
        assert_eq!(written, 7);
        assert!(flow.is_empty());

        let expected = frame(9, 10).to_bytes();
        assert_eq!(transport.accepted.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_no_bytes_lost_across_many_partial_drains() {
        let mut flow = OutputFlowController::new();
        let mut transport = SinkTransport::new(13);
        let mut enqueued = 0;

        for sequence in 0..10u8 {
            let f = frame(sequence, G722_FRAME_BYTES);
            enqueued += f.wire_len();
            flow.enqueue(&f).unwrap();

            // Each short write consumes readiness until re-signaled
            flow.set_writable(true);
            block_on(flow.drain(&mut transport)).unwrap();
        }

        // Transport eventually reports unbounded readiness
        transport.accept_limit = usize::MAX;
        flow.set_writable(true);
        block_on(flow.drain(&mut transport)).unwrap();

        assert!(flow.is_empty());
        assert_eq!(transport.accepted.len(), enqueued);
    }

    #[test]
    fn test_enqueue_overflow_is_all_or_nothing() {
        let mut flow = OutputFlowController::new();
        let full_frames = OUTPUT_QUEUE_CAPACITY / (1 + G722_FRAME_BYTES);
        for sequence in 0..full_frames {
            flow.enqueue(&frame(sequence as u8, G722_FRAME_BYTES))
                .unwrap();
        }
        let queued = flow.queued_bytes();

        assert_eq!(
            flow.enqueue(&frame(0, G722_FRAME_BYTES)),
            Err(FlowError::QueueFull)
        );
        assert_eq!(flow.queued_bytes(), queued);

        // A frame small enough to fit is still accepted
        flow.enqueue(&frame(0, 10)).unwrap();
        assert_eq!(flow.queued_bytes(), queued + 11);
    }

    #[test]
    fn test_clear_discards_queue() {
        let mut flow = OutputFlowController::new();
        flow.enqueue(&frame(0, 50)).unwrap();
        flow.clear();
        assert!(flow.is_empty());
    }
}
