//! Receive-side sequencing
//!
//! The receiver keeps a single scalar: the next byte offset it expects.
//! Exactly the segment starting at that offset is accepted; everything
//! else is discarded unbuffered and answered with a repeat of the current
//! cumulative acknowledgment. Memory use is O(1) regardless of the
//! sender's window size.

use crate::packet::{AckPacket, DataSegment};

/// What to do with one received segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// The segment extends the stream: write its payload, send `ack`
    InOrder { ack: AckPacket },
    /// Duplicate or out-of-order: drop the payload, re-send `ack`
    Discard { ack: AckPacket },
    /// End-of-stream sentinel consumed: send `ack` redundantly, then stop
    EndOfStream { ack: AckPacket },
}

impl Disposition {
    /// The acknowledgment this disposition asks the caller to transmit
    pub fn ack(&self) -> AckPacket {
        match self {
            Disposition::InOrder { ack }
            | Disposition::Discard { ack }
            | Disposition::EndOfStream { ack } => *ack,
        }
    }
}

/// In-order reassembly state for one incoming transfer
#[derive(Debug, Default)]
pub struct ReceiveSequencer {
    /// Next contiguous byte offset required; never decreases
    expected: u32,
    finished: bool,
}

impl ReceiveSequencer {
    /// Create a sequencer expecting offset 0
    pub fn new() -> Self {
        ReceiveSequencer::default()
    }

    /// Classify one incoming segment
    ///
    /// The caller owns all I/O: on `InOrder` it must append the segment's
    /// payload to the output before acknowledging, so a write failure can
    /// abort the transfer without the ACK having promised the bytes.
    pub fn on_segment(&mut self, seg: &DataSegment) -> Disposition {
        if self.finished {
            // The sender re-sends the sentinel only when our final ACKs
            // were all lost; answer it again.
            return Disposition::EndOfStream {
                ack: AckPacket::end_of_stream(self.expected),
            };
        }

        if seg.is_sentinel() && seg.seqno() == self.expected {
            self.finished = true;
            tracing::debug!(offset = self.expected, "end of stream reached");
            return Disposition::EndOfStream {
                ack: AckPacket::end_of_stream(self.expected),
            };
        }

        if seg.seqno() == self.expected && !seg.payload.is_empty() {
            self.expected += seg.payload.len() as u32;
            tracing::trace!(
                seqno = seg.seqno(),
                len = seg.payload.len(),
                expected = self.expected,
                "segment accepted"
            );
            return Disposition::InOrder {
                ack: AckPacket::new(self.expected),
            };
        }

        // Earlier (duplicate), later (gap), or a zero-length segment that
        // is not the sentinel we are waiting for.
        tracing::trace!(
            seqno = seg.seqno(),
            expected = self.expected,
            "segment discarded"
        );
        Disposition::Discard {
            ack: AckPacket::new(self.expected),
        }
    }

    /// Next contiguous byte offset required
    pub fn expected_offset(&self) -> u32 {
        self.expected
    }

    /// True once the end-of-stream sentinel has been consumed
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
