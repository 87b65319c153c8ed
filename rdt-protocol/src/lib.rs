//! Go-Back-N Reliable Transfer Protocol Core
//!
//! This crate implements the protocol state machines for a reliable
//! byte-stream file transfer over unreliable datagrams: the wire format,
//! file segmentation, the sliding send window with cumulative
//! acknowledgments, and the single-offset receive sequencer. It performs
//! no network or clock I/O; sessions live in the `rdt` crate.

pub mod packet;
pub mod segment;
pub mod sequencer;
pub mod window;

pub use packet::{
    AckPacket, DataSegment, Packet, PacketError, PacketHeader, FINAL_ACK_REPEAT, HEADER_SIZE,
    MAX_PACKET_SIZE, MAX_PAYLOAD_SIZE,
};
pub use segment::{SegmentError, SegmentTable};
pub use sequencer::{Disposition, ReceiveSequencer};
pub use window::{AckOutcome, SendWindow};
