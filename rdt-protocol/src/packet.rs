//! Packet structures and serialization
//!
//! Every message on the wire starts with a fixed 16-byte header of four
//! 32-bit big-endian fields: `seqno`, `ackno`, `ctrl_flags`, `data_size`.
//! Data segments carry `data_size` payload bytes after the header;
//! acknowledgments are exactly header-sized.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;
use thiserror::Error;

/// Size of the packet header in bytes (4 fields × 4 bytes each)
pub const HEADER_SIZE: usize = 16;

/// Maximum payload size per segment (MTU 1500 - IP/UDP headers - header)
pub const MAX_PAYLOAD_SIZE: usize = 1456; // 1500 - 28 (IP+UDP) - 16 (header)

/// Maximum total message size (header + payload)
pub const MAX_PACKET_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD_SIZE;

/// Number of times the receiver repeats the final acknowledgment, so the
/// end of stream survives the last ACK being lost.
pub const FINAL_ACK_REPEAT: usize = 8;

/// Acknowledgment flag (bit 0 of `ctrl_flags`)
const ACK_FLAG: u32 = 0x1;

/// End-of-stream flag (bit 1 of `ctrl_flags`)
const EOS_FLAG: u32 = 0x2;

/// Common packet header
///
/// `seqno` is the byte offset of the first payload byte in the stream, not
/// a packet index. `ackno` is meaningful only on acknowledgments and names
/// the next byte offset the receiver expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Byte offset of the first payload byte
    pub seqno: u32,
    /// Cumulative acknowledgment: next byte offset expected
    pub ackno: u32,
    /// Control flags (ACK / end-of-stream)
    pub ctrl_flags: u32,
    /// Payload length in bytes
    pub data_size: u32,
}

impl PacketHeader {
    /// Check if this is an acknowledgment header
    #[inline]
    pub fn is_ack(&self) -> bool {
        (self.ctrl_flags & ACK_FLAG) != 0
    }

    /// Check if this is a data header
    #[inline]
    pub fn is_data(&self) -> bool {
        !self.is_ack()
    }

    /// Check if the end-of-stream flag is set
    #[inline]
    pub fn is_eos(&self) -> bool {
        (self.ctrl_flags & EOS_FLAG) != 0
    }

    /// Parse a header from bytes (network byte order)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketError> {
        if bytes.len() < HEADER_SIZE {
            return Err(PacketError::InsufficientData {
                expected: HEADER_SIZE,
                actual: bytes.len(),
            });
        }

        let mut buf = &bytes[..HEADER_SIZE];
        Ok(PacketHeader {
            seqno: buf.get_u32(),
            ackno: buf.get_u32(),
            ctrl_flags: buf.get_u32(),
            data_size: buf.get_u32(),
        })
    }

    /// Serialize the header to bytes (network byte order)
    pub fn to_bytes(&self, buf: &mut BytesMut) {
        buf.put_u32(self.seqno);
        buf.put_u32(self.ackno);
        buf.put_u32(self.ctrl_flags);
        buf.put_u32(self.data_size);
    }
}

/// A data segment: one unit of the file, tagged with its byte offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSegment {
    /// Packet header
    pub header: PacketHeader,
    /// Payload bytes
    pub payload: Bytes,
}

impl DataSegment {
    /// Create a data segment carrying `payload` at stream offset `seqno`
    ///
    /// # Panics
    /// Panics if the payload exceeds `MAX_PAYLOAD_SIZE`; segment producers
    /// are required to chunk below that bound.
    pub fn new(seqno: u32, payload: Bytes) -> Self {
        assert!(
            payload.len() <= MAX_PAYLOAD_SIZE,
            "payload of {} bytes exceeds maximum {}",
            payload.len(),
            MAX_PAYLOAD_SIZE
        );
        DataSegment {
            header: PacketHeader {
                seqno,
                ackno: 0,
                ctrl_flags: 0,
                data_size: payload.len() as u32,
            },
            payload,
        }
    }

    /// Create the zero-length end-of-stream sentinel at offset `seqno`
    pub fn sentinel(seqno: u32) -> Self {
        DataSegment {
            header: PacketHeader {
                seqno,
                ackno: 0,
                ctrl_flags: EOS_FLAG,
                data_size: 0,
            },
            payload: Bytes::new(),
        }
    }

    /// Byte offset of the first payload byte
    #[inline]
    pub fn seqno(&self) -> u32 {
        self.header.seqno
    }

    /// Byte offset one past the last payload byte
    #[inline]
    pub fn end_offset(&self) -> u32 {
        self.header.seqno + self.payload.len() as u32
    }

    /// Check if this segment is the end-of-stream sentinel
    #[inline]
    pub fn is_sentinel(&self) -> bool {
        self.header.is_eos() && self.payload.is_empty()
    }

    /// Total size on the wire (header + payload)
    pub fn size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Serialize the segment to bytes
    pub fn to_bytes(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.size());
        self.header.to_bytes(&mut buf);
        buf.put_slice(&self.payload);
        buf
    }

    /// Parse a data segment from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketError> {
        let header = PacketHeader::from_bytes(bytes)?;

        if !header.is_data() {
            return Err(PacketError::WrongPacketType {
                expected: "data",
                actual: "ack",
            });
        }

        validate_payload(&header, bytes)?;

        let payload = if header.data_size > 0 {
            Bytes::copy_from_slice(&bytes[HEADER_SIZE..HEADER_SIZE + header.data_size as usize])
        } else {
            Bytes::new()
        };

        Ok(DataSegment { header, payload })
    }
}

/// A cumulative acknowledgment, exactly header-sized on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckPacket {
    /// Packet header
    pub header: PacketHeader,
}

impl AckPacket {
    /// Create an acknowledgment for the next expected byte offset `ackno`
    pub fn new(ackno: u32) -> Self {
        AckPacket {
            header: PacketHeader {
                seqno: 0,
                ackno,
                ctrl_flags: ACK_FLAG,
                data_size: 0,
            },
        }
    }

    /// Create the final acknowledgment confirming the end-of-stream
    /// sentinel at offset `ackno`
    pub fn end_of_stream(ackno: u32) -> Self {
        AckPacket {
            header: PacketHeader {
                seqno: 0,
                ackno,
                ctrl_flags: ACK_FLAG | EOS_FLAG,
                data_size: 0,
            },
        }
    }

    /// Next byte offset the receiver expects
    #[inline]
    pub fn ackno(&self) -> u32 {
        self.header.ackno
    }

    /// Check if this acknowledgment confirms the end-of-stream sentinel
    #[inline]
    pub fn is_eos(&self) -> bool {
        self.header.is_eos()
    }

    /// Serialize the acknowledgment to bytes
    pub fn to_bytes(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE);
        self.header.to_bytes(&mut buf);
        buf
    }

    /// Parse an acknowledgment from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketError> {
        let header = PacketHeader::from_bytes(bytes)?;

        if !header.is_ack() {
            return Err(PacketError::WrongPacketType {
                expected: "ack",
                actual: "data",
            });
        }

        if header.data_size != 0 {
            return Err(PacketError::LengthMismatch {
                declared: header.data_size as usize,
                actual: 0,
            });
        }

        Ok(AckPacket { header })
    }
}

/// Unified packet type (either a data segment or an acknowledgment)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Data(DataSegment),
    Ack(AckPacket),
}

impl Packet {
    /// Check if this is a data segment
    pub fn is_data(&self) -> bool {
        matches!(self, Packet::Data(_))
    }

    /// Check if this is an acknowledgment
    pub fn is_ack(&self) -> bool {
        matches!(self, Packet::Ack(_))
    }

    /// Get the packet header
    pub fn header(&self) -> &PacketHeader {
        match self {
            Packet::Data(p) => &p.header,
            Packet::Ack(p) => &p.header,
        }
    }

    /// Total size on the wire
    pub fn size(&self) -> usize {
        match self {
            Packet::Data(p) => p.size(),
            Packet::Ack(_) => HEADER_SIZE,
        }
    }

    /// Serialize the packet to bytes
    pub fn to_bytes(&self) -> BytesMut {
        match self {
            Packet::Data(p) => p.to_bytes(),
            Packet::Ack(p) => p.to_bytes(),
        }
    }

    /// Parse a packet from bytes (automatically determines type)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketError> {
        let header = PacketHeader::from_bytes(bytes)?;

        if header.is_data() {
            Ok(Packet::Data(DataSegment::from_bytes(bytes)?))
        } else {
            Ok(Packet::Ack(AckPacket::from_bytes(bytes)?))
        }
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Packet::Data(p) if p.is_sentinel() => write!(f, "Sentinel(seqno={})", p.seqno()),
            Packet::Data(p) => {
                write!(f, "Data(seqno={}, len={})", p.seqno(), p.payload.len())
            }
            Packet::Ack(p) if p.is_eos() => write!(f, "EosAck(ackno={})", p.ackno()),
            Packet::Ack(p) => write!(f, "Ack(ackno={})", p.ackno()),
        }
    }
}

/// Reject messages whose declared payload is oversized or inconsistent
/// with the datagram actually received. Accepting either could corrupt the
/// reconstructed file, so both are hard decode failures.
fn validate_payload(header: &PacketHeader, bytes: &[u8]) -> Result<(), PacketError> {
    let declared = header.data_size as usize;

    if declared > MAX_PAYLOAD_SIZE {
        return Err(PacketError::PayloadTooLarge {
            size: declared,
            max: MAX_PAYLOAD_SIZE,
        });
    }

    let actual = bytes.len() - HEADER_SIZE;
    if declared != actual {
        return Err(PacketError::LengthMismatch { declared, actual });
    }

    Ok(())
}

/// Packet parsing and validation errors
#[derive(Error, Debug)]
pub enum PacketError {
    #[error("Insufficient data: expected {expected} bytes, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    #[error("Wrong packet type: expected {expected}, got {actual}")]
    WrongPacketType {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Declared payload length {declared} does not match received {actual}")]
    LengthMismatch { declared: usize, actual: usize },
}
