//! Receiver session
//!
//! Single-threaded: receive one datagram, classify it through the
//! sequencer, write and acknowledge, repeat. The receiver holds no window
//! and no reassembly buffer, so there is nothing to synchronize; it also
//! has no timeout of its own and waits indefinitely for the next segment.

use rdt_io::{RdtSocket, SocketError};
use rdt_protocol::packet::{AckPacket, Packet, PacketError, FINAL_ACK_REPEAT};
use rdt_protocol::sequencer::{Disposition, ReceiveSequencer};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::thread;
use std::time::Duration;
use thiserror::Error;

use crate::stats::{StatsHandle, TransferStats};

/// How long to sleep when the socket has nothing pending
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Datagrams larger than any legal message still arrive truncated to the
/// buffer; a little headroom past the maximum keeps the length check in
/// the decoder meaningful.
const RECV_BUFFER_SIZE: usize = 2048;

/// Receiver session errors
#[derive(Error, Debug)]
pub enum ReceiveError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Socket error: {0}")]
    Socket(#[from] SocketError),

    #[error("Malformed packet from peer: {0}")]
    Packet(#[from] PacketError),
}

/// Receiver tuning knobs
#[derive(Debug, Clone)]
pub struct ReceiverOptions {
    /// Local address to listen on
    pub bind: SocketAddr,
}

impl ReceiverOptions {
    /// Listen on the given local address
    pub fn new(bind: SocketAddr) -> Self {
        ReceiverOptions { bind }
    }
}

/// One incoming file transfer
pub struct Receiver {
    socket: RdtSocket,
    sequencer: ReceiveSequencer,
    stats: StatsHandle,
}

impl Receiver {
    /// Bind the listening socket
    pub fn bind(options: ReceiverOptions) -> Result<Self, ReceiveError> {
        let socket = RdtSocket::bind(options.bind)?;
        Ok(Receiver {
            socket,
            sequencer: ReceiveSequencer::new(),
            stats: StatsHandle::new(),
        })
    }

    /// Address the socket actually listens on
    pub fn local_addr(&self) -> Result<SocketAddr, ReceiveError> {
        Ok(self.socket.local_addr()?)
    }

    /// Live statistics handle, cloneable into a display thread
    pub fn stats(&self) -> StatsHandle {
        self.stats.clone()
    }

    /// Receive one stream into `out` until the end-of-stream sentinel
    ///
    /// Payloads are written append-only in strictly increasing offset
    /// order. The final acknowledgment is repeated `FINAL_ACK_REPEAT`
    /// times before returning, since no further segment would trigger a
    /// fresh one if it got lost.
    pub fn run<W: Write>(mut self, mut out: W) -> Result<TransferStats, ReceiveError> {
        let mut buf = [0u8; RECV_BUFFER_SIZE];
        let local = self.local_addr()?;
        tracing::info!(addr = %local, "waiting for transfer");

        loop {
            let (n, peer) = match self.socket.try_recv_from(&mut buf)? {
                Some(received) => received,
                None => {
                    thread::sleep(POLL_INTERVAL);
                    continue;
                }
            };

            let seg = match Packet::from_bytes(&buf[..n])? {
                Packet::Data(seg) => seg,
                Packet::Ack(ack) => {
                    tracing::debug!(peer = %peer, ackno = ack.ackno(), "ignoring stray ACK");
                    continue;
                }
            };

            self.stats.update(|s| s.segments_received += 1);

            match self.sequencer.on_segment(&seg) {
                Disposition::InOrder { ack } => {
                    // Write before acknowledging: an output failure must
                    // not leave bytes promised to the sender.
                    out.write_all(&seg.payload)?;
                    self.stats.update(|s| s.bytes_transferred += seg.payload.len() as u64);
                    self.send_ack(ack, peer)?;
                }
                Disposition::Discard { ack } => {
                    self.stats.update(|s| s.segments_discarded += 1);
                    self.send_ack(ack, peer)?;
                }
                Disposition::EndOfStream { ack } => {
                    out.flush()?;
                    for _ in 0..FINAL_ACK_REPEAT {
                        self.send_ack(ack, peer)?;
                    }
                    let stats = self.stats.snapshot();
                    tracing::info!(
                        bytes = stats.bytes_transferred,
                        segments = stats.segments_received,
                        "transfer complete"
                    );
                    return Ok(stats);
                }
            }
        }
    }

    fn send_ack(&self, ack: AckPacket, peer: SocketAddr) -> Result<(), ReceiveError> {
        self.socket.send_to(&ack.to_bytes(), peer)?;
        self.stats.update(|s| s.acks_sent += 1);
        tracing::trace!(ackno = ack.ackno(), eos = ack.is_eos(), "sent ACK");
        Ok(())
    }
}
