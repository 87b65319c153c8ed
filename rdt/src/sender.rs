//! Sender session
//!
//! Drives a `SendWindow` against a live socket. Two activities cooperate:
//! a reader thread that decodes incoming datagrams and forwards
//! acknowledgment events over a channel, and the controller loop below,
//! which owns the window exclusively and waits on that channel with a
//! deadline equal to the retransmission timer's remaining time. Window
//! state therefore has a single mutating owner; timer expiry and ACK
//! arrival can never race on it.

use crossbeam::channel::{self, Receiver as ChannelReceiver, RecvTimeoutError, Sender as ChannelSender};
use rdt_io::{RdtSocket, RetransmitTimer, RetryBudget, SocketError};
use rdt_protocol::packet::{AckPacket, DataSegment, Packet, PacketError, MAX_PACKET_SIZE};
use rdt_protocol::segment::{SegmentError, SegmentTable};
use rdt_protocol::window::{AckOutcome, SendWindow};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;

use crate::stats::{StatsHandle, TransferStats};

/// How long the reader thread sleeps when the socket has nothing pending
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Sender session errors
#[derive(Error, Debug)]
pub enum SendError {
    #[error("Socket error: {0}")]
    Socket(#[from] SocketError),

    #[error("Segmentation error: {0}")]
    Segment(#[from] SegmentError),

    #[error("Malformed packet from peer: {0}")]
    Packet(#[from] PacketError),

    #[error("No acknowledgment progress after {attempts} consecutive timeouts")]
    RetriesExhausted { attempts: u32 },

    #[error("Acknowledgment reader thread terminated unexpectedly")]
    AckChannelClosed,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Sender tuning knobs
#[derive(Debug, Clone)]
pub struct SenderOptions {
    /// Peer address segments are sent to
    pub remote: SocketAddr,
    /// Local bind address (any port by default)
    pub bind: SocketAddr,
    /// Maximum number of outstanding segments
    pub window_size: usize,
    /// Payload bytes per segment
    pub segment_size: usize,
    /// Retransmission timeout, measured from the last window progress
    pub retry_timeout: Duration,
    /// Consecutive no-progress timeouts tolerated before giving up
    pub max_retries: u32,
}

impl SenderOptions {
    /// Defaults for sending to `remote`: window of 10 segments, full-MTU
    /// payloads, 100 ms retransmission timeout, 120 retries.
    pub fn new(remote: SocketAddr) -> Self {
        SenderOptions {
            remote,
            bind: "0.0.0.0:0".parse().expect("static address"),
            window_size: 10,
            segment_size: rdt_protocol::MAX_PAYLOAD_SIZE,
            retry_timeout: Duration::from_millis(100),
            max_retries: 120,
        }
    }

    fn validate(&self) -> Result<(), SendError> {
        if self.window_size == 0 {
            return Err(SendError::InvalidConfig(
                "window size must be at least 1".into(),
            ));
        }
        if self.segment_size == 0 || self.segment_size > rdt_protocol::MAX_PAYLOAD_SIZE {
            return Err(SendError::InvalidConfig(format!(
                "segment size {} outside 1..={}",
                self.segment_size,
                rdt_protocol::MAX_PAYLOAD_SIZE
            )));
        }
        Ok(())
    }
}

/// One outgoing file transfer
#[derive(Debug)]
pub struct Sender {
    socket: RdtSocket,
    remote: SocketAddr,
    window: SendWindow,
    retry_timeout: Duration,
    max_retries: u32,
    stats: StatsHandle,
}

impl Sender {
    /// Create a session over an already-built segment table
    pub fn new(options: SenderOptions, table: SegmentTable) -> Result<Self, SendError> {
        options.validate()?;
        let socket = RdtSocket::bind(options.bind)?;

        Ok(Sender {
            socket,
            remote: options.remote,
            window: SendWindow::new(table, options.window_size),
            retry_timeout: options.retry_timeout,
            max_retries: options.max_retries,
            stats: StatsHandle::new(),
        })
    }

    /// Segment `path` and create a session for it
    pub fn from_file<P: AsRef<Path>>(options: SenderOptions, path: P) -> Result<Self, SendError> {
        options.validate()?;
        let table = SegmentTable::from_file(path, options.segment_size)?;
        Sender::new(options, table)
    }

    /// Live statistics handle, cloneable into a display thread
    pub fn stats(&self) -> StatsHandle {
        self.stats.clone()
    }

    /// Run the transfer to completion
    ///
    /// Returns the final counters on success. Fails on local I/O errors or
    /// once the retry budget is exhausted without acknowledgment progress.
    pub fn run(mut self) -> Result<TransferStats, SendError> {
        let total = self.window.table().len();
        let bytes = self.window.table().stream_end();
        tracing::info!(
            remote = %self.remote,
            segments = total,
            bytes,
            "starting transfer"
        );

        let (ack_tx, ack_rx) = channel::unbounded();
        let shutdown = Arc::new(AtomicBool::new(false));
        let reader = {
            let socket = self.socket.try_clone()?;
            let shutdown = shutdown.clone();
            thread::spawn(move || ack_reader(socket, ack_tx, shutdown))
        };

        let result = self.control_loop(&ack_rx);

        shutdown.store(true, Ordering::Relaxed);
        drop(ack_rx);
        let _ = reader.join();

        match &result {
            Ok(stats) => tracing::info!(
                segments_sent = stats.segments_sent,
                retransmissions = stats.retransmissions,
                "transfer complete"
            ),
            Err(e) => tracing::error!(error = %e, "transfer failed"),
        }
        result
    }

    /// Controller loop: single owner of the window state
    fn control_loop(
        &mut self,
        ack_rx: &ChannelReceiver<Result<AckPacket, SendError>>,
    ) -> Result<TransferStats, SendError> {
        let mut timer = RetransmitTimer::new(self.retry_timeout);
        let mut budget = RetryBudget::new(self.max_retries);

        // Initial fill: first window_size segments, then arm the timer.
        transmit(&self.socket, self.remote, self.window.refill(), &self.stats, false)?;
        timer.reset();

        loop {
            match ack_rx.recv_timeout(timer.remaining()) {
                Ok(Ok(ack)) => match self.window.on_ack(&ack) {
                    AckOutcome::Stale => {
                        self.stats.update(|s| s.stale_acks += 1);
                    }
                    AckOutcome::Advanced => {
                        self.stats.update(|s| s.acks_received += 1);
                        budget.record_progress();
                        timer.reset();
                        transmit(
                            &self.socket,
                            self.remote,
                            self.window.refill(),
                            &self.stats,
                            false,
                        )?;
                    }
                    AckOutcome::Complete => {
                        self.stats.update(|s| s.acks_received += 1);
                        return Ok(self.stats.snapshot());
                    }
                },
                Ok(Err(e)) => return Err(e),
                Err(RecvTimeoutError::Timeout) => {
                    if !budget.record_timeout() {
                        return Err(SendError::RetriesExhausted {
                            attempts: budget.consecutive(),
                        });
                    }
                    let in_flight = self.window.on_timeout();
                    tracing::info!(
                        count = in_flight.len(),
                        base = self.window.base(),
                        "timeout, resending in-flight window"
                    );
                    self.stats.update(|s| s.timeouts += 1);
                    transmit(&self.socket, self.remote, in_flight, &self.stats, true)?;
                    timer.reset();
                }
                Err(RecvTimeoutError::Disconnected) => return Err(SendError::AckChannelClosed),
            }
        }
    }
}

/// Transmit a batch of segments and account for them
fn transmit(
    socket: &RdtSocket,
    remote: SocketAddr,
    segments: &[DataSegment],
    stats: &StatsHandle,
    retransmit: bool,
) -> Result<(), SendError> {
    for seg in segments {
        socket.send_to(&seg.to_bytes(), remote)?;
        tracing::debug!(seqno = seg.seqno(), len = seg.payload.len(), retransmit, "sent segment");
    }

    let count = segments.len() as u64;
    let payload_bytes: u64 = segments.iter().map(|s| s.payload.len() as u64).sum();
    stats.update(|s| {
        if retransmit {
            s.retransmissions += count;
        } else {
            s.segments_sent += count;
            s.bytes_transferred += payload_bytes;
        }
    });

    Ok(())
}

/// Reader thread: decode datagrams, forward acknowledgment events
///
/// Anything that is not a well-formed packet is a protocol violation and
/// forwarded as a fatal error; a data packet arriving here is logged and
/// dropped (only the peer's receiver sends data).
fn ack_reader(
    socket: RdtSocket,
    tx: ChannelSender<Result<AckPacket, SendError>>,
    shutdown: Arc<AtomicBool>,
) {
    let mut buf = [0u8; MAX_PACKET_SIZE];

    while !shutdown.load(Ordering::Relaxed) {
        match socket.try_recv_from(&mut buf) {
            Ok(Some((n, from))) => match Packet::from_bytes(&buf[..n]) {
                Ok(Packet::Ack(ack)) => {
                    if tx.send(Ok(ack)).is_err() {
                        break;
                    }
                }
                Ok(Packet::Data(_)) => {
                    tracing::warn!(from = %from, "ignoring data packet on sender socket");
                }
                Err(e) => {
                    let _ = tx.send(Err(e.into()));
                    break;
                }
            },
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                let _ = tx.send(Err(e.into()));
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn local_options() -> SenderOptions {
        SenderOptions::new("127.0.0.1:9".parse().unwrap())
    }

    fn small_table() -> SegmentTable {
        SegmentTable::from_reader(Cursor::new(vec![0u8; 100]), 50).unwrap()
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut options = local_options();
        options.window_size = 0;

        let err = Sender::new(options, small_table()).unwrap_err();
        assert!(matches!(err, SendError::InvalidConfig(_)));
    }

    #[test]
    fn test_oversized_segment_size_rejected() {
        let mut options = local_options();
        options.segment_size = rdt_protocol::MAX_PAYLOAD_SIZE + 1;

        let err = Sender::from_file(options, "/dev/null").unwrap_err();
        assert!(matches!(err, SendError::InvalidConfig(_)));
    }

    #[test]
    fn test_missing_input_file_fails() {
        let err = Sender::from_file(local_options(), "/nonexistent/input.bin").unwrap_err();
        assert!(matches!(err, SendError::Segment(SegmentError::Io(_))));
    }
}
