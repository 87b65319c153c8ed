//! Transfer statistics
//!
//! Counters published by a running session through a cloneable handle, so
//! a display thread can snapshot them while the transfer is in progress.

use parking_lot::RwLock;
use std::sync::Arc;

/// Counters for one transfer session
///
/// Sender sessions fill the send-side counters, receiver sessions the
/// receive-side ones; `bytes_transferred` counts payload bytes (sent for a
/// sender, written to output for a receiver).
#[derive(Debug, Clone, Copy, Default)]
pub struct TransferStats {
    /// Data segments transmitted, first transmissions only
    pub segments_sent: u64,
    /// Data segments transmitted again after a timeout
    pub retransmissions: u64,
    /// Retransmission timer expiries
    pub timeouts: u64,
    /// Acknowledgments that advanced the window (completion included)
    pub acks_received: u64,
    /// Acknowledgments carrying no new information
    pub stale_acks: u64,
    /// Data segments received (any disposition)
    pub segments_received: u64,
    /// Received segments dropped as duplicate or out-of-order
    pub segments_discarded: u64,
    /// Acknowledgments transmitted
    pub acks_sent: u64,
    /// Payload bytes transferred
    pub bytes_transferred: u64,
}

/// Cloneable view onto a session's live statistics
#[derive(Clone, Default, Debug)]
pub struct StatsHandle {
    inner: Arc<RwLock<TransferStats>>,
}

impl StatsHandle {
    /// Create a zeroed handle
    pub fn new() -> Self {
        StatsHandle::default()
    }

    /// Copy of the counters at this instant
    pub fn snapshot(&self) -> TransferStats {
        *self.inner.read()
    }

    /// Apply a mutation under the write lock
    pub(crate) fn update<F: FnOnce(&mut TransferStats)>(&self, f: F) {
        f(&mut self.inner.write());
    }
}
