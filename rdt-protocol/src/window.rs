//! Sliding send window
//!
//! Go-Back-N sender state: a contiguous index range `[base, next)` over the
//! segment table, where `base` is the oldest unacknowledged segment and
//! `next` the first segment not yet sent. The window reacts to two events,
//! a cumulative acknowledgment and a retransmission timeout, and never does
//! I/O itself; the session layer transmits whatever slice an event yields.
//!
//! Invariants: `base <= next <= total` and `next - base <= window_size`.
//! A stale acknowledgment (one not exceeding the highest offset already
//! acknowledged) changes nothing, which is what makes the scheme safe
//! against duplicated and reordered ACKs.

use crate::packet::{AckPacket, DataSegment};
use crate::segment::SegmentTable;

/// Result of feeding one acknowledgment to the window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// No new information; window untouched, timer untouched
    Stale,
    /// `base` advanced; restart the timer and refill the window
    Advanced,
    /// The end-of-stream sentinel is acknowledged; the transfer is done
    Complete,
}

/// Sliding window over a segment table
#[derive(Debug)]
pub struct SendWindow {
    table: SegmentTable,
    window_size: usize,
    /// Index of the oldest unacknowledged segment
    base: usize,
    /// Index of the next segment not yet sent
    next: usize,
    /// Highest cumulative acknowledgment observed
    highest_ack: u32,
    sentinel_acked: bool,
}

impl SendWindow {
    /// Create a window over `table` admitting at most `window_size`
    /// outstanding segments.
    ///
    /// # Panics
    /// Panics if `window_size` is zero.
    pub fn new(table: SegmentTable, window_size: usize) -> Self {
        assert!(window_size > 0, "window size must be at least 1");
        SendWindow {
            table,
            window_size,
            base: 0,
            next: 0,
            highest_ack: 0,
            sentinel_acked: false,
        }
    }

    /// Admit as many unsent segments as fit the window
    ///
    /// Returns the newly admitted segments, in stream order, for
    /// transmission. The first call performs the initial fill; after an
    /// `Advanced` outcome it yields exactly the segments uncovered by the
    /// window slide.
    pub fn refill(&mut self) -> &[DataSegment] {
        let from = self.next;
        let room = self.window_size - (self.next - self.base);
        self.next = (self.next + room).min(self.table.len());
        self.check_invariants();

        let admitted = self.table.range(from, self.next);
        if !admitted.is_empty() {
            tracing::debug!(from, to = self.next, "window admits segments");
        }
        admitted
    }

    /// Process one cumulative acknowledgment
    pub fn on_ack(&mut self, ack: &AckPacket) -> AckOutcome {
        let ackno = ack.ackno();

        if ack.is_eos() {
            // Only the final ACK carries the end-of-stream flag, and it
            // always names the sentinel offset.
            if ackno != self.table.stream_end() {
                tracing::warn!(ackno, "end-of-stream ACK with bogus offset, ignoring");
                return AckOutcome::Stale;
            }
            if self.sentinel_acked {
                return AckOutcome::Stale;
            }
            self.sentinel_acked = true;
            self.highest_ack = ackno;
            self.base = self.table.len();
            self.next = self.table.len();
            self.check_invariants();
            return AckOutcome::Complete;
        }

        if ackno <= self.highest_ack {
            tracing::debug!(ackno, highest = self.highest_ack, "stale ACK");
            return AckOutcome::Stale;
        }

        let idx = match self.table.index_of_offset(ackno) {
            Some(idx) if idx <= self.next => idx,
            Some(idx) => {
                tracing::warn!(ackno, idx, next = self.next, "ACK beyond sent range, ignoring");
                return AckOutcome::Stale;
            }
            None => {
                tracing::warn!(ackno, "ACK names no segment boundary, ignoring");
                return AckOutcome::Stale;
            }
        };

        self.highest_ack = ackno;
        self.base = idx;
        self.check_invariants();
        tracing::debug!(ackno, base = self.base, "window advanced");
        AckOutcome::Advanced
    }

    /// Segments to retransmit on timer expiry: the entire in-flight range
    /// `[base, next)`, verbatim.
    pub fn on_timeout(&self) -> &[DataSegment] {
        self.table.range(self.base, self.next)
    }

    /// Number of segments sent but not yet acknowledged
    pub fn in_flight(&self) -> usize {
        self.next - self.base
    }

    /// True once the sentinel has been acknowledged
    pub fn is_complete(&self) -> bool {
        self.sentinel_acked
    }

    /// Highest cumulative acknowledgment observed so far
    pub fn highest_ack(&self) -> u32 {
        self.highest_ack
    }

    /// Index of the oldest unacknowledged segment
    pub fn base(&self) -> usize {
        self.base
    }

    /// Index of the next segment not yet sent
    pub fn next_index(&self) -> usize {
        self.next
    }

    /// The underlying segment table
    pub fn table(&self) -> &SegmentTable {
        &self.table
    }

    fn check_invariants(&self) {
        debug_assert!(self.base <= self.next);
        debug_assert!(self.next <= self.table.len());
        debug_assert!(self.next - self.base <= self.window_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// 25 data segments of 1000 bytes plus the sentinel
    fn window(window_size: usize) -> SendWindow {
        let data: Vec<u8> = (0..25_000).map(|i| (i % 256) as u8).collect();
        let table = SegmentTable::from_reader(Cursor::new(data), 1000).unwrap();
        SendWindow::new(table, window_size)
    }

    #[test]
    fn test_initial_fill_respects_window_size() {
        let mut w = window(10);
        let sent = w.refill();

        assert_eq!(sent.len(), 10);
        assert_eq!(sent[0].seqno(), 0);
        assert_eq!(sent[9].seqno(), 9000);
        assert_eq!(w.in_flight(), 10);
    }

    #[test]
    fn test_initial_fill_smaller_table() {
        let table = SegmentTable::from_reader(Cursor::new(vec![0u8; 1500]), 1000).unwrap();
        let mut w = SendWindow::new(table, 10);

        // 2 data segments + sentinel, all admitted at once
        assert_eq!(w.refill().len(), 3);
        assert_eq!(w.in_flight(), 3);
    }

    #[test]
    fn test_ack_advances_and_slides_one() {
        let mut w = window(10);
        w.refill();

        assert_eq!(w.on_ack(&AckPacket::new(1000)), AckOutcome::Advanced);
        assert_eq!(w.base(), 1);

        let sent = w.refill();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].seqno(), 10_000);
        assert_eq!(w.in_flight(), 10);
    }

    #[test]
    fn test_cumulative_ack_covers_several_segments() {
        let mut w = window(10);
        w.refill();

        // One ACK confirming the first four segments at once
        assert_eq!(w.on_ack(&AckPacket::new(4000)), AckOutcome::Advanced);
        assert_eq!(w.base(), 4);

        let sent = w.refill();
        assert_eq!(sent.len(), 4);
        assert_eq!(w.in_flight(), 10);
    }

    #[test]
    fn test_stale_ack_is_ignored() {
        let mut w = window(10);
        w.refill();
        w.on_ack(&AckPacket::new(3000));

        assert_eq!(w.on_ack(&AckPacket::new(3000)), AckOutcome::Stale);
        assert_eq!(w.on_ack(&AckPacket::new(1000)), AckOutcome::Stale);
        assert_eq!(w.on_ack(&AckPacket::new(0)), AckOutcome::Stale);
        assert_eq!(w.base(), 3);
    }

    #[test]
    fn test_ack_for_unsent_offset_is_ignored() {
        let mut w = window(4);
        w.refill(); // next == 4

        assert_eq!(w.on_ack(&AckPacket::new(20_000)), AckOutcome::Stale);
        assert_eq!(w.base(), 0);
    }

    #[test]
    fn test_ack_off_boundary_is_ignored() {
        let mut w = window(10);
        w.refill();

        assert_eq!(w.on_ack(&AckPacket::new(1500)), AckOutcome::Stale);
        assert_eq!(w.base(), 0);
    }

    #[test]
    fn test_timeout_resends_entire_flight_verbatim() {
        let mut w = window(10);
        let first: Vec<DataSegment> = w.refill().to_vec();
        w.on_ack(&AckPacket::new(2000));
        w.refill();

        let resent = w.on_timeout();
        assert_eq!(resent.len(), 10);
        assert_eq!(resent[0].seqno(), 2000);
        // Verbatim: same seqno and payload as originally transmitted
        assert_eq!(resent[0], first[2]);
        assert_eq!(resent[7], first[9]);
    }

    #[test]
    fn test_window_bound_holds_throughout() {
        let mut w = window(5);
        w.refill();
        for ackno in (1000..=25_000).step_by(1000) {
            assert!(w.in_flight() <= 5);
            w.on_ack(&AckPacket::new(ackno));
            w.refill();
            assert!(w.in_flight() <= 5);
        }
    }

    #[test]
    fn test_plain_ack_for_file_size_does_not_complete() {
        let mut w = window(30);
        w.refill();

        // All data acknowledged, sentinel still outstanding
        assert_eq!(w.on_ack(&AckPacket::new(25_000)), AckOutcome::Advanced);
        assert!(!w.is_complete());
        assert_eq!(w.in_flight(), 1); // the sentinel
    }

    #[test]
    fn test_eos_ack_completes() {
        let mut w = window(30);
        w.refill();
        w.on_ack(&AckPacket::new(25_000));

        assert_eq!(
            w.on_ack(&AckPacket::end_of_stream(25_000)),
            AckOutcome::Complete
        );
        assert!(w.is_complete());
        assert_eq!(w.in_flight(), 0);

        // Repeats of the final ACK carry nothing new
        assert_eq!(
            w.on_ack(&AckPacket::end_of_stream(25_000)),
            AckOutcome::Stale
        );
    }

    #[test]
    fn test_eos_ack_with_wrong_offset_is_ignored() {
        let mut w = window(10);
        w.refill();

        assert_eq!(
            w.on_ack(&AckPacket::end_of_stream(1000)),
            AckOutcome::Stale
        );
        assert!(!w.is_complete());
    }

    #[test]
    fn test_empty_stream_is_sentinel_only() {
        let table = SegmentTable::from_reader(Cursor::new(Vec::new()), 1000).unwrap();
        let mut w = SendWindow::new(table, 10);

        let sent = w.refill();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].is_sentinel());

        assert_eq!(w.on_ack(&AckPacket::end_of_stream(0)), AckOutcome::Complete);
        assert!(w.is_complete());
    }
}
