//! Property-based tests for the window and sequencer state machines
//!
//! Random arrival orders, duplication, and arbitrary ACK values must never
//! corrupt the output stream, regress the cumulative ACK, or break the
//! window bound.

use proptest::prelude::*;
use rdt_protocol::packet::AckPacket;
use rdt_protocol::sequencer::Disposition;
use rdt_protocol::{DataSegment, ReceiveSequencer, SegmentTable, SendWindow};
use std::io::Cursor;

fn source(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 131) ^ (i >> 2)) as u8).collect()
}

fn segments_of(data: &[u8], segment_size: usize) -> Vec<DataSegment> {
    SegmentTable::from_reader(Cursor::new(data.to_vec()), segment_size)
        .unwrap()
        .iter()
        .cloned()
        .collect()
}

proptest! {
    /// Whatever arrives in whatever order, the bytes written are always
    /// exactly the stream prefix up to the expected offset, and the
    /// emitted ACK values never decrease.
    #[test]
    fn prop_output_is_always_an_ordered_prefix(
        len in 0usize..3000,
        segment_size in 1usize..=200,
        arrivals in prop::collection::vec(0usize..64, 0..256),
    ) {
        let data = source(len);
        let segments = segments_of(&data, segment_size);

        let mut sequencer = ReceiveSequencer::new();
        let mut output = Vec::new();
        let mut last_ack = 0u32;

        for pick in arrivals {
            let seg = &segments[pick % segments.len()];
            let disposition = sequencer.on_segment(seg);

            if matches!(disposition, Disposition::InOrder { .. }) {
                output.extend_from_slice(&seg.payload);
            }

            let ack = disposition.ack();
            prop_assert!(ack.ackno() >= last_ack);
            last_ack = ack.ackno();

            prop_assert_eq!(sequencer.expected_offset() as usize, output.len());
            prop_assert_eq!(&output[..], &data[..output.len()]);
        }
    }

    /// Delivering the full table once per round, in a rotated order with
    /// duplicates, always reconstructs the stream within `len` rounds.
    #[test]
    fn prop_repeated_rounds_reconstruct_stream(
        len in 1usize..2500,
        segment_size in 1usize..=250,
        rotation in 0usize..32,
    ) {
        let data = source(len);
        let segments = segments_of(&data, segment_size);

        let mut sequencer = ReceiveSequencer::new();
        let mut output = Vec::new();

        let mut rounds = 0;
        while !sequencer.is_finished() {
            // Full rotation per round, every segment delivered twice
            for i in 0..segments.len() {
                let seg = &segments[(i + rounds + rotation) % segments.len()];
                for _ in 0..2 {
                    if matches!(sequencer.on_segment(seg), Disposition::InOrder { .. }) {
                        output.extend_from_slice(&seg.payload);
                    }
                }
            }
            rounds += 1;
            prop_assert!(rounds <= segments.len(), "no progress in a full round");
        }

        prop_assert_eq!(output, data);
    }

    /// Arbitrary ACK values, stale or bogus ones included, never push the
    /// window past its bound or move `base` backwards.
    #[test]
    fn prop_window_bound_survives_arbitrary_acks(
        len in 0usize..4000,
        segment_size in 1usize..=300,
        window_size in 1usize..=16,
        acks in prop::collection::vec(any::<u32>(), 0..128),
    ) {
        let data = source(len);
        let table = SegmentTable::from_reader(Cursor::new(data), segment_size).unwrap();
        let stream_end = table.stream_end();
        let mut window = SendWindow::new(table, window_size);

        window.refill();
        prop_assert!(window.in_flight() <= window_size);

        let mut last_base = window.base();
        for raw in acks {
            // Mix of plausible boundaries and junk offsets
            let ackno = if raw % 3 == 0 { raw % (stream_end + 2) } else { raw };
            window.on_ack(&AckPacket::new(ackno));
            window.refill();

            prop_assert!(window.base() >= last_base);
            prop_assert!(window.base() <= window.next_index());
            prop_assert!(window.in_flight() <= window_size);
            last_base = window.base();
        }
    }
}
