//! End-to-end transfer tests over loopback UDP
//!
//! Runs real sender and receiver sessions against each other, including a
//! deterministic lossy relay that swallows exactly one data segment.

use bytes::BytesMut;
use rdt::io::RdtSocket;
use rdt::{Receiver, ReceiverOptions, Sender, SenderOptions};
use rdt_protocol::packet::PacketHeader;
use rdt_protocol::{Packet, SegmentTable};
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 31) ^ (i >> 3)) as u8).collect()
}

fn spawn_receiver() -> (SocketAddr, thread::JoinHandle<(Vec<u8>, rdt::TransferStats)>) {
    let receiver = Receiver::bind(ReceiverOptions::new("127.0.0.1:0".parse().unwrap())).unwrap();
    let addr = receiver.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let mut out = Vec::new();
        let stats = receiver.run(&mut out).unwrap();
        (out, stats)
    });
    (addr, handle)
}

fn sender_for(remote: SocketAddr, data: &[u8]) -> Sender {
    let mut options = SenderOptions::new(remote);
    options.window_size = 10;
    options.segment_size = 1000;
    let table = SegmentTable::from_reader(Cursor::new(data.to_vec()), 1000).unwrap();
    Sender::new(options, table).unwrap()
}

#[test]
fn test_clean_transfer_over_loopback() {
    let data = payload(25_000);
    let (addr, receiver) = spawn_receiver();

    let summary = sender_for(addr, &data).run().unwrap();
    let (out, rx_stats) = receiver.join().unwrap();

    assert_eq!(out, data);
    assert_eq!(summary.segments_sent, 26);
    assert_eq!(summary.acks_received, 26);
    assert_eq!(rx_stats.bytes_transferred, 25_000);
}

#[test]
fn test_empty_file_transfer() {
    let (addr, receiver) = spawn_receiver();

    let summary = sender_for(addr, &[]).run().unwrap();
    let (out, _) = receiver.join().unwrap();

    assert!(out.is_empty());
    assert_eq!(summary.segments_sent, 1); // sentinel only
    assert_eq!(summary.acks_received, 1);
}

/// Forwards datagrams between the two endpoints, swallowing the first
/// copy of the data segment at offset 12,000.
fn spawn_lossy_relay(
    receiver_addr: SocketAddr,
    stop: Arc<AtomicBool>,
) -> (SocketAddr, thread::JoinHandle<bool>) {
    let relay = RdtSocket::bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let relay_addr = relay.local_addr().unwrap();

    let handle = thread::spawn(move || {
        let mut buf = [0u8; 2048];
        let mut sender_addr: Option<SocketAddr> = None;
        let mut dropped = false;

        while !stop.load(Ordering::Relaxed) {
            match relay.try_recv_from(&mut buf) {
                Ok(Some((n, from))) => {
                    if from == receiver_addr {
                        // ACK path back to the sender
                        if let Some(sender) = sender_addr {
                            let _ = relay.send_to(&buf[..n], sender);
                        }
                    } else {
                        sender_addr = Some(from);
                        if !dropped {
                            if let Ok(Packet::Data(seg)) = Packet::from_bytes(&buf[..n]) {
                                if seg.seqno() == 12_000 {
                                    dropped = true;
                                    continue;
                                }
                            }
                        }
                        let _ = relay.send_to(&buf[..n], receiver_addr);
                    }
                }
                Ok(None) => thread::sleep(Duration::from_micros(200)),
                Err(_) => break,
            }
        }
        dropped
    });

    (relay_addr, handle)
}

#[test]
fn test_transfer_survives_segment_loss() {
    let data = payload(25_000);
    let (receiver_addr, receiver) = spawn_receiver();

    let stop = Arc::new(AtomicBool::new(false));
    let (relay_addr, relay) = spawn_lossy_relay(receiver_addr, stop.clone());

    let summary = sender_for(relay_addr, &data).run().unwrap();
    let (out, _) = receiver.join().unwrap();

    stop.store(true, Ordering::Relaxed);
    let dropped = relay.join().unwrap();

    assert!(dropped, "relay never saw the target segment");
    assert_eq!(out, data);
    assert!(summary.timeouts >= 1, "loss must trigger a timeout");
    assert!(
        summary.retransmissions >= 1,
        "timeout must resend the in-flight window"
    );
}

/// A datagram declaring an oversized payload is a protocol violation and
/// kills the receiver rather than being processed.
#[test]
fn test_receiver_rejects_oversized_declaration() {
    let receiver = Receiver::bind(ReceiverOptions::new("127.0.0.1:0".parse().unwrap())).unwrap();
    let addr = receiver.local_addr().unwrap();
    let handle = thread::spawn(move || receiver.run(Vec::new()));

    let mut buf = BytesMut::new();
    PacketHeader {
        seqno: 0,
        ackno: 0,
        ctrl_flags: 0,
        data_size: 60_000,
    }
    .to_bytes(&mut buf);
    buf.extend_from_slice(&[0u8; 16]);

    let socket = RdtSocket::bind("127.0.0.1:0".parse().unwrap()).unwrap();
    socket.send_to(&buf, addr).unwrap();

    let result = handle.join().unwrap();
    assert!(matches!(result, Err(rdt::ReceiveError::Packet(_))));
}
