//! RDT - Reliable Datagram Transfer
//!
//! High-level sender and receiver sessions for the Go-Back-N file
//! transfer protocol.

pub use rdt_io as io;
pub use rdt_protocol as protocol;

pub mod receiver;
pub mod sender;
pub mod stats;

pub use receiver::{ReceiveError, Receiver, ReceiverOptions};
pub use sender::{SendError, Sender, SenderOptions};
pub use stats::{StatsHandle, TransferStats};
