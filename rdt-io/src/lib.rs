//! I/O and Platform Abstraction
//!
//! This crate provides the datagram socket wrapper and the retransmission
//! timing primitives used by the transfer sessions.

pub mod socket;
pub mod time;

pub use socket::{RdtSocket, SocketError};
pub use time::{RetransmitTimer, RetryBudget};
