//! CLI Library
//!
//! Shared functionality for the transfer command-line tools.

pub mod config;
pub mod stats;

pub use config::{Config, ConfigError, ReceiverConfig, SenderConfig};
pub use stats::{
    display_compact_stats, display_receiver_summary, display_sender_summary, format_bandwidth,
    format_bytes, format_duration,
};
