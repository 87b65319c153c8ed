//! Configuration file support for the CLI tools
//!
//! Both tools accept a TOML file carrying the same settings as their
//! command-line flags; explicit flags win over file values.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Sender configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderConfig {
    /// Destination host name or address
    pub host: String,
    /// Destination port
    pub port: u16,
    /// Input file path
    pub input: String,
    /// Maximum outstanding segments
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Payload bytes per segment
    #[serde(default = "default_segment_size")]
    pub segment_size: usize,
    /// Retransmission timeout in milliseconds
    #[serde(default = "default_retry_timeout_ms")]
    pub retry_timeout_ms: u64,
    /// Consecutive no-progress timeouts before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Statistics display interval in seconds (0 disables)
    #[serde(default = "default_stats_interval")]
    pub stats_interval_secs: u64,
}

/// Receiver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverConfig {
    /// Listening port
    pub port: u16,
    /// Bind address
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Output file path
    pub output: String,
    /// Statistics display interval in seconds (0 disables)
    #[serde(default = "default_stats_interval")]
    pub stats_interval_secs: u64,
}

fn default_window_size() -> usize {
    10
}

fn default_segment_size() -> usize {
    rdt_protocol::MAX_PAYLOAD_SIZE
}

fn default_retry_timeout_ms() -> u64 {
    100
}

fn default_max_retries() -> u32 {
    120
}

fn default_stats_interval() -> u64 {
    1
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

/// Combined configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Sender configuration
    pub sender: Option<SenderConfig>,
    /// Receiver configuration
    pub receiver: Option<ReceiverConfig>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Create an example sender configuration
    pub fn example_sender() -> Self {
        Config {
            sender: Some(SenderConfig {
                host: "192.168.1.10".to_string(),
                port: 9000,
                input: "payload.bin".to_string(),
                window_size: default_window_size(),
                segment_size: default_segment_size(),
                retry_timeout_ms: default_retry_timeout_ms(),
                max_retries: default_max_retries(),
                stats_interval_secs: default_stats_interval(),
            }),
            receiver: None,
        }
    }

    /// Create an example receiver configuration
    pub fn example_receiver() -> Self {
        Config {
            sender: None,
            receiver: Some(ReceiverConfig {
                port: 9000,
                bind: default_bind(),
                output: "received.bin".to_string(),
                stats_interval_secs: default_stats_interval(),
            }),
        }
    }
}

impl SenderConfig {
    /// Retransmission timeout as a Duration
    pub fn retry_timeout(&self) -> Duration {
        Duration::from_millis(self.retry_timeout_ms)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}
