//! Reliable file sender
//!
//! Segments a file and ships it to a receiver over UDP with a Go-Back-N
//! sliding window.

use anyhow::Context;
use clap::Parser;
use rdt::{Sender, SenderOptions};
use rdt_cli::config::Config;
use rdt_cli::stats::{display_compact_stats, display_sender_summary};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rdt-sender")]
#[command(about = "Go-Back-N reliable file sender", long_about = None)]
struct Args {
    /// Destination host
    host: Option<String>,

    /// Destination port
    port: Option<u16>,

    /// Input file path
    file: Option<PathBuf>,

    /// Read settings from a TOML config file (flags override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum outstanding segments
    #[arg(short, long)]
    window: Option<usize>,

    /// Payload bytes per segment
    #[arg(long)]
    segment_size: Option<usize>,

    /// Retransmission timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Consecutive no-progress timeouts before giving up
    #[arg(long)]
    max_retries: Option<u32>,

    /// Statistics interval in seconds (0 disables, default 1)
    #[arg(long)]
    stats: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let file_config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?
            .sender,
        None => None,
    };

    let host = args
        .host
        .or_else(|| file_config.as_ref().map(|c| c.host.clone()))
        .context("destination host required (argument or config file)")?;
    let port = args
        .port
        .or_else(|| file_config.as_ref().map(|c| c.port))
        .context("destination port required (argument or config file)")?;
    let input = args
        .file
        .or_else(|| file_config.as_ref().map(|c| PathBuf::from(&c.input)))
        .context("input file required (argument or config file)")?;

    let remote: SocketAddr = (host.as_str(), port)
        .to_socket_addrs()
        .with_context(|| format!("invalid host {}", host))?
        .next()
        .with_context(|| format!("could not resolve host {}", host))?;

    let mut options = SenderOptions::new(remote);
    if let Some(cfg) = &file_config {
        options.window_size = cfg.window_size;
        options.segment_size = cfg.segment_size;
        options.retry_timeout = cfg.retry_timeout();
        options.max_retries = cfg.max_retries;
    }
    if let Some(window) = args.window {
        options.window_size = window;
    }
    if let Some(segment_size) = args.segment_size {
        options.segment_size = segment_size;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        options.retry_timeout = Duration::from_millis(timeout_ms);
    }
    if let Some(max_retries) = args.max_retries {
        options.max_retries = max_retries;
    }

    tracing::info!(remote = %remote, input = %input.display(), "rdt-sender starting");

    let sender = Sender::from_file(options, &input)
        .with_context(|| format!("cannot prepare transfer of {}", input.display()))?;

    let start = Instant::now();
    let stats_interval = args
        .stats
        .or_else(|| file_config.as_ref().map(|c| c.stats_interval_secs))
        .unwrap_or(1);
    if stats_interval > 0 {
        let handle = sender.stats();
        thread::spawn(move || loop {
            thread::sleep(Duration::from_secs(stats_interval));
            display_compact_stats(&handle.snapshot(), start.elapsed());
        });
    }

    let summary = sender.run().context("transfer failed")?;
    display_sender_summary(&summary, start.elapsed());

    Ok(())
}
