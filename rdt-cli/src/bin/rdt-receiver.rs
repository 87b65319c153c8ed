//! Reliable file receiver
//!
//! Listens for one incoming transfer, reassembles it strictly in order,
//! and writes the result to a file.

use anyhow::Context;
use clap::Parser;
use rdt::{Receiver, ReceiverOptions};
use rdt_cli::config::Config;
use rdt_cli::stats::{display_compact_stats, display_receiver_summary};
use std::fs::File;
use std::io::BufWriter;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rdt-receiver")]
#[command(about = "Go-Back-N reliable file receiver", long_about = None)]
struct Args {
    /// Listening port
    port: Option<u16>,

    /// Output file path
    file: Option<PathBuf>,

    /// Bind address (default 0.0.0.0)
    #[arg(short, long)]
    bind: Option<String>,

    /// Read settings from a TOML config file (flags override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

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
            .receiver,
        None => None,
    };

    let port = args
        .port
        .or_else(|| file_config.as_ref().map(|c| c.port))
        .context("listening port required (argument or config file)")?;
    let output = args
        .file
        .or_else(|| file_config.as_ref().map(|c| PathBuf::from(&c.output)))
        .context("output file required (argument or config file)")?;
    let bind_host = args
        .bind
        .clone()
        .or_else(|| file_config.as_ref().map(|c| c.bind.clone()))
        .unwrap_or_else(|| "0.0.0.0".to_string());

    let listen_addr: SocketAddr = format!("{}:{}", bind_host, port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", bind_host, port))?;

    let receiver =
        Receiver::bind(ReceiverOptions::new(listen_addr)).context("cannot bind listening socket")?;
    let local = receiver.local_addr().context("cannot read local address")?;
    tracing::info!(addr = %local, output = %output.display(), "rdt-receiver listening");

    let writer = BufWriter::new(
        File::create(&output)
            .with_context(|| format!("cannot create output file {}", output.display()))?,
    );

    let start = Instant::now();
    let stats_interval = args
        .stats
        .or_else(|| file_config.as_ref().map(|c| c.stats_interval_secs))
        .unwrap_or(1);
    if stats_interval > 0 {
        let handle = receiver.stats();
        thread::spawn(move || loop {
            thread::sleep(Duration::from_secs(stats_interval));
            display_compact_stats(&handle.snapshot(), start.elapsed());
        });
    }

    let summary = receiver.run(writer).context("transfer failed")?;
    display_receiver_summary(&summary, start.elapsed());

    Ok(())
}
