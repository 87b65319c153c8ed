//! Statistics display and formatting

use rdt::TransferStats;
use std::time::Duration;

/// Format bytes in human-readable form
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format bandwidth in human-readable form
pub fn format_bandwidth(bps: u64) -> String {
    const KBPS: u64 = 1000;
    const MBPS: u64 = KBPS * 1000;
    const GBPS: u64 = MBPS * 1000;

    if bps >= GBPS {
        format!("{:.2} Gbps", bps as f64 / GBPS as f64)
    } else if bps >= MBPS {
        format!("{:.2} Mbps", bps as f64 / MBPS as f64)
    } else if bps >= KBPS {
        format!("{:.2} Kbps", bps as f64 / KBPS as f64)
    } else {
        format!("{} bps", bps)
    }
}

/// Format duration in human-readable form
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

/// Throughput over the whole transfer, in bits per second
fn throughput_bps(stats: &TransferStats, elapsed: Duration) -> u64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        ((stats.bytes_transferred as f64) * 8.0 / secs) as u64
    } else {
        0
    }
}

/// Display the final summary of a sender session
pub fn display_sender_summary(stats: &TransferStats, elapsed: Duration) {
    println!("\n┌──────────────────────────────────────────────┐");
    println!("│ TRANSFER SUMMARY (sender)                    │");
    println!("├──────────────────────────────────────────────┤");
    println!("│ Payload:          {:<26} │", format_bytes(stats.bytes_transferred));
    println!("│ Segments sent:    {:<26} │", stats.segments_sent);
    println!("│ Retransmissions:  {:<26} │", stats.retransmissions);
    println!("│ Timeouts:         {:<26} │", stats.timeouts);
    println!("│ ACKs (new/stale): {:<26} │", format!("{}/{}", stats.acks_received, stats.stale_acks));
    println!("│ Elapsed:          {:<26} │", format_duration(elapsed));
    println!("│ Throughput:       {:<26} │", format_bandwidth(throughput_bps(stats, elapsed)));
    println!("└──────────────────────────────────────────────┘");
}

/// Display the final summary of a receiver session
pub fn display_receiver_summary(stats: &TransferStats, elapsed: Duration) {
    println!("\n┌──────────────────────────────────────────────┐");
    println!("│ TRANSFER SUMMARY (receiver)                  │");
    println!("├──────────────────────────────────────────────┤");
    println!("│ Payload:          {:<26} │", format_bytes(stats.bytes_transferred));
    println!("│ Segments:         {:<26} │", stats.segments_received);
    println!("│ Discarded:        {:<26} │", stats.segments_discarded);
    println!("│ ACKs sent:        {:<26} │", stats.acks_sent);
    println!("│ Elapsed:          {:<26} │", format_duration(elapsed));
    println!("│ Throughput:       {:<26} │", format_bandwidth(throughput_bps(stats, elapsed)));
    println!("└──────────────────────────────────────────────┘");
}

/// Display compact stats on one line (for continuous updates)
pub fn display_compact_stats(stats: &TransferStats, elapsed: Duration) {
    print!(
        "\r[{:8}] {} | segs: {} | rexmit: {} | rate: {}        ",
        format_duration(elapsed),
        format_bytes(stats.bytes_transferred),
        stats.segments_sent + stats.segments_received,
        stats.retransmissions,
        format_bandwidth(throughput_bps(stats, elapsed)),
    );

    use std::io::Write;
    let _ = std::io::stdout().flush();
}
