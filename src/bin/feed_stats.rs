//! Feed statistics driver: decode a capture and count messages by type
//! without driving a book.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use itch_replay::wire::{AddOrder, MessageHeader, OrderExecuted};
use itch_replay::{find_itch_offset, Decoder, MessageVisitor, PcapReader};

#[derive(Parser, Debug)]
#[command(name = "feed_stats", version, about = "Count ITCH messages in a pcap capture")]
struct Args {
    /// Capture file to scan.
    pcap: PathBuf,
}

#[derive(Default)]
struct StatsVisitor {
    add_orders: u64,
    order_executed: u64,
    system_events: u64,
    unknown: u64,
    total_shares: u64,
    total_executions: u64,
}

impl StatsVisitor {
    fn total_messages(&self) -> u64 {
        self.add_orders + self.order_executed + self.system_events + self.unknown
    }
}

impl MessageVisitor for StatsVisitor {
    fn on_add_order(&mut self, msg: &AddOrder) {
        self.add_orders += 1;
        self.total_shares += msg.shares() as u64;
    }

    fn on_order_executed(&mut self, msg: &OrderExecuted) {
        self.order_executed += 1;
        self.total_executions += msg.executed_shares() as u64;
    }

    fn on_system_event(&mut self, _msg: &MessageHeader) {
        self.system_events += 1;
    }

    fn on_unknown(&mut self, _msg_type: u8, _rest: &[u8]) {
        self.unknown += 1;
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let reader = PcapReader::open(&args.pcap)
        .with_context(|| format!("failed to open capture {}", args.pcap.display()))?;
    println!(
        "capture: {} ({:.2} MB)",
        args.pcap.display(),
        reader.file_size() as f64 / (1024.0 * 1024.0)
    );

    let decoder = Decoder::new();
    let mut stats = StatsVisitor::default();

    let started = std::time::Instant::now();
    let packets = reader.for_each_payload(|payload| {
        let offset = find_itch_offset(payload);
        if offset < payload.len() {
            decoder.decode_stream(&payload[offset..], &mut stats);
        }
    });
    let elapsed = started.elapsed();

    println!("\n=== Performance ===");
    println!("Packets processed: {packets}");
    println!("Time: {:.3} ms", elapsed.as_secs_f64() * 1e3);
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        println!(
            "Throughput: {:.2} M packets/s, {:.2} MB/s",
            packets as f64 / secs / 1e6,
            reader.file_size() as f64 / (1024.0 * 1024.0) / secs
        );
    }

    println!("\n=== ITCH Message Statistics ===");
    println!("Add Orders:       {:>12}", stats.add_orders);
    println!("Order Executed:   {:>12}", stats.order_executed);
    println!("System Events:    {:>12}", stats.system_events);
    println!("Unknown:          {:>12}", stats.unknown);
    println!("--------------------------------");
    println!("Total Messages:   {:>12}", stats.total_messages());
    println!("Total Shares:     {:>12}", stats.total_shares);
    println!("Total Executions: {:>12}", stats.total_executions);

    Ok(())
}
