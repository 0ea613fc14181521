//! Market replay driver: pcap capture in, matching-engine state and
//! latency percentiles out.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use itch_replay::{MatchingEngine, PcapReader, ReplayConfig, ReplaySession};

#[derive(Parser, Debug)]
#[command(name = "replay", version, about = "Replay an ITCH 5.0 pcap capture through the matching engine")]
struct Args {
    /// Capture file to replay.
    pcap: PathBuf,

    /// Order pool capacity.
    #[arg(long, default_value_t = 10_000_000)]
    capacity: u32,

    /// Make every Nth add marketable to exercise matching (0 disables).
    #[arg(long, default_value_t = 100)]
    match_interval: u64,

    /// Use the wire order references as ids instead of synthesising
    /// sequential ones.
    #[arg(long)]
    wire_ids: bool,

    /// Fixed ITCH payload offset, overriding per-packet discovery.
    #[arg(long)]
    offset: Option<usize>,

    /// Pin the replay thread to the last CPU core.
    #[arg(long)]
    pin: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if args.pin {
        if let Some(core) = core_affinity::get_core_ids().and_then(|ids| ids.last().copied()) {
            core_affinity::set_for_current(core);
        }
    }

    let reader = PcapReader::open(&args.pcap)
        .with_context(|| format!("failed to open capture {}", args.pcap.display()))?;
    println!(
        "capture: {} ({:.2} MB)",
        args.pcap.display(),
        reader.file_size() as f64 / (1024.0 * 1024.0)
    );

    let config = ReplayConfig {
        pool_capacity: args.capacity,
        match_trigger_interval: args.match_interval,
        synthesize_ids: !args.wire_ids,
        payload_offset: args.offset,
    };

    let mut engine = MatchingEngine::new(config.pool_capacity);
    engine.warm_up();

    let stats = ReplaySession::new(config).run(&reader, &mut engine);

    println!("\n=== Performance ===");
    println!("Packets processed:  {}", stats.packets);
    println!("Messages decoded:   {}", stats.messages_seen());
    println!("Total time:         {:.3} ms", stats.elapsed.as_secs_f64() * 1e3);
    let secs = stats.elapsed.as_secs_f64();
    if secs > 0.0 {
        println!(
            "Throughput:         {:.2} M packets/s, {:.2} M msgs/s, {:.2} MB/s",
            stats.packets as f64 / secs / 1e6,
            stats.messages_seen() as f64 / secs / 1e6,
            stats.bytes_mapped as f64 / (1024.0 * 1024.0) / secs,
        );
    }

    println!("\n=== Replay ===");
    println!("Add orders seen:    {}", stats.adds_seen);
    println!("Executions seen:    {}", stats.executions_seen);
    println!("System events:      {}", stats.system_events);
    println!("Unknown messages:   {}", stats.unknown_messages);
    println!("Orders added:       {}", stats.orders_added);
    println!("Orders rejected:    {}", stats.orders_rejected);
    println!("Orders removed:     {}", stats.orders_removed);
    println!("Fills executed:     {}", engine.fill_count());
    println!("Quantity filled:    {}", engine.filled_qty());

    let hist = &stats.add_latency;
    if hist.len() > 0 {
        println!("\n=== add_order latency (ns) ===");
        println!("p50:  {:>8}", hist.value_at_quantile(0.50));
        println!("p99:  {:>8}", hist.value_at_quantile(0.99));
        println!("p999: {:>8}", hist.value_at_quantile(0.999));
        println!("max:  {:>8}", hist.max());
    }

    println!("\n=== Final Book ===");
    println!("Orders resting:     {}", engine.order_count());
    println!("Bid levels:         {}", engine.bid_level_count());
    println!("Ask levels:         {}", engine.ask_level_count());
    if let Some(bid) = engine.best_bid() {
        println!("Best bid:           {:.4}", bid as f64 / 10_000.0);
    }
    if let Some(ask) = engine.best_ask() {
        println!("Best ask:           {:.4}", ask as f64 / 10_000.0);
    }
    if let Some(spread) = engine.spread() {
        println!("Spread:             {:.4}", spread as f64 / 10_000.0);
    }
    println!(
        "Pool utilisation:   {:.2}% ({} / {})",
        100.0 * engine.pool().live() as f64 / engine.pool().capacity().max(1) as f64,
        engine.pool().live(),
        engine.pool().capacity()
    );

    Ok(())
}
