//! Replay session: capture file → decoder → matching engine.
//!
//! Walks every packet of a mapped capture, locates the ITCH payload inside
//! each datagram, decodes the stream, and drives the matching engine from
//! the decoded events while recording per-`add_order` latency in an HDR
//! histogram.

use std::time::{Duration, Instant};

use hdrhistogram::Histogram;

use crate::book::Side;
use crate::engine::MatchingEngine;
use crate::parser::{Decoder, MessageVisitor};
use crate::pcap::{find_itch_offset, PcapReader};
use crate::wire::{AddOrder, MessageHeader, OrderExecuted};

/// Knobs for a replay run.
#[derive(Clone, Debug)]
pub struct ReplayConfig {
    /// Order pool capacity; a full trading day of adds fits in 10 million.
    pub pool_capacity: u32,
    /// Make every Nth add marketable (flip side, cross the opposite best)
    /// so one-sided replay captures still exercise the matching path.
    /// 0 disables the simulation.
    pub match_trigger_interval: u64,
    /// Replace wire order references with sequential ids. Replay captures
    /// commonly repeat one reference for every add, which the engine's
    /// duplicate check would otherwise reject wholesale.
    pub synthesize_ids: bool,
    /// Skip offset discovery and use this payload offset for every packet.
    pub payload_offset: Option<usize>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        ReplayConfig {
            pool_capacity: 10_000_000,
            match_trigger_interval: 100,
            synthesize_ids: true,
            payload_offset: None,
        }
    }
}

/// Counters and timings collected over one replay run.
pub struct ReplayStats {
    pub packets: usize,
    pub adds_seen: u64,
    pub executions_seen: u64,
    pub system_events: u64,
    pub unknown_messages: u64,
    pub orders_added: u64,
    pub orders_rejected: u64,
    pub orders_removed: u64,
    pub bytes_mapped: usize,
    pub elapsed: Duration,
    /// One sample per `add_order` call, in nanoseconds.
    pub add_latency: Histogram<u64>,
}

impl ReplayStats {
    fn new() -> ReplayStats {
        ReplayStats {
            packets: 0,
            adds_seen: 0,
            executions_seen: 0,
            system_events: 0,
            unknown_messages: 0,
            orders_added: 0,
            orders_rejected: 0,
            orders_removed: 0,
            bytes_mapped: 0,
            elapsed: Duration::ZERO,
            // 3 significant digits up to 1s covers any sane add_order call.
            add_latency: Histogram::new_with_bounds(1, 1_000_000_000, 3)
                .expect("histogram bounds are statically valid"),
        }
    }

    pub fn messages_seen(&self) -> u64 {
        self.adds_seen + self.executions_seen + self.system_events + self.unknown_messages
    }
}

/// One replay over a mapped capture and an engine.
pub struct ReplaySession {
    config: ReplayConfig,
}

impl ReplaySession {
    pub fn new(config: ReplayConfig) -> ReplaySession {
        ReplaySession { config }
    }

    /// Run the full pipeline, leaving the final book state in `engine`.
    pub fn run(&self, reader: &PcapReader, engine: &mut MatchingEngine) -> ReplayStats {
        let mut stats = ReplayStats::new();
        stats.bytes_mapped = reader.file_size();

        let decoder = Decoder::new();
        let mut visitor = BookVisitor {
            engine,
            stats: &mut stats,
            config: &self.config,
            next_id: 1,
        };

        let started = Instant::now();
        let packets = reader.for_each_payload(|payload| {
            let offset = self
                .config
                .payload_offset
                .unwrap_or_else(|| find_itch_offset(payload));
            if offset < payload.len() {
                decoder.decode_stream(&payload[offset..], &mut visitor);
            }
        });
        stats.packets = packets;
        stats.elapsed = started.elapsed();
        stats
    }
}

/// Visitor bridging decoded messages into the engine.
struct BookVisitor<'a> {
    engine: &'a mut MatchingEngine,
    stats: &'a mut ReplayStats,
    config: &'a ReplayConfig,
    next_id: u64,
}

impl BookVisitor<'_> {
    /// Pick the (side, price) actually sent to the engine, flipping every
    /// Nth order across the spread when the simulation is on.
    fn simulate(&self, side: Side, price: u64) -> (Side, u64) {
        let interval = self.config.match_trigger_interval;
        if interval == 0 || self.stats.adds_seen % interval != 0 {
            return (side, price);
        }

        let side = side.opposite();
        let price = match side {
            Side::Buy => self.engine.best_ask().map_or(price, |ask| ask + 100),
            Side::Sell => self
                .engine
                .best_bid()
                .map_or(price, |bid| bid.saturating_sub(100)),
        };
        (side, price)
    }
}

impl MessageVisitor for BookVisitor<'_> {
    fn on_add_order(&mut self, msg: &AddOrder) {
        self.stats.adds_seen += 1;

        let id = if self.config.synthesize_ids {
            let id = self.next_id;
            self.next_id += 1;
            id
        } else {
            msg.order_ref()
        };
        let side = if msg.is_buy() { Side::Buy } else { Side::Sell };
        let (side, price) = self.simulate(side, msg.price() as u64);

        let started = Instant::now();
        let added = self.engine.add_order(id, price, msg.shares(), side);
        let elapsed = started.elapsed().as_nanos() as u64;
        self.stats.add_latency.saturating_record(elapsed.max(1));

        if added {
            self.stats.orders_added += 1;
        } else {
            self.stats.orders_rejected += 1;
        }
    }

    fn on_order_executed(&mut self, msg: &OrderExecuted) {
        self.stats.executions_seen += 1;
        if self.engine.execute_order(msg.order_ref(), msg.executed_shares()) {
            self.stats.orders_removed += 1;
        }
    }

    fn on_system_event(&mut self, _msg: &MessageHeader) {
        self.stats.system_events += 1;
    }

    fn on_unknown(&mut self, _msg_type: u8, _rest: &[u8]) {
        self.stats.unknown_messages += 1;
    }
}
