//! # itch-replay
//!
//! A market-data replay engine for NASDAQ TotalView-ITCH 5.0.
//!
//! ## Design Principles
//!
//! - **Zero-Copy**: wire messages are viewed in place over the mmap'd
//!   capture; big-endian fields are swapped on read, never copied out
//! - **Static Dispatch**: the decoder is monomorphised over a visitor
//!   trait, so unused handlers vanish after inlining
//! - **Pool Allocation**: every resting order lives in a fixed-capacity
//!   pool with an intrusive free list; the matching hot path never touches
//!   the heap
//! - **Single-Writer**: one thread owns the whole pipeline (no locks)
//!
//! ## Architecture
//!
//! ```text
//! [pcap mmap] --> [offset discovery] --> [ITCH decoder] --> [matching engine]
//!    pcap.rs           pcap.rs           wire/parser.rs     pool/level/book/engine.rs
//! ```

pub mod book;
pub mod engine;
pub mod level;
pub mod parser;
pub mod pcap;
pub mod pool;
pub mod replay;
pub mod wire;

// Re-exports for convenience
pub use book::{Book, OrderRef, Side};
pub use engine::MatchingEngine;
pub use level::PriceLevel;
pub use parser::{DecodeResult, Decoder, MessageVisitor};
pub use pcap::{find_itch_offset, PcapReader};
pub use pool::{Order, OrderPool, SlotIndex, NULL_SLOT};
pub use replay::{ReplayConfig, ReplaySession, ReplayStats};
