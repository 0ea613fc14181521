//! ITCH message decoder with statically dispatched visitors.
//!
//! The dispatcher is generic over a [`MessageVisitor`]; handler calls are
//! resolved at compile time, so a visitor that only implements
//! `on_add_order` pays nothing for the other hooks — the provided no-op
//! bodies disappear after inlining. No message bytes are copied: each
//! handler receives a view borrowing the input buffer.

use crate::wire::{message_size, tag, AddOrder, MessageHeader, OrderExecuted};

/// Handlers for the message types the dispatcher decodes.
///
/// All methods default to no-ops; implement only the ones you care about.
pub trait MessageVisitor {
    /// Tag `A`.
    fn on_add_order(&mut self, _msg: &AddOrder) {}

    /// Tag `E`.
    fn on_order_executed(&mut self, _msg: &OrderExecuted) {}

    /// Tag `S`. Only the common header is decoded.
    fn on_system_event(&mut self, _msg: &MessageHeader) {}

    /// Any tag without an entry in the size table. `rest` is the remaining
    /// buffer starting at the unknown tag, so callers can log without losing
    /// sequence position.
    fn on_unknown(&mut self, _msg_type: u8, _rest: &[u8]) {}
}

/// Outcome of decoding a single message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeResult {
    /// Message decoded and dispatched; payload is the bytes consumed.
    Ok(usize),
    /// Buffer shorter than the declared message size.
    BufferTooSmall,
    /// Tag absent from the size table; `on_unknown` was invoked.
    UnknownType,
    /// Reserved for length-prefixed framings.
    InvalidLength,
}

/// Stateless ITCH decoder.
#[derive(Clone, Copy, Debug, Default)]
pub struct Decoder;

impl Decoder {
    pub fn new() -> Self {
        Decoder
    }

    /// Decode one message from the start of `buf` and dispatch it.
    ///
    /// Never panics and never writes to `buf`.
    #[inline]
    pub fn decode_one<V: MessageVisitor>(&self, buf: &[u8], visitor: &mut V) -> DecodeResult {
        let Some(&msg_type) = buf.first() else {
            return DecodeResult::BufferTooSmall;
        };

        let size = message_size(msg_type);
        if size == 0 {
            visitor.on_unknown(msg_type, buf);
            return DecodeResult::UnknownType;
        }
        if buf.len() < size {
            return DecodeResult::BufferTooSmall;
        }

        match msg_type {
            tag::ADD_ORDER => {
                // Length checked against the size table above; the views
                // cannot fail here.
                if let Some(msg) = AddOrder::from_bytes(buf) {
                    visitor.on_add_order(msg);
                }
            }
            tag::ORDER_EXECUTED => {
                if let Some(msg) = OrderExecuted::from_bytes(buf) {
                    visitor.on_order_executed(msg);
                }
            }
            tag::SYSTEM_EVENT => {
                if let Some(msg) = MessageHeader::from_bytes(buf) {
                    visitor.on_system_event(msg);
                }
            }
            _ => unreachable!("size table entry without a dispatch arm"),
        }

        DecodeResult::Ok(size)
    }

    /// Decode consecutive messages from `buf`, returning bytes consumed.
    ///
    /// Stops at the end of the buffer, at a trailing partial message, or at
    /// an unknown tag (its size is unknowable, so the walk cannot step past
    /// it). The return value always points at the start of whatever stopped
    /// the walk.
    pub fn decode_stream<V: MessageVisitor>(&self, buf: &[u8], visitor: &mut V) -> usize {
        let mut consumed = 0;

        while consumed < buf.len() {
            let rest = &buf[consumed..];
            let msg_type = rest[0];
            let size = message_size(msg_type);

            if size == 0 {
                visitor.on_unknown(msg_type, rest);
                break;
            }
            if rest.len() < size {
                break;
            }

            match self.decode_one(rest, visitor) {
                DecodeResult::Ok(n) => consumed += n,
                _ => break,
            }
        }

        consumed
    }
}
