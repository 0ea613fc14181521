//! Wire primitives for NASDAQ TotalView-ITCH 5.0.
//!
//! Message layouts mirror the on-wire byte sequence exactly: every field is
//! a byte or a fixed byte array, so each struct has alignment 1, no padding,
//! and can be viewed in place over an unaligned input buffer. Multi-byte
//! integers are big-endian on the wire and converted to host order in the
//! accessors; the backing buffer is never written.

use std::mem::size_of;

/// Valid ITCH 5.0 message tags (first byte of every message).
pub mod tag {
    pub const ADD_ORDER: u8 = b'A';
    pub const ADD_ORDER_MPID: u8 = b'F';
    pub const ORDER_EXECUTED: u8 = b'E';
    pub const ORDER_EXECUTED_PRICE: u8 = b'C';
    pub const ORDER_CANCEL: u8 = b'X';
    pub const ORDER_DELETE: u8 = b'D';
    pub const ORDER_REPLACE: u8 = b'U';
    pub const TRADE: u8 = b'P';
    pub const CROSS_TRADE: u8 = b'Q';
    pub const BROKEN_TRADE: u8 = b'B';
    pub const SYSTEM_EVENT: u8 = b'S';
    pub const STOCK_DIRECTORY: u8 = b'R';
    pub const TRADING_ACTION: u8 = b'H';
    pub const REG_SHO: u8 = b'Y';
    pub const PARTICIPANT_POSITION: u8 = b'L';
    pub const NOII: u8 = b'I';
    pub const RPII: u8 = b'N';
    pub const MWCB_DECLINE: u8 = b'V';
    pub const MWCB_STATUS: u8 = b'W';
    pub const IPO_QUOTING: u8 = b'K';
}

/// Total message length in bytes for a tag, or 0 if the layout is unknown.
///
/// Only the messages the dispatcher decodes have fixed sizes here; every
/// other tag is recognised by [`is_itch_tag`] but routed through the unknown
/// hook.
#[inline]
pub const fn message_size(msg_type: u8) -> usize {
    match msg_type {
        tag::ADD_ORDER => size_of::<AddOrder>(),
        tag::ORDER_EXECUTED => size_of::<OrderExecuted>(),
        tag::SYSTEM_EVENT => SYSTEM_EVENT_SIZE,
        _ => 0,
    }
}

/// System Event is the common header plus a 1-byte event code.
pub const SYSTEM_EVENT_SIZE: usize = size_of::<MessageHeader>() + 1;

/// Whether a byte is a known ITCH 5.0 message tag.
///
/// Used by the capture framer to recognise the start of an ITCH payload
/// inside an encapsulated datagram; membership does not imply the decoder
/// knows the layout.
#[inline]
pub const fn is_itch_tag(c: u8) -> bool {
    matches!(
        c,
        b'A' | b'F' | b'E' | b'C' | b'X' | b'D' | b'U' // order messages
        | b'P' | b'Q' | b'B'                           // trade messages
        | b'S' | b'R' | b'H' | b'Y' | b'L'             // system / stock
        | b'I' | b'N'                                  // imbalance
        | b'V' | b'W' | b'K'                           // MWCB and IPO
    )
}

/// Common prefix of every ITCH message (11 bytes).
#[repr(C)]
pub struct MessageHeader {
    message_type: u8,
    stock_locate: [u8; 2],
    tracking_number: [u8; 2],
    timestamp: [u8; 6],
}

const _: () = assert!(size_of::<MessageHeader>() == 11);
const _: () = assert!(std::mem::align_of::<MessageHeader>() == 1);

impl MessageHeader {
    /// Borrow the first 11 bytes of `buf` as a header view.
    #[inline]
    pub fn from_bytes(buf: &[u8]) -> Option<&MessageHeader> {
        view(buf)
    }

    #[inline]
    pub fn message_type(&self) -> u8 {
        self.message_type
    }

    #[inline]
    pub fn stock_locate(&self) -> u16 {
        u16::from_be_bytes(self.stock_locate)
    }

    #[inline]
    pub fn tracking_number(&self) -> u16 {
        u16::from_be_bytes(self.tracking_number)
    }

    /// Nanoseconds since midnight, reconstructed from the 6-byte big-endian
    /// field by shift-and-or.
    #[inline]
    pub fn timestamp(&self) -> u64 {
        let t = &self.timestamp;
        (t[0] as u64) << 40
            | (t[1] as u64) << 32
            | (t[2] as u64) << 24
            | (t[3] as u64) << 16
            | (t[4] as u64) << 8
            | (t[5] as u64)
    }
}

/// Add Order, no MPID attribution (tag `A`, 36 bytes).
#[repr(C)]
pub struct AddOrder {
    header: MessageHeader,
    order_ref: [u8; 8],
    side: u8,
    shares: [u8; 4],
    stock: [u8; 8],
    price: [u8; 4],
}

const _: () = assert!(size_of::<AddOrder>() == 36);
const _: () = assert!(std::mem::align_of::<AddOrder>() == 1);

impl AddOrder {
    #[inline]
    pub fn from_bytes(buf: &[u8]) -> Option<&AddOrder> {
        view(buf)
    }

    #[inline]
    pub fn header(&self) -> &MessageHeader {
        &self.header
    }

    #[inline]
    pub fn order_ref(&self) -> u64 {
        u64::from_be_bytes(self.order_ref)
    }

    /// `true` iff the side byte is `'B'`.
    #[inline]
    pub fn is_buy(&self) -> bool {
        side_is_buy(self.side)
    }

    #[inline]
    pub fn shares(&self) -> u32 {
        u32::from_be_bytes(self.shares)
    }

    /// 8-byte ASCII symbol, space-padded.
    #[inline]
    pub fn stock(&self) -> &[u8; 8] {
        &self.stock
    }

    /// Price in ten-thousandths of the quote currency.
    #[inline]
    pub fn price(&self) -> u32 {
        u32::from_be_bytes(self.price)
    }
}

/// Order Executed (tag `E`, 31 bytes).
#[repr(C)]
pub struct OrderExecuted {
    header: MessageHeader,
    order_ref: [u8; 8],
    executed_shares: [u8; 4],
    match_number: [u8; 8],
}

const _: () = assert!(size_of::<OrderExecuted>() == 31);
const _: () = assert!(std::mem::align_of::<OrderExecuted>() == 1);

impl OrderExecuted {
    #[inline]
    pub fn from_bytes(buf: &[u8]) -> Option<&OrderExecuted> {
        view(buf)
    }

    #[inline]
    pub fn header(&self) -> &MessageHeader {
        &self.header
    }

    #[inline]
    pub fn order_ref(&self) -> u64 {
        u64::from_be_bytes(self.order_ref)
    }

    #[inline]
    pub fn executed_shares(&self) -> u32 {
        u32::from_be_bytes(self.executed_shares)
    }

    #[inline]
    pub fn match_number(&self) -> u64 {
        u64::from_be_bytes(self.match_number)
    }
}

/// `true` iff an ITCH side byte encodes the buy side.
#[inline]
pub const fn side_is_buy(side: u8) -> bool {
    side == b'B'
}

/// Reinterpret the prefix of `buf` as a wire struct.
///
/// Sound for the message types in this module because every field is a byte
/// or byte array, giving alignment 1 and a layout identical to the wire
/// bytes. Returns `None` when the buffer is shorter than the struct.
#[inline]
fn view<T>(buf: &[u8]) -> Option<&T> {
    const { assert!(std::mem::align_of::<T>() == 1) };
    if buf.len() < size_of::<T>() {
        return None;
    }
    // SAFETY: length checked above; T has alignment 1 and no invalid bit
    // patterns (all fields are u8 / [u8; N]); the returned borrow ties the
    // view lifetime to the buffer.
    Some(unsafe { &*buf.as_ptr().cast::<T>() })
}
