//! Price level: the FIFO queue of resting orders at one price.
//!
//! Orders are kept in an insertion-ordered doubly linked list threaded
//! through pool slots, so append, head removal, and removal from any
//! position are all O(1). Head order = oldest = first to match.

use crate::pool::{OrderPool, SlotIndex, NULL_SLOT};

/// All resting orders at one price, one side.
#[derive(Clone, Copy, Debug)]
pub struct PriceLevel {
    /// Price in ticks shared by every order in the list.
    pub price: u64,
    /// Sum of open quantity across the list.
    pub qty: u64,
    /// Number of orders in the list.
    pub orders: u32,
    /// Oldest order (time priority).
    pub head: SlotIndex,
    /// Newest order.
    pub tail: SlotIndex,
}

impl PriceLevel {
    #[inline]
    pub const fn new(price: u64) -> PriceLevel {
        PriceLevel {
            price,
            qty: 0,
            orders: 0,
            head: NULL_SLOT,
            tail: NULL_SLOT,
        }
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.orders == 0
    }

    /// Append `slot` at the tail (loses time priority to everything before
    /// it). The slot's quantity must already be set.
    #[inline]
    pub fn push_back(&mut self, pool: &mut OrderPool, slot: SlotIndex) {
        let qty = pool.get(slot).qty;

        if self.tail == NULL_SLOT {
            debug_assert!(self.head == NULL_SLOT);
            self.head = slot;
            self.tail = slot;
            let order = pool.get_mut(slot);
            order.prev = NULL_SLOT;
            order.next = NULL_SLOT;
        } else {
            pool.get_mut(self.tail).next = slot;
            let order = pool.get_mut(slot);
            order.prev = self.tail;
            order.next = NULL_SLOT;
            self.tail = slot;
        }

        self.orders += 1;
        self.qty += qty as u64;
    }

    /// Detach and return the head order, or `None` when empty.
    ///
    /// The slot is not freed; the caller owns that decision.
    #[inline]
    pub fn pop_front(&mut self, pool: &mut OrderPool) -> Option<SlotIndex> {
        if self.head == NULL_SLOT {
            return None;
        }

        let slot = self.head;
        let order = pool.get(slot);
        let next = order.next;
        let qty = order.qty;

        if next == NULL_SLOT {
            self.head = NULL_SLOT;
            self.tail = NULL_SLOT;
        } else {
            self.head = next;
            pool.get_mut(next).prev = NULL_SLOT;
        }

        self.orders -= 1;
        self.qty -= qty as u64;

        let order = pool.get_mut(slot);
        order.prev = NULL_SLOT;
        order.next = NULL_SLOT;
        Some(slot)
    }

    /// Unlink `slot` from anywhere in the list (cancellation path).
    ///
    /// Returns `true` when the level is now empty. The slot is not freed.
    #[inline]
    pub fn unlink(&mut self, pool: &mut OrderPool, slot: SlotIndex) -> bool {
        let order = pool.get(slot);
        let prev = order.prev;
        let next = order.next;
        let qty = order.qty;

        match (prev, next) {
            (NULL_SLOT, NULL_SLOT) => {
                debug_assert!(self.head == slot && self.tail == slot);
                self.head = NULL_SLOT;
                self.tail = NULL_SLOT;
            }
            (NULL_SLOT, _) => {
                debug_assert!(self.head == slot);
                self.head = next;
                pool.get_mut(next).prev = NULL_SLOT;
            }
            (_, NULL_SLOT) => {
                debug_assert!(self.tail == slot);
                self.tail = prev;
                pool.get_mut(prev).next = NULL_SLOT;
            }
            (_, _) => {
                pool.get_mut(prev).next = next;
                pool.get_mut(next).prev = prev;
            }
        }

        self.orders -= 1;
        self.qty -= qty as u64;

        let order = pool.get_mut(slot);
        order.prev = NULL_SLOT;
        order.next = NULL_SLOT;
        self.orders == 0
    }

    /// Oldest order without detaching it.
    #[inline]
    pub const fn peek_head(&self) -> SlotIndex {
        self.head
    }

    /// Account for a partial fill applied directly to an order's quantity.
    #[inline]
    pub fn reduce_qty(&mut self, qty: u32) {
        debug_assert!(self.qty >= qty as u64);
        self.qty -= qty as u64;
    }
}
