//! Limit-order-book storage: price ladders, order index, best-price cache.
//!
//! Each side is a `BTreeMap` from price to [`PriceLevel`], so the bid
//! ladder's best is its greatest key and the ask ladder's best is its
//! smallest. Best prices are cached and maintained incrementally; the
//! ladder is only re-consulted when the best level empties. The order index
//! maps external ids to pool slots for O(1) cancel lookup and enforces id
//! uniqueness.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::level::PriceLevel;
use crate::pool::{OrderPool, SlotIndex};

/// Order side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    #[inline]
    pub const fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Where a live order sits: its pool slot plus the (price, side) that keys
/// its level.
#[derive(Clone, Copy, Debug)]
pub struct OrderRef {
    pub slot: SlotIndex,
    pub price: u64,
    pub side: Side,
}

/// Book storage shared by the matching engine.
#[derive(Default)]
pub struct Book {
    bids: BTreeMap<u64, PriceLevel>,
    asks: BTreeMap<u64, PriceLevel>,
    index: FxHashMap<u64, OrderRef>,
    best_bid: Option<u64>,
    best_ask: Option<u64>,
}

impl Book {
    pub fn new() -> Book {
        Book::default()
    }

    pub fn with_order_capacity(orders: usize) -> Book {
        Book {
            index: FxHashMap::with_capacity_and_hasher(orders, Default::default()),
            ..Book::default()
        }
    }

    // ------------------------------------------------------------------
    // Best-price queries
    // ------------------------------------------------------------------

    #[inline]
    pub fn best_bid(&self) -> Option<u64> {
        self.best_bid
    }

    #[inline]
    pub fn best_ask(&self) -> Option<u64> {
        self.best_ask
    }

    #[inline]
    pub fn best_price(&self, side: Side) -> Option<u64> {
        match side {
            Side::Buy => self.best_bid,
            Side::Sell => self.best_ask,
        }
    }

    /// `ask - bid` when both sides are populated.
    #[inline]
    pub fn spread(&self) -> Option<u64> {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Level access
    // ------------------------------------------------------------------

    #[inline]
    fn ladder(&self, side: Side) -> &BTreeMap<u64, PriceLevel> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    #[inline]
    fn ladder_mut(&mut self, side: Side) -> &mut BTreeMap<u64, PriceLevel> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    #[inline]
    pub fn level(&self, side: Side, price: u64) -> Option<&PriceLevel> {
        self.ladder(side).get(&price)
    }

    #[inline]
    pub fn level_mut(&mut self, side: Side, price: u64) -> Option<&mut PriceLevel> {
        self.ladder_mut(side).get_mut(&price)
    }

    #[inline]
    pub fn level_or_insert(&mut self, side: Side, price: u64) -> &mut PriceLevel {
        self.ladder_mut(side)
            .entry(price)
            .or_insert_with(|| PriceLevel::new(price))
    }

    /// Drop an emptied level and refresh the cached best if it was at the
    /// front of the ladder.
    pub fn remove_empty_level(&mut self, side: Side, price: u64) {
        match side {
            Side::Buy => {
                self.bids.remove(&price);
                if self.best_bid == Some(price) {
                    self.best_bid = self.bids.keys().next_back().copied();
                }
            }
            Side::Sell => {
                self.asks.remove(&price);
                if self.best_ask == Some(price) {
                    self.best_ask = self.asks.keys().next().copied();
                }
            }
        }
    }

    #[inline]
    fn improve_best_on_add(&mut self, side: Side, price: u64) {
        match side {
            Side::Buy => {
                if self.best_bid.map_or(true, |best| price > best) {
                    self.best_bid = Some(price);
                }
            }
            Side::Sell => {
                if self.best_ask.map_or(true, |best| price < best) {
                    self.best_ask = Some(price);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Order membership
    // ------------------------------------------------------------------

    #[inline]
    pub fn contains(&self, id: u64) -> bool {
        self.index.contains_key(&id)
    }

    #[inline]
    pub fn lookup(&self, id: u64) -> Option<&OrderRef> {
        self.index.get(&id)
    }

    /// Rest an allocated slot at `(price, side)`, appending at the tail of
    /// its level. Returns `false` without touching the book when `id` is
    /// already live.
    pub fn insert_order(
        &mut self,
        pool: &mut OrderPool,
        id: u64,
        side: Side,
        price: u64,
        slot: SlotIndex,
    ) -> bool {
        if self.index.contains_key(&id) {
            return false;
        }

        self.index.insert(id, OrderRef { slot, price, side });
        self.level_or_insert(side, price).push_back(pool, slot);
        self.improve_best_on_add(side, price);
        true
    }

    /// Unlink an order from its level and the index (cancellation path).
    ///
    /// Empty levels are removed immediately. The pool slot is NOT freed;
    /// the caller still owns it.
    pub fn remove_order(&mut self, pool: &mut OrderPool, id: u64) -> Option<OrderRef> {
        let order_ref = self.index.remove(&id)?;

        if let Some(level) = self.level_mut(order_ref.side, order_ref.price) {
            if level.unlink(pool, order_ref.slot) {
                self.remove_empty_level(order_ref.side, order_ref.price);
            }
        }

        Some(order_ref)
    }

    /// Drop an id from the index after the matching loop already unlinked
    /// its slot.
    #[inline]
    pub fn forget(&mut self, id: u64) {
        self.index.remove(&id);
    }

    // ------------------------------------------------------------------
    // Counts
    // ------------------------------------------------------------------

    #[inline]
    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn bid_level_count(&self) -> usize {
        self.bids.len()
    }

    #[inline]
    pub fn ask_level_count(&self) -> usize {
        self.asks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Ladder iteration from the best price outward (bids descending, asks
    /// ascending).
    pub fn levels_from_best(&self, side: Side) -> impl Iterator<Item = &PriceLevel> + '_ {
        let (fwd, rev) = match side {
            Side::Buy => (None, Some(self.bids.values().rev())),
            Side::Sell => (Some(self.asks.values()), None),
        };
        fwd.into_iter().flatten().chain(rev.into_iter().flatten())
    }
}
