//! Price-time-priority matching over the pool-backed book.
//!
//! All operations are synchronous, bounded, and total: rejections come back
//! as `false`, never as panics. Fill counts are tracked here, at the point
//! where fills actually happen, so callers never have to infer matches from
//! order-count deltas.

use crate::book::{Book, Side};
use crate::pool::{OrderPool, NULL_SLOT};

/// Single-threaded matching engine owning the order pool and the book.
pub struct MatchingEngine {
    pool: OrderPool,
    book: Book,
    fills: u64,
    filled_qty: u64,
}

impl MatchingEngine {
    /// Engine over a pool of `capacity` order slots.
    pub fn new(capacity: u32) -> MatchingEngine {
        MatchingEngine {
            pool: OrderPool::new(capacity),
            book: Book::with_order_capacity(capacity as usize),
            fills: 0,
            filled_qty: 0,
        }
    }

    /// Add a limit order, matching aggressively first.
    ///
    /// If `price` crosses the opposite best, resting liquidity is consumed
    /// in price-time priority until the order is exhausted or no longer
    /// crosses; any residual quantity rests at `(price, side)`.
    ///
    /// Returns `false` for a duplicate id, zero quantity, or a pool with no
    /// slot for the residual. Fills executed before a pool rejection stand:
    /// that liquidity was genuinely consumed.
    pub fn add_order(&mut self, id: u64, price: u64, qty: u32, side: Side) -> bool {
        if qty == 0 {
            return false;
        }
        if self.book.contains(id) {
            return false;
        }

        let remaining = self.cross(side, price, qty);
        if remaining == 0 {
            return true;
        }

        let Some(slot) = self.pool.alloc() else {
            return false;
        };

        let order = self.pool.get_mut(slot);
        order.id = id;
        order.price = price;
        order.qty = remaining;
        order.is_buy = side == Side::Buy;

        // Duplicate check already done; this insert cannot fail.
        self.book.insert_order(&mut self.pool, id, side, price, slot)
    }

    /// Remove a resting order. Returns `true` iff `id` was live.
    pub fn cancel_order(&mut self, id: u64) -> bool {
        match self.book.remove_order(&mut self.pool, id) {
            Some(order_ref) => {
                self.pool.free(order_ref.slot);
                true
            }
            None => false,
        }
    }

    /// Apply an execution of `shares` against a resting order, removing it
    /// when nothing remains. `shares` beyond the open quantity is clamped.
    ///
    /// Returns `false` when `id` is not live.
    pub fn execute_order(&mut self, id: u64, shares: u32) -> bool {
        let Some(&order_ref) = self.book.lookup(id) else {
            return false;
        };

        let open = self.pool.get(order_ref.slot).qty;
        let fill = shares.min(open);
        if fill == 0 {
            return true;
        }

        self.fills += 1;
        self.filled_qty += fill as u64;

        if fill == open {
            if let Some(order_ref) = self.book.remove_order(&mut self.pool, id) {
                self.pool.free(order_ref.slot);
            }
        } else {
            self.pool.get_mut(order_ref.slot).qty = open - fill;
            if let Some(level) = self.book.level_mut(order_ref.side, order_ref.price) {
                level.reduce_qty(fill);
            }
        }

        true
    }

    /// Consume opposite-side liquidity while `price` crosses its best.
    /// Returns the unfilled remainder.
    fn cross(&mut self, side: Side, price: u64, mut remaining: u32) -> u32 {
        let opposite = side.opposite();

        while remaining > 0 {
            let Some(best) = self.book.best_price(opposite) else {
                break;
            };
            let crosses = match side {
                Side::Buy => price >= best,
                Side::Sell => price <= best,
            };
            if !crosses {
                break;
            }

            remaining = self.fill_level(opposite, best, remaining);
        }

        remaining
    }

    /// Match against the FIFO queue at one opposite level until the taker or
    /// the level is exhausted.
    fn fill_level(&mut self, maker_side: Side, price: u64, mut remaining: u32) -> u32 {
        while remaining > 0 {
            let Some(level) = self.book.level_mut(maker_side, price) else {
                break;
            };
            let maker_slot = level.peek_head();
            if maker_slot == NULL_SLOT {
                break;
            }

            let maker = self.pool.get(maker_slot);
            let maker_id = maker.id;
            let maker_qty = maker.qty;

            let fill = remaining.min(maker_qty);
            remaining -= fill;
            self.fills += 1;
            self.filled_qty += fill as u64;

            if fill == maker_qty {
                // Maker exhausted: unlink, forget, return the slot.
                if let Some(level) = self.book.level_mut(maker_side, price) {
                    let _ = level.pop_front(&mut self.pool);
                }
                self.book.forget(maker_id);
                self.pool.free(maker_slot);

                if self.book.level(maker_side, price).map_or(true, |l| l.is_empty()) {
                    self.book.remove_empty_level(maker_side, price);
                    break;
                }
            } else {
                self.pool.get_mut(maker_slot).qty = maker_qty - fill;
                if let Some(level) = self.book.level_mut(maker_side, price) {
                    level.reduce_qty(fill);
                }
            }
        }

        remaining
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    #[inline]
    pub fn best_bid(&self) -> Option<u64> {
        self.book.best_bid()
    }

    #[inline]
    pub fn best_ask(&self) -> Option<u64> {
        self.book.best_ask()
    }

    #[inline]
    pub fn spread(&self) -> Option<u64> {
        self.book.spread()
    }

    #[inline]
    pub fn order_count(&self) -> usize {
        self.book.order_count()
    }

    #[inline]
    pub fn bid_level_count(&self) -> usize {
        self.book.bid_level_count()
    }

    #[inline]
    pub fn ask_level_count(&self) -> usize {
        self.book.ask_level_count()
    }

    /// Number of individual fills executed (one per maker order touched).
    #[inline]
    pub fn fill_count(&self) -> u64 {
        self.fills
    }

    /// Total quantity filled across all matches.
    #[inline]
    pub fn filled_qty(&self) -> u64 {
        self.filled_qty
    }

    /// Open quantity resting under `id`, if live.
    pub fn open_qty(&self, id: u64) -> Option<u32> {
        self.book.lookup(id).map(|r| self.pool.get(r.slot).qty)
    }

    #[inline]
    pub fn pool(&self) -> &OrderPool {
        &self.pool
    }

    #[inline]
    pub fn book(&self) -> &Book {
        &self.book
    }

    /// Pre-fault the pool pages before a latency-sensitive run.
    pub fn warm_up(&mut self) {
        self.pool.warm_up();
    }

    /// Verify the structural invariants of the book; test support.
    ///
    /// # Panics
    /// Panics on the first violated invariant.
    pub fn assert_invariants(&self) {
        // Pool conservation.
        assert_eq!(
            self.pool.live() + self.pool.free_slots(),
            self.pool.capacity(),
            "pool conservation"
        );
        assert_eq!(
            self.pool.live() as usize,
            self.book.order_count(),
            "index size matches live slots"
        );

        // Ladder ordering and the uncrossed-market condition.
        if let (Some(bid), Some(ask)) = (self.best_bid(), self.best_ask()) {
            assert!(bid < ask, "book crossed: bid {bid} >= ask {ask}");
        }
        let mut last: Option<u64> = None;
        for level in self.book.levels_from_best(Side::Buy) {
            if let Some(prev) = last {
                assert!(level.price < prev, "bid ladder not descending");
            }
            last = Some(level.price);
            self.assert_level(level);
        }
        last = None;
        for level in self.book.levels_from_best(Side::Sell) {
            if let Some(prev) = last {
                assert!(level.price > prev, "ask ladder not ascending");
            }
            last = Some(level.price);
            self.assert_level(level);
        }
    }

    fn assert_level(&self, level: &crate::level::PriceLevel) {
        assert!(!level.is_empty(), "empty level left in ladder");

        let mut sum = 0u64;
        let mut count = 0u32;
        let mut slot = level.head;
        while slot != NULL_SLOT {
            let order = self.pool.get(slot);
            assert_eq!(order.price, level.price, "order price off its level");
            assert!(order.qty > 0, "zero-qty order resting");
            assert!(
                self.book.contains(order.id),
                "listed order missing from index"
            );
            sum += order.qty as u64;
            count += 1;
            slot = order.next;
        }
        assert_eq!(sum, level.qty, "level aggregate qty mismatch");
        assert_eq!(count, level.orders, "level order count mismatch");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resting_orders_do_not_cross() {
        let mut engine = MatchingEngine::new(64);
        assert!(engine.add_order(1, 1000, 100, Side::Buy));
        assert!(engine.add_order(2, 1010, 50, Side::Sell));

        assert_eq!(engine.best_bid(), Some(1000));
        assert_eq!(engine.best_ask(), Some(1010));
        assert_eq!(engine.spread(), Some(10));
        assert_eq!(engine.order_count(), 2);
        assert_eq!(engine.fill_count(), 0);
        engine.assert_invariants();
    }

    #[test]
    fn aggressive_buy_partially_fills_maker() {
        let mut engine = MatchingEngine::new(64);
        engine.add_order(1, 1000, 100, Side::Buy);
        engine.add_order(2, 1010, 50, Side::Sell);

        assert!(engine.add_order(3, 1010, 40, Side::Buy));
        assert_eq!(engine.open_qty(2), Some(10));
        assert_eq!(engine.open_qty(3), None); // fully filled, never rested
        assert_eq!(engine.best_ask(), Some(1010));
        assert_eq!(engine.order_count(), 2);
        assert_eq!(engine.fill_count(), 1);
        assert_eq!(engine.filled_qty(), 40);
        engine.assert_invariants();
    }

    #[test]
    fn sweep_across_levels_rests_residual_maker() {
        let mut engine = MatchingEngine::new(64);
        engine.add_order(1, 1010, 20, Side::Sell);
        engine.add_order(2, 1020, 30, Side::Sell);

        assert!(engine.add_order(7, 1020, 45, Side::Buy));
        assert_eq!(engine.order_count(), 1);
        assert_eq!(engine.open_qty(2), Some(5));
        assert_eq!(engine.best_ask(), Some(1020));
        assert_eq!(engine.best_bid(), None);
        assert_eq!(engine.fill_count(), 2);
        assert_eq!(engine.filled_qty(), 45);
        engine.assert_invariants();
    }

    #[test]
    fn residual_rests_after_clearing_a_side() {
        let mut engine = MatchingEngine::new(64);
        engine.add_order(1, 1010, 20, Side::Sell);

        assert!(engine.add_order(2, 1015, 50, Side::Buy));
        assert_eq!(engine.best_ask(), None);
        assert_eq!(engine.best_bid(), Some(1015));
        assert_eq!(engine.open_qty(2), Some(30));
        engine.assert_invariants();
    }

    #[test]
    fn fifo_priority_within_a_level() {
        let mut engine = MatchingEngine::new(64);
        engine.add_order(1, 1010, 10, Side::Sell);
        engine.add_order(2, 1010, 10, Side::Sell);
        engine.add_order(3, 1010, 10, Side::Sell);

        engine.add_order(4, 1010, 15, Side::Buy);
        // First-in fully filled, second partially, third untouched.
        assert_eq!(engine.open_qty(1), None);
        assert_eq!(engine.open_qty(2), Some(5));
        assert_eq!(engine.open_qty(3), Some(10));
        engine.assert_invariants();
    }

    #[test]
    fn rejects_duplicates_and_zero_qty() {
        let mut engine = MatchingEngine::new(64);
        assert!(engine.add_order(1, 1000, 100, Side::Buy));
        assert!(!engine.add_order(1, 1005, 100, Side::Buy));
        assert!(!engine.add_order(2, 1000, 0, Side::Buy));
        assert_eq!(engine.order_count(), 1);
        assert_eq!(engine.best_bid(), Some(1000));
    }

    #[test]
    fn cancel_semantics() {
        let mut engine = MatchingEngine::new(64);
        engine.add_order(1, 1000, 100, Side::Buy);

        assert!(engine.cancel_order(1));
        assert!(!engine.cancel_order(1));
        assert!(!engine.cancel_order(99));
        assert_eq!(engine.order_count(), 0);
        assert_eq!(engine.pool().free_slots(), engine.pool().capacity());
    }

    #[test]
    fn pool_exhaustion_rejects_rest() {
        let mut engine = MatchingEngine::new(2);
        assert!(engine.add_order(1, 1000, 10, Side::Buy));
        assert!(engine.add_order(2, 990, 10, Side::Buy));
        assert!(!engine.add_order(3, 980, 10, Side::Buy));
        assert_eq!(engine.order_count(), 2);

        // A fully matching order needs no slot and still succeeds.
        assert!(engine.add_order(4, 990, 20, Side::Sell));
        assert_eq!(engine.order_count(), 0);
        engine.assert_invariants();
    }

    #[test]
    fn execute_reduces_then_removes() {
        let mut engine = MatchingEngine::new(8);
        engine.add_order(1, 1000, 100, Side::Buy);

        assert!(engine.execute_order(1, 40));
        assert_eq!(engine.open_qty(1), Some(60));
        assert_eq!(engine.fill_count(), 1);

        assert!(engine.execute_order(1, 200)); // clamped
        assert_eq!(engine.open_qty(1), None);
        assert_eq!(engine.order_count(), 0);
        assert_eq!(engine.filled_qty(), 100);

        assert!(!engine.execute_order(1, 10));
        engine.assert_invariants();
    }
}
