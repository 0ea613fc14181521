//! Stress tests: capacity limits, slot churn, and single-level contention.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use itch_replay::{MatchingEngine, Side};

#[test]
fn near_capacity_operation() {
    const CAPACITY: u32 = 10_000;
    let mut engine = MatchingEngine::new(CAPACITY);

    // Fill to 95% capacity with non-overlapping sides.
    let target = (CAPACITY as f64 * 0.95) as u64;
    for i in 0..target {
        let (side, price) = if i % 2 == 0 {
            (Side::Buy, 8_000 + (i % 100) * 10)
        } else {
            (Side::Sell, 10_000 + (i % 100) * 10)
        };
        assert!(
            engine.add_order(i, price, 100, side),
            "order {i} should be accepted"
        );
    }

    assert_eq!(engine.order_count(), target as usize);
    assert_eq!(engine.pool().live() + engine.pool().free_slots(), CAPACITY);
    engine.assert_invariants();
}

#[test]
fn exhausted_pool_recovers_after_cancels() {
    const CAPACITY: u32 = 100;
    let mut engine = MatchingEngine::new(CAPACITY);

    for i in 0..CAPACITY as u64 {
        assert!(engine.add_order(i, 5_000 + i, 10, Side::Sell));
    }
    assert!(engine.pool().is_full());
    assert!(!engine.add_order(1_000, 4_000, 10, Side::Buy));

    for i in 0..10u64 {
        assert!(engine.cancel_order(i));
    }
    for i in 0..10u64 {
        assert!(engine.add_order(2_000 + i, 4_000, 10, Side::Buy));
    }
    assert!(engine.pool().is_full());
    engine.assert_invariants();
}

#[test]
fn heavy_churn_at_one_price() {
    let mut engine = MatchingEngine::new(1_000);
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let mut live: Vec<u64> = Vec::new();
    let mut next_id = 1u64;

    for _ in 0..50_000 {
        if live.len() < 500 && rng.gen_bool(0.6) {
            let id = next_id;
            next_id += 1;
            if engine.add_order(id, 10_000, rng.gen_range(1..50), Side::Buy) {
                live.push(id);
            }
        } else if !live.is_empty() {
            let idx = rng.gen_range(0..live.len());
            let id = live.swap_remove(idx);
            assert!(engine.cancel_order(id));
        }
    }

    assert!(engine.bid_level_count() <= 1);
    engine.assert_invariants();
}

#[test]
fn extreme_values_survive() {
    let mut engine = MatchingEngine::new(16);

    assert!(engine.add_order(u64::MAX, u64::MAX - 1, u32::MAX, Side::Buy));
    assert!(engine.add_order(1, u64::MAX, u32::MAX, Side::Sell));
    // Top of the price range crosses the resting ask exactly.
    assert!(engine.add_order(2, u64::MAX, u32::MAX, Side::Buy));

    assert_eq!(engine.filled_qty(), u32::MAX as u64);
    engine.assert_invariants();
}

#[test]
fn alternating_sweep_rounds() {
    let mut engine = MatchingEngine::new(10_000);
    let mut next_id = 1u64;

    for round in 0..50u64 {
        // Ladder of asks, then one bid that sweeps it all.
        let base = 10_000 + round;
        for i in 0..20u64 {
            assert!(engine.add_order(next_id, base + i, 10, Side::Sell));
            next_id += 1;
        }
        assert!(engine.add_order(next_id, base + 19, 200, Side::Buy));
        next_id += 1;

        assert_eq!(engine.order_count(), 0, "round {round} left residue");
        assert_eq!(engine.best_ask(), None);
        assert_eq!(engine.best_bid(), None);
    }

    assert_eq!(engine.fill_count(), 50 * 20);
    assert_eq!(engine.pool().free_slots(), engine.pool().capacity());
    engine.assert_invariants();
}
