//! Shared, direct-mapped static-eval cache (§4.6).
//!
//! Grounded on `pleco_engine/src/tables/pawn_table.rs`'s key/entry probe shape
//! (`PawnTable::probe`: mask the Zobrist-derived key down to a table index, validate the
//! stored key, recompute on miss), generalized from a pawn-structure-only cache keyed by
//! `pawn_key` to a whole-position eval cache keyed by the full Zobrist key, and from
//! `PawnEntry`'s owned-struct-per-slot design to the XOR-validated single `AtomicU64` slot
//! §4.6 calls for (no locks, torn writes read back as a miss).

use std::sync::atomic::{AtomicU64, Ordering};

/// Added to the true score before storing so that an all-zero slot (the initial state)
/// reads back as "empty" rather than as a valid zero-centipawn entry.
const SCORE_OFFSET: i64 = 1 << 20;

pub struct EvalCache {
    slots: Vec<AtomicU64>,
    mask: u64,
}

impl EvalCache {
    pub fn new(mb: usize) -> Self {
        let bytes = mb.max(1) * 1024 * 1024;
        let mut count = (bytes / 8).next_power_of_two();
        if count == 0 {
            count = 1;
        }
        let slots = (0..count).map(|_| AtomicU64::new(0)).collect();
        EvalCache { slots, mask: count as u64 - 1 }
    }

    #[inline]
    fn index(&self, key: u64) -> usize {
        (key & self.mask) as usize
    }

    pub fn probe(&self, key: u64) -> Option<i32> {
        let packed = self.slots[self.index(key)].load(Ordering::Relaxed);
        let stored_key_part = (packed >> 32) as u32;
        let stored_score_part = (packed & 0xFFFF_FFFF) as u32;
        if stored_key_part ^ stored_score_part != (key as u32) {
            return None;
        }
        if stored_score_part == 0 {
            return None;
        }
        Some(stored_score_part as i64 as i32 - SCORE_OFFSET as i32)
    }

    pub fn store(&self, key: u64, score: i32) {
        let biased = (score as i64 + SCORE_OFFSET) as u32;
        let biased = biased.max(1);
        let key_part = (key as u32) ^ biased;
        let packed = ((key_part as u64) << 32) | biased as u64;
        self.slots[self.index(key)].store(packed, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        for slot in &self.slots {
            slot.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_then_probe_round_trips() {
        let cache = EvalCache::new(1);
        cache.store(0x1234_5678_9abc_def0, -37);
        assert_eq!(cache.probe(0x1234_5678_9abc_def0), Some(-37));
    }

    #[test]
    fn probe_miss_on_untouched_slot() {
        let cache = EvalCache::new(1);
        assert_eq!(cache.probe(42), None);
    }

    #[test]
    fn colliding_key_reads_back_as_miss() {
        let cache = EvalCache::new(1);
        cache.store(1, 100);
        // A different key that maps to the same slot (mask keeps only low bits) but
        // differs in the high bits used for validation must not appear to hit.
        assert_eq!(cache.probe((1u64 << 40) | 1), None);
    }
}
