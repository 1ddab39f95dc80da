//! Cooperative-cancellation primitives shared across the thread pool (§5).
//!
//! Grounded on `pleco_engine/src/sync/mod.rs`'s `LockLatch`/`GuardedBool` pair, generalized
//! from a condvar-backed latch (useful for a hand-rolled thread park/unpark dance) down to
//! the single atomic this workspace's design actually needs: a search-wide stop flag,
//! checked far more often than it's set.

use std::sync::atomic::{AtomicBool, Ordering};

/// A cooperative stop flag. Readers use `Acquire`, writers use `Release`, matching §5's
/// "acquire/release on `stop` and `stopSignal` is sufficient" ordering guarantee.
#[derive(Default)]
pub struct StopFlag(AtomicBool);

impl StopFlag {
    pub const fn new() -> Self {
        StopFlag(AtomicBool::new(false))
    }

    #[inline(always)]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    #[inline(always)]
    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[inline(always)]
    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_clear_and_latches() {
        let flag = StopFlag::new();
        assert!(!flag.is_set());
        flag.set();
        assert!(flag.is_set());
        flag.clear();
        assert!(!flag.is_set());
    }
}
