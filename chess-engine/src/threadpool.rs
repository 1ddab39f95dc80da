//! Lazy-SMP thread pool (§4.9.1).
//!
//! Grounded on `pleco_engine/src/threadpool/mod.rs`'s `ThreadPool`/`Searcher` shape (one
//! authoritative main thread, N-1 helpers searching the same root with staggered starting
//! depths, a barrier before the next `go`), rebuilt on `std::thread::scope` so helper
//! threads borrow the shared `TranspositionTable`/`EvalCache` directly instead of going
//! through that file's raw-pointer `SearcherPtr`/`static mut THREADPOOL` globals.

use chess_core::{Move, Position};

use crate::driver::{self, InfoLine, SearchOutcome};
use crate::eval_cache::EvalCache;
use crate::search::ThreadContext;
use crate::sync::StopFlag;
use crate::tb::Tablebase;
use crate::time::TimeManager;
use crate::tt::TranspositionTable;

/// Per-thread depth stagger pattern (§4.9.1): thread `i`'s iterative-deepening loop starts
/// at `root_depth + SMP_DEPTHS[i % 16]` rather than depth 1, so helpers diversify the
/// search tree instead of duplicating thread 0's work ply-for-ply.
pub const SMP_DEPTHS: [i32; 16] = [0, 1, 0, 1, 0, 1, 0, 2, 0, 1, 0, 2, 0, 1, 0, 3];

pub struct ThreadPoolConfig {
    pub threads: usize,
    pub multi_pv: usize,
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        ThreadPoolConfig { threads: 1, multi_pv: 1 }
    }
}

/// Runs a full Lazy-SMP search and returns thread 0's result, which is authoritative
/// (§4.9.1: "Thread 0 is authoritative: its result is the returned best move").
pub fn search(
    pos: &Position,
    tt: &TranspositionTable,
    eval_cache: &EvalCache,
    tb: &dyn Tablebase,
    stop: &StopFlag,
    time: &TimeManager,
    config: &ThreadPoolConfig,
    search_moves: &[Move],
    mut on_info: impl FnMut(InfoLine),
) -> SearchOutcome {
    tt.new_search();
    let threads = config.threads.max(1);

    if threads == 1 {
        let mut ctx = ThreadContext::new(tt, eval_cache, stop, tb, Some(time));
        return driver::iterative_deepen(&mut ctx, pos, time, config.multi_pv, search_moves, on_info);
    }

    let main_result = std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(threads - 1);
        for i in 1..threads {
            let handle = scope.spawn(move || {
                let mut ctx = ThreadContext::new(tt, eval_cache, stop, tb, None);
                ctx.is_main_thread = false;
                let stagger = SMP_DEPTHS[i % SMP_DEPTHS.len()];
                run_helper(&mut ctx, pos, search_moves, stagger, stop);
            });
            handles.push(handle);
        }

        let mut main_ctx = ThreadContext::new(tt, eval_cache, stop, tb, Some(time));
        let result = driver::iterative_deepen(&mut main_ctx, pos, time, config.multi_pv, search_moves, &mut on_info);
        stop.set();

        for h in handles {
            let _ = h.join();
        }
        result
    });

    main_result
}

/// A helper thread's own iterative-deepening loop, started `stagger` plies ahead of depth
/// 1 so it explores different lines than thread 0 at comparable wall-clock time. Helpers
/// share the TT/eval cache but never report `info` lines themselves — only thread 0's
/// progress reaches the UCI layer (§4.9.1).
fn run_helper(ctx: &mut ThreadContext, pos: &Position, search_moves: &[Move], stagger: i32, stop: &StopFlag) {
    let pseudo = pos.pseudo_legal_moves();
    let root_moves: Vec<Move> = pseudo
        .as_slice()
        .iter()
        .copied()
        .filter(|&m| !pos.do_move(m).is_in_check(pos.side_to_move()))
        .filter(|m| search_moves.is_empty() || search_moves.contains(m))
        .collect();
    if root_moves.is_empty() {
        return;
    }

    ctx.repetition_stack.push(pos.zobrist());
    let mut depth = 1 + stagger;
    while !stop.is_set() && (depth as usize) < crate::search::MAX_PLY {
        crate::search::pvs(ctx, pos, -crate::search::INFTY, crate::search::INFTY, depth, 0, true, false, None, None);
        depth += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tb::NoTablebase;

    #[test]
    fn single_threaded_search_reports_a_legal_best_move() {
        let pos = Position::new_standard();
        let tt = TranspositionTable::new(1);
        let ec = EvalCache::new(1);
        let stop = StopFlag::new();
        let tb = NoTablebase;
        let time = TimeManager::init(std::time::Instant::now(), &crate::time::Limits { limits_type: Some(crate::time::LimitKindStorage::Depth(3)), ..Default::default() }, chess_core::Color::White, 0);
        let config = ThreadPoolConfig { threads: 1, multi_pv: 1 };
        let outcome = search(&pos, &tt, &ec, &tb, &stop, &time, &config, &[], |_| {});
        assert!(!outcome.best_move.is_null());
    }

    #[test]
    fn smp_depths_pattern_has_sixteen_entries() {
        assert_eq!(SMP_DEPTHS.len(), 16);
    }
}
