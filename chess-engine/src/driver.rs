//! Iterative-deepening search driver: aspiration windows, multi-PV, easymove detection,
//! and time-budget gating (§4.9).
//!
//! Grounded on `pleco_engine/src/engine.rs`'s `uci_go`/`search` orchestration and
//! `pleco_engine/src/search/mod.rs`'s per-iteration aspiration-window retry loop, rebuilt
//! as a plain function over `ThreadContext` rather than `pleco_engine`'s `Searcher` struct
//! with its `UnsafeCell<RootMoveList>`.

use chess_core::{Move, Position};

use crate::search::{self, ThreadContext, INFTY, MATE};
use crate::time::TimeManager;

const NEAR_MATE: i32 = MATE - 1024;

#[derive(Clone, Debug)]
pub struct PvLine {
    pub score: i32,
    pub mv: Move,
    pub depth: i32,
}

/// One `info` line's worth of progress, handed to the UCI layer to format and print.
#[derive(Clone, Debug)]
pub struct InfoLine {
    pub depth: i32,
    pub seldepth: i32,
    pub multi_pv_index: usize,
    pub score: i32,
    pub mate_score: bool,
    pub nodes: u64,
    pub time_msec: u64,
    pub hashfull: u32,
    pub pv: Move,
}

pub struct SearchOutcome {
    pub best_move: Move,
    pub ponder_move: Option<Move>,
    pub depth_reached: i32,
}

fn legal_root_moves(pos: &Position) -> Vec<Move> {
    let pseudo = pos.pseudo_legal_moves();
    pseudo
        .as_slice()
        .iter()
        .copied()
        .filter(|&m| !pos.do_move(m).is_in_check(pos.side_to_move()))
        .collect()
}

/// Runs iterative deepening from depth 1 until the time manager or a depth limit says
/// stop. `on_info` is called once per completed depth per multi-PV slot.
pub fn iterative_deepen(
    ctx: &mut ThreadContext,
    pos: &Position,
    time: &TimeManager,
    multi_pv: usize,
    search_moves: &[Move],
    mut on_info: impl FnMut(InfoLine),
) -> SearchOutcome {
    let root_moves = if search_moves.is_empty() {
        legal_root_moves(pos)
    } else {
        legal_root_moves(pos).into_iter().filter(|m| search_moves.contains(m)).collect()
    };

    if root_moves.is_empty() {
        return SearchOutcome { best_move: Move::NULL, ponder_move: None, depth_reached: 0 };
    }

    let multi_pv = multi_pv.max(1).min(root_moves.len());
    let mut pv_lines: Vec<PvLine> = root_moves.iter().take(multi_pv).map(|&m| PvLine { score: -INFTY, mv: m, depth: 0 }).collect();

    let mut best_move_stable_count = 0;
    let mut last_best_move = Move::NULL;
    let mut depth_reached = 0;

    ctx.repetition_stack.clear();
    ctx.repetition_stack.push(pos.zobrist());

    'iterative: for depth in 1..=(time.depth_limit().unwrap_or(search::MAX_PLY as i32)) {
        if ctx.stop.is_set() {
            break;
        }
        if depth > 1 && time.should_stop_before_next_iteration() {
            break;
        }

        for pv_index in 0..multi_pv {
            if ctx.stop.is_set() {
                break 'iterative;
            }

            let (window_lo, window_hi) = aspiration_window(depth, pv_lines[pv_index].score);
            let mut alpha = window_lo;
            let mut beta = window_hi;
            let mut delta = (beta - alpha).max(1);

            let score = loop {
                let s = search::pvs(ctx, pos, alpha, beta, depth, 0, true, false, None, None);
                if ctx.stop.is_set() {
                    break s;
                }
                if s <= alpha {
                    beta = (alpha + beta) / 2;
                    alpha = (s - delta).max(-INFTY);
                    delta += delta / 2;
                } else if s >= beta {
                    beta = (s + delta).min(INFTY);
                    delta += delta / 2;
                } else {
                    break s;
                }
            };

            if ctx.stop.is_set() {
                break 'iterative;
            }

            let best_mv = ctx
                .tt
                .probe(pos.zobrist())
                .map(|d| d.mv)
                .filter(|m| !m.is_null())
                .unwrap_or(root_moves[0]);
            pv_lines[pv_index] = PvLine { score, mv: best_mv, depth };

            on_info(InfoLine {
                depth,
                seldepth: ctx.seldepth,
                multi_pv_index: pv_index + 1,
                score,
                mate_score: score.abs() >= NEAR_MATE,
                nodes: ctx.nodes,
                time_msec: time.elapsed_msec(),
                hashfull: ctx.tt.hashfull(),
                pv: best_mv,
            });
        }

        depth_reached = depth;
        let current_best = pv_lines[0].mv;
        if current_best == last_best_move {
            best_move_stable_count += 1;
        } else {
            best_move_stable_count = 0;
            last_best_move = current_best;
        }

        // Easymove: a long-stable best move with a healthy score margin earns a quick
        // verification at reduced depth instead of spending the full budget (§4.9).
        if best_move_stable_count >= 7 && depth >= 8 && !ctx.stop.is_set() {
            let verify_depth = (depth - 5).max(1);
            let verify = search::pvs(ctx, pos, pv_lines[0].score - 20, pv_lines[0].score + 20, verify_depth, 0, true, false, None, None);
            if (verify - pv_lines[0].score).abs() < 20 {
                break;
            }
        }
    }

    let best_move = pv_lines[0].mv;
    let ponder_move = ponder_from_tt(ctx, pos, best_move);

    SearchOutcome { best_move, ponder_move, depth_reached }
}

fn ponder_from_tt(ctx: &ThreadContext, pos: &Position, best_move: Move) -> Option<Move> {
    if best_move.is_null() {
        return None;
    }
    let after = pos.do_move(best_move);
    ctx.tt.probe(after.zobrist()).map(|d| d.mv).filter(|m| !m.is_null())
}

/// `δ = 20 − min(depth/3, 10) + |prev|/20`; opened from depth 6 onward when the previous
/// score isn't near a mate bound (§4.9).
fn aspiration_window(depth: i32, prev_score: i32) -> (i32, i32) {
    if depth < 6 || prev_score.abs() >= NEAR_MATE || prev_score == -INFTY {
        return (-INFTY, INFTY);
    }
    let delta = 20 - (depth / 3).min(10) + prev_score.abs() / 20;
    ((prev_score - delta).max(-INFTY), (prev_score + delta).min(INFTY))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspiration_window_is_full_width_below_depth_six() {
        assert_eq!(aspiration_window(5, 30), (-INFTY, INFTY));
    }

    #[test]
    fn aspiration_window_narrows_around_previous_score_at_depth_six() {
        let (lo, hi) = aspiration_window(6, 30);
        assert!(lo < 30 && hi > 30);
        assert!(hi - lo < 2 * INFTY);
    }

    #[test]
    fn near_mate_previous_score_reopens_full_window() {
        assert_eq!(aspiration_window(10, MATE - 10), (-INFTY, INFTY));
    }
}
