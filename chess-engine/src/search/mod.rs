//! Fail-soft principal-variation search kernel (§4.8).
//!
//! Grounded on the control flow of `pleco_engine/src/search/mod.rs`'s (never-exposed)
//! `Searcher::search` — entry checks, the reverse-futility/razoring/null-move pruning gate,
//! then a move loop with futility/LMP/SEE pruning, LMR, and singular extension — rebuilt
//! here as ordinary recursive functions over an owned `Position` (copy-make, no unmake)
//! instead of that file's `UnsafeCell`-based per-thread `Stack` array.

pub mod params;

use chess_core::square::{Color, PieceKind};
use chess_core::{Move, Position};

use crate::eval_cache::EvalCache;
use crate::history::HistoryTables;
use crate::movepick::{self, MovePicker};
use crate::sync::StopFlag;
use crate::tt::{self, NodeType, TranspositionTable};

pub const INFTY: i32 = 32_001;
pub const MATE: i32 = tt::MATE_SCORE;
pub const MAX_PLY: usize = 128;
const NEAR_MATE: i32 = MATE - 1024;

/// Everything a single search thread needs that isn't shared with other threads (§4.9.1,
/// §5 "per-thread state"). Owned outright: Lazy-SMP workers each get their own.
pub struct ThreadContext<'a> {
    pub tt: &'a TranspositionTable,
    pub eval_cache: &'a EvalCache,
    pub stop: &'a StopFlag,
    pub tb: &'a dyn crate::tb::Tablebase,
    pub tb_probe_limit: u32,
    pub history: HistoryTables,
    pub repetition_stack: Vec<u64>,
    pub nodes: u64,
    pub seldepth: i32,
    pub is_main_thread: bool,
    pub time: Option<&'a crate::time::TimeManager>,
    pub root_stop_check_counter: u32,
}

impl<'a> ThreadContext<'a> {
    pub fn new(
        tt: &'a TranspositionTable,
        eval_cache: &'a EvalCache,
        stop: &'a StopFlag,
        tb: &'a dyn crate::tb::Tablebase,
        time: Option<&'a crate::time::TimeManager>,
    ) -> Self {
        ThreadContext {
            tt,
            eval_cache,
            stop,
            tb,
            tb_probe_limit: 6,
            history: HistoryTables::new(),
            repetition_stack: Vec::with_capacity(128),
            nodes: 0,
            seldepth: 0,
            is_main_thread: true,
            time: None.or(time),
            root_stop_check_counter: 0,
        }
    }

    fn is_repetition(&self, key: u64) -> bool {
        self.repetition_stack.iter().filter(|&&k| k == key).count() >= 1
    }

    /// Thread-0 timeout poll, checked every 2048 nodes to keep the check cheap (§4.8.3 step 1).
    fn poll_stop(&mut self) -> bool {
        if self.stop.is_set() {
            return true;
        }
        if self.is_main_thread {
            self.root_stop_check_counter = self.root_stop_check_counter.wrapping_add(1);
            if self.root_stop_check_counter % 2048 == 0 {
                if let Some(time) = self.time {
                    if time.should_stop_now() {
                        self.stop.set();
                        return true;
                    }
                }
            }
        }
        false
    }
}

fn mate_in(ply: i32) -> i32 {
    MATE - ply
}

fn mated_in(ply: i32) -> i32 {
    -MATE + ply
}

/// Principal variation search over `(alpha, beta)` at `depth` plies remaining, `ply` from
/// the root. Returns a fail-soft score (may lie outside the window).
#[allow(clippy::too_many_arguments)]
pub fn pvs(
    ctx: &mut ThreadContext,
    pos: &Position,
    mut alpha: i32,
    mut beta: i32,
    depth: i32,
    ply: i32,
    pv_node: bool,
    cut_node: bool,
    prev_move_info: Option<(Color, PieceKind, chess_core::square::Square)>,
    prev2_move_info: Option<(Color, PieceKind, chess_core::square::Square)>,
) -> i32 {
    ctx.nodes += 1;
    if pv_node && ply > ctx.seldepth {
        ctx.seldepth = ply;
    }

    // --- 4.8.1 Entry checks ---
    if depth <= 0 || ply as usize >= MAX_PLY - 1 {
        return quiescence(ctx, pos, alpha, beta, ply, 0);
    }

    if ctx.poll_stop() {
        return INFTY;
    }

    if ply > 0 {
        if pos.is_draw_by_fifty_or_material() || ctx.is_repetition(pos.zobrist()) {
            return 0;
        }
        beta = beta.min(mate_in(ply));
        alpha = alpha.max(mated_in(ply));
        if alpha >= beta {
            return alpha;
        }
    }

    let key = pos.zobrist();
    let tt_hit = ctx.tt.probe(key);
    let tt_move = tt_hit.map(|d| d.mv).unwrap_or(Move::NULL);
    if let Some(data) = tt_hit {
        if ply > 0 && data.depth as i32 >= depth {
            let score = tt::score_from_tt(data.score, ply);
            let tight = match data.node_type {
                NodeType::All => score <= alpha,
                NodeType::Cut => score >= beta,
                NodeType::Pv => !pv_node,
                NodeType::None => false,
            };
            if tight {
                return score;
            }
        }
    }

    if ctx.tb.is_probeable(pos, ctx.tb_probe_limit) {
        if let Some(wdl) = ctx.tb.probe_wdl(pos) {
            let score = match wdl {
                crate::tb::Wdl::Loss => mated_in(ply) + 1,
                crate::tb::Wdl::BlessedLoss => -2,
                crate::tb::Wdl::Draw => 0,
                crate::tb::Wdl::CursedWin => 2,
                crate::tb::Wdl::Win => mate_in(ply) - 1,
            };
            ctx.tt.store(key, Move::NULL, tt::score_to_tt(score, ply), score, depth as i8, NodeType::Pv);
            return score;
        }
    }

    let in_check = pos.is_in_check(pos.side_to_move());
    let mut static_eval = if in_check {
        -MATE
    } else {
        ctx.eval_cache.probe(key).unwrap_or_else(|| {
            let e = chess_core::eval::evaluate(pos);
            ctx.eval_cache.store(key, e);
            e
        })
    };
    if !in_check {
        if let Some(data) = tt_hit {
            let tts = tt::score_from_tt(data.score, ply);
            let improves_bound = match data.node_type {
                NodeType::All => tts < static_eval,
                NodeType::Cut => tts > static_eval,
                _ => true,
            };
            if improves_bound {
                static_eval = tts;
            }
        }
    }

    // --- 4.8.2 Pruning gate ---
    if !pv_node && !in_check {
        if depth <= 6
            && static_eval - params::reverse_futility_margin(depth) >= beta
            && pos.non_pawn_material(pos.side_to_move()) > 0
        {
            return static_eval;
        }

        if depth <= 3 {
            let margin = params::RAZOR_MARGIN[depth.clamp(0, 2) as usize];
            if static_eval <= alpha - margin {
                let score = quiescence(ctx, pos, alpha - margin, alpha - margin + 1, ply, 0);
                if score < alpha - margin {
                    return score;
                }
            }
        }

        if depth >= 2
            && static_eval >= beta
            && pos.non_pawn_material(pos.side_to_move()) > 0
            && ply > 0
        {
            let r = 2 + (32 * depth + (static_eval - beta).min(384)) / 128;
            let null_pos = pos.do_null_move();
            ctx.repetition_stack.push(null_pos.zobrist());
            let mut score = -pvs(ctx, &null_pos, -beta, -beta + 1, depth - 1 - r, ply + 1, false, !cut_node, None, None);
            ctx.repetition_stack.pop();
            if ctx.stop.is_set() {
                return INFTY;
            }
            if score >= beta {
                if depth >= 10 {
                    let verify = pvs(ctx, pos, beta - 1, beta, depth - 1 - r, ply, false, false, prev_move_info, prev2_move_info);
                    if verify < beta {
                        score = verify;
                    }
                }
                if score >= beta {
                    return if score >= NEAR_MATE { beta } else { score };
                }
            }
        }
    }

    let is_cut_node = cut_node;
    let effective_hash_move = if tt_move.is_null()
        && movepick::should_run_iid(pv_node, is_cut_node, depth, static_eval, beta)
    {
        let iid_depth = movepick::iid_reduced_depth(pv_node, depth);
        if iid_depth > 0 {
            pvs(ctx, pos, alpha, beta, iid_depth, ply, pv_node, cut_node, prev_move_info, prev2_move_info);
            ctx.tt.probe(key).map(|d| d.mv).unwrap_or(Move::NULL)
        } else {
            Move::NULL
        }
    } else {
        tt_move
    };

    // --- 4.8.3 Move loop ---
    let original_alpha = alpha;
    let mut picker = MovePicker::new(effective_hash_move, pv_node);
    let mut best_score = -INFTY;
    let mut best_move = Move::NULL;
    let mut moves_searched = 0i32;
    let mut searched_quiets: Vec<(Move, PieceKind)> = Vec::new();
    let improving = !in_check && ply >= 2;

    while let Some(m) = picker.next(pos, &ctx.history, ply as usize) {
        if ctx.poll_stop() {
            return INFTY;
        }

        let is_capture_or_promo = m.is_capture() || m.is_promotion();
        let gives_check = pos.is_check_move(m);
        let near_mate = best_score.abs() >= NEAR_MATE;

        if !pv_node
            && !in_check
            && !is_capture_or_promo
            && m != effective_hash_move
            && !gives_check
            && !near_mate
            && moves_searched > 0
        {
            let prune_depth = depth.max(1);
            if static_eval <= alpha - params::futility_margin(prune_depth) && !ctx.history.killers.is_killer(ply as usize, m) {
                moves_searched += 1;
                continue;
            }
            if depth <= 7 {
                let lmp_limit = 3 + depth * depth / if improving { 1 } else { 2 } + if pv_node { depth } else { 0 };
                if moves_searched > lmp_limit {
                    moves_searched += 1;
                    continue;
                }
            }
            if depth <= 2 {
                let color = pos.side_to_move();
                let cmh = ctx.history.counter_move_history.get(prev_move_info, color, pos.piece_at(m.start()).map(|p| p.kind).unwrap_or(PieceKind::Pawn), m.end());
                let fuh = ctx.history.followup_history.get(prev2_move_info, color, pos.piece_at(m.start()).map(|p| p.kind).unwrap_or(PieceKind::Pawn), m.end());
                let thresh = 3 - 3 * depth * depth;
                if cmh < thresh && fuh < thresh {
                    moves_searched += 1;
                    continue;
                }
            }
            if depth <= 5 && pos.see_for_move(m) < -100 * depth {
                moves_searched += 1;
                continue;
            }
        }

        let child = if m == tt_move { pos.do_hash_move(m) } else { Some(pos.do_move(m)) };
        let child = match child {
            Some(c) if !c.is_in_check(pos.side_to_move()) => c,
            _ => {
                continue;
            }
        };

        moves_searched += 1;
        let moving_kind = pos.piece_at(m.start()).map(|p| p.kind).unwrap_or(PieceKind::Pawn);
        ctx.repetition_stack.push(child.zobrist());

        let mut reduction = 0;
        if depth >= 3 && moves_searched > (if pv_node { 4 } else { 2 }) + in_check as i32 && !is_capture_or_promo && !gives_check {
            let mut r = ctx.history_params_reduction(pv_node, improving, depth, moves_searched);
            if ctx.history.killers.is_killer(ply as usize, m) {
                r -= 1;
            }
            if in_check {
                r -= 1;
            }
            let h = ctx.history.butterfly.get(pos.side_to_move(), m);
            r -= h / 512;
            if is_cut_node {
                r += 1;
            }
            if pv_node {
                r -= 1;
            }
            reduction = r.clamp(0, (depth - 2).max(0));
        }

        let mut extension = 0;
        if reduction == 0 && gives_check && pos.see_for_move(m) >= 0 {
            extension = 1;
        } else if reduction == 0
            && extension == 0
            && depth >= 7
            && m == tt_move
            && !tt_move.is_null()
            && matches!(tt_hit.map(|d| d.node_type), Some(NodeType::Cut) | Some(NodeType::Pv))
            && tt_hit.map(|d| d.depth as i32 >= depth - 3).unwrap_or(false)
        {
            let tt_score = tt::score_from_tt(tt_hit.unwrap().score, ply);
            let singular_beta = tt_score - 10 - depth;
            let singular_depth = depth / 2 - 1;
            if singular_depth > 0 && is_move_singular(ctx, pos, m, singular_beta, singular_depth, ply) {
                extension = 1;
            }
        }

        let new_depth = depth - 1 + extension;
        let score = if moves_searched == 1 {
            -pvs(ctx, &child, -beta, -alpha, new_depth, ply + 1, pv_node, false, Some((pos.side_to_move(), moving_kind, m.end())), prev_move_info)
        } else {
            let reduced_depth = (new_depth - reduction).max(1);
            let mut s = -pvs(ctx, &child, -alpha - 1, -alpha, reduced_depth, ply + 1, false, true, Some((pos.side_to_move(), moving_kind, m.end())), prev_move_info);
            if s > alpha && reduction > 0 {
                s = -pvs(ctx, &child, -alpha - 1, -alpha, new_depth, ply + 1, false, !cut_node, Some((pos.side_to_move(), moving_kind, m.end())), prev_move_info);
            }
            if s > alpha && s < beta && pv_node {
                s = -pvs(ctx, &child, -beta, -alpha, new_depth, ply + 1, true, false, Some((pos.side_to_move(), moving_kind, m.end())), prev_move_info);
            }
            s
        };

        ctx.repetition_stack.pop();

        if ctx.stop.is_set() {
            return INFTY;
        }

        if score > best_score {
            best_score = score;
            best_move = m;
            if score > alpha {
                alpha = score;
                if score >= beta {
                    if !is_capture_or_promo {
                        ctx.history.update_quiet_cutoff(
                            pos.side_to_move(),
                            m,
                            moving_kind,
                            &searched_quiets,
                            depth,
                            ply as usize,
                            prev_move_info,
                            prev2_move_info,
                        );
                    }
                    ctx.tt.store(key, m, tt::score_to_tt(score, ply), static_eval, depth as i8, NodeType::Cut);
                    return score;
                }
            }
        }

        if !is_capture_or_promo {
            searched_quiets.push((m, moving_kind));
        }
    }

    if moves_searched == 0 {
        return if in_check { mated_in(ply) } else { 0 };
    }

    // The cutoff path above already returned for Cut-nodes; what's left is either a PV
    // node (alpha was raised past its entry value) or an All-node (every move failed low).
    let node_type = if alpha > original_alpha { NodeType::Pv } else { NodeType::All };
    // §4.8.3: "For All nodes that would have triggered IID, still store the IID candidate
    // as the best move even though no cutoff occurred."
    let store_move = if best_move.is_null() { effective_hash_move } else { best_move };
    ctx.tt.store(key, store_move, tt::score_to_tt(best_score, ply), static_eval, depth as i8, node_type);

    best_score
}

impl<'a> ThreadContext<'a> {
    fn history_params_reduction(&self, pv: bool, improving: bool, depth: i32, move_number: i32) -> i32 {
        static PARAMS: once_params::Lazy = once_params::Lazy::new();
        PARAMS.get().reduction(pv, improving, depth, move_number)
    }
}

/// Lazily-initialized, process-wide LMR/LMP tables (§4.8, `search::params`). One copy is
/// enough: the tables are read-only after construction and cheap to share across threads.
mod once_params {
    use super::params::SearchParams;
    use std::sync::OnceLock;

    pub struct Lazy(OnceLock<SearchParams>);

    impl Lazy {
        pub const fn new() -> Self {
            Lazy(OnceLock::new())
        }

        pub fn get(&self) -> &SearchParams {
            self.0.get_or_init(SearchParams::new)
        }
    }
}

/// Singular-extension verification (§4.8.3 step 6): every move other than `excluded` must
/// fail below `singular_beta` at `singular_depth` for the TT move to be called singular.
fn is_move_singular(ctx: &mut ThreadContext, pos: &Position, excluded: Move, singular_beta: i32, singular_depth: i32, ply: i32) -> bool {
    let mut picker = MovePicker::new(Move::NULL, false);
    while let Some(m) = picker.next(pos, &ctx.history, ply as usize) {
        if m == excluded {
            continue;
        }
        let Some(child) = pos.do_hash_move(m).or_else(|| Some(pos.do_move(m))) else { continue };
        if child.is_in_check(pos.side_to_move()) {
            continue;
        }
        ctx.repetition_stack.push(child.zobrist());
        let score = -pvs(ctx, &child, -singular_beta - 1, -singular_beta, singular_depth, ply + 1, false, true, None, None);
        ctx.repetition_stack.pop();
        if score >= singular_beta {
            return false;
        }
    }
    true
}

/// Stand-pat quiescence search over captures, capturing promotions, and (near the root of
/// the quiescence tree) checks (§4.8.4).
pub fn quiescence(ctx: &mut ThreadContext, pos: &Position, mut alpha: i32, beta: i32, ply: i32, qply: i32) -> i32 {
    ctx.nodes += 1;
    if ply as usize >= MAX_PLY - 1 {
        return chess_core::eval::evaluate(pos);
    }
    if pos.is_in_check(pos.side_to_move()) {
        return check_quiescence(ctx, pos, alpha, beta, ply, qply);
    }
    if pos.is_draw_by_fifty_or_material() || ctx.is_repetition(pos.zobrist()) {
        return 0;
    }

    let key = pos.zobrist();
    let stand_pat = ctx.eval_cache.probe(key).unwrap_or_else(|| {
        let e = chess_core::eval::evaluate(pos);
        ctx.eval_cache.store(key, e);
        e
    });
    if stand_pat >= beta {
        return stand_pat;
    }
    alpha = alpha.max(stand_pat);
    let mut best_score = stand_pat;

    let captures = pos.capture_moves();
    let mut scored: Vec<(Move, i32)> = captures
        .as_slice()
        .iter()
        .map(|&m| {
            let victim = pos.piece_at(m.end()).map(piece_value).unwrap_or(100);
            let attacker = pos.piece_at(m.start()).map(piece_value).unwrap_or(100);
            (m, victim * 16 - attacker)
        })
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1));

    for (m, _) in scored {
        if ctx.poll_stop() {
            return INFTY;
        }
        let victim_value = pos.piece_at(m.end()).map(piece_value).unwrap_or(100);
        if stand_pat + victim_value < alpha - 130 {
            best_score = best_score.max(stand_pat + victim_value + 130);
            continue;
        }
        let see = pos.see_for_move(m);
        if stand_pat < alpha - 80 && see <= 0 {
            continue;
        }
        let exch = victim_value - pos.piece_at(m.start()).map(piece_value).unwrap_or(100);
        if exch < 0 && see < 0 {
            continue;
        }
        let Some(child) = Some(pos.do_move(m)) else { continue };
        if child.is_in_check(pos.side_to_move()) {
            continue;
        }
        let score = -quiescence(ctx, &child, -beta, -alpha, ply + 1, qply + 1);
        if ctx.stop.is_set() {
            return INFTY;
        }
        if score > best_score {
            best_score = score;
            if score > alpha {
                alpha = score;
                if score >= beta {
                    return score;
                }
            }
        }
    }

    if qply < 2 && stand_pat >= alpha - 110 {
        let quiets = pos.quiet_moves();
        for &m in quiets.as_slice() {
            if !pos.is_check_move(m) {
                continue;
            }
            if pos.see_for_move(m) < 0 {
                continue;
            }
            let child = pos.do_move(m);
            if child.is_in_check(pos.side_to_move()) {
                continue;
            }
            let score = -check_quiescence(ctx, &child, -beta, -alpha, ply + 1, qply + 1);
            if ctx.stop.is_set() {
                return INFTY;
            }
            if score > best_score {
                best_score = score;
                if score > alpha {
                    alpha = score;
                    if score >= beta {
                        return score;
                    }
                }
            }
        }
    }

    best_score
}

fn piece_value(p: chess_core::square::Piece) -> i32 {
    match p.kind {
        PieceKind::Pawn => 100,
        PieceKind::Knight => 320,
        PieceKind::Bishop => 330,
        PieceKind::Rook => 500,
        PieceKind::Queen => 900,
        PieceKind::King => 20_000,
    }
}

/// Quiescence search when in check: every escape is tried (no stand-pat), SEE-filtered
/// except for the first move tried (§4.8.4).
fn check_quiescence(ctx: &mut ThreadContext, pos: &Position, alpha: i32, beta: i32, ply: i32, qply: i32) -> i32 {
    ctx.nodes += 1;
    let mut alpha = alpha;
    let escapes = pos.check_escapes();
    if escapes.is_empty() {
        return mated_in(ply);
    }
    let mut best_score = -INFTY;
    for (i, &m) in escapes.as_slice().iter().enumerate() {
        if ctx.poll_stop() {
            return INFTY;
        }
        if i > 0 && pos.see_for_move(m) < 0 {
            continue;
        }
        let child = pos.do_move(m);
        if child.is_in_check(pos.side_to_move()) {
            continue;
        }
        let score = -quiescence(ctx, &child, -beta, -alpha, ply + 1, qply);
        if ctx.stop.is_set() {
            return INFTY;
        }
        if score > best_score {
            best_score = score;
            if score > alpha {
                alpha = score;
                if score >= beta {
                    return score;
                }
            }
        }
    }
    if best_score == -INFTY {
        mated_in(ply)
    } else {
        best_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval_cache::EvalCache;
    use crate::tb::NoTablebase;
    use crate::tt::TranspositionTable;

    #[test]
    fn quiescence_on_quiet_position_returns_static_eval() {
        let pos = Position::new_standard();
        let tt = TranspositionTable::new(1);
        let ec = EvalCache::new(1);
        let stop = StopFlag::new();
        let tb = NoTablebase;
        let mut ctx = ThreadContext::new(&tt, &ec, &stop, &tb, None);
        let score = quiescence(&mut ctx, &pos, -INFTY, INFTY, 0, 0);
        assert_eq!(score, chess_core::eval::evaluate(&pos));
    }

    #[test]
    fn shallow_search_on_start_position_does_not_panic_and_returns_finite_score() {
        let pos = Position::new_standard();
        let tt = TranspositionTable::new(1);
        let ec = EvalCache::new(1);
        let stop = StopFlag::new();
        let tb = NoTablebase;
        let mut ctx = ThreadContext::new(&tt, &ec, &stop, &tb, None);
        let score = pvs(&mut ctx, &pos, -INFTY, INFTY, 3, 0, true, false, None, None);
        assert!(score.abs() < INFTY);
    }

    #[test]
    fn stopped_search_returns_infty_sentinel() {
        let pos = Position::new_standard();
        let tt = TranspositionTable::new(1);
        let ec = EvalCache::new(1);
        let stop = StopFlag::new();
        stop.set();
        let tb = NoTablebase;
        let mut ctx = ThreadContext::new(&tt, &ec, &stop, &tb, None);
        let score = pvs(&mut ctx, &pos, -INFTY, INFTY, 5, 0, true, false, None, None);
        assert_eq!(score, INFTY);
    }
}
