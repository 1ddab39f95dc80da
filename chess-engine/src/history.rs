//! Per-thread move-ordering memory: killer moves and the butterfly / counter-move /
//! followup-move history tables (§3 "Per-thread state", §4.7.2).
//!
//! Grounded on `pleco_engine/src/tables/{butterfly,counter_move,continuation}.rs`'s shapes
//! (`ButterflyHistory` indexed by `[color][from*64+to]`, the continuation tables indexed by
//! a predecessor `(piece, to)` pair). `pleco_engine/src/search/mod.rs`'s `Stack` indexes
//! continuation history via a raw `*mut PieceToHistory` stashed on the search stack; this
//! workspace keeps the same addressing scheme but backs it with an owned, `Box`-backed
//! table addressed by plain array indices, never a raw pointer.

use chess_core::square::{Color, PieceKind};
use chess_core::Move;

pub const MAX_PLY: usize = 128;

const HISTORY_MAX: i32 = 1 << 14;

fn piece_index(color: Color, kind: PieceKind) -> usize {
    color as usize * 6 + kind.index()
}

fn clamp_history(v: i32) -> i32 {
    v.clamp(-HISTORY_MAX, HISTORY_MAX)
}

/// Butterfly history: `[color][from * 64 + to]`.
pub struct ButterflyHistory {
    table: Box<[[i32; 64 * 64]; 2]>,
}

impl ButterflyHistory {
    pub fn new() -> Self {
        ButterflyHistory { table: Box::new([[0; 64 * 64]; 2]) }
    }

    pub fn get(&self, color: Color, m: Move) -> i32 {
        self.table[color as usize][m.start().0 as usize * 64 + m.end().0 as usize]
    }

    pub fn add(&mut self, color: Color, m: Move, bonus: i32) {
        let slot = &mut self.table[color as usize][m.start().0 as usize * 64 + m.end().0 as usize];
        *slot = clamp_history(*slot + bonus);
    }

    pub fn clear(&mut self) {
        *self.table = [[0; 64 * 64]; 2];
    }

    pub fn rescale(&mut self) {
        for row in self.table.iter_mut() {
            for v in row.iter_mut() {
                *v /= 2;
            }
        }
    }
}

impl Default for ButterflyHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// Continuation history, addressed by `(predecessor piece, predecessor to-square, this
/// move's piece, this move's to-square)`. Used for both the counter-move history (ply-1
/// predecessor) and the followup-move history (ply-2 predecessor) — same shape, two owned
/// instances per thread.
pub struct ContinuationHistory {
    table: Box<[[i32; 12 * 64]; 12 * 64]>,
}

impl ContinuationHistory {
    pub fn new() -> Self {
        ContinuationHistory { table: Box::new([[0; 12 * 64]; 12 * 64]) }
    }

    fn index(prev_color: Color, prev_kind: PieceKind, prev_to: chess_core::square::Square) -> usize {
        piece_index(prev_color, prev_kind) * 64 + prev_to.0 as usize
    }

    pub fn get(
        &self,
        prev: Option<(Color, PieceKind, chess_core::square::Square)>,
        color: Color,
        kind: PieceKind,
        to: chess_core::square::Square,
    ) -> i32 {
        let Some((pc, pk, pt)) = prev else { return 0 };
        self.table[Self::index(pc, pk, pt)][piece_index(color, kind) * 64 + to.0 as usize]
    }

    pub fn add(
        &mut self,
        prev: Option<(Color, PieceKind, chess_core::square::Square)>,
        color: Color,
        kind: PieceKind,
        to: chess_core::square::Square,
        bonus: i32,
    ) {
        let Some((pc, pk, pt)) = prev else { return };
        let slot = &mut self.table[Self::index(pc, pk, pt)][piece_index(color, kind) * 64 + to.0 as usize];
        *slot = clamp_history(*slot + bonus);
    }

    pub fn clear(&mut self) {
        *self.table = [[0; 12 * 64]; 12 * 64];
    }

    pub fn rescale(&mut self) {
        for row in self.table.iter_mut() {
            for v in row.iter_mut() {
                *v /= 2;
            }
        }
    }
}

impl Default for ContinuationHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// Two killer-move slots per ply.
pub struct Killers {
    slots: Vec<[Move; 2]>,
}

impl Killers {
    pub fn new() -> Self {
        Killers { slots: vec![[Move::NULL; 2]; MAX_PLY] }
    }

    pub fn get(&self, ply: usize) -> [Move; 2] {
        self.slots[ply.min(MAX_PLY - 1)]
    }

    pub fn is_killer(&self, ply: usize, m: Move) -> bool {
        let k = self.get(ply);
        k[0] == m || k[1] == m
    }

    /// Shifts slot 0 into slot 1 and installs `m` as the new slot 0, unless `m` is already
    /// the slot-0 killer (§4.7.2).
    pub fn update(&mut self, ply: usize, m: Move) {
        let ply = ply.min(MAX_PLY - 1);
        if self.slots[ply][0] == m {
            return;
        }
        self.slots[ply][1] = self.slots[ply][0];
        self.slots[ply][0] = m;
    }

    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = [Move::NULL; 2];
        }
    }
}

impl Default for Killers {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-thread move-ordering memory bundle, owned (never shared) so Lazy-SMP helper threads
/// can diverge in move order without any synchronization (§4.9.1).
pub struct HistoryTables {
    pub killers: Killers,
    pub butterfly: ButterflyHistory,
    pub counter_move_history: ContinuationHistory,
    pub followup_history: ContinuationHistory,
}

impl HistoryTables {
    pub fn new() -> Self {
        HistoryTables {
            killers: Killers::new(),
            butterfly: ButterflyHistory::new(),
            counter_move_history: ContinuationHistory::new(),
            followup_history: ContinuationHistory::new(),
        }
    }

    /// Bonus/malus sweep after a quiet move causes a beta cutoff (§4.7.2): the cutoff move
    /// gains `depth^2` (capped at 144); every quiet move tried before it loses
    /// `depth*h/64 + depth^2` from the same tables.
    #[allow(clippy::too_many_arguments)]
    pub fn update_quiet_cutoff(
        &mut self,
        color: Color,
        best: Move,
        best_kind: PieceKind,
        searched_before: &[(Move, PieceKind)],
        depth: i32,
        ply: usize,
        prev: Option<(Color, PieceKind, chess_core::square::Square)>,
        prev2: Option<(Color, PieceKind, chess_core::square::Square)>,
    ) {
        let bonus = (depth * depth).min(144);
        self.butterfly.add(color, best, bonus);
        self.counter_move_history.add(prev, color, best_kind, best.end(), bonus);
        self.followup_history.add(prev2, color, best_kind, best.end(), bonus);

        for &(m, kind) in searched_before {
            let h = self.butterfly.get(color, m);
            let malus = depth * h / 64 + bonus;
            self.butterfly.add(color, m, -malus);
            self.counter_move_history.add(prev, color, kind, m.end(), -malus);
            self.followup_history.add(prev2, color, kind, m.end(), -malus);
        }

        self.killers.update(ply, best);
    }

    pub fn clear(&mut self) {
        self.killers.clear();
        self.butterfly.clear();
        self.counter_move_history.clear();
        self.followup_history.clear();
    }

    /// Halves every entry rather than zeroing — histories persist across searches within a
    /// game (§3: "rescaled (not zeroed) between searches").
    pub fn rescale(&mut self) {
        self.butterfly.rescale();
        self.counter_move_history.rescale();
        self.followup_history.rescale();
    }
}

impl Default for HistoryTables {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::square::Square;

    #[test]
    fn killers_shift_on_update() {
        let mut k = Killers::new();
        let a = Move::make_quiet(Square::new(0), Square::new(1));
        let b = Move::make_quiet(Square::new(0), Square::new(2));
        k.update(3, a);
        k.update(3, b);
        let slots = k.get(3);
        assert_eq!(slots[0], b);
        assert_eq!(slots[1], a);
    }

    #[test]
    fn killer_already_in_slot_zero_is_a_no_op() {
        let mut k = Killers::new();
        let a = Move::make_quiet(Square::new(0), Square::new(1));
        k.update(1, a);
        k.update(1, a);
        assert_eq!(k.get(1)[0], a);
        assert_eq!(k.get(1)[1], Move::NULL);
    }

    #[test]
    fn butterfly_history_accumulates_and_clamps() {
        let mut h = ButterflyHistory::new();
        let m = Move::make_quiet(Square::new(4), Square::new(20));
        h.add(Color::White, m, 100);
        h.add(Color::White, m, 100);
        assert_eq!(h.get(Color::White, m), 200);
        h.add(Color::White, m, 1_000_000);
        assert_eq!(h.get(Color::White, m), HISTORY_MAX);
    }

    #[test]
    fn quiet_cutoff_rewards_best_and_punishes_earlier_quiets() {
        let mut tables = HistoryTables::new();
        let best = Move::make_quiet(Square::new(4), Square::new(20));
        let earlier = Move::make_quiet(Square::new(4), Square::new(12));
        tables.update_quiet_cutoff(Color::White, best, PieceKind::Knight, &[(earlier, PieceKind::Bishop)], 5, 2, None, None);
        assert!(tables.butterfly.get(Color::White, best) > 0);
        assert!(tables.butterfly.get(Color::White, earlier) < 0);
        assert_eq!(tables.killers.get(2)[0], best);
    }
}
