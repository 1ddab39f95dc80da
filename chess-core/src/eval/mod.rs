//! Static evaluation: a tapered combination of material, piece-square tables, and the
//! positional terms in `terms` and `endgame` (§4.4).
//!
//! Grounded on `pleco/src/tools/eval.rs`'s `Eval::eval_low` driver shape (per-side term
//! functions summed and differenced, plus non-pawn material folded in separately), taken
//! from single-valued to tapered `(mg, eg)` scoring and extended with every term §4.4.2
//! names. `pleco_engine::searcher::eval::Evaluation::evaluate` is the newer, in-progress
//! design the upstream crate was migrating toward when development stalled (its body is
//! `unimplemented!()`); this module follows that newer struct-based shape (a `Score`
//! accumulator threaded through per-term calls) rather than resurrecting the older
//! freestanding `Eval::eval_low` functions verbatim.

mod endgame;
mod psqt;
mod terms;

use crate::position::Position;
use crate::square::{Color, PieceKind};

pub use endgame::scale_factor;

const RES: i32 = 128;
const PHASE_ALPHA: i32 = 3_100;
const PHASE_BETA: i32 = 15_250;

const PHASE_WEIGHT: [i32; 6] = [0, 1, 1, 2, 4, 0];
const MATERIAL_MG: [i32; 6] = [100, 320, 330, 500, 950, 0];
const MATERIAL_EG: [i32; 6] = [130, 300, 320, 530, 970, 0];

fn phase(pos: &Position) -> i32 {
    let mut raw = 0;
    for &color in &crate::square::ALL_COLORS {
        for kind in [PieceKind::Knight, PieceKind::Bishop, PieceKind::Rook, PieceKind::Queen] {
            raw += PHASE_WEIGHT[kind.index()] * crate::bits::popcount(pos.pieces(color, kind)) as i32;
        }
    }
    (RES - (raw - PHASE_ALPHA) * RES / PHASE_BETA).clamp(0, RES)
}

fn material_and_psqt(pos: &Position, color: Color) -> terms::Score {
    let mut mg = 0;
    let mut eg = 0;
    for kind in crate::square::ALL_PIECE_KINDS {
        let mut bb = pos.pieces(color, kind);
        while bb != 0 {
            let sq = crate::square::Square(crate::bits::lsb_index(bb));
            bb = crate::bits::clear_lsb(bb);
            mg += MATERIAL_MG[kind.index()];
            eg += MATERIAL_EG[kind.index()];
            let (pm, pe) = psqt::lookup(kind, color, sq);
            mg += pm;
            eg += pe;
        }
    }
    (mg, eg)
}

fn side_score(pos: &Position, color: Color) -> terms::Score {
    let mut score = material_and_psqt(pos, color);
    let add = |a: terms::Score, b: terms::Score| (a.0 + b.0, a.1 + b.1);
    score = add(score, terms::bishop_pair(pos, color));
    score = add(score, terms::imbalance(pos, color));
    score = add(score, terms::knight_closed_bonus(pos, color));
    score = add(score, terms::mobility(pos, color));
    score = add(score, terms::center_control(pos, color));
    score = add(score, terms::king_safety(pos, color));
    score = add(score, terms::threats(pos, color));
    score = add(score, terms::king_pawn_tropism(pos, color));
    score = add(score, terms::outposts(pos, color));
    score = add(score, terms::rook_files(pos, color));
    score = add(score, terms::bishop_pawn_color_penalty(pos, color));
    score
}

/// Static evaluation of `pos` in centipawns from the side-to-move's perspective (negamax
/// convention: positive favors the side to move).
pub fn evaluate(pos: &Position) -> i32 {
    let ph = phase(pos);
    if ph == RES {
        if let Some(score) = endgame::try_evaluate(pos) {
            return score;
        }
    }

    let white = side_score(pos, Color::White);
    let black = side_score(pos, Color::Black);
    let mg = white.0 - black.0;
    let eg = white.1 - black.1;

    let tapered = (mg * (RES - ph) + eg * ph) / RES;

    let scale = scale_factor(pos);
    let scaled = tapered * scale / 32;

    if pos.side_to_move() == Color::White {
        scaled
    } else {
        -scaled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_position_is_balanced() {
        let pos = Position::new_standard();
        assert_eq!(evaluate(&pos), 0);
    }

    #[test]
    fn extra_queen_is_a_large_advantage() {
        let pos = Position::from_fen("4k3/8/8/8/8/8/8/3QK3 w - - 0 1").unwrap();
        assert!(evaluate(&pos) > 500);
    }

    #[test]
    fn eval_is_symmetric_under_color_flip() {
        let white_up = Position::from_fen("4k3/8/8/8/8/8/8/3QK3 w - - 0 1").unwrap();
        let black_up = Position::from_fen("3qk3/8/8/8/8/8/8/4K3 b - - 0 1").unwrap();
        assert_eq!(evaluate(&white_up), evaluate(&black_up));
    }
}
