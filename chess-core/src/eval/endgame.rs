//! Endgame special-case oracles, consulted when the phase is pure endgame and material is
//! simple enough to recognize (§4.4.3).
//!
//! Grounded on the "KX vs K" and "wrong bishop" endgame lore `pleco`'s own simple evaluator
//! doesn't attempt (`pleco/src/tools/eval.rs` stops at material + PSQT-ish terms); these
//! recognizers are this workspace's own addition to close out the tapered evaluator's
//! pure-endgame branch of the tapered evaluator.

use crate::bits;
use crate::position::Position;
use crate::square::{Color, PieceKind, Square};

const MATE_IN_ENDGAME: i32 = 12_000;

/// Drives the losing king toward a corner, and the winning king toward the losing king —
/// the generic "mate with overwhelming material" shaping function used by the KX-vs-K and
/// KNB-vs-K recognizers.
fn push_to_corner_and_close(winning_king: Square, losing_king: Square) -> i32 {
    let corner_dist = corner_distance(losing_king);
    let king_dist = winning_king.distance(losing_king) as i32;
    (4 - corner_dist) * 10 + (7 - king_dist) * 6
}

fn corner_distance(sq: Square) -> i32 {
    let file_d = sq.file().min(7 - sq.file()) as i32;
    let rank_d = sq.rank().min(7 - sq.rank()) as i32;
    file_d.min(rank_d)
}

/// Distance from `sq` to the *nearest corner matching `light_square`'s color*, used by the
/// KNB-vs-K "correct corner" recognizer (a bishop can only force mate in the corner that
/// matches its own square color).
fn colored_corner_distance(sq: Square, light_square: bool) -> i32 {
    let corners = [Square::new(0), Square::new(7), Square::new(56), Square::new(63)];
    corners
        .iter()
        .filter(|c| c.on_dark_square() != light_square)
        .map(|c| sq.distance(*c) as i32)
        .min()
        .unwrap_or(0)
}

/// Attempts to resolve `pos` via a known simple-endgame pattern. Returns `None` when no
/// recognizer applies and the general evaluator should run instead.
pub fn try_evaluate(pos: &Position) -> Option<i32> {
    let white_material = material_signature(pos, Color::White);
    let black_material = material_signature(pos, Color::Black);

    if let Some(score) = kx_vs_k(pos, &white_material, &black_material) {
        return Some(score);
    }
    if let Some(score) = kp_vs_k(pos, &white_material, &black_material) {
        return Some(score);
    }
    if let Some(score) = knb_vs_k(pos, &white_material, &black_material) {
        return Some(score);
    }
    None
}

struct MaterialSignature {
    pawns: u32,
    knights: u32,
    bishops: u32,
    rooks: u32,
    queens: u32,
}

fn material_signature(pos: &Position, color: Color) -> MaterialSignature {
    MaterialSignature {
        pawns: bits::popcount(pos.pieces(color, PieceKind::Pawn)),
        knights: bits::popcount(pos.pieces(color, PieceKind::Knight)),
        bishops: bits::popcount(pos.pieces(color, PieceKind::Bishop)),
        rooks: bits::popcount(pos.pieces(color, PieceKind::Rook)),
        queens: bits::popcount(pos.pieces(color, PieceKind::Queen)),
    }
}

fn is_bare_king(m: &MaterialSignature) -> bool {
    m.pawns == 0 && m.knights == 0 && m.bishops == 0 && m.rooks == 0 && m.queens == 0
}

/// KX-vs-K: a lone rook or queen (plus anything else) against a bare king is a forced win,
/// scored by how close the defending king is to a corner and to the attacker's king.
fn kx_vs_k(pos: &Position, white: &MaterialSignature, black: &MaterialSignature) -> Option<i32> {
    let (winner, loser, winner_sig) = if is_bare_king(black) && (white.rooks > 0 || white.queens > 0) {
        (Color::White, Color::Black, white)
    } else if is_bare_king(white) && (black.rooks > 0 || black.queens > 0) {
        (Color::Black, Color::White, black)
    } else {
        return None;
    };
    let _ = winner_sig;
    let score = MATE_IN_ENDGAME + push_to_corner_and_close(pos.king_square(winner), pos.king_square(loser));
    Some(if winner == pos.side_to_move() { score } else { -score })
}

/// KP-vs-K: defers to the general evaluator's material + tropism terms but nudges the
/// score toward the side whose king is closer to its own passed pawn, a cheap proxy for
/// the rule-of-the-square without a full king-race search.
fn kp_vs_k(pos: &Position, white: &MaterialSignature, black: &MaterialSignature) -> Option<i32> {
    let white_is_kp = white.pawns == 1 && is_bare_king(&sig_minus_pawns(white));
    let black_is_kp = black.pawns == 1 && is_bare_king(&sig_minus_pawns(black));
    if !(white_is_kp && is_bare_king(black) || black_is_kp && is_bare_king(white)) {
        return None;
    }
    let (attacker, pawn_color) = if white_is_kp { (Color::White, Color::White) } else { (Color::Black, Color::Black) };
    let pawn_sq = Square(bits::lsb_index(pos.pieces(pawn_color, PieceKind::Pawn)));
    let king_sq = pos.king_square(attacker);
    let defender_king_sq = pos.king_square(attacker.other());
    let queening_rank = if pawn_color == Color::White { 7 } else { 0 };
    let queening_sq = Square::from_file_rank(pawn_sq.file(), queening_rank);

    let king_support = 10 - king_sq.distance(pawn_sq) as i32;
    let defender_race = defender_king_sq.distance(queening_sq) as i32 - pawn_sq.distance(queening_sq) as i32;
    let score = 100 + king_support * 5 + defender_race.max(-5).min(5) * 20;
    Some(if attacker == pos.side_to_move() { score } else { -score })
}

fn sig_minus_pawns(m: &MaterialSignature) -> MaterialSignature {
    MaterialSignature { pawns: 0, knights: m.knights, bishops: m.bishops, rooks: m.rooks, queens: m.queens }
}

/// KNB-vs-K: forced mate, but only deliverable in the corner matching the bishop's square
/// color — the classic "wrong corner" knight-and-bishop mate.
fn knb_vs_k(pos: &Position, white: &MaterialSignature, black: &MaterialSignature) -> Option<i32> {
    let white_knb = white.knights == 1 && white.bishops == 1 && white.pawns == 0 && white.rooks == 0 && white.queens == 0;
    let black_knb = black.knights == 1 && black.bishops == 1 && black.pawns == 0 && black.rooks == 0 && black.queens == 0;
    let (winner, loser) = if white_knb && is_bare_king(black) {
        (Color::White, Color::Black)
    } else if black_knb && is_bare_king(white) {
        (Color::Black, Color::White)
    } else {
        return None;
    };
    let bishop_sq = Square(bits::lsb_index(pos.pieces(winner, PieceKind::Bishop)));
    let light_square = bishop_sq.on_dark_square();
    let dist = colored_corner_distance(pos.king_square(loser), light_square);
    let score = MATE_IN_ENDGAME - dist * 20 + push_to_corner_and_close(pos.king_square(winner), pos.king_square(loser)) / 2;
    Some(if winner == pos.side_to_move() { score } else { -score })
}

/// Scale factor numerator over a 32 denominator, applied after tapering (§4.4.4).
pub fn scale_factor(pos: &Position) -> i32 {
    let white = material_signature(pos, Color::White);
    let black = material_signature(pos, Color::Black);

    let opposite_bishops = white.bishops == 1
        && black.bishops == 1
        && {
            let wb = Square(bits::lsb_index(pos.pieces(Color::White, PieceKind::Bishop)));
            let bb = Square(bits::lsb_index(pos.pieces(Color::Black, PieceKind::Bishop)));
            wb.on_dark_square() != bb.on_dark_square()
        };
    if opposite_bishops {
        return if white.knights + white.rooks + white.queens == 0 && black.knights + black.rooks + black.queens == 0 {
            14
        } else {
            28
        };
    }

    if white.pawns == 0 || black.pawns == 0 {
        let pawn_side_pawns = white.pawns.max(black.pawns);
        return match pawn_side_pawns {
            0 => 3,
            1 => 4,
            _ => 24,
        };
    }

    32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn krk_is_winning_for_rook_side() {
        let pos = Position::from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 0 1").unwrap();
        let score = try_evaluate(&pos).expect("KR vs K should be recognized");
        assert!(score > 0);
    }

    #[test]
    fn opposite_colored_bishops_scale_down() {
        let pos = Position::from_fen("4k3/8/8/3b4/8/8/8/2B1K3 w - - 0 1").unwrap();
        assert_eq!(scale_factor(&pos), 14);
    }

    #[test]
    fn balanced_material_does_not_scale() {
        let pos = Position::new_standard();
        assert_eq!(scale_factor(&pos), 32);
    }
}
