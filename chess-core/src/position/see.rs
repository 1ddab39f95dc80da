//! Static exchange evaluation (§4.3.2 "SEE").
//!
//! Grounded on `pleco`'s SEE (`pleco/src/board/mod.rs`'s `see`/`see_move` swap-list
//! algorithm): repeatedly remove the least-valuable attacker of the side to move from the
//! occupancy, revealing x-ray re-attackers behind it, then minimax the resulting gain
//! array backward. Piece values here are SEE-specific, distinct from the evaluator's.

use super::Position;
use crate::moves::Move;
use crate::square::{Color, PieceKind, Square};

/// SEE-specific piece values — distinct from evaluation material values (§4.3.2).
pub const SEE_PIECE_VALUE: [i32; 6] = [100, 400, 400, 600, 1150, 100_000 / 2];

impl Position {
    /// Static exchange evaluation of all captures landing on `to`, from `side`'s
    /// perspective, assuming `side` captures first.
    pub fn see(&self, to: Square, side: Color) -> i32 {
        let occ = self.occupied();
        let target_value = self.piece_at(to).map(|p| SEE_PIECE_VALUE[p.kind.index()]).unwrap_or(0);
        let Some(first_attacker) = self.least_valuable_attacker(to, side, occ) else {
            return 0;
        };
        self.see_swap_list(to, side, occ, first_attacker, target_value)
    }

    /// SEE for a specific move, forcing the move's own piece to be the first attacker
    /// (§4.3.2 `see_for_move`) rather than whichever piece the generic `see` would pick.
    pub fn see_for_move(&self, m: Move) -> i32 {
        let Some(moving) = self.piece_at(m.start()) else { return 0 };
        let side = self.side_to_move;
        let to = m.end();

        let captured_value = if m.is_en_passant() {
            SEE_PIECE_VALUE[PieceKind::Pawn.index()]
        } else {
            self.piece_at(to).map(|p| SEE_PIECE_VALUE[p.kind.index()]).unwrap_or(0)
        };

        let mut occ = self.occupied() & !m.start().bb();
        if m.is_en_passant() {
            let captured_sq = Square::from_file_rank(to.file(), m.start().rank());
            occ &= !captured_sq.bb();
        }

        let mut gains = vec![captured_value];
        let mut attacker_value = SEE_PIECE_VALUE[moving.kind.index()];
        let mut side_to_move = side.other();

        loop {
            match self.least_valuable_attacker(to, side_to_move, occ) {
                None => break,
                Some(sq) => {
                    let piece = self.piece_at(sq).expect("attacker square must hold a piece");
                    gains.push(attacker_value - *gains.last().unwrap());
                    occ &= !sq.bb();
                    attacker_value = SEE_PIECE_VALUE[piece.kind.index()];
                    side_to_move = side_to_move.other();
                }
            }
        }

        minimax_gains(&mut gains);
        gains[0]
    }

    fn least_valuable_attacker(&self, to: Square, side: Color, occ: u64) -> Option<Square> {
        let attackers = self.attackers_to(to, occ) & self.occupancy(side) & occ;
        if attackers == 0 {
            return None;
        }
        ATTACKER_PRIORITY.iter().find_map(|&kind| {
            let candidates = attackers & self.pieces(side, kind);
            if candidates != 0 {
                Some(Square(crate::bits::lsb_index(candidates)))
            } else {
                None
            }
        })
    }

    fn see_swap_list(&self, to: Square, side: Color, mut occ: u64, first_attacker: Square, target_value: i32) -> i32 {
        let mut gains = vec![target_value];
        let mut attacker_sq = first_attacker;
        let mut side_to_move = side;

        loop {
            let attacker_piece = self.piece_at(attacker_sq).expect("attacker square must hold a piece");
            let attacker_value = SEE_PIECE_VALUE[attacker_piece.kind.index()];
            gains.push(attacker_value - *gains.last().unwrap());
            occ &= !attacker_sq.bb();
            side_to_move = side_to_move.other();
            match self.least_valuable_attacker(to, side_to_move, occ) {
                None => break,
                Some(next) => attacker_sq = next,
            }
        }

        minimax_gains(&mut gains);
        gains[0]
    }
}

const ATTACKER_PRIORITY: [PieceKind; 6] = [
    PieceKind::Pawn,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Rook,
    PieceKind::Queen,
    PieceKind::King,
];

/// Backward minimax over a swap-off gain list: each side only continues the exchange if
/// doing so improves on stopping, so `gain[i] = max(-gain[i+1], gain[i])` scanned from the
/// tail.
fn minimax_gains(gains: &mut [i32]) {
    for i in (0..gains.len().saturating_sub(1)).rev() {
        gains[i] = gains[i].max(-gains[i + 1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn see_on_empty_square_is_zero() {
        let pos = Position::new_standard();
        assert_eq!(pos.see(Square::from_file_rank(4, 4), Color::White), 0);
    }

    #[test]
    fn see_pawn_takes_undefended_pawn_is_positive() {
        // White pawn e4, black pawn d5 undefended: exd5 wins a pawn outright.
        let pos = Position::from_fen("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1").unwrap();
        let m = Move::make_capture(Square::from_file_rank(4, 3), Square::from_file_rank(3, 4));
        assert_eq!(pos.see_for_move(m), SEE_PIECE_VALUE[PieceKind::Pawn.index()]);
    }

    #[test]
    fn see_losing_capture_is_negative() {
        // White queen takes a pawn defended by a black pawn: loses queen for pawn.
        let pos = Position::from_fen("4k3/3p4/8/3p4/8/8/8/3QK3 w - - 0 1").unwrap();
        let m = Move::make_capture(Square::from_file_rank(3, 0), Square::from_file_rank(3, 4));
        let score = pos.see_for_move(m);
        assert!(score < 0);
    }
}
