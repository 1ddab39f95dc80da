//! Castling-rights flag set.
//!
//! Grounded on `pleco/src/board/castle_rights.rs`, which uses the same `bitflags!` shape.

use crate::square::Color;
use bitflags::bitflags;

bitflags! {
    /// The four independent castling privileges. A set bit means "still possible in
    /// principle" (rook and king haven't moved), not "legal right now".
    #[derive(Default)]
    pub struct CastleRights: u8 {
        const WHITE_K = 0b0000_1000;
        const WHITE_Q = 0b0000_0100;
        const BLACK_K = 0b0000_0010;
        const BLACK_Q = 0b0000_0001;
        const WHITE_ALL = Self::WHITE_K.bits | Self::WHITE_Q.bits;
        const BLACK_ALL = Self::BLACK_K.bits | Self::BLACK_Q.bits;
        const ALL = Self::WHITE_ALL.bits | Self::BLACK_ALL.bits;
    }
}

impl CastleRights {
    #[inline]
    pub fn king_side(color: Color) -> CastleRights {
        match color {
            Color::White => CastleRights::WHITE_K,
            Color::Black => CastleRights::BLACK_K,
        }
    }

    #[inline]
    pub fn queen_side(color: Color) -> CastleRights {
        match color {
            Color::White => CastleRights::WHITE_Q,
            Color::Black => CastleRights::BLACK_Q,
        }
    }

    #[inline]
    pub fn remove_color(&mut self, color: Color) {
        let keep = match color {
            Color::White => CastleRights::BLACK_ALL,
            Color::Black => CastleRights::WHITE_ALL,
        };
        *self &= keep;
    }

    /// Returns the castle-rights mask that a move touching `sq` should clear (rook or
    /// king starting squares); zero if `sq` carries no castling significance.
    #[inline]
    pub fn mask_for_square(sq: crate::square::Square) -> CastleRights {
        match sq.0 {
            0 => CastleRights::WHITE_Q,
            7 => CastleRights::WHITE_K,
            56 => CastleRights::BLACK_Q,
            63 => CastleRights::BLACK_K,
            4 => CastleRights::WHITE_ALL,
            60 => CastleRights::BLACK_ALL,
            _ => CastleRights::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_color_keeps_other_side() {
        let mut c = CastleRights::ALL;
        c.remove_color(Color::White);
        assert_eq!(c, CastleRights::BLACK_ALL);
    }
}
