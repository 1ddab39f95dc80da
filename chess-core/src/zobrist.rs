//! The Zobrist hash table (§4.3.3): a fixed 794-entry table of deterministic pseudo-random
//! 64-bit values, combined by XOR to incrementally hash a `Position`.
//!
//! Grounded on `pleco/src/helper/zobrist.rs`, which keys piece-square/side/castle/en-passant
//! contributions the same way; that file hides the table behind `static mut` access functions,
//! while this workspace exposes one `lazy_static` table and lets `Position` index it directly
//! (safe, no `unsafe`).

use crate::castling::CastleRights;
use crate::prng::Prng;
use crate::square::{Color, PieceKind, Square};

/// Deterministic seed so Zobrist keys are reproducible across runs and builds.
const ZOBRIST_SEED: u64 = 23_081;

const PIECE_SQUARE_COUNT: usize = 768; // 2 colors * 6 kinds * 64 squares
const SIDE_INDEX: usize = 768;
const CASTLING_BASE: usize = 769; // 16 entries, one per 4-bit castling mask value
const EP_BASE: usize = 785; // 9 entries: 8 files + "none"
pub const TABLE_LEN: usize = 794;

pub struct ZobristTable {
    table: [u64; TABLE_LEN],
}

impl ZobristTable {
    fn generate() -> ZobristTable {
        let mut prng = Prng::new(ZOBRIST_SEED);
        let mut table = [0u64; TABLE_LEN];
        for slot in table.iter_mut() {
            *slot = prng.next_u64();
        }
        ZobristTable { table }
    }

    #[inline]
    pub fn piece_square(&self, color: Color, kind: PieceKind, sq: Square) -> u64 {
        let idx = 384 * (color as usize) + 64 * kind.index() + sq.0 as usize;
        self.table[idx]
    }

    #[inline]
    pub fn side_to_move(&self) -> u64 {
        self.table[SIDE_INDEX]
    }

    #[inline]
    pub fn castling(&self, rights: CastleRights) -> u64 {
        self.table[CASTLING_BASE + rights.bits() as usize]
    }

    /// `file` in `0..8`, or `8` for "no en-passant file".
    #[inline]
    pub fn en_passant(&self, file: u8) -> u64 {
        debug_assert!(file <= 8);
        self.table[EP_BASE + file as usize]
    }
}

lazy_static::lazy_static! {
    pub static ref ZOBRIST: ZobristTable = ZobristTable::generate();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_exactly_794_live_entries() {
        assert_eq!(TABLE_LEN, 794);
        assert_eq!(EP_BASE + 8, TABLE_LEN - 1);
    }

    #[test]
    fn distinct_features_hash_differently() {
        let z = &*ZOBRIST;
        let a = z.piece_square(Color::White, PieceKind::Pawn, Square::new(0));
        let b = z.piece_square(Color::White, PieceKind::Pawn, Square::new(1));
        assert_ne!(a, b);
        assert_ne!(z.side_to_move(), 0);
    }

    #[test]
    fn deterministic_across_instances() {
        let a = ZobristTable::generate();
        let b = ZobristTable::generate();
        assert_eq!(a.table, b.table);
    }
}
