//! Bitboard position representation, magic-bitboard move generation, and static
//! evaluation for a chess engine's search core (§3, §4.1-§4.4).
//!
//! This crate has no knowledge of threads, time control, or the UCI protocol — see the
//! `chess-engine` crate for the search kernel, transposition table, and driver built on
//! top of it.

pub mod bits;
pub mod castling;
pub mod eval;
pub mod magic;
pub mod moves;
pub mod position;
pub mod prng;
pub mod square;
pub mod zobrist;

pub use castling::CastleRights;
pub use moves::{Move, MoveList, MoveParseError};
pub use position::{FenError, Position};
pub use square::{Color, Piece, PieceKind, Square};
