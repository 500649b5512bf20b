/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// Precomputed attack tables for every piece.
mod attacks;

/// Sets of squares as 64-bit integers.
mod bitboard;

/// Pseudo-legal move generation.
mod movegen;

/// Compact move encoding.
mod moves;

/// Move path enumeration, for testing move generation.
mod perft;

/// Colors, piece kinds, and colored pieces.
mod piece;

/// Board state, FEN, and make/undo.
mod position;

/// Squares, files, and ranks.
mod square;

/// Zobrist hashing of positions.
mod zobrist;

pub use attacks::*;
pub use bitboard::*;
pub use movegen::*;
pub use moves::*;
pub use perft::*;
pub use piece::*;
pub use position::*;
pub use square::*;
pub use zobrist::*;
