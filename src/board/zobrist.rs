/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use super::{CastlingRights, Color, Piece, PieceKind, Rank, Square};

/// Stores Zobrist hash keys, for hashing positions.
///
/// Generated at compile time from fixed seeds, so keys are identical between runs and builds.
const ZOBRIST_TABLE: ZobristHashTable = ZobristHashTable::new();

/// Four random u64 values.
const SEEDS: [u64; 4] = [
    0b1001000111000101101010110011110011101011111111010101101001110001,
    0b0000011010111010001001010011101110011101110110001001011111001101,
    0b1000000000010101101101011110010110011100110000100111010111101001,
    0b1111100011110100001001111111110001010100000100011101111001010011,
];

/// Represents a key generated from a Zobrist Hash.
#[derive(Default, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct ZobristKey(u64);

impl ZobristKey {
    /// Return the inner `u64` of this key.
    #[inline(always)]
    pub const fn inner(&self) -> u64 {
        self.0
    }

    /// Adds/removes `hash_key` to this [`ZobristKey`].
    ///
    /// This is done internally with the XOR operator, so hashing the same value twice is a no-op.
    ///
    /// # Example
    /// ```
    /// # use corvid::*;
    /// let mut key = ZobristKey::default();
    /// key.hash(42);
    /// assert_ne!(key.inner(), 0);
    /// key.hash(42);
    /// assert_eq!(key.inner(), 0);
    /// ```
    #[inline(always)]
    pub fn hash(&mut self, hash_key: u64) {
        self.0 ^= hash_key;
    }

    /// Adds/removes the hash for `piece` on `square`.
    ///
    /// # Example
    /// ```
    /// # use corvid::*;
    /// let pawn = Piece::new(Color::Black, PieceKind::Pawn);
    /// let mut d7 = ZobristKey::default();
    /// d7.hash_piece(Square::D7, pawn);
    ///
    /// let mut d5 = ZobristKey::default();
    /// d5.hash_piece(Square::D5, pawn);
    /// assert_ne!(d5, d7);
    /// ```
    #[inline(always)]
    pub fn hash_piece(&mut self, square: Square, piece: Piece) {
        self.hash(ZOBRIST_TABLE.piece_keys[square][piece.index()]);
    }

    /// Adds/removes the hash for an en passant target on `ep_square`.
    ///
    /// Only squares on ranks 3 and 6 carry a key; any other square hashes to nothing.
    #[inline(always)]
    pub fn hash_ep_square(&mut self, ep_square: Square) {
        self.hash(ZOBRIST_TABLE.ep_keys[ep_square]);
    }

    /// Same as [`ZobristKey::hash_ep_square`], doing nothing for `None`.
    #[inline(always)]
    pub fn hash_optional_ep_square(&mut self, ep_square: Option<Square>) {
        if let Some(square) = ep_square {
            self.hash_ep_square(square);
        }
    }

    /// Adds/removes the hash for the provided set of castling rights.
    #[inline(always)]
    pub fn hash_castling_rights(&mut self, rights: CastlingRights) {
        self.hash(ZOBRIST_TABLE.castling_keys[rights.index()]);
    }

    /// Adds/removes the hash for `color` being the side to move.
    ///
    /// White's key is zero, so only Black changes the hash.
    #[inline(always)]
    pub fn hash_side_to_move(&mut self, color: Color) {
        self.hash(ZOBRIST_TABLE.color_key[color]);
    }

    /// Flips the side to move, as done after every move.
    #[inline(always)]
    pub fn toggle_side_to_move(&mut self) {
        self.hash(ZOBRIST_TABLE.color_key[Color::Black]);
    }
}

impl fmt::Display for ZobristKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0>16X}", self.0)
    }
}

impl fmt::Debug for ZobristKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ZobristKey(0x{self})")
    }
}

/// Computes the full hash and the pawn-only hash of a position from scratch.
///
/// `pieces` yields every occupied square with its piece.
pub fn hash_from_scratch(
    pieces: impl IntoIterator<Item = (Square, Piece)>,
    ep_square: Option<Square>,
    castling_rights: CastlingRights,
    side_to_move: Color,
) -> (ZobristKey, ZobristKey) {
    let mut key = ZobristKey::default();
    let mut pawn_key = ZobristKey::default();

    for (square, piece) in pieces {
        key.hash_piece(square, piece);
        if piece.kind() == PieceKind::Pawn {
            pawn_key.hash_piece(square, piece);
        }
    }

    key.hash_optional_ep_square(ep_square);
    key.hash_castling_rights(castling_rights);
    key.hash_side_to_move(side_to_move);

    (key, pawn_key)
}

/// Internal table of keys, one per (square, piece), en passant square, set of castling rights, and side to move.
struct ZobristHashTable {
    piece_keys: [[u64; Piece::COUNT]; Square::COUNT],
    ep_keys: [u64; Square::COUNT],
    castling_keys: [u64; CastlingRights::COUNT],
    color_key: [u64; Color::COUNT],
}

impl ZobristHashTable {
    /// Initialize this table, generating keys via the [`XoShiRo`] generator.
    const fn new() -> Self {
        let mut piece_keys = [[0; Piece::COUNT]; Square::COUNT];
        let mut ep_keys = [0; Square::COUNT];
        let mut castling_keys = [0; CastlingRights::COUNT];
        let mut color_key = [0; Color::COUNT];

        let mut prng = XoShiRo::from_seeds(SEEDS);

        let mut i = 0;
        while i < Square::COUNT {
            let mut j = 0;
            while j < Piece::COUNT {
                let key;
                (key, prng) = prng.get_next_const();
                piece_keys[i][j] = key;
                j += 1;
            }

            // En passant can only target ranks 3 and 6
            let rank = Square::from_index_unchecked(i).rank().inner();
            if rank == Rank::THREE.inner() || rank == Rank::SIX.inner() {
                let key;
                (key, prng) = prng.get_next_const();
                ep_keys[i] = key;
            }

            i += 1;
        }

        // Index 0 (no rights) keeps a zero key
        i = 1;
        while i < CastlingRights::COUNT {
            let key;
            (key, prng) = prng.get_next_const();
            castling_keys[i] = key;
            i += 1;
        }

        let (key, _) = prng.get_next_const();
        color_key[Color::Black.index()] = key;

        Self {
            piece_keys,
            ep_keys,
            castling_keys,
            color_key,
        }
    }
}

/// A pseudo-random number generator using the "xoshiro256**" algorithm.
///
/// See <https://prng.di.unimi.it/xoshiro256starstar.c>
struct XoShiRo([u64; 4]);

impl XoShiRo {
    #[inline(always)]
    const fn from_seeds(seeds: [u64; 4]) -> Self {
        Self(seeds)
    }

    /// Returns `(next, Self)` so it can be called in `const` contexts.
    #[inline(always)]
    const fn get_next_const(self) -> (u64, Self) {
        let mut s = self.0;
        let result = s[1].wrapping_mul(5).rotate_left(7).wrapping_mul(9);

        let t = s[1] << 17;

        s[2] ^= s[0];
        s[3] ^= s[1];
        s[1] ^= s[2];
        s[0] ^= s[3];

        s[2] ^= t;

        s[3] = s[3].rotate_left(45);
        (result, Self(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_distinct() {
        let mut keys = Vec::new();
        for row in ZOBRIST_TABLE.piece_keys.iter() {
            keys.extend_from_slice(row);
        }
        keys.extend(ZOBRIST_TABLE.ep_keys.iter().filter(|k| **k != 0));
        keys.extend(ZOBRIST_TABLE.castling_keys.iter().skip(1));
        keys.push(ZOBRIST_TABLE.color_key[Color::Black]);

        let total = keys.len();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), total);
        assert_eq!(total, 64 * 12 + 16 + 15 + 1);
    }

    #[test]
    fn test_ep_keys_only_on_ep_ranks() {
        let mut key = ZobristKey::default();
        key.hash_ep_square(Square::E2);
        assert_eq!(key, ZobristKey::default());

        key.hash_ep_square(Square::E3);
        assert_ne!(key, ZobristKey::default());
    }

    #[test]
    fn test_side_to_move_toggles() {
        let mut white = ZobristKey::default();
        white.hash_side_to_move(Color::White);
        assert_eq!(white, ZobristKey::default());

        let mut black = ZobristKey::default();
        black.hash_side_to_move(Color::Black);
        white.toggle_side_to_move();
        assert_eq!(white, black);
    }
}
