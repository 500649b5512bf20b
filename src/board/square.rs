/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    fmt,
    ops::{Index, IndexMut},
    str::FromStr,
};

use super::{Bitboard, Color};
use crate::SquareError;

/// Represents a single square on an `8x8` chess board.
///
/// Squares are indexed `0..64` with `A1 = 0`, `B1 = 1`, ..., `H8 = 63`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct Square(pub(crate) u8);

macro_rules! square_consts {
    ($($file:ident => [$($name:ident: $rank:ident),*]),* $(,)?) => {
        impl Square {
            $($(pub const $name: Self = Self::new(File::$file, Rank::$rank);)*)*
        }
    };
}

square_consts! {
    A => [A1: ONE, A2: TWO, A3: THREE, A4: FOUR, A5: FIVE, A6: SIX, A7: SEVEN, A8: EIGHT],
    B => [B1: ONE, B2: TWO, B3: THREE, B4: FOUR, B5: FIVE, B6: SIX, B7: SEVEN, B8: EIGHT],
    C => [C1: ONE, C2: TWO, C3: THREE, C4: FOUR, C5: FIVE, C6: SIX, C7: SEVEN, C8: EIGHT],
    D => [D1: ONE, D2: TWO, D3: THREE, D4: FOUR, D5: FIVE, D6: SIX, D7: SEVEN, D8: EIGHT],
    E => [E1: ONE, E2: TWO, E3: THREE, E4: FOUR, E5: FIVE, E6: SIX, E7: SEVEN, E8: EIGHT],
    F => [F1: ONE, F2: TWO, F3: THREE, F4: FOUR, F5: FIVE, F6: SIX, F7: SEVEN, F8: EIGHT],
    G => [G1: ONE, G2: TWO, G3: THREE, G4: FOUR, G5: FIVE, G6: SIX, G7: SEVEN, G8: EIGHT],
    H => [H1: ONE, H2: TWO, H3: THREE, H4: FOUR, H5: FIVE, H6: SIX, H7: SEVEN, H8: EIGHT],
}

impl Square {
    pub const COUNT: usize = 64;

    /// Returns an iterator over all squares, from `A1` to `H8`.
    ///
    /// # Example
    /// ```
    /// # use corvid::Square;
    /// let mut iter = Square::iter();
    /// assert_eq!(iter.len(), 64);
    /// assert_eq!(iter.next().unwrap(), Square::A1);
    /// assert_eq!(iter.last().unwrap(), Square::H8);
    /// ```
    #[inline(always)]
    pub fn iter() -> impl ExactSizeIterator<Item = Self> + DoubleEndedIterator<Item = Self> {
        (0..Self::COUNT as u8).map(Self)
    }

    /// Creates a new [`Square`] from the provided [`File`] and [`Rank`].
    #[inline(always)]
    pub const fn new(file: File, rank: Rank) -> Self {
        Self(file.0 | rank.0 << 3)
    }

    /// Creates a new [`Square`] from an index, without bounds checking.
    ///
    /// `index` must be less than `64`.
    #[inline(always)]
    pub const fn from_index_unchecked(index: usize) -> Self {
        debug_assert!(index < Self::COUNT, "Square index out of bounds");
        Self(index as u8)
    }

    /// Parses a [`Square`] from coordinate notation, such as `"e4"`.
    ///
    /// # Example
    /// ```
    /// # use corvid::Square;
    /// assert_eq!(Square::from_uci("c4"), Ok(Square::C4));
    /// assert!(Square::from_uci("z0").is_err());
    /// ```
    pub fn from_uci(square: &str) -> Result<Self, SquareError> {
        let mut chars = square.chars();
        let (Some(file), Some(rank), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(SquareError::InvalidLength(square.to_string()));
        };

        Ok(Self::new(File::from_char(file)?, Rank::from_char(rank)?))
    }

    #[inline(always)]
    pub const fn file(&self) -> File {
        File(self.0 & 0b111)
    }

    #[inline(always)]
    pub const fn rank(&self) -> Rank {
        Rank(self.0 >> 3)
    }

    /// Returns this square's index, for use in lookup tables.
    #[inline(always)]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    /// Alias for [`Bitboard::from_square`].
    #[inline(always)]
    pub const fn bitboard(&self) -> Bitboard {
        Bitboard::from_square(*self)
    }

    /// Mirrors this square vertically, so `A1` becomes `A8`.
    #[inline(always)]
    pub const fn flipped(self) -> Self {
        Self(self.0 ^ 56)
    }

    /// Returns this square from `color`'s point of view.
    #[inline(always)]
    pub const fn relative_to(self, color: Color) -> Self {
        match color {
            Color::White => self,
            Color::Black => self.flipped(),
        }
    }

    /// Number of king moves needed to travel from `self` to `other`.
    ///
    /// # Example
    /// ```
    /// # use corvid::Square;
    /// assert_eq!(Square::A1.distance(Square::H8), 7);
    /// assert_eq!(Square::E4.distance(Square::F6), 2);
    /// ```
    #[inline(always)]
    pub const fn distance(&self, other: Self) -> u8 {
        let files = self.file().0.abs_diff(other.file().0);
        let ranks = self.rank().0.abs_diff(other.rank().0);
        if files > ranks {
            files
        } else {
            ranks
        }
    }

    /// Attempt to offset this [`Square`] by the file and rank offsets.
    ///
    /// Returns `None` if the result would leave the board.
    ///
    /// # Example
    /// ```
    /// # use corvid::Square;
    /// assert_eq!(Square::C4.offset(1, 1), Some(Square::D5));
    /// assert_eq!(Square::A1.offset(-1, -1), None);
    /// ```
    #[inline(always)]
    pub const fn offset(&self, file_delta: i8, rank_delta: i8) -> Option<Self> {
        let Some(file) = self.file().offset(file_delta) else {
            return None;
        };

        let Some(rank) = self.rank().offset(rank_delta) else {
            return None;
        };

        Some(Self::new(file, rank))
    }

    /// Moves this square `n` ranks towards `color`'s opponent, if possible.
    #[inline(always)]
    pub const fn forward_by(&self, color: Color, n: i8) -> Option<Self> {
        match color {
            Color::White => self.offset(0, n),
            Color::Black => self.offset(0, -n),
        }
    }

    /// Moves this square `n` ranks towards `color`'s own side, if possible.
    #[inline(always)]
    pub const fn backward_by(&self, color: Color, n: i8) -> Option<Self> {
        self.forward_by(color, -n)
    }
}

impl FromStr for Square {
    type Err = SquareError;
    #[inline(always)]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_uci(s)
    }
}

impl<T> Index<Square> for [T; Square::COUNT] {
    type Output = T;
    #[inline(always)]
    fn index(&self, index: Square) -> &Self::Output {
        &self[index.index()]
    }
}

impl<T> IndexMut<Square> for [T; Square::COUNT] {
    #[inline(always)]
    fn index_mut(&mut self, index: Square) -> &mut Self::Output {
        &mut self[index.index()]
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file(), self.rank())
    }
}

impl fmt::Debug for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self} ({})", self.0)
    }
}

/// Represents one of eight ranks on a chess board.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Rank(pub(crate) u8);

impl Rank {
    pub const ONE: Self = Self(0);
    pub const TWO: Self = Self(1);
    pub const THREE: Self = Self(2);
    pub const FOUR: Self = Self(3);
    pub const FIVE: Self = Self(4);
    pub const SIX: Self = Self(5);
    pub const SEVEN: Self = Self(6);
    pub const EIGHT: Self = Self(7);

    pub const MAX: u8 = 7;
    pub const COUNT: usize = 8;

    /// Returns an iterator over all ranks, from [`Rank::ONE`] to [`Rank::EIGHT`].
    #[inline(always)]
    pub fn iter() -> impl ExactSizeIterator<Item = Self> + DoubleEndedIterator<Item = Self> {
        (0..Self::COUNT as u8).map(Self)
    }

    /// Parses a [`Rank`] from its digit, `'1'` through `'8'`.
    pub fn from_char(rank: char) -> Result<Self, SquareError> {
        match rank {
            '1'..='8' => Ok(Self(rank as u8 - b'1')),
            _ => Err(SquareError::InvalidRank(rank)),
        }
    }

    /// First rank relative to `color`.
    #[inline(always)]
    pub const fn first(color: Color) -> Self {
        [Self::ONE, Self::EIGHT][color.index()]
    }

    /// Rank from which `color`'s pawns make their double push.
    #[inline(always)]
    pub const fn second(color: Color) -> Self {
        [Self::TWO, Self::SEVEN][color.index()]
    }

    #[inline(always)]
    pub const fn inner(&self) -> u8 {
        self.0
    }

    #[inline(always)]
    pub const fn char(&self) -> char {
        (self.0 + b'1') as char
    }

    /// Attempt to offset this [`Rank`] by the provided `delta`.
    ///
    /// # Example
    /// ```
    /// # use corvid::Rank;
    /// assert_eq!(Rank::FOUR.offset(1), Some(Rank::FIVE));
    /// assert_eq!(Rank::ONE.offset(-1), None);
    /// ```
    #[inline(always)]
    pub const fn offset(self, delta: i8) -> Option<Self> {
        match self.0.checked_add_signed(delta) {
            Some(bits) if bits <= Self::MAX => Some(Self(bits)),
            _ => None,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.char())
    }
}

impl fmt::Debug for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rank({})", self.char())
    }
}

/// Represents one of eight files on a chess board.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct File(pub(crate) u8);

impl File {
    pub const A: Self = Self(0);
    pub const B: Self = Self(1);
    pub const C: Self = Self(2);
    pub const D: Self = Self(3);
    pub const E: Self = Self(4);
    pub const F: Self = Self(5);
    pub const G: Self = Self(6);
    pub const H: Self = Self(7);

    pub const MAX: u8 = 7;
    pub const COUNT: usize = 8;

    /// Returns an iterator over all files, from [`File::A`] to [`File::H`].
    #[inline(always)]
    pub fn iter() -> impl ExactSizeIterator<Item = Self> + DoubleEndedIterator<Item = Self> {
        (0..Self::COUNT as u8).map(Self)
    }

    /// Parses a [`File`] from its letter, `'a'` through `'h'` (either case).
    pub fn from_char(file: char) -> Result<Self, SquareError> {
        match file.to_ascii_lowercase() {
            f @ 'a'..='h' => Ok(Self(f as u8 - b'a')),
            _ => Err(SquareError::InvalidFile(file)),
        }
    }

    #[inline(always)]
    pub const fn inner(&self) -> u8 {
        self.0
    }

    #[inline(always)]
    pub const fn char(&self) -> char {
        (self.0 + b'a') as char
    }

    /// Attempt to offset this [`File`] by the provided `delta`.
    #[inline(always)]
    pub const fn offset(self, delta: i8) -> Option<Self> {
        match self.0.checked_add_signed(delta) {
            Some(bits) if bits <= Self::MAX => Some(Self(bits)),
            _ => None,
        }
    }
}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.char())
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "File({})", self.char())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_parts() {
        assert_eq!(Square::E4.file(), File::E);
        assert_eq!(Square::E4.rank(), Rank::FOUR);
        assert_eq!(Square::E4.index(), 28);
        assert_eq!(Square::new(File::H, Rank::EIGHT), Square::H8);
    }

    #[test]
    fn test_square_from_uci() {
        assert_eq!("h8".parse::<Square>(), Ok(Square::H8));
        assert_eq!("A1".parse::<Square>(), Ok(Square::A1));
        assert_eq!(
            "e9".parse::<Square>(),
            Err(SquareError::InvalidRank('9'))
        );
        assert_eq!(
            "i1".parse::<Square>(),
            Err(SquareError::InvalidFile('i'))
        );
        assert!(matches!(
            "e44".parse::<Square>(),
            Err(SquareError::InvalidLength(_))
        ));
    }

    #[test]
    fn test_square_display_round_trip() {
        for square in Square::iter() {
            assert_eq!(square.to_string().parse::<Square>(), Ok(square));
        }
    }

    #[test]
    fn test_relative_squares() {
        assert_eq!(Square::E2.relative_to(Color::Black), Square::E7);
        assert_eq!(Square::E2.forward_by(Color::White, 2), Some(Square::E4));
        assert_eq!(Square::E7.forward_by(Color::Black, 2), Some(Square::E5));
        assert_eq!(Square::E1.backward_by(Color::White, 1), None);
    }
}
