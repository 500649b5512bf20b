/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    fmt,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use uci_parser::UciScore;

use crate::MAX_DEPTH;

/// Evaluation of a position in centipawns, always from the perspective of one side.
///
/// Mates are encoded at the top of the range: a score of `MATE - n` means the side to move at the
/// root delivers mate `n` plies from the root, and `n - MATE` means it is mated after `n` plies.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Score(pub i32);

impl Score {
    /// Bound that no real score reaches. Used as the initial search window.
    pub const INF: Self = Self(i16::MAX as i32);

    /// Mate on the board, at the root.
    pub const MATE: Self = Self(Self::INF.0 - 1);

    /// A drawn position.
    pub const DRAW: Self = Self(0);

    /// The farthest mate a search can see.
    pub const LOWEST_MATE: Self = Self(Self::MATE.0 - MAX_DEPTH as i32);

    /// Score of delivering mate `ply` plies from the root.
    #[inline(always)]
    pub const fn mate_in(ply: usize) -> Self {
        Self(Self::MATE.0 - ply as i32)
    }

    /// Score for the side to move when it is mated at `ply` plies from the root.
    ///
    /// Mates closer to the root are worse for the loser, so shorter mates are preferred by the winner.
    ///
    /// # Example
    /// ```
    /// # use corvid::Score;
    /// assert_eq!(Score::mated_in(0), -Score::MATE);
    /// assert!(Score::mated_in(2) > Score::mated_in(1));
    /// assert!(Score::mated_in(5).is_mate());
    /// ```
    #[inline(always)]
    pub const fn mated_in(ply: usize) -> Self {
        Self(ply as i32 - Self::MATE.0)
    }

    /// Returns `true` if either side is getting mated.
    #[inline(always)]
    pub const fn is_mate(&self) -> bool {
        self.0.abs() >= Self::LOWEST_MATE.0
    }

    /// Distance to mate, in plies. Meaningless unless [`Score::is_mate`].
    #[inline(always)]
    pub const fn plies_to_mate(&self) -> i32 {
        Self::MATE.0 - self.0.abs()
    }

    /// Distance to mate in full moves, as UCI reports it.
    ///
    /// Positive if the side to move mates, negative if it gets mated.
    #[inline(always)]
    pub const fn moves_to_mate(&self) -> i32 {
        let plies = self.plies_to_mate();
        if self.0 > 0 {
            // Our own mating move counts as a full move
            (plies + 1) / 2
        } else {
            -plies / 2
        }
    }

    /// Converts a score seen from the root into one seen from a node `ply` plies deep.
    ///
    /// Only mates change: a mate `n` plies from the root is `n - ply` plies from the node.
    #[inline(always)]
    pub const fn relative(self, ply: usize) -> Self {
        self.shift_mate(ply as i32)
    }

    /// Inverse of [`Score::relative`].
    #[inline(always)]
    pub const fn absolute(self, ply: usize) -> Self {
        self.shift_mate(-(ply as i32))
    }

    /// Moves a mate score `plies` closer to mate.
    #[inline(always)]
    const fn shift_mate(self, plies: i32) -> Self {
        match self.0 {
            s if s >= Self::LOWEST_MATE.0 => Self(s + plies),
            s if s <= -Self::LOWEST_MATE.0 => Self(s - plies),
            s => Self(s),
        }
    }

    /// Converts this score into the form sent with `info score`.
    #[inline(always)]
    pub fn into_uci(self) -> UciScore {
        if self.is_mate() {
            UciScore::mate(self.moves_to_mate())
        } else {
            UciScore::cp(self.0)
        }
    }
}

impl From<Score> for UciScore {
    #[inline(always)]
    fn from(value: Score) -> Self {
        value.into_uci()
    }
}

impl Add<i32> for Score {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: i32) -> Self {
        Self(self.0 + rhs)
    }
}

impl Sub<i32> for Score {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: i32) -> Self {
        Self(self.0 - rhs)
    }
}

impl Add for Score {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        self + rhs.0
    }
}

impl Sub for Score {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        self - rhs.0
    }
}

impl AddAssign<i32> for Score {
    #[inline(always)]
    fn add_assign(&mut self, rhs: i32) {
        self.0 += rhs;
    }
}

impl SubAssign<i32> for Score {
    #[inline(always)]
    fn sub_assign(&mut self, rhs: i32) {
        self.0 -= rhs;
    }
}

impl Neg for Score {
    type Output = Self;
    #[inline(always)]
    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl PartialEq<i32> for Score {
    #[inline(always)]
    fn eq(&self, other: &i32) -> bool {
        self.0 == *other
    }
}

impl PartialOrd<i32> for Score {
    #[inline(always)]
    fn partial_cmp(&self, other: &i32) -> Option<std::cmp::Ordering> {
        Some(self.0.cmp(other))
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_mate() {
            write!(f, "#{}", self.moves_to_mate())
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl fmt::Debug for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_mate() {
            write!(f, "{} ({} plies to mate)", self.0, self.plies_to_mate())
        } else {
            write!(f, "{}", self.0)
        }
    }
}
