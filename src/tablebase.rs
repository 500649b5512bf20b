/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Endgame tablebase hook.
//!
//! The engine does not read any tablebase format itself. Anything that can answer "who wins here,
//! and with which move" for small positions can be plugged in through [`Tablebase`].

use crate::{Move, Position, Score};

/// Score of a tablebase win at the root. Kept well below mate scores so the two never mix.
const TB_WIN: i32 = 20_000;

/// Game-theoretic result for the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wdl {
    Win,
    Draw,
    Loss,
}

impl Wdl {
    /// The same result, seen by the opponent.
    #[inline(always)]
    pub const fn negate(self) -> Self {
        match self {
            Self::Win => Self::Loss,
            Self::Draw => Self::Draw,
            Self::Loss => Self::Win,
        }
    }

    /// Search score of this result at `ply` plies from the root.
    ///
    /// Wins found closer to the root score higher, losses found further away score higher.
    #[inline(always)]
    pub const fn score(self, ply: usize) -> Score {
        match self {
            Self::Win => Score(TB_WIN - ply as i32),
            Self::Draw => Score::DRAW,
            Self::Loss => Score(ply as i32 - TB_WIN),
        }
    }
}

/// The answer of a tablebase for one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TablebaseEntry {
    /// A move that preserves `result`, if the position is not terminal.
    pub bestmove: Option<Move>,

    /// Result for the side to move.
    pub result: Wdl,
}

/// A source of perfect endgame knowledge.
///
/// Probes are made from the search thread, so implementations must be shareable across threads.
pub trait Tablebase: Send + Sync {
    /// Looks up `position`, returning `None` if it is not covered.
    fn probe(&self, position: &Position) -> Option<TablebaseEntry>;

    /// Largest number of pieces, Kings included, that this tablebase covers.
    fn max_pieces(&self) -> u8;

    /// Returns `true` if `position` has few enough pieces to be worth probing.
    #[inline(always)]
    fn can_probe(&self, position: &Position) -> bool {
        position.occupied().population() <= self.max_pieces()
    }
}

/// A tablebase that knows nothing. This is what the engine ships with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoTablebase;

impl Tablebase for NoTablebase {
    #[inline(always)]
    fn probe(&self, _position: &Position) -> Option<TablebaseEntry> {
        None
    }

    #[inline(always)]
    fn max_pieces(&self) -> u8 {
        0
    }
}
