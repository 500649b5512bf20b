/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use crate::{Move, Score, SearchBounds, ZobristKey};

/// Number of bytes in a megabyte
const BYTES_IN_MB: usize = 1024 * 1024;

/// How the score of an entry relates to the true score of its position.
///
/// See [CPW](https://www.chessprogramming.org/Node_Types) for more.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum Bound {
    /// The score is exact.
    Exact,

    /// The score is at least this much; the node failed high.
    Lower,

    /// The score is at most this much; no move raised alpha.
    Upper,
}

impl Bound {
    /// Classifies `score` against the window it was searched with:
    ///
    /// ```text
    /// if score <= alpha:
    ///     UPPER
    /// else if score >= beta:
    ///     LOWER
    /// else:
    ///     EXACT
    /// ```
    #[inline(always)]
    pub fn new(score: Score, bounds: SearchBounds) -> Self {
        if score <= bounds.alpha {
            Self::Upper
        } else if score >= bounds.beta {
            Self::Lower
        } else {
            Self::Exact
        }
    }
}

/// An entry into a hash table
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct TTableEntry {
    /// Key of the node this entry represents.
    pub key: ZobristKey,

    /// Depth at which the data for this entry was found.
    pub depth: u8,

    /// Best move found for this position, if any move raised alpha.
    pub bestmove: Option<Move>,

    /// Best score found for this position, with mates counted from this node.
    pub score: Score,

    /// Bound kind of `score`.
    pub bound: Bound,
}

impl TTableEntry {
    /// Creates a new [`TTableEntry`] from the provided parameters.
    ///
    /// The bound is computed with [`Bound::new`] and a mate `score` found `ply` plies from the root
    /// is stored relative to this node, so it stays valid wherever the position reappears.
    #[inline(always)]
    pub fn new(
        key: ZobristKey,
        bestmove: Option<Move>,
        score: Score,
        bounds: SearchBounds,
        depth: u8,
        ply: usize,
    ) -> Self {
        let bound = Bound::new(score, bounds);
        let score = score.relative(ply);

        Self {
            key,
            bestmove,
            score,
            depth,
            bound,
        }
    }

    /// Returns this entry's score, relative to the root at `ply`.
    #[inline(always)]
    pub fn score_at(&self, ply: usize) -> Score {
        self.score.absolute(ply)
    }

    /// Determine whether the score in this entry can be used and, if so, return it.
    ///
    /// An entry's score can be used if and only if:
    ///     1. The entry is [`Bound::Exact`].
    ///     2. The entry is a [`Bound::Upper`] and its score is `<= alpha`.
    ///     3. The entry is a [`Bound::Lower`] and its score is `>= beta`.
    #[inline(always)]
    pub fn try_score(&self, bounds: SearchBounds, ply: usize) -> Option<Score> {
        let score = self.score_at(ply);

        match self.bound {
            Bound::Exact => Some(score),
            Bound::Upper if score <= bounds.alpha => Some(score),
            Bound::Lower if score >= bounds.beta => Some(score),
            _ => None,
        }
    }
}

/// Transposition Table.
///
/// Used during a search to keep track of previous search results on positions,
/// avoiding unnecessary re-computations. Every write replaces whatever was in its slot.
#[derive(Debug)]
pub struct TTable {
    /// Internal cache of the TTable.
    cache: Vec<Option<TTableEntry>>,

    /// Number of collisions that have occurred since last clearing.
    pub(crate) collisions: usize,

    /// Number of accesses that have occurred since last clearing.
    pub(crate) accesses: usize,

    /// Number of hits that have occurred since last clearing.
    pub(crate) hits: usize,
}

impl TTable {
    /// Default size of the Transposition Table, in megabytes.
    pub const DEFAULT_SIZE: usize = 16;

    /// Minimum size of the Transposition Table, in megabytes.
    pub const MIN_SIZE: usize = 1;

    /// Maximum size of the Transposition Table, in megabytes.
    pub const MAX_SIZE: usize = 1_024;

    /// Create a new [`TTable`] that is at most `size` megabytes.
    ///
    /// The number of entries is rounded down to a power of two so keys can be masked into indices.
    #[inline(always)]
    pub fn new(size: usize) -> Self {
        let size = size.clamp(Self::MIN_SIZE, Self::MAX_SIZE);
        Self::from_capacity((size * BYTES_IN_MB) / size_of::<Option<TTableEntry>>())
    }

    /// Create a new [`TTable`] that can hold `capacity` entries, rounded down to a power of two.
    #[inline(always)]
    pub fn from_capacity(capacity: usize) -> Self {
        let capacity = match capacity {
            0 => 1,
            n if n.is_power_of_two() => n,
            n => n.next_power_of_two() >> 1,
        };

        Self {
            cache: vec![None; capacity],
            collisions: 0,
            accesses: 0,
            hits: 0,
        }
    }

    /// Clears the entries of this [`TTable`].
    #[inline(always)]
    pub fn clear(&mut self) {
        self.cache.iter_mut().for_each(|entry| *entry = None);
        self.collisions = 0;
        self.accesses = 0;
        self.hits = 0;
    }

    /// Replaces this table with an empty one of `size` megabytes.
    #[inline(always)]
    pub fn resize(&mut self, size: usize) {
        *self = Self::new(size);
    }

    /// Returns the number of entries that can fit within this [`TTable`]
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.cache.len()
    }

    /// Returns the size of this [`TTable`], in megabytes.
    #[inline(always)]
    pub fn size(&self) -> usize {
        self.cache.len() * size_of::<Option<TTableEntry>>() / BYTES_IN_MB
    }

    /// Returns the number of `Some` entries in this [`TTable`].
    #[inline(always)]
    pub fn num_entries(&self) -> usize {
        self.cache.iter().filter(|entry| entry.is_some()).count()
    }

    /// Map `key` to an index into this [`TTable`].
    #[inline(always)]
    fn index(&self, key: ZobristKey) -> usize {
        key.inner() as usize & (self.capacity() - 1)
    }

    /// Get the entry if and only if it matches the provided key
    #[inline(always)]
    pub fn get(&self, key: ZobristKey) -> Option<&TTableEntry> {
        self.cache[self.index(key)]
            .as_ref()
            .filter(|entry| entry.key == key)
    }

    /// Looks up `key` for use at a node of `depth` remaining plies, `ply` plies from the root.
    ///
    /// Returns the stored move, the score relative to the root, and the bound. The score may only be
    /// used to cut off when the entry was searched at least as deep as `depth` and its bound allows it
    /// within `bounds`; otherwise the stored move is still returned for ordering, with no score.
    #[inline(always)]
    pub fn probe(
        &mut self,
        key: ZobristKey,
        depth: u8,
        ply: usize,
        bounds: SearchBounds,
    ) -> Option<(Option<Move>, Option<Score>, Bound)> {
        self.accesses += 1;
        let entry = *self.get(key)?;
        self.hits += 1;

        let score = if entry.depth >= depth {
            entry.try_score(bounds, ply)
        } else {
            None
        };

        Some((entry.bestmove, score, entry.bound))
    }

    /// Store `entry` in the table at `entry.key`, overriding and returning whatever was there.
    #[inline(always)]
    pub fn store(&mut self, entry: TTableEntry) -> Option<TTableEntry> {
        let index = self.index(entry.key);
        let old = self.cache[index].replace(entry);

        if old.is_some_and(|old| old.key != entry.key) {
            self.collisions += 1;
        }

        old
    }

    /// Builds an entry from the search data of a node and stores it. Last write wins.
    #[inline(always)]
    pub fn record(
        &mut self,
        key: ZobristKey,
        bestmove: Option<Move>,
        score: Score,
        bounds: SearchBounds,
        depth: u8,
        ply: usize,
    ) {
        self.store(TTableEntry::new(key, bestmove, score, bounds, depth, ply));
    }

    /// Per-mille of slots in use, as reported by UCI `hashfull`.
    #[inline(always)]
    pub fn hashfull(&self) -> usize {
        // Sampling the first thousand slots is the usual approximation
        let sample = self.capacity().min(1_000);
        let used = self.cache[..sample].iter().filter(|e| e.is_some()).count();
        used * 1_000 / sample
    }
}

impl Default for TTable {
    #[inline(always)]
    fn default() -> Self {
        Self::new(Self::DEFAULT_SIZE)
    }
}

impl fmt::Display for TTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hit_rate = if self.accesses == 0 {
            0.0
        } else {
            self.hits as f32 / self.accesses as f32 * 100.0
        };

        writeln!(f, "TT size: {}mb ({} entries)", self.size(), self.capacity())?;
        writeln!(f, "TT entries in use: {}", self.num_entries())?;
        writeln!(f, "TT hashfull: {}/1000", self.hashfull())?;
        write!(
            f,
            "TT stats: {} hits / {} accesses ({hit_rate:.2}% hit rate), {} collisions",
            self.hits, self.accesses, self.collisions
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::*;

    fn window(alpha: i32, beta: i32) -> SearchBounds {
        SearchBounds::new(Score(alpha), Score(beta))
    }

    #[test]
    fn test_replacement_is_last_write_wins() {
        // Two positions whose keys share the low bit, so a 2-slot table maps both to the same index
        let pos1 = Position::default();
        let mut pos2 = Position::from_fen(FEN_KIWIPETE).unwrap();
        while pos1.key().inner() % 2 != pos2.key().inner() % 2 {
            let mv = pos2.legal_moves()[0];
            pos2.make_move(mv);
        }

        let key1 = pos1.key();
        let key2 = pos2.key();
        let bounds = window(-100, 100);

        let mut tt = TTable::from_capacity(2);
        assert_eq!(tt.num_entries(), 0, "TTable should initialize to being empty");

        tt.record(key1, None, Score::DRAW, bounds, 3, 0);
        assert_eq!(tt.num_entries(), 1);
        assert_eq!(tt.get(key1).map(|e| e.score), Some(Score::DRAW));

        tt.record(key2, None, Score(50), bounds, 1, 0);
        assert_eq!(tt.num_entries(), 1, "A colliding entry replaces the old one");
        assert!(tt.get(key1).is_none(), "Cannot get an entry that has been overridden");
        assert_eq!(tt.get(key2).map(|e| e.score), Some(Score(50)));
        assert_eq!(tt.collisions, 1);
    }

    #[test]
    fn test_bound_classification() {
        let bounds = window(-50, 50);
        assert_eq!(Bound::new(Score(-50), bounds), Bound::Upper);
        assert_eq!(Bound::new(Score(0), bounds), Bound::Exact);
        assert_eq!(Bound::new(Score(50), bounds), Bound::Lower);
    }

    #[test]
    fn test_probe_respects_depth_and_bounds() {
        let key = Position::default().key();
        let mut tt = TTable::from_capacity(16);

        // A fail-high of 80 at depth 4
        tt.record(key, None, Score(80), window(-20, 20), 4, 0);

        // Too shallow to cut off, but the entry is still a hit
        let (_, score, bound) = tt.probe(key, 5, 0, window(-20, 20)).unwrap();
        assert_eq!(score, None);
        assert_eq!(bound, Bound::Lower);

        // Deep enough, and 80 >= beta
        let (_, score, _) = tt.probe(key, 4, 0, window(-20, 20)).unwrap();
        assert_eq!(score, Some(Score(80)));

        // A lower bound of 80 says nothing against beta = 100
        let (_, score, _) = tt.probe(key, 4, 0, window(90, 100)).unwrap();
        assert_eq!(score, None);

        assert_eq!(tt.hits, 3);
        assert_eq!(tt.accesses, 3);
    }

    #[test]
    fn test_mate_scores_are_stored_relative_to_node() {
        let key = Position::default().key();
        let mut tt = TTable::from_capacity(16);

        // Mate found 3 plies below a node at ply 2: the root sees MATE - 5
        let at_root = Score::MATE - 5;
        tt.record(key, None, at_root, window(-10, 10), 3, 2);

        let entry = *tt.get(key).unwrap();
        assert_eq!(entry.score, Score::MATE - 3);

        // Reached again at ply 4, the mate is 3 + 4 = 7 plies from the root
        assert_eq!(entry.score_at(4), Score::MATE - 7);
    }

    #[test]
    fn test_capacity_is_power_of_two() {
        assert_eq!(TTable::from_capacity(0).capacity(), 1);
        assert_eq!(TTable::from_capacity(1000).capacity(), 512);
        assert_eq!(TTable::from_capacity(1024).capacity(), 1024);
        assert!(TTable::new(1).capacity().is_power_of_two());
    }

    #[test]
    fn test_clear_and_resize() {
        let key = Position::default().key();
        let mut tt = TTable::new(1);
        tt.record(key, None, Score::DRAW, window(-1, 1), 1, 0);
        assert_eq!(tt.num_entries(), 1);

        tt.clear();
        assert_eq!(tt.num_entries(), 0);
        assert_eq!(tt.hits, 0);

        let small = tt.capacity();
        tt.resize(2);
        assert!(tt.size() <= 2);
        assert_eq!(tt.capacity(), small * 2);
    }
}
