/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use super::{Move, Position};

/// Perform a perft at the specified depth, collecting only data about the number of possible positions (nodes).
///
/// This performs bulk counting, meaning that, at depth 1, it returns the number of available moves,
/// rather than making them, recursing again, and returning 1 for each terminal case.
/// If you do *not* want to use bulk counting, use [`perft_generic`].
///
/// # Example
/// ```
/// # use corvid::*;
/// let mut pos = Position::default();
/// assert_eq!(perft(&mut pos, 3), 8_902);
/// ```
#[inline(always)]
pub fn perft(position: &mut Position, depth: usize) -> u64 {
    perft_generic::<true>(position, depth)
}

/// Perform a splitperft at the specified depth, returning the number of nodes reachable after each root move.
///
/// The moves are in generation order.
pub fn splitperft(position: &mut Position, depth: usize) -> Vec<(Move, u64)> {
    if depth == 0 {
        return Vec::new();
    }

    position
        .legal_moves()
        .into_iter()
        .map(|mv| {
            position.make_move(mv);
            let nodes = perft_generic::<true>(position, depth - 1);
            position.undo_move();
            (mv, nodes)
        })
        .collect()
}

/// Generic version of `perft` that allows you to specify whether to perform bulk counting.
///
/// The position is walked with make/undo and is unchanged when this returns.
pub fn perft_generic<const BULK: bool>(position: &mut Position, depth: usize) -> u64 {
    // Recursion limit; return 1, since we're fathoming this node.
    if depth == 0 {
        return 1;
    }

    let moves = position.legal_moves();

    // Bulk counting; no need to recurse again just to apply a singular move and return 1.
    if BULK && depth == 1 {
        return moves.len() as u64;
    }

    moves.into_iter().fold(0, |nodes, mv| {
        position.make_move(mv);
        let new_nodes = perft_generic::<BULK>(position, depth - 1);
        position.undo_move();
        nodes + new_nodes
    })
}
