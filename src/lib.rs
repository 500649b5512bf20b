/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// Board representation, attack tables, and move generation.
mod board;

/// Command-line and stdin command definitions.
mod cli;

/// Code related to the engine's functionality, such as user input handling.
mod engine;

/// Typed errors for parsing and board consistency.
mod error;

/// Evaluation of chess positions.
mod eval;

/// Killer moves, history scores, and static exchange evaluation.
mod ordering;

/// Score type and mate encoding.
mod score;

/// Main engine logic; all search related code.
mod search;

/// Endgame tablebase hook.
mod tablebase;

/// Transposition table.
mod ttable;

pub use board::*;
pub use cli::*;
pub use engine::*;
pub use error::*;
pub use eval::*;
pub use ordering::*;
pub use score::*;
pub use search::*;
pub use tablebase::*;
pub use ttable::*;
