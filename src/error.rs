/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Typed errors surfaced by the board and search layers.
//!
//! Parsing and legality problems are returned to the caller so that the protocol layer can report them.
//! [`BoardError`] marks a position whose internal state no longer agrees with itself; a search that hits it
//! stops and hands the error back instead of playing on.

use thiserror::Error;

use crate::{Color, Square};

/// Errors that occur when parsing a square, file, or rank.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SquareError {
    #[error("invalid file {0:?}: expected a letter between 'a' and 'h'")]
    InvalidFile(char),

    #[error("invalid rank {0:?}: expected a digit between '1' and '8'")]
    InvalidRank(char),

    #[error("invalid square {0:?}: expected a file followed by a rank, such as \"e4\"")]
    InvalidLength(String),
}

/// Errors that occur when parsing a FEN string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FenError {
    #[error("FEN must have between 4 and 6 fields, found {0}")]
    FieldCount(usize),

    #[error("piece placement must describe 8 ranks, found {0}")]
    RankCount(usize),

    #[error("rank {rank} of the piece placement describes {files} files instead of 8")]
    RankLength { rank: usize, files: usize },

    #[error("invalid piece character {0:?} in piece placement")]
    InvalidPiece(char),

    #[error("side to move must be 'w' or 'b', found {0:?}")]
    SideToMove(String),

    #[error("invalid castling character {0:?}")]
    Castling(char),

    #[error("invalid en passant square {0:?}")]
    EnPassant(String),

    #[error("invalid {field} {value:?}: expected a non-negative integer")]
    Clock { field: &'static str, value: String },

    #[error("{color} must have exactly one king, found {count}")]
    KingCount { color: Color, count: u8 },
}

/// Errors that occur when parsing or validating a move against a position.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoveError {
    #[error("malformed move {0:?}: expected coordinate notation such as \"e2e4\" or \"e7e8q\"")]
    Malformed(String),

    #[error(transparent)]
    Square(#[from] SquareError),

    #[error("no piece on {0}")]
    NoPiece(Square),

    #[error("the piece on {square} does not belong to {color}")]
    WrongColor { square: Square, color: Color },

    #[error("{0} is not a legal move in this position")]
    Illegal(String),

    #[error("{0} would leave the king in check")]
    LeavesKingInCheck(String),

    #[error("malformed move {0:?}: expected algebraic notation such as \"Nf3\", \"exd5\" or \"O-O\"")]
    MalformedSan(String),

    #[error("{0} matches more than one legal move")]
    Ambiguous(String),
}

/// An internal consistency failure of a position.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("corrupt board: {0}")]
    Corrupt(String),
}
