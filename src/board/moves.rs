/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use super::{File, PieceKind, Position, Rank, Square};
use crate::MoveError;

/// Maximum possible number of moves in a given chess position.
///
/// Found [here](<https://www.chessprogramming.org/Chess_Position#cite_note-4>)
pub const MAX_NUM_MOVES: usize = 218;

/// An alias for an [`arrayvec::ArrayVec`] containing at most [`MAX_NUM_MOVES`] moves.
pub type MoveList = arrayvec::ArrayVec<Move, MAX_NUM_MOVES>;

/// Represents the different kinds of moves that can be made during a chess game.
///
/// Internally, these are represented by bit flags, which allows a compact representation of the [`Move`] struct.
/// The flag values follow the [chess programming wiki](https://www.chessprogramming.org/Encoding_Moves#From-To_Based).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum MoveKind {
    /// A single piece moves to an empty square.
    Quiet = 0 << Move::FLG_BITS,

    /// A Pawn's first move, advancing two squares forward.
    PawnDoublePush = 1 << Move::FLG_BITS,

    /// The King moves two squares towards the H file, and the Rook jumps over it.
    ShortCastle = 2 << Move::FLG_BITS,

    /// The King moves two squares towards the A file, and the Rook jumps over it.
    LongCastle = 3 << Move::FLG_BITS,

    /// A piece moves onto a square occupied by an opponent's piece, removing it from the board.
    Capture = 4 << Move::FLG_BITS,

    /// A Pawn captures an opposing Pawn that just made a double push, by moving onto the square it skipped.
    EnPassantCapture = 5 << Move::FLG_BITS,

    PromoteKnight = 8 << Move::FLG_BITS,
    PromoteBishop = 9 << Move::FLG_BITS,
    PromoteRook = 10 << Move::FLG_BITS,
    PromoteQueen = 11 << Move::FLG_BITS,

    CaptureAndPromoteKnight = 12 << Move::FLG_BITS,
    CaptureAndPromoteBishop = 13 << Move::FLG_BITS,
    CaptureAndPromoteRook = 14 << Move::FLG_BITS,
    CaptureAndPromoteQueen = 15 << Move::FLG_BITS,
}

impl MoveKind {
    /// Non-capturing promotions, most valuable first.
    pub const PROMOTIONS: [Self; 4] = [
        Self::PromoteQueen,
        Self::PromoteRook,
        Self::PromoteBishop,
        Self::PromoteKnight,
    ];

    /// Capturing promotions, most valuable first.
    pub const CAPTURE_PROMOTIONS: [Self; 4] = [
        Self::CaptureAndPromoteQueen,
        Self::CaptureAndPromoteRook,
        Self::CaptureAndPromoteBishop,
        Self::CaptureAndPromoteKnight,
    ];

    /// Decodes the flag bits of a [`Move`].
    ///
    /// Flags `6` and `7` are unused; they decode to [`MoveKind::Quiet`] and are never produced by [`Move::new`].
    #[inline(always)]
    const fn from_flags(flags: u16) -> Self {
        match flags >> Move::FLG_BITS {
            1 => Self::PawnDoublePush,
            2 => Self::ShortCastle,
            3 => Self::LongCastle,
            4 => Self::Capture,
            5 => Self::EnPassantCapture,
            8 => Self::PromoteKnight,
            9 => Self::PromoteBishop,
            10 => Self::PromoteRook,
            11 => Self::PromoteQueen,
            12 => Self::CaptureAndPromoteKnight,
            13 => Self::CaptureAndPromoteBishop,
            14 => Self::CaptureAndPromoteRook,
            15 => Self::CaptureAndPromoteQueen,
            _ => Self::Quiet,
        }
    }
}

impl fmt::Display for MoveKind {
    /// Displays a human-readable description for this [`MoveKind`].
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Quiet => "Quiet",
            Self::PawnDoublePush => "Pawn Double Push",
            Self::EnPassantCapture => "En Passant Capture",
            Self::ShortCastle => "Short Castle",
            Self::LongCastle => "Long Castle",
            Self::Capture => "Capture",
            Self::PromoteQueen => "Promotion (Queen)",
            Self::PromoteKnight => "Promotion (Knight)",
            Self::PromoteRook => "Promotion (Rook)",
            Self::PromoteBishop => "Promotion (Bishop)",
            Self::CaptureAndPromoteQueen => "Capture and Promotion (Queen)",
            Self::CaptureAndPromoteKnight => "Capture and Promotion (Knight)",
            Self::CaptureAndPromoteRook => "Capture and Promotion (Rook)",
            Self::CaptureAndPromoteBishop => "Capture and Promotion (Bishop)",
        };

        write!(f, "{s}")
    }
}

/// Represents a move made on a chess board, including whether a piece is to be promoted.
///
/// Internally encoded using the following bit pattern:
/// ```text
///     0000 000000 000000
///      |     |      |
///      |     |      +- Source square of the move.
///      |     +- Target square of the move.
///      +- Special flags for promotion, castling, etc.
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Move(u16);

impl Move {
    /// Mask for the source ("from") bits.
    const SRC_MASK: u16 = 0b0000_0000_0011_1111;
    /// Mask for the destination ("to") bits.
    const DST_MASK: u16 = 0b0000_1111_1100_0000;
    /// Mask for the flag (promotions, captures, etc.) bits.
    const FLG_MASK: u16 = 0b1111_0000_0000_0000;
    /// Start index of destination bits.
    const DST_BITS: u16 = 6;
    /// Start index of flag bits.
    const FLG_BITS: u16 = 12;

    const FLAG_CAPTURE: u16 = 4 << Self::FLG_BITS;
    const FLAG_PROMOTION: u16 = 8 << Self::FLG_BITS;

    /// Creates a new [`Move`] from the given [`Square`]s and a [`MoveKind`].
    ///
    /// # Example
    /// ```
    /// # use corvid::{Move, Square, MoveKind};
    /// let e2e4 = Move::new(Square::E2, Square::E4, MoveKind::PawnDoublePush);
    /// assert_eq!(e2e4.to_string(), "e2e4");
    ///
    /// let e7e8n = Move::new(Square::E7, Square::E8, MoveKind::PromoteKnight);
    /// assert_eq!(e7e8n.to_string(), "e7e8n");
    /// ```
    #[inline(always)]
    pub const fn new(from: Square, to: Square, kind: MoveKind) -> Self {
        Self(kind as u16 | (to.index() as u16) << Self::DST_BITS | from.index() as u16)
    }

    /// The raw 16-bit encoding of this [`Move`].
    #[inline(always)]
    pub const fn inner(&self) -> u16 {
        self.0
    }

    /// Fetches the source (or "from") part of this [`Move`], as a [`Square`].
    #[inline(always)]
    pub const fn from(&self) -> Square {
        Square::from_index_unchecked((self.0 & Self::SRC_MASK) as usize)
    }

    /// Fetches the destination (or "to") part of this [`Move`], as a [`Square`].
    #[inline(always)]
    pub const fn to(&self) -> Square {
        Square::from_index_unchecked(((self.0 & Self::DST_MASK) >> Self::DST_BITS) as usize)
    }

    /// Fetches the [`MoveKind`] part of this [`Move`].
    #[inline(always)]
    pub const fn kind(&self) -> MoveKind {
        MoveKind::from_flags(self.0 & Self::FLG_MASK)
    }

    /// Returns `true` if this [`Move`] removes an enemy piece (capture, promotion-capture, en passant).
    #[inline(always)]
    pub const fn is_capture(&self) -> bool {
        self.0 & Self::FLAG_CAPTURE != 0
    }

    /// Returns `true` if this [`Move`] captures nothing. Castling and double pushes are quiet.
    #[inline(always)]
    pub const fn is_quiet(&self) -> bool {
        self.0 & Self::FLAG_CAPTURE == 0
    }

    #[inline(always)]
    pub const fn is_promotion(&self) -> bool {
        self.0 & Self::FLAG_PROMOTION != 0
    }

    /// Captures and promotions: the moves searched by quiescence.
    #[inline(always)]
    pub const fn is_tactical(&self) -> bool {
        self.is_capture() || self.is_promotion()
    }

    #[inline(always)]
    pub const fn is_en_passant(&self) -> bool {
        matches!(self.kind(), MoveKind::EnPassantCapture)
    }

    #[inline(always)]
    pub const fn is_castle(&self) -> bool {
        matches!(self.kind(), MoveKind::ShortCastle | MoveKind::LongCastle)
    }

    #[inline(always)]
    pub const fn is_pawn_double_push(&self) -> bool {
        matches!(self.kind(), MoveKind::PawnDoublePush)
    }

    /// If this [`Move`] is a castling move, returns the source and destination [`File`]s of the Rook.
    #[inline(always)]
    pub const fn castling_rook_files(&self) -> Option<(File, File)> {
        match self.kind() {
            MoveKind::ShortCastle => Some((File::H, File::F)),
            MoveKind::LongCastle => Some((File::A, File::D)),
            _ => None,
        }
    }

    /// The piece a pawn becomes, if this [`Move`] is a promotion.
    ///
    /// # Example
    /// ```
    /// # use corvid::{Move, MoveKind, PieceKind, Square};
    /// let b7c8b = Move::new(Square::B7, Square::C8, MoveKind::CaptureAndPromoteBishop);
    /// assert_eq!(b7c8b.promotion(), Some(PieceKind::Bishop));
    /// ```
    #[inline(always)]
    pub const fn promotion(&self) -> Option<PieceKind> {
        match self.kind() {
            MoveKind::PromoteQueen | MoveKind::CaptureAndPromoteQueen => Some(PieceKind::Queen),
            MoveKind::PromoteKnight | MoveKind::CaptureAndPromoteKnight => Some(PieceKind::Knight),
            MoveKind::PromoteRook | MoveKind::CaptureAndPromoteRook => Some(PieceKind::Rook),
            MoveKind::PromoteBishop | MoveKind::CaptureAndPromoteBishop => Some(PieceKind::Bishop),
            _ => None,
        }
    }

    /// Parses a [`Move`] in coordinate notation (`"e2e4"`, `"e7e8q"`, `"e1g1"` for castling),
    /// resolving its [`MoveKind`] from `position`.
    ///
    /// The move must be legal in `position`.
    ///
    /// # Example
    /// ```
    /// # use corvid::*;
    /// let position = Position::from_fen("n1n5/PPPk4/8/8/8/8/4Kppp/5N1N b - - 0 1").unwrap();
    /// let g2h1q = Move::from_uci(&position, "g2h1q").unwrap();
    /// assert_eq!(g2h1q.kind(), MoveKind::CaptureAndPromoteQueen);
    ///
    /// assert!(matches!(Move::from_uci(&position, "g2g1"), Err(MoveError::Illegal(_))));
    /// ```
    pub fn from_uci(position: &Position, uci: &str) -> Result<Self, MoveError> {
        let uci = uci.trim();
        let (Some(from), Some(to), promotion) = (uci.get(0..2), uci.get(2..4), uci.get(4..))
        else {
            return Err(MoveError::Malformed(uci.to_string()));
        };

        let from = Square::from_uci(from)?;
        let to = Square::from_uci(to)?;

        let promotion = match promotion {
            None | Some("") => None,
            Some(p) => {
                let mut chars = p.chars();
                match (chars.next().and_then(PieceKind::from_char), chars.next()) {
                    (Some(kind), None) if kind != PieceKind::Pawn && kind != PieceKind::King => {
                        Some(kind)
                    }
                    _ => return Err(MoveError::Malformed(uci.to_string())),
                }
            }
        };

        let piece = position.piece_at(from).ok_or(MoveError::NoPiece(from))?;
        let color = position.side_to_move();
        if piece.color() != color {
            return Err(MoveError::WrongColor {
                square: from,
                color,
            });
        }

        let mv = position
            .pseudo_legal_moves()
            .into_iter()
            .find(|mv| mv.from() == from && mv.to() == to && mv.promotion() == promotion)
            .ok_or_else(|| MoveError::Illegal(uci.to_string()))?;

        if !position.is_legal(mv) {
            return Err(MoveError::LeavesKingInCheck(uci.to_string()));
        }

        Ok(mv)
    }

    /// Formats this [`Move`] in standard algebraic notation (`"Nbd7"`, `"exd6"`, `"e8=Q+"`, `"O-O-O#"`).
    ///
    /// `position` is the position *before* the move is played, and the move must be legal in it.
    ///
    /// # Example
    /// ```
    /// # use corvid::*;
    /// let position = Position::from_fen("6k1/5ppp/8/8/8/8/5PPP/3R2K1 w - - 0 1").unwrap();
    /// let d1d8 = Move::from_uci(&position, "d1d8").unwrap();
    /// assert_eq!(d1d8.to_san(&position), "Rd8#");
    /// ```
    pub fn to_san(&self, position: &Position) -> String {
        let Some(piece) = position.piece_at(self.from()) else {
            return self.to_string();
        };

        let mut san = match self.kind() {
            MoveKind::ShortCastle => String::from("O-O"),
            MoveKind::LongCastle => String::from("O-O-O"),
            _ => self.san_body(position, piece.kind()),
        };

        let mut after = position.clone();
        after.make_move(*self);
        if after.in_check() {
            san.push(if after.legal_moves().is_empty() { '#' } else { '+' });
        }

        san
    }

    /// Piece letter, disambiguation, capture marker, destination and promotion.
    fn san_body(&self, position: &Position, kind: PieceKind) -> String {
        let (from, to) = (self.from(), self.to());
        let mut san = String::with_capacity(8);

        if kind == PieceKind::Pawn {
            if self.is_capture() {
                san.push(from.file().char());
            }
        } else {
            san.push(kind.char().to_ascii_uppercase());

            let rivals = position
                .legal_moves()
                .into_iter()
                .filter(|mv| mv.to() == to && mv.from() != from)
                .filter(|mv| position.piece_at(mv.from()).is_some_and(|p| p.kind() == kind))
                .map(|mv| mv.from())
                .collect::<Vec<_>>();

            if !rivals.is_empty() {
                let shares_file = rivals.iter().any(|sq| sq.file() == from.file());
                let shares_rank = rivals.iter().any(|sq| sq.rank() == from.rank());

                // The file is preferred whenever it alone tells the pieces apart
                if !shares_file {
                    san.push(from.file().char());
                } else if !shares_rank {
                    san.push(from.rank().char());
                } else {
                    san.push(from.file().char());
                    san.push(from.rank().char());
                }
            }
        }

        if self.is_capture() {
            san.push('x');
        }
        san.push_str(&to.to_string());

        if let Some(promote) = self.promotion() {
            san.push('=');
            san.push(promote.char().to_ascii_uppercase());
        }

        san
    }

    /// Parses a [`Move`] in standard algebraic notation, resolving it against the legal moves of `position`.
    ///
    /// Parsing is lenient: check and annotation suffixes are ignored, `0-0` is accepted for castling,
    /// over-specified origins (`"Ng1f3"`) and hyphenated long notation (`"Ng1-f3"`) are understood, and the `=`
    /// before a promotion piece may be left out. A pawn reaching the last rank with no promotion piece promotes
    /// to a Queen.
    ///
    /// # Example
    /// ```
    /// # use corvid::*;
    /// let position = Position::default();
    /// assert_eq!(Move::from_san(&position, "Nf3").unwrap().to_string(), "g1f3");
    /// assert!(matches!(Move::from_san(&position, "Ke2"), Err(MoveError::Illegal(_))));
    /// ```
    pub fn from_san(position: &Position, san: &str) -> Result<Self, MoveError> {
        let malformed = || MoveError::MalformedSan(san.to_string());
        let notation = san.trim().trim_end_matches(['+', '#', '!', '?']);
        let legal = position.legal_moves();

        let castle = match notation {
            "O-O" | "0-0" => Some(MoveKind::ShortCastle),
            "O-O-O" | "0-0-0" => Some(MoveKind::LongCastle),
            _ => None,
        };
        if let Some(kind) = castle {
            return legal
                .into_iter()
                .find(|mv| mv.kind() == kind)
                .ok_or_else(|| MoveError::Illegal(san.to_string()));
        }

        let mut chars = notation.chars().filter(|&c| c != '-').collect::<Vec<_>>();

        // A trailing letter can only be a promotion piece, since squares end in a digit
        let mut promotion = None;
        if let Some(&last) = chars.last() {
            if last.is_ascii_alphabetic() {
                match PieceKind::from_char(last) {
                    Some(kind) if !matches!(kind, PieceKind::Pawn | PieceKind::King) => {
                        promotion = Some(kind)
                    }
                    _ => return Err(malformed()),
                }
                chars.pop();
                if chars.last() == Some(&'=') {
                    chars.pop();
                }
            }
        }

        let kind = match chars.first() {
            Some(&c) if c.is_ascii_uppercase() => {
                chars.remove(0);
                PieceKind::from_char(c).ok_or_else(malformed)?
            }
            _ => PieceKind::Pawn,
        };

        let is_capture = chars.contains(&'x');
        chars.retain(|&c| c != 'x');

        if chars.len() < 2 {
            return Err(malformed());
        }
        let target = chars.split_off(chars.len() - 2).into_iter().collect::<String>();
        let to = Square::from_uci(&target)?;

        // Whatever is left pins down the origin
        let mut from_file = None;
        let mut from_rank = None;
        for c in chars {
            if let Ok(file) = File::from_char(c) {
                from_file = Some(file);
            } else if let Ok(rank) = Rank::from_char(c) {
                from_rank = Some(rank);
            } else {
                return Err(malformed());
            }
        }

        let last_rank = Rank::first(!position.side_to_move());
        if kind == PieceKind::Pawn && promotion.is_none() && to.rank() == last_rank {
            promotion = Some(PieceKind::Queen);
        }

        let mut candidates = legal.into_iter().filter(|mv| {
            mv.to() == to
                && mv.promotion() == promotion
                && (!is_capture || mv.is_capture())
                && from_file.is_none_or(|file| mv.from().file() == file)
                && from_rank.is_none_or(|rank| mv.from().rank() == rank)
                && position.piece_at(mv.from()).is_some_and(|p| p.kind() == kind)
        });

        match (candidates.next(), candidates.next()) {
            (Some(mv), None) => Ok(mv),
            (None, _) => Err(MoveError::Illegal(san.to_string())),
            (Some(_), Some(_)) => Err(MoveError::Ambiguous(san.to_string())),
        }
    }
}

impl fmt::Display for Move {
    /// Coordinate notation, as used by UCI.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(promote) = self.promotion() {
            write!(f, "{}{}{}", self.from(), self.to(), promote.char())
        } else {
            write!(f, "{}{}", self.from(), self.to())
        }
    }
}

impl fmt::Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self} ({})", self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Position;

    #[test]
    fn test_move_encoding() {
        let mv = Move::new(Square::G7, Square::H8, MoveKind::CaptureAndPromoteRook);
        assert_eq!(mv.from(), Square::G7);
        assert_eq!(mv.to(), Square::H8);
        assert_eq!(mv.kind(), MoveKind::CaptureAndPromoteRook);
        assert!(mv.is_capture());
        assert!(mv.is_promotion());
        assert_eq!(mv.promotion(), Some(PieceKind::Rook));
        assert_eq!(mv.to_string(), "g7h8r");
    }

    #[test]
    fn test_every_kind_decodes() {
        let kinds = [
            MoveKind::Quiet,
            MoveKind::PawnDoublePush,
            MoveKind::ShortCastle,
            MoveKind::LongCastle,
            MoveKind::Capture,
            MoveKind::EnPassantCapture,
        ]
        .into_iter()
        .chain(MoveKind::PROMOTIONS)
        .chain(MoveKind::CAPTURE_PROMOTIONS);

        for kind in kinds {
            assert_eq!(Move::new(Square::A2, Square::B3, kind).kind(), kind);
        }
    }

    #[test]
    fn test_quiet_flags() {
        let castle = Move::new(Square::E1, Square::G1, MoveKind::ShortCastle);
        assert!(castle.is_quiet());
        assert!(castle.is_castle());
        assert!(!castle.is_tactical());

        let ep = Move::new(Square::E5, Square::D6, MoveKind::EnPassantCapture);
        assert!(ep.is_capture());
        assert!(ep.is_en_passant());
    }

    #[test]
    fn test_from_uci() {
        let kiwipete = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        let position = Position::from_fen(kiwipete).unwrap();

        let castle = Move::from_uci(&position, "e1g1").unwrap();
        assert_eq!(castle.kind(), MoveKind::ShortCastle);

        let long = Move::from_uci(&position, "e1c1").unwrap();
        assert_eq!(long.kind(), MoveKind::LongCastle);

        let push = Move::from_uci(&position, "a2a4").unwrap();
        assert_eq!(push.kind(), MoveKind::PawnDoublePush);

        let capture = Move::from_uci(&position, "e2a6").unwrap();
        assert_eq!(capture.kind(), MoveKind::Capture);

        assert!(matches!(
            Move::from_uci(&position, "e4"),
            Err(MoveError::Malformed(_))
        ));
        assert!(matches!(
            Move::from_uci(&position, "e3e4"),
            Err(MoveError::NoPiece(Square::E3))
        ));
        assert!(matches!(
            Move::from_uci(&position, "a8b8"),
            Err(MoveError::WrongColor { .. })
        ));
        assert!(matches!(
            Move::from_uci(&position, "a2a5"),
            Err(MoveError::Illegal(_))
        ));
        assert!(matches!(
            Move::from_uci(&position, "i2a5"),
            Err(MoveError::Square(_))
        ));
    }

    #[test]
    fn test_from_uci_rejects_self_check() {
        // The d2 knight is pinned by the queen on b4
        let position = Position::from_fen("4k3/8/8/8/1q6/8/3N4/4K3 w - - 0 1").unwrap();
        assert!(matches!(
            Move::from_uci(&position, "d2f3"),
            Err(MoveError::LeavesKingInCheck(_))
        ));
    }

    fn san(fen: &str, uci: &str) -> String {
        let position = Position::from_fen(fen).unwrap();
        Move::from_uci(&position, uci).unwrap().to_san(&position)
    }

    #[test]
    fn test_to_san() {
        let kiwipete = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        assert_eq!(san(kiwipete, "e1g1"), "O-O");
        assert_eq!(san(kiwipete, "e1c1"), "O-O-O");
        assert_eq!(san(kiwipete, "e2a6"), "Bxa6");
        assert_eq!(san(kiwipete, "d5e6"), "dxe6");
        assert_eq!(san(kiwipete, "a2a4"), "a4");

        // Disambiguation by file, by rank, and by both
        assert_eq!(san("4k3/8/8/8/8/8/4K3/R6R w - - 0 1", "a1d1"), "Rad1");
        assert_eq!(san("4k3/8/8/R7/8/8/4K3/R7 w - - 0 1", "a1a3"), "R1a3");
        assert_eq!(san("4k3/8/8/8/8/Q7/8/Q1Q1K3 w - - 0 1", "a1b2"), "Qa1b2");
        assert_eq!(san("4k3/8/8/8/8/Q7/8/Q1Q1K3 w - - 0 1", "c1b2"), "Qcb2");

        assert_eq!(san("4k3/P7/8/8/8/8/8/4K3 w - - 0 1", "a7a8q"), "a8=Q+");
        assert_eq!(san("6k1/5ppp/8/8/8/8/5PPP/3R2K1 w - - 0 1", "d1d8"), "Rd8#");
    }

    #[test]
    fn test_from_san() {
        let kiwipete = Position::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        let parse = |san: &str| Move::from_san(&kiwipete, san).map(|mv| mv.to_string());

        assert_eq!(parse("O-O").unwrap(), "e1g1");
        assert_eq!(parse("0-0-0").unwrap(), "e1c1");
        assert_eq!(parse("Bxa6").unwrap(), "e2a6");
        assert_eq!(parse("dxe6").unwrap(), "d5e6");
        assert_eq!(parse("Nxf7+!?").unwrap(), "e5f7");
        assert_eq!(parse("Ne5-d3").unwrap(), "e5d3");
        assert!(matches!(parse("Bxb5"), Err(MoveError::Illegal(_))));
        assert!(matches!(parse("Zz"), Err(MoveError::MalformedSan(_))));
        assert!(matches!(parse("Qe9"), Err(MoveError::Square(_))));

        let rooks = Position::from_fen("4k3/8/8/8/8/8/4K3/R6R w - - 0 1").unwrap();
        assert!(matches!(Move::from_san(&rooks, "Rd1"), Err(MoveError::Ambiguous(_))));
        assert_eq!(Move::from_san(&rooks, "Rhd1").unwrap().to_string(), "h1d1");

        let promote = Position::from_fen("4k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert_eq!(Move::from_san(&promote, "a8").unwrap().to_string(), "a7a8q");
        assert_eq!(Move::from_san(&promote, "a8=N").unwrap().to_string(), "a7a8n");
        assert_eq!(Move::from_san(&promote, "a8R").unwrap().to_string(), "a7a8r");
    }

    #[test]
    fn test_san_resolves_every_legal_move() {
        let position = Position::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();

        for mv in position.legal_moves() {
            let san = mv.to_san(&position);
            assert_eq!(Move::from_san(&position, &san), Ok(mv), "{san}");
        }
    }
}
