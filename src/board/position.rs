/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{fmt, str::FromStr};

use super::{
    bishop_attacks, generate_all, hash_from_scratch, king_attacks, knight_attacks, pawn_attacks,
    rook_attacks, Bitboard, Color, File, Move, MoveList, Piece, PieceKind, Rank, Square,
    ZobristKey,
};
use crate::{BoardError, FenError};

/// FEN string for the starting position of chess.
pub const FEN_STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// A popular FEN string for debugging move generation.
pub const FEN_KIWIPETE: &str =
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

/// The four castling flags, packed into the low bits of a `u8`.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CastlingRights(u8);

impl CastlingRights {
    /// Number of possible combinations of castling rights.
    pub const COUNT: usize = 16;

    pub const NONE: Self = Self(0);
    pub const WHITE_SHORT: Self = Self(0b0001);
    pub const WHITE_LONG: Self = Self(0b0010);
    pub const BLACK_SHORT: Self = Self(0b0100);
    pub const BLACK_LONG: Self = Self(0b1000);

    /// The short-castling flag of `color`.
    #[inline(always)]
    pub const fn short(color: Color) -> Self {
        [Self::WHITE_SHORT, Self::BLACK_SHORT][color.index()]
    }

    /// The long-castling flag of `color`.
    #[inline(always)]
    pub const fn long(color: Color) -> Self {
        [Self::WHITE_LONG, Self::BLACK_LONG][color.index()]
    }

    #[inline(always)]
    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    #[inline(always)]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[inline(always)]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    #[inline(always)]
    pub(crate) const fn index(&self) -> usize {
        self.0 as usize
    }

    /// The rights lost when a piece leaves or lands on `square`.
    #[inline(always)]
    const fn revoked_by(square: Square) -> Self {
        match square.index() {
            0 => Self::WHITE_LONG,                          // a1
            4 => Self(Self::WHITE_SHORT.0 | Self::WHITE_LONG.0), // e1
            7 => Self::WHITE_SHORT,                         // h1
            56 => Self::BLACK_LONG,                         // a8
            60 => Self(Self::BLACK_SHORT.0 | Self::BLACK_LONG.0), // e8
            63 => Self::BLACK_SHORT,                        // h8
            _ => Self::NONE,
        }
    }
}

impl fmt::Display for CastlingRights {
    /// Formats the rights as in a FEN string: `KQkq`, or `-` for none.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "-");
        }

        for (flag, c) in [
            (Self::WHITE_SHORT, 'K'),
            (Self::WHITE_LONG, 'Q'),
            (Self::BLACK_SHORT, 'k'),
            (Self::BLACK_LONG, 'q'),
        ] {
            if self.contains(flag) {
                write!(f, "{c}")?;
            }
        }

        Ok(())
    }
}

impl fmt::Debug for CastlingRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CastlingRights({self})")
    }
}

/// How a game ended.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    /// The side to move has been mated; the payload is the winner.
    Checkmate(Color),
    Stalemate,
    FiftyMoves,
    InsufficientMaterial,
    /// The same position has occurred three times.
    Repetition,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checkmate(winner) => write!(f, "checkmate, {winner} wins"),
            Self::Stalemate => write!(f, "draw by stalemate"),
            Self::FiftyMoves => write!(f, "draw by the fifty-move rule"),
            Self::InsufficientMaterial => write!(f, "draw by insufficient material"),
            Self::Repetition => write!(f, "draw by threefold repetition"),
        }
    }
}

/// Everything needed to take back one move.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Undo {
    /// `None` for a null move.
    mv: Option<Move>,
    /// The captured piece and the square it stood on.
    captured: Option<(Piece, Square)>,
    castling_rights: CastlingRights,
    ep_square: Option<Square>,
    halfmove: u16,
    fullmove: u16,
    key: ZobristKey,
    pawn_key: ZobristKey,
}

/// The mutable state of a chess game.
///
/// Pieces are stored twice: as one [`Bitboard`] per color and kind, and in a mailbox for constant-time lookup
/// by square. Both hashes are updated incrementally by [`Position::make_move`], and every applied move pushes a
/// record so that [`Position::undo_move`] can restore the previous state exactly.
#[derive(Clone, PartialEq, Eq)]
pub struct Position {
    pieces: [[Bitboard; PieceKind::COUNT]; Color::COUNT],
    colors: [Bitboard; Color::COUNT],
    mailbox: [Option<Piece>; Square::COUNT],

    side_to_move: Color,
    castling_rights: CastlingRights,
    ep_square: Option<Square>,

    /// Plies since the last capture or pawn move.
    halfmove: u16,

    /// Starts at 1 and increases after every Black move.
    fullmove: u16,

    key: ZobristKey,
    pawn_key: ZobristKey,

    history: Vec<Undo>,
}

impl Position {
    /// An empty board with White to move.
    ///
    /// This is not a playable position; it is the starting point for [`Position::from_fen`].
    pub fn empty() -> Self {
        Self {
            pieces: [[Bitboard::EMPTY_BOARD; PieceKind::COUNT]; Color::COUNT],
            colors: [Bitboard::EMPTY_BOARD; Color::COUNT],
            mailbox: [None; Square::COUNT],
            side_to_move: Color::White,
            castling_rights: CastlingRights::NONE,
            ep_square: None,
            halfmove: 0,
            fullmove: 1,
            key: ZobristKey::default(),
            pawn_key: ZobristKey::default(),
            history: Vec::with_capacity(256),
        }
    }

    /// Parses a [`Position`] from a FEN string.
    ///
    /// The halfmove and fullmove fields may be omitted, defaulting to `0` and `1`.
    /// Castling rights whose king or rook is not on its starting square are dropped.
    ///
    /// # Example
    /// ```
    /// # use corvid::*;
    /// let pos = Position::from_fen("4k3/8/8/8/8/8/8/4K2R w K -").unwrap();
    /// assert_eq!(pos.to_fen(), "4k3/8/8/8/8/8/8/4K2R w K - 0 1");
    ///
    /// assert_eq!(Position::from_fen("8/8/8 w - -"), Err(FenError::RankCount(3)));
    /// ```
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let fields = fen.split_whitespace().collect::<Vec<_>>();
        if !(4..=6).contains(&fields.len()) {
            return Err(FenError::FieldCount(fields.len()));
        }

        let mut pos = Self::empty();

        let ranks = fields[0].split('/').collect::<Vec<_>>();
        if ranks.len() != Rank::COUNT {
            return Err(FenError::RankCount(ranks.len()));
        }

        for (i, placements) in ranks.iter().enumerate() {
            let rank = Rank(Rank::MAX - i as u8);
            let mut files = 0;

            for c in placements.chars() {
                if let Some(skip) = c.to_digit(10) {
                    files += skip as usize;
                    continue;
                }

                let piece = Piece::from_char(c).ok_or(FenError::InvalidPiece(c))?;
                if files >= File::COUNT {
                    return Err(FenError::RankLength {
                        rank: rank.0 as usize + 1,
                        files: files + 1,
                    });
                }
                pos.put(Square::new(File(files as u8), rank), piece);
                files += 1;
            }

            if files != File::COUNT {
                return Err(FenError::RankLength {
                    rank: rank.0 as usize + 1,
                    files,
                });
            }
        }

        pos.side_to_move =
            Color::from_uci(fields[1]).ok_or_else(|| FenError::SideToMove(fields[1].to_string()))?;

        if fields[2] != "-" {
            for c in fields[2].chars() {
                let flag = match c {
                    'K' => CastlingRights::WHITE_SHORT,
                    'Q' => CastlingRights::WHITE_LONG,
                    'k' => CastlingRights::BLACK_SHORT,
                    'q' => CastlingRights::BLACK_LONG,
                    _ => return Err(FenError::Castling(c)),
                };
                pos.castling_rights = pos.castling_rights.with(flag);
            }
        }

        if fields[3] != "-" {
            let ep = Square::from_uci(fields[3])
                .ok()
                .filter(|sq| sq.rank() == Rank::THREE || sq.rank() == Rank::SIX)
                .ok_or_else(|| FenError::EnPassant(fields[3].to_string()))?;
            pos.ep_square = Some(ep);
        }

        if let Some(halfmove) = fields.get(4) {
            pos.halfmove = halfmove.parse().map_err(|_| FenError::Clock {
                field: "halfmove clock",
                value: halfmove.to_string(),
            })?;
        }

        if let Some(fullmove) = fields.get(5) {
            pos.fullmove = fullmove.parse().map_err(|_| FenError::Clock {
                field: "fullmove number",
                value: fullmove.to_string(),
            })?;
        }

        for color in Color::all() {
            let count = pos.pieces(color, PieceKind::King).population();
            if count != 1 {
                return Err(FenError::KingCount { color, count });
            }
        }

        pos.sanitize_castling_rights();
        (pos.key, pos.pawn_key) = pos.compute_hashes();

        Ok(pos)
    }

    /// Removes castling rights whose king or rook has left its starting square.
    fn sanitize_castling_rights(&mut self) {
        for color in Color::all() {
            let rank = Rank::first(color);
            let king = Piece::new(color, PieceKind::King);
            let rook = Piece::new(color, PieceKind::Rook);
            let king_home = self.piece_at(Square::new(File::E, rank)) == Some(king);

            for (flag, file) in [
                (CastlingRights::short(color), File::H),
                (CastlingRights::long(color), File::A),
            ] {
                if !king_home || self.piece_at(Square::new(file, rank)) != Some(rook) {
                    self.castling_rights = self.castling_rights.without(flag);
                }
            }
        }
    }

    /// Writes this position as a FEN string.
    ///
    /// # Example
    /// ```
    /// # use corvid::*;
    /// assert_eq!(Position::default().to_fen(), FEN_STARTPOS);
    /// ```
    pub fn to_fen(&self) -> String {
        let mut placements = String::with_capacity(72);

        for rank in Rank::iter().rev() {
            let mut empty = 0;
            for file in File::iter() {
                match self.piece_at(Square::new(file, rank)) {
                    Some(piece) => {
                        if empty > 0 {
                            placements += &empty.to_string();
                            empty = 0;
                        }
                        placements.push(piece.char());
                    }
                    None => empty += 1,
                }
            }

            if empty > 0 {
                placements += &empty.to_string();
            }
            if rank != Rank::ONE {
                placements.push('/');
            }
        }

        let ep = self
            .ep_square
            .map(|sq| sq.to_string())
            .unwrap_or_else(|| String::from("-"));

        format!(
            "{placements} {} {} {ep} {} {}",
            self.side_to_move.to_uci(),
            self.castling_rights,
            self.halfmove,
            self.fullmove
        )
    }

    #[inline(always)]
    pub const fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline(always)]
    pub const fn castling_rights(&self) -> CastlingRights {
        self.castling_rights
    }

    /// The square a pawn may capture onto en passant, if the last move was a double push.
    #[inline(always)]
    pub const fn ep_square(&self) -> Option<Square> {
        self.ep_square
    }

    #[inline(always)]
    pub const fn halfmove(&self) -> u16 {
        self.halfmove
    }

    #[inline(always)]
    pub const fn fullmove(&self) -> u16 {
        self.fullmove
    }

    /// The incrementally maintained Zobrist hash of this position.
    #[inline(always)]
    pub const fn key(&self) -> ZobristKey {
        self.key
    }

    /// Zobrist hash of the pawns only.
    #[inline(always)]
    pub const fn pawn_key(&self) -> ZobristKey {
        self.pawn_key
    }

    #[inline(always)]
    pub const fn piece_at(&self, square: Square) -> Option<Piece> {
        self.mailbox[square.index()]
    }

    /// All pieces of `color` and `kind`.
    #[inline(always)]
    pub const fn pieces(&self, color: Color, kind: PieceKind) -> Bitboard {
        self.pieces[color.index()][kind.index()]
    }

    /// All pieces of `kind`, of either color.
    #[inline(always)]
    pub const fn kind(&self, kind: PieceKind) -> Bitboard {
        self.pieces[0][kind.index()].or(self.pieces[1][kind.index()])
    }

    /// All pieces of `color`.
    #[inline(always)]
    pub const fn color(&self, color: Color) -> Bitboard {
        self.colors[color.index()]
    }

    #[inline(always)]
    pub const fn occupied(&self) -> Bitboard {
        self.colors[0].or(self.colors[1])
    }

    /// Rooks and Queens of `color`.
    #[inline(always)]
    pub const fn orthogonal_sliders(&self, color: Color) -> Bitboard {
        self.pieces(color, PieceKind::Rook)
            .or(self.pieces(color, PieceKind::Queen))
    }

    /// Bishops and Queens of `color`.
    #[inline(always)]
    pub const fn diagonal_sliders(&self, color: Color) -> Bitboard {
        self.pieces(color, PieceKind::Bishop)
            .or(self.pieces(color, PieceKind::Queen))
    }

    /// The square of `color`'s King.
    ///
    /// Every position built by [`Position::from_fen`] has exactly one King per side.
    #[inline(always)]
    pub const fn king_square(&self, color: Color) -> Square {
        self.pieces(color, PieceKind::King).to_square_unchecked()
    }

    /// All pieces, of either color, that attack `square` when the board is occupied by `occupied`.
    ///
    /// Passing an occupancy other than [`Position::occupied`] reveals x-ray attackers behind removed pieces.
    pub fn attackers_to(&self, square: Square, occupied: Bitboard) -> Bitboard {
        let pawns = (pawn_attacks(square, Color::Black) & self.pieces(Color::White, PieceKind::Pawn))
            | (pawn_attacks(square, Color::White) & self.pieces(Color::Black, PieceKind::Pawn));

        let orthogonal = self.orthogonal_sliders(Color::White) | self.orthogonal_sliders(Color::Black);
        let diagonal = self.diagonal_sliders(Color::White) | self.diagonal_sliders(Color::Black);

        pawns
            | (knight_attacks(square) & self.kind(PieceKind::Knight))
            | (king_attacks(square) & self.kind(PieceKind::King))
            | (rook_attacks(square, occupied) & orthogonal)
            | (bishop_attacks(square, occupied) & diagonal)
    }

    /// Returns `true` if any piece of `by` attacks `square`.
    ///
    /// # Example
    /// ```
    /// # use corvid::*;
    /// let pos = Position::default();
    /// assert!(pos.is_attacked(Square::F3, Color::White));
    /// assert!(!pos.is_attacked(Square::E4, Color::White));
    /// ```
    #[inline(always)]
    pub fn is_attacked(&self, square: Square, by: Color) -> bool {
        self.is_attacked_with(square, by, self.occupied())
    }

    /// Same as [`Position::is_attacked`], with a custom occupancy for the sliders.
    #[inline(always)]
    pub fn is_attacked_with(&self, square: Square, by: Color, occupied: Bitboard) -> bool {
        (self.attackers_to(square, occupied) & self.color(by)).is_nonempty()
    }

    /// Enemy pieces giving check to the side to move.
    #[inline(always)]
    pub fn checkers(&self) -> Bitboard {
        let us = self.side_to_move;
        self.attackers_to(self.king_square(us), self.occupied()) & self.color(!us)
    }

    #[inline(always)]
    pub fn in_check(&self) -> bool {
        self.checkers().is_nonempty()
    }

    /// Every pseudo-legal move for the side to move. See [`generate_all`].
    #[inline(always)]
    pub fn pseudo_legal_moves(&self) -> MoveList {
        generate_all(self)
    }

    /// Every legal move for the side to move.
    pub fn legal_moves(&self) -> MoveList {
        let mut moves = generate_all(self);
        moves.retain(|mv| self.is_legal(*mv));
        moves
    }

    /// Returns `true` if the pseudo-legal `mv` does not leave the mover's King in check.
    ///
    /// The move is not played; the occupancy after the move is simulated instead.
    pub fn is_legal(&self, mv: Move) -> bool {
        let us = self.side_to_move;
        let from = mv.from();
        let to = mv.to();

        let Some(piece) = self.piece_at(from) else {
            return false;
        };

        let captured = if mv.is_en_passant() {
            Square::new(to.file(), from.rank()).bitboard()
        } else if mv.is_capture() {
            to.bitboard()
        } else {
            Bitboard::EMPTY_BOARD
        };

        let occupied = (self.occupied() ^ from ^ captured) | to;
        let king = if piece.kind() == PieceKind::King {
            to
        } else {
            self.king_square(us)
        };

        let attackers = self.attackers_to(king, occupied) & self.color(!us) & !captured;
        attackers.is_empty()
    }

    /// Applies a pseudo-legal move, recording what is needed to take it back.
    ///
    /// A move from an empty square is played as a null move so that the undo history stays paired.
    pub fn make_move(&mut self, mv: Move) {
        let us = self.side_to_move;
        let from = mv.from();
        let to = mv.to();

        let Some(piece) = self.piece_at(from) else {
            self.make_null_move();
            return;
        };

        let mut undo = Undo {
            mv: Some(mv),
            captured: None,
            castling_rights: self.castling_rights,
            ep_square: self.ep_square,
            halfmove: self.halfmove,
            fullmove: self.fullmove,
            key: self.key,
            pawn_key: self.pawn_key,
        };

        if let Some(ep) = self.ep_square.take() {
            self.key.hash_ep_square(ep);
        }

        // Clocks stick at their maximum instead of wrapping
        self.halfmove = self.halfmove.saturating_add(1);
        if us == Color::Black {
            self.fullmove = self.fullmove.saturating_add(1);
        }

        if mv.is_capture() {
            let victim_square = if mv.is_en_passant() {
                Square::new(to.file(), from.rank())
            } else {
                to
            };

            if let Some(victim) = self.take(victim_square) {
                self.hash_piece(victim_square, victim);
                undo.captured = Some((victim, victim_square));
            }
            self.halfmove = 0;
        }

        self.take(from);
        self.hash_piece(from, piece);

        let placed = match mv.promotion() {
            Some(kind) => Piece::new(us, kind),
            None => piece,
        };
        self.put(to, placed);
        self.hash_piece(to, placed);

        if let Some((rook_from, rook_to)) = mv.castling_rook_files() {
            let rank = from.rank();
            let (rook_from, rook_to) = (Square::new(rook_from, rank), Square::new(rook_to, rank));
            if let Some(rook) = self.take(rook_from) {
                self.hash_piece(rook_from, rook);
                self.put(rook_to, rook);
                self.hash_piece(rook_to, rook);
            }
        }

        if piece.kind() == PieceKind::Pawn {
            self.halfmove = 0;

            if mv.is_pawn_double_push() {
                self.ep_square = from.forward_by(us, 1);
                self.key.hash_optional_ep_square(self.ep_square);
            }
        }

        let rights = self
            .castling_rights
            .without(CastlingRights::revoked_by(from))
            .without(CastlingRights::revoked_by(to));
        if rights != self.castling_rights {
            self.key.hash_castling_rights(self.castling_rights);
            self.key.hash_castling_rights(rights);
            self.castling_rights = rights;
        }

        self.side_to_move = !us;
        self.key.toggle_side_to_move();

        self.history.push(undo);
    }

    /// Takes back the most recently applied move (or null move), returning it.
    ///
    /// Returns `None` without changing anything if no move has been applied.
    pub fn undo_move(&mut self) -> Option<Move> {
        let undo = self.history.pop()?;

        self.side_to_move = !self.side_to_move;
        let us = self.side_to_move;

        if let Some(mv) = undo.mv {
            let from = mv.from();
            let to = mv.to();

            if let Some(moved) = self.take(to) {
                let original = if mv.is_promotion() {
                    Piece::new(us, PieceKind::Pawn)
                } else {
                    moved
                };
                self.put(from, original);
            }

            if let Some((rook_from, rook_to)) = mv.castling_rook_files() {
                let rank = from.rank();
                if let Some(rook) = self.take(Square::new(rook_to, rank)) {
                    self.put(Square::new(rook_from, rank), rook);
                }
            }

            if let Some((victim, square)) = undo.captured {
                self.put(square, victim);
            }
        }

        self.castling_rights = undo.castling_rights;
        self.ep_square = undo.ep_square;
        self.halfmove = undo.halfmove;
        self.fullmove = undo.fullmove;
        self.key = undo.key;
        self.pawn_key = undo.pawn_key;

        undo.mv
    }

    /// Passes the turn to the opponent without moving a piece.
    pub fn make_null_move(&mut self) {
        self.history.push(Undo {
            mv: None,
            captured: None,
            castling_rights: self.castling_rights,
            ep_square: self.ep_square,
            halfmove: self.halfmove,
            fullmove: self.fullmove,
            key: self.key,
            pawn_key: self.pawn_key,
        });

        if let Some(ep) = self.ep_square.take() {
            self.key.hash_ep_square(ep);
        }

        self.side_to_move = !self.side_to_move;
        self.key.toggle_side_to_move();
    }

    /// Takes back a null move made with [`Position::make_null_move`].
    #[inline(always)]
    pub fn undo_null_move(&mut self) {
        self.undo_move();
    }

    /// Returns `true` if the halfmove clock has reached 100 plies.
    #[inline(always)]
    pub const fn can_draw_by_fifty(&self) -> bool {
        self.halfmove >= 100
    }

    /// Returns `true` if neither side has enough material to deliver mate.
    ///
    /// # Example
    /// ```
    /// # use corvid::*;
    /// // Lone Kings
    /// let kk: Position = "8/4k3/8/8/3K4/8/8/8 w - - 0 1".parse().unwrap();
    /// assert!(kk.can_draw_by_insufficient_material());
    ///
    /// // A single Knight
    /// let knk: Position = "8/4k3/2n5/8/3K4/8/8/8 w - - 0 1".parse().unwrap();
    /// assert!(knk.can_draw_by_insufficient_material());
    ///
    /// // Opposing Bishops on the same color square
    /// let same: Position = "8/2b1k3/8/8/3K4/8/5B2/8 w - - 0 1".parse().unwrap();
    /// assert!(same.can_draw_by_insufficient_material());
    ///
    /// // Opposing Bishops on different color squares
    /// let diff: Position = "8/3bk3/8/8/3K4/8/5B2/8 w - - 0 1".parse().unwrap();
    /// assert!(!diff.can_draw_by_insufficient_material());
    /// ```
    pub fn can_draw_by_insufficient_material(&self) -> bool {
        let heavy = self.kind(PieceKind::Queen) | self.kind(PieceKind::Rook) | self.kind(PieceKind::Pawn);
        if heavy.is_nonempty() {
            return false;
        }

        let wb = self.pieces(Color::White, PieceKind::Bishop);
        let wn = self.pieces(Color::White, PieceKind::Knight);
        let bb = self.pieces(Color::Black, PieceKind::Bishop);
        let bn = self.pieces(Color::Black, PieceKind::Knight);

        match (wb.population(), wn.population(), bb.population(), bn.population()) {
            (0, 0, 0, 0) | (1, 0, 0, 0) | (0, 0, 1, 0) | (0, 1, 0, 0) | (0, 0, 0, 1) => true,

            // Bishops on squares of the same color can never mate
            (1, 0, 1, 0) => {
                let bishops = wb | bb;
                (bishops & Bitboard::LIGHT_SQUARES).is_empty()
                    || (bishops & Bitboard::DARK_SQUARES).is_empty()
            }

            _ => false,
        }
    }

    /// Number of earlier occurrences of the current position since the last irreversible move.
    pub fn repetitions(&self) -> usize {
        let n = self.history.len();
        let reversible = (self.halfmove as usize).min(n);

        // Positions with the same side to move are two plies apart
        self.history[n - reversible..]
            .iter()
            .rev()
            .skip(1)
            .step_by(2)
            .filter(|undo| undo.key == self.key)
            .count()
    }

    /// Returns `true` if the current position has occurred before since the last irreversible move.
    ///
    /// # Example
    /// ```
    /// # use corvid::*;
    /// let mut pos = Position::default();
    /// for mv in ["b1a3", "b8a6", "a3b1"] {
    ///     pos.make_move(Move::from_uci(&pos, mv).unwrap());
    ///     assert!(!pos.is_repetition());
    /// }
    /// pos.make_move(Move::from_uci(&pos, "a6b8").unwrap());
    /// assert!(pos.is_repetition());
    /// ```
    #[inline(always)]
    pub fn is_repetition(&self) -> bool {
        self.repetitions() > 0
    }

    /// The result of the game in this position, or `None` if it is still going.
    pub fn outcome(&self) -> Option<Outcome> {
        if self.legal_moves().is_empty() {
            return if self.in_check() {
                Some(Outcome::Checkmate(!self.side_to_move))
            } else {
                Some(Outcome::Stalemate)
            };
        }

        if self.can_draw_by_fifty() {
            Some(Outcome::FiftyMoves)
        } else if self.can_draw_by_insufficient_material() {
            Some(Outcome::InsufficientMaterial)
        } else if self.repetitions() >= 2 {
            Some(Outcome::Repetition)
        } else {
            None
        }
    }

    /// Computes the full hash and the pawn hash from scratch.
    pub fn compute_hashes(&self) -> (ZobristKey, ZobristKey) {
        let pieces = Square::iter().filter_map(|sq| self.piece_at(sq).map(|piece| (sq, piece)));
        hash_from_scratch(pieces, self.ep_square, self.castling_rights, self.side_to_move)
    }

    /// Checks that the bitboards, mailbox, hashes, and kings agree with each other.
    pub fn validate(&self) -> Result<(), BoardError> {
        let mut union = Bitboard::EMPTY_BOARD;

        for color in Color::all() {
            let mut color_union = Bitboard::EMPTY_BOARD;
            for kind in PieceKind::all() {
                let bb = self.pieces(color, kind);
                if union.intersects(bb) {
                    return Err(BoardError::Corrupt(format!(
                        "{color} {kind} bitboard overlaps another piece"
                    )));
                }
                union |= bb;
                color_union |= bb;
            }

            if color_union != self.color(color) {
                return Err(BoardError::Corrupt(format!(
                    "{color} occupancy does not match its pieces"
                )));
            }

            let kings = self.pieces(color, PieceKind::King).population();
            if kings != 1 {
                return Err(BoardError::Corrupt(format!("{color} has {kings} kings")));
            }
        }

        for square in Square::iter() {
            let from_bitboards = Color::all().into_iter().find_map(|color| {
                PieceKind::all()
                    .into_iter()
                    .find(|kind| self.pieces(color, *kind).intersects(square))
                    .map(|kind| Piece::new(color, kind))
            });

            if from_bitboards != self.piece_at(square) {
                return Err(BoardError::Corrupt(format!(
                    "mailbox holds {:?} on {square} but bitboards hold {from_bitboards:?}",
                    self.piece_at(square)
                )));
            }
        }

        if self.compute_hashes() != (self.key, self.pawn_key) {
            return Err(BoardError::Corrupt(format!(
                "hash {} drifted from its recomputed value",
                self.key
            )));
        }

        Ok(())
    }

    /// Places `piece` on the empty `square`, without touching the hashes.
    #[inline(always)]
    fn put(&mut self, square: Square, piece: Piece) {
        let (color, kind) = (piece.color().index(), piece.kind().index());
        self.pieces[color][kind] |= square;
        self.colors[color] |= square;
        self.mailbox[square] = Some(piece);
    }

    /// Removes and returns the piece on `square`, without touching the hashes.
    #[inline(always)]
    fn take(&mut self, square: Square) -> Option<Piece> {
        let piece = self.mailbox[square].take()?;
        let (color, kind) = (piece.color().index(), piece.kind().index());
        self.pieces[color][kind].clear(square);
        self.colors[color].clear(square);
        Some(piece)
    }

    /// Toggles `piece` on `square` in both hashes.
    #[inline(always)]
    fn hash_piece(&mut self, square: Square, piece: Piece) {
        self.key.hash_piece(square, piece);
        if piece.kind() == PieceKind::Pawn {
            self.pawn_key.hash_piece(square, piece);
        }
    }
}

impl Default for Position {
    /// The standard starting position.
    fn default() -> Self {
        // The start position is a constant, valid FEN
        Self::from_fen(FEN_STARTPOS).unwrap_or_else(|_| Self::empty())
    }
}

impl FromStr for Position {
    type Err = FenError;
    #[inline(always)]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_fen(s)
    }
}

impl fmt::Display for Position {
    /// Draws the board from White's side, with the state of the game next to it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in Rank::iter().rev() {
            write!(f, "{rank} |")?;
            for file in File::iter() {
                let piece = self.piece_at(Square::new(file, rank));
                write!(f, " {}", piece.map(|p| p.char()).unwrap_or('.'))?;
            }

            match rank {
                Rank::SEVEN => write!(f, "      FEN: {}", self.to_fen())?,
                Rank::SIX => write!(f, "     Side: {}", self.side_to_move)?,
                Rank::FIVE => write!(f, " Castling: {}", self.castling_rights)?,
                Rank::FOUR => match self.ep_square {
                    Some(ep) => write!(f, "       EP: {ep}")?,
                    None => write!(f, "       EP: -")?,
                },
                Rank::THREE => write!(f, "Half-move: {}", self.halfmove)?,
                Rank::TWO => write!(f, "Full-move: {}", self.fullmove)?,
                Rank::ONE => write!(f, "      Key: {}", self.key)?,
                _ => {}
            }
            writeln!(f)?;
        }

        write!(f, "  +----------------\n    a b c d e f g h")
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Position({:?})", self.to_fen())
    }
}
