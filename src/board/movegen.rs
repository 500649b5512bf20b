/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Pseudo-legal move generation.
//!
//! Generated moves obey piece movement and occupancy, but may leave the mover's King in check;
//! filter them with [`Position::is_legal`]. Castling is the exception: it is only produced when the King's
//! start, transit, and destination squares are safe.

use super::{
    bishop_attacks, king_attacks, knight_attacks, pawn_attacks, queen_attacks, ray_between,
    rook_attacks, Bitboard, CastlingRights, File, Move, MoveKind, MoveList, PieceKind,
    Position, Rank, Square,
};

/// Destination squares each kind of move may use.
#[derive(Clone, Copy)]
struct Targets {
    /// Non-capturing, non-promoting destinations.
    quiet: Bitboard,
    /// Squares of enemy pieces that may be captured.
    capture: Bitboard,
    /// Destinations of non-capturing promotions.
    promote: Bitboard,
}

/// Every pseudo-legal move for the side to move.
///
/// # Example
/// ```
/// # use corvid::*;
/// assert_eq!(generate_all(&Position::default()).len(), 20);
/// ```
pub fn generate_all(position: &Position) -> MoveList {
    let us = position.side_to_move();
    let empty = !position.occupied();
    let targets = Targets {
        quiet: empty,
        capture: position.color(!us),
        promote: empty,
    };

    let mut moves = MoveList::new();
    generate_pawn_moves(position, targets, &mut moves);
    generate_piece_moves(position, targets, &mut moves);
    generate_king_moves(position, targets.quiet | targets.capture, &mut moves);
    generate_castling(position, &mut moves);
    moves
}

/// Captures and promotions or, when the side to move is in check, every check evasion.
///
/// This is the move set of quiescence search. Evasions are pseudo-legal like everything else,
/// but King steps onto attacked squares are already left out.
///
/// # Example
/// ```
/// # use corvid::*;
/// // No captures are available at the start
/// assert!(generate_quiet_or_tactical(&Position::default()).is_empty());
/// ```
pub fn generate_quiet_or_tactical(position: &Position) -> MoveList {
    let checkers = position.checkers();
    if checkers.is_nonempty() {
        return generate_evasions(position, checkers);
    }

    let us = position.side_to_move();
    let targets = Targets {
        quiet: Bitboard::EMPTY_BOARD,
        capture: position.color(!us),
        promote: !position.occupied(),
    };

    let mut moves = MoveList::new();
    generate_pawn_moves(position, targets, &mut moves);
    generate_piece_moves(position, targets, &mut moves);
    generate_king_moves(position, targets.capture, &mut moves);
    moves
}

/// Moves that may get the side to move out of check by `checkers`.
fn generate_evasions(position: &Position, checkers: Bitboard) -> MoveList {
    let us = position.side_to_move();
    let king = position.king_square(us);
    let mut moves = MoveList::new();

    // The King may not step along a slider's line, so attacks are computed without it
    let occupied = position.occupied() ^ king;
    let safe = king_attacks(king)
        .iter()
        .filter(|sq| !position.is_attacked_with(*sq, !us, occupied))
        .collect::<Bitboard>();
    generate_king_moves(position, safe & !position.color(us), &mut moves);

    // In double check, only the King can move
    if checkers.population() == 1 {
        let checker = checkers.to_square_unchecked();
        let block = ray_between(king, checker);
        let targets = Targets {
            quiet: block,
            capture: checkers,
            promote: block,
        };
        generate_pawn_moves(position, targets, &mut moves);
        generate_piece_moves(position, targets, &mut moves);
    }

    moves
}

fn generate_pawn_moves(position: &Position, targets: Targets, moves: &mut MoveList) {
    let us = position.side_to_move();
    let pawns = position.pieces(us, PieceKind::Pawn);
    let empty = !position.occupied();
    let promotion_rank = Bitboard::eighth_rank(us);

    let single = pawns.forward_by(us, 1) & empty;
    let double = (single & Bitboard::third_rank(us)).forward_by(us, 1) & empty;

    for to in single & promotion_rank & targets.promote {
        if let Some(from) = to.backward_by(us, 1) {
            for kind in MoveKind::PROMOTIONS {
                moves.push(Move::new(from, to, kind));
            }
        }
    }

    for to in single & !promotion_rank & targets.quiet {
        if let Some(from) = to.backward_by(us, 1) {
            moves.push(Move::new(from, to, MoveKind::Quiet));
        }
    }

    for to in double & targets.quiet {
        if let Some(from) = to.backward_by(us, 2) {
            moves.push(Move::new(from, to, MoveKind::PawnDoublePush));
        }
    }

    for from in pawns {
        let attacks = pawn_attacks(from, us) & targets.capture;

        for to in attacks & promotion_rank {
            for kind in MoveKind::CAPTURE_PROMOTIONS {
                moves.push(Move::new(from, to, kind));
            }
        }

        for to in attacks & !promotion_rank {
            moves.push(Move::new(from, to, MoveKind::Capture));
        }
    }

    if let Some(ep) = position.ep_square() {
        for from in pawn_attacks(ep, !us) & pawns {
            let victim = Square::new(ep.file(), from.rank());
            if targets.capture.intersects(victim) || targets.quiet.intersects(ep) {
                moves.push(Move::new(from, ep, MoveKind::EnPassantCapture));
            }
        }
    }
}

/// Knights, Bishops, Rooks, and Queens.
fn generate_piece_moves(position: &Position, targets: Targets, moves: &mut MoveList) {
    let us = position.side_to_move();
    let occupied = position.occupied();
    let allowed = targets.quiet | targets.capture;

    for kind in [
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Rook,
        PieceKind::Queen,
    ] {
        for from in position.pieces(us, kind) {
            let attacks = match kind {
                PieceKind::Knight => knight_attacks(from),
                PieceKind::Bishop => bishop_attacks(from, occupied),
                PieceKind::Rook => rook_attacks(from, occupied),
                _ => queen_attacks(from, occupied),
            };

            push_moves(from, attacks & allowed, targets.capture, moves);
        }
    }
}

fn generate_king_moves(position: &Position, allowed: Bitboard, moves: &mut MoveList) {
    let us = position.side_to_move();
    let from = position.king_square(us);
    push_moves(from, king_attacks(from) & allowed, position.color(!us), moves);
}

/// Adds a move from `from` to every square of `destinations`, as a capture where an enemy stands.
#[inline(always)]
fn push_moves(from: Square, destinations: Bitboard, enemies: Bitboard, moves: &mut MoveList) {
    for to in destinations {
        let kind = if enemies.intersects(to) {
            MoveKind::Capture
        } else {
            MoveKind::Quiet
        };
        moves.push(Move::new(from, to, kind));
    }
}

/// Castling requires the right, empty squares between King and Rook, and no attacks on the King's path.
fn generate_castling(position: &Position, moves: &mut MoveList) {
    let us = position.side_to_move();
    let rights = position.castling_rights();
    let rank = Rank::first(us);
    let king = Square::new(File::E, rank);

    for (right, rook_file, king_file, kind) in [
        (CastlingRights::short(us), File::H, File::G, MoveKind::ShortCastle),
        (CastlingRights::long(us), File::A, File::C, MoveKind::LongCastle),
    ] {
        if !rights.contains(right) || position.king_square(us) != king {
            continue;
        }

        let rook = Square::new(rook_file, rank);
        let to = Square::new(king_file, rank);
        if ray_between(king, rook).intersects(position.occupied()) {
            continue;
        }

        // Start, transit, and destination squares
        let path = ray_between(king, to) | king | to;
        if path.iter().any(|sq| position.is_attacked(sq, !us)) {
            continue;
        }

        moves.push(Move::new(king, to, kind));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FEN_KIWIPETE, FEN_STARTPOS};

    fn legal_sorted(position: &Position, moves: MoveList) -> Vec<String> {
        let mut moves = moves
            .into_iter()
            .filter(|mv| position.is_legal(*mv))
            .map(|mv| mv.to_string())
            .collect::<Vec<_>>();
        moves.sort();
        moves
    }

    #[test]
    fn test_generation_is_deterministic() {
        let pos = Position::from_fen(FEN_KIWIPETE).unwrap();
        assert_eq!(generate_all(&pos), generate_all(&pos));
        assert_eq!(pos.legal_moves().len(), 48);
    }

    #[test]
    fn test_evasions_are_complete() {
        let fens = [
            // Single check by a knight
            "4k3/8/3N4/8/8/8/8/4K3 b - - 0 1",
            // Single check by a slider, which may be blocked
            "4k3/8/8/8/8/8/8/R3K2r w - - 0 1",
            // Double check
            "4k3/8/8/8/8/5n2/8/r3K3 w - - 0 1",
            // Check by a pawn that may be captured en passant
            "8/8/8/2k5/3Pp3/8/8/4K3 b - d3 0 1",
            // Check with a promotion block available
            "r3K3/1P6/8/8/8/8/8/7k w - - 0 1",
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        ];

        for fen in fens {
            let pos = Position::from_fen(fen).unwrap();
            if !pos.in_check() {
                continue;
            }

            assert_eq!(
                legal_sorted(&pos, generate_quiet_or_tactical(&pos)),
                legal_sorted(&pos, generate_all(&pos)),
                "evasions differ on {fen}"
            );
        }
    }

    #[test]
    fn test_evasions_along_a_perft_walk() {
        // Every in-check node within three plies of kiwipete
        fn walk(pos: &mut Position, depth: usize) {
            if pos.in_check() {
                assert_eq!(
                    legal_sorted(pos, generate_quiet_or_tactical(pos)),
                    legal_sorted(pos, generate_all(pos)),
                    "evasions differ on {}",
                    pos.to_fen()
                );
            }

            if depth == 0 {
                return;
            }

            for mv in pos.legal_moves() {
                pos.make_move(mv);
                walk(pos, depth - 1);
                pos.undo_move();
            }
        }

        walk(&mut Position::from_fen(FEN_KIWIPETE).unwrap(), 3);
    }

    #[test]
    fn test_tactical_moves_are_captures_or_promotions() {
        let pos = Position::from_fen("r3k3/1P6/8/3p4/4P3/8/8/4K3 w - - 0 1").unwrap();
        let moves = generate_quiet_or_tactical(&pos);
        assert!(moves.iter().all(|mv| mv.is_tactical()));

        let names = legal_sorted(&pos, moves);
        assert!(names.contains(&"e4d5".to_string()));
        assert!(names.contains(&"b7b8q".to_string()));
        assert!(names.contains(&"b7a8n".to_string()));
        assert_eq!(names.len(), 9);
    }

    #[test]
    fn test_castling_through_attack_is_not_generated() {
        // The rook on f8 covers f1
        let pos = Position::from_fen("4kr2/8/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
        let moves = generate_all(&pos)
            .into_iter()
            .filter(|mv| mv.is_castle())
            .map(|mv| mv.to_string())
            .collect::<Vec<_>>();
        assert_eq!(moves, vec!["e1c1"]);
    }

    #[test]
    fn test_start_position_counts() {
        let pos = Position::from_fen(FEN_STARTPOS).unwrap();
        assert_eq!(generate_all(&pos).len(), 20);
        assert_eq!(pos.legal_moves().len(), 20);
    }
}
