/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Precomputed attack tables.
//!
//! Leaper attacks (knight, king, pawn captures) and the rays between squares are generated at compile time.
//! Sliding attacks use rotated line lookups: the occupancy of the six inner squares of the rank, file, diagonal,
//! or anti-diagonal through a square is gathered into a 6-bit index, which selects the attack set along that line.
//! Ranks are gathered with a shift, files and diagonals with a multiply-and-shift that rotates the line onto the
//! top byte. The line tables are built once, on first use, and are read-only afterwards.

use std::sync::LazyLock;

use super::{Bitboard, Color, Square};

/// Deltas for the movement of the Queen.
const QUEEN_DELTAS: [(i8, i8); 8] = [
    /* Rook */
    (1, 0),
    (0, -1),
    (-1, 0),
    (0, 1),
    /* Bishop */
    (1, 1),
    (1, -1),
    (-1, -1),
    (-1, 1),
];

/// Deltas for the movement of the Knight.
const KNIGHT_DELTAS: [(i8, i8); 8] = [
    (1, 2),
    (1, -2),
    (2, 1),
    (2, -1),
    (-1, 2),
    (-1, -2),
    (-2, 1),
    (-2, -1),
];

/// The four lines a slider can travel along, each as a pair of opposite directions.
const LINE_DELTAS: [[(i8, i8); 2]; 4] = [
    [(1, 0), (-1, 0)],  // rank
    [(0, 1), (0, -1)],  // file
    [(1, 1), (-1, -1)], // diagonal (a1-h8 direction)
    [(1, -1), (-1, 1)], // anti-diagonal (h1-a8 direction)
];

const RANK: usize = 0;
const FILE: usize = 1;
const DIAGONAL: usize = 2;
const ANTI_DIAGONAL: usize = 3;

/// Number of occupancy patterns of the six inner squares of a line.
const LINE_PATTERNS: usize = 64;

/// Multiplier that rotates the inner squares of the A file onto the top six bits.
///
/// The square on rank `r` (for `r` in `2..=7`) lands on bit `64 - r`, so rank 7 becomes the lowest index bit.
const FILE_ROTATION: u64 = 0x0080402010080400;

/// Multiplier that projects one square per file onto the top rank.
const DIAGONAL_ROTATION: u64 = Bitboard::FILE_B.0;

const INNER_FILES: Bitboard = Bitboard(!(Bitboard::FILE_A.0 | Bitboard::FILE_H.0));
const INNER_RANKS: Bitboard = Bitboard(!(Bitboard::RANK_1.0 | Bitboard::RANK_8.0));

const KNIGHT_ATTACKS: [Bitboard; Square::COUNT] = generate_leaper_mobility(&KNIGHT_DELTAS);
const KING_ATTACKS: [Bitboard; Square::COUNT] = generate_leaper_mobility(&QUEEN_DELTAS);
const PAWN_ATTACKS: [[Bitboard; Square::COUNT]; Color::COUNT] = [
    generate_pawn_attacks(Color::White),
    generate_pawn_attacks(Color::Black),
];

/// For every square and line, the squares whose occupancy can change the attacks along that line.
const LINE_MASKS: [[Bitboard; Square::COUNT]; 4] = [
    generate_line_masks(RANK, INNER_FILES),
    generate_line_masks(FILE, INNER_RANKS),
    generate_line_masks(DIAGONAL, INNER_FILES),
    generate_line_masks(ANTI_DIAGONAL, INNER_FILES),
];

/// A table indexed by two squares that returns a Bitboard of a ray of squares between (exclusive) the indices.
const RAY_BETWEEN: [[Bitboard; Square::COUNT]; Square::COUNT] = {
    let mut rays = [[Bitboard::EMPTY_BOARD; Square::COUNT]; Square::COUNT];

    let mut i = 0;
    while i < Square::COUNT {
        let from = Square::from_index_unchecked(i);
        let mut j = 0;
        while j < QUEEN_DELTAS.len() {
            let (df, dr) = QUEEN_DELTAS[j];
            let mut ray = Bitboard::EMPTY_BOARD;
            let mut to = from;

            while let Some(shifted) = to.offset(df, dr) {
                rays[from.index()][shifted.index()] = ray;
                ray = ray.or(shifted.bitboard());
                to = shifted;
            }

            j += 1;
        }

        i += 1;
    }

    rays
};

/// Sliding attacks along each line, indexed by `line`, then `square * 64 + pattern`.
static LINE_ATTACKS: LazyLock<[Vec<Bitboard>; 4]> = LazyLock::new(|| {
    [
        generate_line_attacks(RANK),
        generate_line_attacks(FILE),
        generate_line_attacks(DIAGONAL),
        generate_line_attacks(ANTI_DIAGONAL),
    ]
});

/// Forces construction of the sliding attack tables.
///
/// Calling this is optional; the first attack query builds the tables otherwise.
pub fn init_attack_tables() {
    LazyLock::force(&LINE_ATTACKS);
}

/// Fetch the raw attacks for a knight on the provided square.
#[inline(always)]
pub const fn knight_attacks(square: Square) -> Bitboard {
    KNIGHT_ATTACKS[square.index()]
}

/// Fetch the raw, unblocked attacks for a king on the provided square.
#[inline(always)]
pub const fn king_attacks(square: Square) -> Bitboard {
    KING_ATTACKS[square.index()]
}

/// Fetch the squares attacked by a pawn of `color` on the provided square.
#[inline(always)]
pub const fn pawn_attacks(square: Square, color: Color) -> Bitboard {
    PAWN_ATTACKS[color.index()][square.index()]
}

/// Computes the squares a Rook on `square` attacks, given the `blockers` on the board.
///
/// The first blocker along each direction is included.
#[inline(always)]
pub fn rook_attacks(square: Square, blockers: Bitboard) -> Bitboard {
    line_attacks(RANK, square, blockers) | line_attacks(FILE, square, blockers)
}

/// Computes the squares a Bishop on `square` attacks, given the `blockers` on the board.
#[inline(always)]
pub fn bishop_attacks(square: Square, blockers: Bitboard) -> Bitboard {
    line_attacks(DIAGONAL, square, blockers) | line_attacks(ANTI_DIAGONAL, square, blockers)
}

/// Computes the squares a Queen on `square` attacks, given the `blockers` on the board.
#[inline(always)]
pub fn queen_attacks(square: Square, blockers: Bitboard) -> Bitboard {
    rook_attacks(square, blockers) | bishop_attacks(square, blockers)
}

/// Fetches a [`Bitboard`] with all of the bits along the ray between `from` and `to` (exclusive) set to `1`.
///
/// Empty if the squares do not share a rank, file, or diagonal.
///
/// # Example
/// ```
/// # use corvid::*;
/// assert_eq!(ray_between(Square::A1, Square::A4), Square::A2.bitboard() | Square::A3);
/// assert!(ray_between(Square::A1, Square::B3).is_empty());
/// ```
#[inline(always)]
pub const fn ray_between(from: Square, to: Square) -> Bitboard {
    RAY_BETWEEN[from.index()][to.index()]
}

/// Computes sliding attacks by walking each ray until it hits a blocker.
///
/// Slow reference used to build and check the lookup tables.
pub fn sliding_attacks_slow(square: Square, blockers: Bitboard, deltas: &[(i8, i8)]) -> Bitboard {
    let mut attacks = Bitboard::EMPTY_BOARD;

    for &(df, dr) in deltas {
        let mut ray = square;
        while let Some(shifted) = ray.offset(df, dr) {
            attacks.set(shifted);
            if blockers.intersects(shifted) {
                break;
            }
            ray = shifted;
        }
    }

    attacks
}

#[inline(always)]
fn line_attacks(line: usize, square: Square, blockers: Bitboard) -> Bitboard {
    let pattern = line_pattern(line, square, blockers);
    LINE_ATTACKS[line][square.index() * LINE_PATTERNS + pattern]
}

/// Gathers the occupancy of the inner squares of `line` through `square` into a 6-bit index.
#[inline(always)]
fn line_pattern(line: usize, square: Square, blockers: Bitboard) -> usize {
    let occupied = (blockers & LINE_MASKS[line][square.index()]).0;

    let pattern = match line {
        RANK => occupied >> (square.rank().0 * 8 + 1),
        FILE => ((occupied >> square.file().0).wrapping_mul(FILE_ROTATION)) >> 58,
        _ => occupied.wrapping_mul(DIAGONAL_ROTATION) >> 58,
    };

    pattern as usize & (LINE_PATTERNS - 1)
}

fn generate_line_attacks(line: usize) -> Vec<Bitboard> {
    let mut table = vec![Bitboard::EMPTY_BOARD; Square::COUNT * LINE_PATTERNS];

    for square in Square::iter() {
        for blockers in LINE_MASKS[line][square.index()].subsets() {
            let pattern = line_pattern(line, square, blockers);
            table[square.index() * LINE_PATTERNS + pattern] =
                sliding_attacks_slow(square, blockers, &LINE_DELTAS[line]);
        }
    }

    table
}

const fn generate_lines(line: usize) -> [Bitboard; Square::COUNT] {
    let mut lines = [Bitboard::EMPTY_BOARD; Square::COUNT];

    let mut i = 0;
    while i < Square::COUNT {
        let square = Square::from_index_unchecked(i);
        let mut j = 0;
        while j < 2 {
            let (df, dr) = LINE_DELTAS[line][j];
            let mut ray = square;
            while let Some(shifted) = ray.offset(df, dr) {
                lines[i] = lines[i].or(shifted.bitboard());
                ray = shifted;
            }
            j += 1;
        }
        i += 1;
    }

    lines
}

const fn generate_line_masks(line: usize, inner: Bitboard) -> [Bitboard; Square::COUNT] {
    let lines = generate_lines(line);
    let mut masks = [Bitboard::EMPTY_BOARD; Square::COUNT];

    let mut i = 0;
    while i < Square::COUNT {
        masks[i] = lines[i].and(inner);
        i += 1;
    }

    masks
}

/// Generates the squares attacked by pawns of `color` from every square.
const fn generate_pawn_attacks(color: Color) -> [Bitboard; Square::COUNT] {
    let mut boards = [Bitboard::EMPTY_BOARD; Square::COUNT];
    let mut i = 0;
    while i < Square::COUNT {
        let bb = Bitboard::from_square(Square::from_index_unchecked(i));
        let forward = bb.forward_by(color, 1);

        boards[i] = forward.east().or(forward.west());
        i += 1;
    }
    boards
}

/// Generates the moves from every location for the "Leaper" pieces.
/// Leapers may "leap" or "jump" to a square a specified distance away.
///
/// In standard chess, the Leapers are the King and Knight.
const fn generate_leaper_mobility(deltas: &[(i8, i8)]) -> [Bitboard; Square::COUNT] {
    let mut mobility = [Bitboard::EMPTY_BOARD; Square::COUNT];

    let mut i = 0;
    while i < Square::COUNT {
        let square = Square::from_index_unchecked(i);
        let mut movement = Bitboard::EMPTY_BOARD;

        let mut j = 0;
        while j < deltas.len() {
            let (df, dr) = deltas[j];
            if let Some(shifted) = square.offset(df, dr) {
                movement = movement.or(shifted.bitboard());
            }

            j += 1;
        }

        mobility[i] = movement;
        i += 1;
    }

    mobility
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOK_DELTAS: [(i8, i8); 4] = [(1, 0), (0, -1), (-1, 0), (0, 1)];
    const BISHOP_DELTAS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, -1), (-1, 1)];

    /// Every square whose occupancy can influence a rook or bishop on `square`.
    fn relevant(square: Square, lines: [usize; 2]) -> Bitboard {
        LINE_MASKS[lines[0]][square.index()] | LINE_MASKS[lines[1]][square.index()]
    }

    #[test]
    fn rook_tables_match_ray_walk() {
        for square in Square::iter() {
            for blockers in relevant(square, [RANK, FILE]).subsets() {
                assert_eq!(
                    rook_attacks(square, blockers),
                    sliding_attacks_slow(square, blockers, &ROOK_DELTAS),
                    "rook on {square} with blockers {blockers:?}"
                );
            }
        }
    }

    #[test]
    fn bishop_tables_match_ray_walk() {
        for square in Square::iter() {
            for blockers in relevant(square, [DIAGONAL, ANTI_DIAGONAL]).subsets() {
                assert_eq!(
                    bishop_attacks(square, blockers),
                    sliding_attacks_slow(square, blockers, &BISHOP_DELTAS),
                    "bishop on {square} with blockers {blockers:?}"
                );
            }
        }
    }

    #[test]
    fn sliders_ignore_irrelevant_squares() {
        // Pseudo-random boards; edge squares and the slider's own square must not change the result.
        let mut state = 0x9E37_79B9_7F4A_7C15_u64;
        for _ in 0..2000 {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let blockers = Bitboard(state);

            for square in Square::iter() {
                assert_eq!(
                    queen_attacks(square, blockers),
                    sliding_attacks_slow(square, blockers, &QUEEN_DELTAS)
                );
            }
        }
    }

    #[test]
    fn rook_blockers() {
        // . . . X . . . X
        // . . . . . . . .
        // . . . X . . . .
        // . . . . . . . .
        // . . . . . . . X
        // . . X . . . . .
        // . . . X . X . .
        // . . . . . . . .
        let blockers =
            Bitboard::new(0b1000100000000000000010000000000010000000000001000010100000000000);

        let expected = [
            Square::D2,
            Square::D3,
            Square::D5,
            Square::D6,
            Square::A4,
            Square::B4,
            Square::C4,
            Square::E4,
            Square::F4,
            Square::G4,
            Square::H4,
        ]
        .into_iter()
        .collect::<Bitboard>();

        assert_eq!(rook_attacks(Square::D4, blockers), expected);
    }

    #[test]
    fn leaper_tables() {
        assert_eq!(knight_attacks(Square::A1), Square::B3.bitboard() | Square::C2);
        assert_eq!(king_attacks(Square::H8).population(), 3);
        assert_eq!(
            pawn_attacks(Square::E4, Color::White),
            Square::D5.bitboard() | Square::F5
        );
        assert_eq!(
            pawn_attacks(Square::A7, Color::Black),
            Square::B6.bitboard()
        );
    }

    #[test]
    fn rays_between_squares() {
        assert_eq!(
            ray_between(Square::A1, Square::D4),
            Square::B2.bitboard() | Square::C3
        );
        assert_eq!(ray_between(Square::E1, Square::E2), Bitboard::EMPTY_BOARD);
        assert_eq!(ray_between(Square::H8, Square::H5), Square::H7.bitboard() | Square::H6);
    }
}
