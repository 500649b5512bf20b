/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use crate::{Color, File, PieceKind, Position, Rank, Score, Square};

/// Bonus for a piece of each kind standing `d` squares (King distance) away from the enemy King.
///
/// Indexed by `[kind][distance]`. The King itself contributes nothing.
const TROPISM: [[i32; 8]; PieceKind::COUNT] = [
    [0, 40, 20, 12, 9, 6, 4, 2],     // Pawn
    [0, 100, 50, 35, 10, 3, 2, 2],   // Knight
    [0, 50, 25, 15, 7, 5, 3, 2],     // Bishop
    [0, 50, 40, 15, 5, 2, 1, 1],     // Rook
    [0, 100, 60, 20, 10, 7, 5, 4],   // Queen
    [0; 8],                          // King
];

/// Material difference beyond which the lead is not rewarded further.
const MAX_LEAD: i32 = 2400;

/// Evaluates `position` from `color`'s perspective.
///
/// Positive scores favor `color`. This is a pure function of the board, so
/// `evaluate(p, White) == -evaluate(p, Black)` always holds.
///
/// # Example
/// ```
/// # use corvid::*;
/// let pos = Position::default();
/// assert_eq!(evaluate(&pos, Color::White), Score::DRAW);
/// ```
#[inline(always)]
pub fn evaluate(position: &Position, color: Color) -> Score {
    Evaluator::new(position).eval_for(color)
}

/// Encapsulates the logic of scoring a chess position.
///
/// Scores are computed for White and flipped for Black, so a high number is good for whichever
/// side asked. The score is built from two terms:
///
/// * Material, with a bonus for the leading side that grows as material comes off the board
///   while the leader still has Pawns. This encourages trading down when ahead.
/// * King tropism: every piece is rewarded for standing near the enemy King.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    /// The position to evaluate.
    position: &'a Position,
}

impl<'a> Evaluator<'a> {
    #[inline(always)]
    pub fn new(position: &'a Position) -> Self {
        Self { position }
    }

    /// Evaluate this position from the side-to-move's perspective.
    #[inline(always)]
    pub fn eval(&self) -> Score {
        self.eval_for(self.position.side_to_move())
    }

    /// Evaluate this position from `color`'s perspective.
    #[inline(always)]
    pub fn eval_for(&self, color: Color) -> Score {
        let white = self.material() + self.tropism();
        Score(white * color.negation_multiplier())
    }

    /// Material balance with the trading bonus, from White's perspective.
    fn material(&self) -> i32 {
        let [white, black] = Color::all().map(|color| material_of(self.position, color));

        if white == black {
            return 0;
        }

        let (leader, diff) = if white > black {
            (Color::White, white - black)
        } else {
            (Color::Black, black - white)
        };

        let total = white + black;
        let pawns = self.position.pieces(leader, PieceKind::Pawn).population() as i32;
        let bonus = diff * (12_000 - total) * pawns / (6_400 * (pawns + 1));

        (diff.min(MAX_LEAD) + bonus) * leader.negation_multiplier()
    }

    /// Sum of King tropism of both sides, from White's perspective.
    fn tropism(&self) -> i32 {
        Square::iter()
            .filter_map(|square| self.tropism_at(square))
            .sum()
    }

    /// Tropism contribution of the piece on `square`, from White's perspective.
    fn tropism_at(&self, square: Square) -> Option<i32> {
        let piece = self.position.piece_at(square)?;
        let enemy_king = self.position.pieces(!piece.color(), PieceKind::King);
        let king = enemy_king.lsb()?;
        let distance = square.distance(king) as usize;

        Some(TROPISM[piece.kind()][distance] * piece.color().negation_multiplier())
    }
}

impl fmt::Display for Evaluator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let color = self.position.side_to_move();

        write!(f, "  +")?;
        for _ in File::iter() {
            write!(f, "-----+")?;
        }
        writeln!(f)?;

        for rank in Rank::iter().rev() {
            write!(f, "{rank} |")?;

            // The piece char
            for file in File::iter() {
                let piece = self.position.piece_at(Square::new(file, rank));
                let piece_char = piece.map(|p| p.char()).unwrap_or(' ');
                write!(f, "  {piece_char}  |")?;
            }
            writeln!(f)?;
            write!(f, "  |")?;

            // Its tropism, from White's perspective
            for file in File::iter() {
                let cell = match self.tropism_at(Square::new(file, rank)) {
                    Some(val) if val > 0 => format!("+{val}"),
                    Some(val) => format!("{val}"),
                    None => String::new(),
                };
                write!(f, "{cell:^5}|")?;
            }
            writeln!(f)?;

            write!(f, "  +")?;
            for _ in File::iter() {
                write!(f, "-----+")?;
            }
            writeln!(f)?;
        }
        for file in File::iter() {
            write!(f, "     {file}")?;
        }

        let score = self.eval_for(color);
        let winning_side = if score > Score::DRAW {
            Some(color)
        } else if score < Score::DRAW {
            Some(color.opponent())
        } else {
            None
        };

        writeln!(f, "\n\nMaterial: {}", self.material())?;
        writeln!(f, "Tropism: {}", self.tropism())?;
        writeln!(
            f,
            "Winning side: {}",
            winning_side.map(|c| c.name()).unwrap_or("N/A")
        )?;
        writeln!(f, "Score: {score}")?;

        Ok(())
    }
}

/// Material of `color`, not counting the King.
#[inline(always)]
fn material_of(position: &Position, color: Color) -> i32 {
    PieceKind::all()
        .into_iter()
        .filter(|kind| *kind != PieceKind::King)
        .map(|kind| position.pieces(color, kind).population() as i32 * kind.value())
        .sum()
}
