/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Move ordering: killer moves, the history heuristic, and static exchange evaluation.

use crate::{Color, Move, PieceKind, Position, Square, MAX_DEPTH};

/// Maximum bonus to apply to a move via History Heuristic.
pub const MAX_HISTORY: i16 = 16_384;

/// Value to multiply depth by when computing history bonuses.
const HISTORY_MULTIPLIER: i32 = 300;

/// Value to subtract from a history bonus at a given depth.
const HISTORY_OFFSET: i32 = 250;

/// Ordering score of the TT move. Nothing ranks above it.
const TT_MOVE_SCORE: i32 = i32::MAX;

/// Captures that do not lose material, and promotions.
const GOOD_TACTICAL_BASE: i32 = 1 << 26;

/// Captures that lose material still come before any quiet move.
const BAD_CAPTURE_BASE: i32 = 1 << 24;

/// Killers rank above every history score.
const KILLER_BASE: i32 = 1 << 20;

/// Two killer moves per ply, remembered from quiet moves that caused a beta cutoff.
#[derive(Debug, Clone)]
pub struct KillerTable([[Option<Move>; 2]; MAX_DEPTH as usize + 1]);

impl KillerTable {
    /// Removes all killers.
    #[inline(always)]
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Remembers `mv` as a killer at `ply`, demoting the previous first killer.
    #[inline(always)]
    pub fn store(&mut self, ply: usize, mv: Move) {
        let Some(slots) = self.0.get_mut(ply) else {
            return;
        };

        if slots[0] != Some(mv) {
            slots[1] = slots[0];
            slots[0] = Some(mv);
        }
    }

    /// Ordering value of `mv` at `ply`.
    ///
    /// The killers of this ply are worth 10 and 8; those of two plies up, where the same side was
    /// to move, are worth 6 and 4. Anything else is 0.
    #[inline(always)]
    pub fn value(&self, ply: usize, mv: Move) -> i32 {
        let mv = Some(mv);
        let at = |ply: usize| self.0.get(ply).copied().unwrap_or_default();

        let [first, second] = at(ply);
        if first == mv {
            return 10;
        } else if second == mv {
            return 8;
        }

        if ply >= 2 {
            let [first, second] = at(ply - 2);
            if first == mv {
                return 6;
            } else if second == mv {
                return 4;
            }
        }

        0
    }
}

impl Default for KillerTable {
    #[inline(always)]
    fn default() -> Self {
        Self([[None; 2]; MAX_DEPTH as usize + 1])
    }
}

/// Stores bonuses and penalties for moves, indexed by side, source, and destination (a "butterfly" table).
///
/// Used to keep track of good/bad quiet moves found during search.
#[derive(Debug, Clone)]
pub struct HistoryTable([[[i16; Square::COUNT]; Square::COUNT]; Color::COUNT]);

impl HistoryTable {
    /// Clear the history table, removing all scores.
    #[inline(always)]
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Bonus awarded for a cutoff at `depth`.
    #[inline(always)]
    pub fn bonus(depth: u8) -> i16 {
        (HISTORY_MULTIPLIER * depth as i32 - HISTORY_OFFSET).clamp(0, MAX_HISTORY as i32) as i16
    }

    /// Current score of `mv` played by `color`.
    #[inline(always)]
    pub fn get(&self, color: Color, mv: Move) -> i16 {
        self.0[color][mv.from()][mv.to()]
    }

    /// Applies a bonus (or, if negative, a penalty) to `mv` played by `color`.
    ///
    /// Uses the "history gravity" formula from <https://www.chessprogramming.org/History_Heuristic#History_Bonuses>,
    /// which keeps every score within `[-MAX_HISTORY, MAX_HISTORY]`.
    #[inline(always)]
    pub fn update(&mut self, color: Color, mv: Move, bonus: i16) {
        let current = self.get(color, mv) as i32;
        let max = MAX_HISTORY as i32;
        let clamped = (bonus as i32).clamp(-max, max);

        let new = current + clamped - current * clamped.abs() / max;
        self.0[color][mv.from()][mv.to()] = new as i16;
    }
}

impl Default for HistoryTable {
    #[inline(always)]
    fn default() -> Self {
        Self([[[0; Square::COUNT]; Square::COUNT]; Color::COUNT])
    }
}

/// This table represents values for [MVV-LVA](https://www.chessprogramming.org/MVV-LVA) move ordering.
///
/// It is indexed by `[attacker][victim]`:
/// ```text
///                     VICTIM
/// A       P     N     B     R     Q     K
/// T    +---------------------------------+
/// T   P| 900   2900  3200  4900  8900  0
/// A   N| 700   2700  3000  4700  8700  0
/// C   B| 670   2670  2970  4670  8670  0
/// K   R| 500   2500  2800  4500  8500  0
/// E   Q| 100   2100  2400  4100  8100  0
/// R   K| -1000 1000  1300  3000  7000  0
/// ```
const MVV_LVA: [[i32; PieceKind::COUNT]; PieceKind::COUNT] = {
    let kinds = PieceKind::all();
    let mut matrix = [[0; PieceKind::COUNT]; PieceKind::COUNT];

    let mut attacker = 0;
    while attacker < PieceKind::COUNT {
        let mut victim = 0;
        // The King can never be captured
        while victim < PieceKind::COUNT - 1 {
            matrix[attacker][victim] = 10 * kinds[victim].value() - kinds[attacker].value();
            victim += 1;
        }
        attacker += 1;
    }
    matrix
};

/// MVV-LVA value of `mv` in `position`, or 0 if it captures nothing.
#[inline(always)]
pub fn mvv_lva(position: &Position, mv: Move) -> i32 {
    let Some(attacker) = position.piece_at(mv.from()) else {
        return 0;
    };

    let victim = if mv.is_en_passant() {
        Some(PieceKind::Pawn)
    } else {
        position.piece_at(mv.to()).map(|p| p.kind())
    };

    victim.map_or(0, |victim| MVV_LVA[attacker.kind()][victim])
}

/// [Static exchange evaluation](https://www.chessprogramming.org/Static_Exchange_Evaluation) of `mv`.
///
/// Plays out every capture on the destination square, least valuable attacker first, letting either
/// side stop when continuing would lose material. Attackers hidden behind sliders (x-rays) join the
/// exchange as the pieces in front of them leave. Returns the material won by the side making `mv`,
/// in centipawns.
///
/// # Example
/// ```
/// # use corvid::*;
/// // The Knight on e5 is defended by a pawn: Qxe5 loses the Queen for a Knight
/// let pos = Position::from_fen("4k3/8/3p4/4n3/8/8/4Q3/4K3 w - - 0 1").unwrap();
/// let mv = Move::from_uci(&pos, "e2e5").unwrap();
/// assert_eq!(see(&pos, mv), 300 - 900);
/// ```
pub fn see(position: &Position, mv: Move) -> i32 {
    let from = mv.from();
    let to = mv.to();
    let Some(mover) = position.piece_at(from) else {
        return 0;
    };

    let mut occupied = position.occupied() ^ from;
    let mut gains = [0; 32];

    gains[0] = if mv.is_en_passant() {
        if let Some(victim) = to.backward_by(mover.color(), 1) {
            occupied ^= victim;
        }
        PieceKind::Pawn.value()
    } else {
        position.piece_at(to).map_or(0, |p| p.kind().value())
    };

    // Value of the piece now standing on `to`, which the next capture removes
    let mut on_square = mover.kind().value();
    if let Some(promotion) = mv.promotion() {
        gains[0] += promotion.value() - PieceKind::Pawn.value();
        on_square = promotion.value();
    }

    let mut side = !mover.color();
    let mut depth = 0;

    loop {
        let attackers = position.attackers_to(to, occupied) & occupied;
        let ours = attackers & position.color(side);

        let Some((kind, square)) = PieceKind::all()
            .into_iter()
            .find_map(|kind| (ours & position.pieces(side, kind)).lsb().map(|sq| (kind, sq)))
        else {
            break;
        };

        // The King may only recapture if nothing can take it back
        if kind == PieceKind::King && (attackers & position.color(!side)).is_nonempty() {
            break;
        }

        depth += 1;
        if depth == gains.len() {
            depth -= 1;
            break;
        }

        gains[depth] = on_square - gains[depth - 1];
        on_square = kind.value();
        occupied ^= square;
        side = !side;
    }

    // Either side may decline to continue the exchange
    while depth > 0 {
        gains[depth - 1] = -(-gains[depth - 1]).max(gains[depth]);
        depth -= 1;
    }

    gains[0]
}

/// Everything needed to score the moves of one node.
pub struct MoveScorer<'a> {
    pub position: &'a Position,
    pub tt_move: Option<Move>,
    pub killers: &'a KillerTable,
    pub history: &'a HistoryTable,
    pub ply: usize,
}

impl MoveScorer<'_> {
    /// Ordering score of `mv`; higher is searched earlier.
    ///
    /// TT move, then captures and promotions (non-losing by MVV-LVA, then losing by SEE), then killers,
    /// then quiet moves by history.
    #[inline(always)]
    pub fn score(&self, mv: Move) -> i32 {
        if self.tt_move == Some(mv) {
            return TT_MOVE_SCORE;
        }

        if mv.is_capture() {
            let exchange = see(self.position, mv);
            return if exchange >= 0 {
                GOOD_TACTICAL_BASE + mvv_lva(self.position, mv)
            } else {
                BAD_CAPTURE_BASE + exchange
            };
        }

        if let Some(promotion) = mv.promotion() {
            return GOOD_TACTICAL_BASE + promotion.value();
        }

        let killer = self.killers.value(self.ply, mv);
        if killer > 0 {
            return KILLER_BASE + killer;
        }

        self.history.get(self.position.side_to_move(), mv) as i32
    }

    /// Sorts `moves` so the most promising come first. Ties keep their current order.
    #[inline(always)]
    pub fn sort(&self, moves: &mut [Move]) {
        moves.sort_by_cached_key(|mv| std::cmp::Reverse(self.score(*mv)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn see_of(fen: &str, uci: &str) -> i32 {
        let pos = Position::from_fen(fen).unwrap();
        let mv = Move::from_uci(&pos, uci).unwrap();
        see(&pos, mv)
    }

    #[test]
    fn test_see_undefended() {
        assert_eq!(see_of("4k3/8/8/3r4/8/8/8/3RK3 w - - 0 1", "d1d5"), 500);
    }

    #[test]
    fn test_see_defended_by_pawn() {
        // RxP, pxR
        assert_eq!(see_of("4k3/8/2p5/3p4/8/8/8/3RK3 w - - 0 1", "d1d5"), 100 - 500);
    }

    #[test]
    fn test_see_xray_support() {
        // Doubled Rooks win the defended pawn: RxP, rxR, RxR
        let fen = "3rk3/8/8/3p4/8/8/3R4/3RK3 w - - 0 1";
        assert_eq!(see_of(fen, "d2d5"), 100);

        // Without the back Rook the capture loses the exchange
        let fen = "3rk3/8/8/3p4/8/8/3R4/4K3 w - - 0 1";
        assert_eq!(see_of(fen, "d2d5"), 100 - 500);
    }

    #[test]
    fn test_see_king_cannot_recapture_into_defense() {
        // Kxd2 would walk into the Rook on d8
        assert_eq!(see_of("3rk3/8/8/8/8/1n6/3B4/4K3 b - - 0 1", "b3d2"), 330);

        // Without the Rook, the King takes back
        assert_eq!(see_of("4k3/8/8/8/8/1n6/3B4/4K3 b - - 0 1", "b3d2"), 330 - 300);
    }

    #[test]
    fn test_see_en_passant_and_promotion() {
        assert_eq!(see_of("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1", "e5d6"), 100);
        assert_eq!(see_of("4k3/1P6/8/8/8/8/8/4K3 w - - 0 1", "b7b8q"), 800);
    }

    #[test]
    fn test_killer_values() {
        let pos = Position::default();
        let a = Move::from_uci(&pos, "e2e4").unwrap();
        let b = Move::from_uci(&pos, "d2d4").unwrap();
        let c = Move::from_uci(&pos, "g1f3").unwrap();

        let mut killers = KillerTable::default();
        killers.store(4, a);
        killers.store(4, b);
        assert_eq!(killers.value(4, b), 10);
        assert_eq!(killers.value(4, a), 8);
        assert_eq!(killers.value(6, b), 6);
        assert_eq!(killers.value(6, a), 4);
        assert_eq!(killers.value(5, a), 0);
        assert_eq!(killers.value(4, c), 0);

        // Storing the first killer again does not evict the second
        killers.store(4, b);
        assert_eq!(killers.value(4, a), 8);
    }

    #[test]
    fn test_history_gravity_is_bounded() {
        let pos = Position::default();
        let mv = Move::from_uci(&pos, "e2e4").unwrap();
        let mut history = HistoryTable::default();

        for _ in 0..1_000 {
            history.update(Color::White, mv, MAX_HISTORY);
        }
        assert!(history.get(Color::White, mv) <= MAX_HISTORY);
        assert!(history.get(Color::White, mv) > MAX_HISTORY / 2);
        assert_eq!(history.get(Color::Black, mv), 0);

        for _ in 0..1_000 {
            history.update(Color::White, mv, -MAX_HISTORY);
        }
        assert!(history.get(Color::White, mv) >= -MAX_HISTORY);
        assert!(history.get(Color::White, mv) < 0);
    }

    #[test]
    fn test_ordering_priorities() {
        // White can win the Queen, or take a Knight defended by a pawn
        let pos = Position::from_fen("4k3/8/2p5/1q1n4/P7/8/8/3RK3 w - - 0 1").unwrap();
        let quiet = Move::from_uci(&pos, "e1f2").unwrap();
        let killer = Move::from_uci(&pos, "a4a5").unwrap();
        let good = Move::from_uci(&pos, "a4b5").unwrap();
        let bad = Move::from_uci(&pos, "d1d5").unwrap();
        let tt = Move::from_uci(&pos, "d1d2").unwrap();

        assert_eq!(see(&pos, good), 900 - 100);
        assert_eq!(see(&pos, bad), 300 - 500);

        let mut killers = KillerTable::default();
        killers.store(0, killer);
        let history = HistoryTable::default();

        let scorer = MoveScorer {
            position: &pos,
            tt_move: Some(tt),
            killers: &killers,
            history: &history,
            ply: 0,
        };

        let mut moves = vec![quiet, bad, killer, good, tt];
        scorer.sort(&mut moves);
        assert_eq!(moves, vec![tt, good, bad, killer, quiet]);
    }

    #[test]
    fn test_mvv_lva_prefers_valuable_victims() {
        let pos = Position::from_fen("4k3/8/2p5/1q1n4/P7/8/8/3RK3 w - - 0 1").unwrap();
        let pxq = Move::from_uci(&pos, "a4b5").unwrap();
        let rxn = Move::from_uci(&pos, "d1d5").unwrap();
        let quiet = Move::from_uci(&pos, "d1d2").unwrap();
        assert!(mvv_lva(&pos, pxq) > mvv_lva(&pos, rxn));
        assert_eq!(mvv_lva(&pos, quiet), 0);
    }
}
