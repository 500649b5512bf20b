/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    fmt,
    marker::PhantomData,
    ops::Neg,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use arrayvec::ArrayVec;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use uci_parser::{UciInfo, UciResponse, UciSearchOptions};

use crate::{
    evaluate, generate_all, generate_quiet_or_tactical, see, BoardError, HistoryTable,
    KillerTable, Move, MoveList, MoveScorer, Position, Score, TTable, Tablebase,
};

/// Maximum depth that can be searched
pub const MAX_DEPTH: u8 = u8::MAX / 2;

/// Number of nodes visited between two checks of the clock and the stop flag.
const NODE_CHECK_INTERVAL: u64 = 1024;

/// Divisor of the remaining time used as the soft limit of a search.
const SOFT_TIMEOUT_DIVISOR: u32 = 20;

/// Divisor of the remaining time used as the hard limit of a search.
const HARD_TIMEOUT_DIVISOR: u32 = 3;

/// Divisor of the increment added to both limits.
const TIME_INC_DIVISOR: u32 = 2;

/// How much a search reports about itself on `stdout`.
///
/// Chosen at compile time, so a silent search pays nothing for logging.
pub trait LogLevel {
    /// Print `info` lines after each iteration, and `bestmove` at the end.
    const INFO: bool;

    /// Additionally print `info string` diagnostics.
    const DEBUG: bool;
}

/// Prints nothing. Used by benchmarks and tests.
pub struct LogNone;
impl LogLevel for LogNone {
    const INFO: bool = false;
    const DEBUG: bool = false;
}

/// Prints standard UCI output.
pub struct LogInfo;
impl LogLevel for LogInfo {
    const INFO: bool = true;
    const DEBUG: bool = false;
}

/// Prints standard UCI output and diagnostics.
pub struct LogDebug;
impl LogLevel for LogDebug {
    const INFO: bool = true;
    const DEBUG: bool = true;
}

/// A marker trait for the types of nodes encountered during search.
///
/// Credit to Cosmo, author of Viridithas,
/// for the idea of using a const generic trait for this.
trait NodeType {
    /// Is this node the first searched?
    const ROOT: bool;

    /// Is this node a PV node?
    const PV: bool;
}

/// First node searched.
struct RootNode;
impl NodeType for RootNode {
    const ROOT: bool = true;
    const PV: bool = true;
}

/// A node on the principal variation, searched with a non-null window.
struct PvNode;
impl NodeType for PvNode {
    const ROOT: bool = false;
    const PV: bool = true;
}

/// A node not on the principal variation, searched with a null window.
struct NonPvNode;
impl NodeType for NonPvNode {
    const ROOT: bool = false;
    const PV: bool = false;
}

/// Represents the best sequence of moves found during a search.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PrincipalVariation(ArrayVec<Move, { MAX_DEPTH as usize }>);

impl PrincipalVariation {
    /// clears the moves of `self`.
    #[inline(always)]
    fn clear(&mut self) {
        self.0.clear();
    }

    /// Replace the contents of `self` with `mv` followed by the contents of `other`.
    ///
    /// Moves that would not fit are dropped from the end.
    #[inline(always)]
    fn extend(&mut self, mv: Move, other: &Self) {
        self.clear();
        self.0.push(mv);
        let room = self.0.remaining_capacity().min(other.0.len());
        self.0.extend(other.0[..room].iter().copied());
    }

    /// The moves of this line, starting at the root.
    #[inline(always)]
    pub fn moves(&self) -> &[Move] {
        &self.0
    }

    /// First move of this line.
    #[inline(always)]
    pub fn first(&self) -> Option<Move> {
        self.0.first().copied()
    }
}

impl fmt::Display for PrincipalVariation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let moves = self.0.iter().map(|mv| mv.to_string()).collect::<Vec<_>>();
        write!(f, "{}", moves.join(" "))
    }
}

/// Bounds within an alpha-beta search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchBounds {
    /// Lower bound.
    ///
    /// We are guaranteed a score that is AT LEAST `alpha`.
    /// During search, if no move can raise `alpha`, we are said to have "failed low."
    pub alpha: Score,

    /// Upper bound.
    ///
    /// Our opponent is guaranteed a score that is AT MOST `beta`.
    /// During search, if a move scores higher than `beta`, we are said to have "failed high."
    pub beta: Score,
}

impl SearchBounds {
    /// Create a new [`SearchBounds`] from the provided `alpha` and `beta` values.
    #[inline(always)]
    pub const fn new(alpha: Score, beta: Score) -> Self {
        Self { alpha, beta }
    }

    /// Create a "null window" around `alpha`.
    #[inline(always)]
    fn null_alpha(self) -> Self {
        Self::new(self.alpha, self.alpha + 1)
    }
}

impl Neg for SearchBounds {
    type Output = Self;
    /// Negating a [`SearchBounds`] swaps the `alpha` and `beta` fields and negates them both.
    #[inline(always)]
    fn neg(self) -> Self::Output {
        Self {
            alpha: -self.beta,
            beta: -self.alpha,
        }
    }
}

impl Default for SearchBounds {
    /// Default [`SearchBounds`] are a `(-infinity, infinity)`.
    #[inline(always)]
    fn default() -> Self {
        Self::new(-Score::INF, Score::INF)
    }
}

/// The result of a search, containing the best move found, score, and total nodes searched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchResult {
    /// Number of nodes searched.
    pub nodes: u64,

    /// Best move found during the search.
    ///
    /// Only `None` if the root position has no legal moves.
    pub bestmove: Option<Move>,

    /// Evaluation of the position after `bestmove` is made.
    pub score: Score,

    /// The depth of the last completed iteration.
    pub depth: u8,

    /// Principal variation found by the last completed iteration.
    pub pv: PrincipalVariation,
}

impl Default for SearchResult {
    /// A default search result should initialize to a *very bad* value,
    /// since there isn't a move to play.
    #[inline(always)]
    fn default() -> Self {
        Self {
            nodes: 0,
            bestmove: None,
            score: -Score::INF,
            depth: 0,
            pv: PrincipalVariation::default(),
        }
    }
}

/// Configuration variables for executing a [`Search`].
#[derive(Debug, Clone, Copy)]
pub struct SearchConfig {
    /// Maximum depth to execute the search.
    pub max_depth: u8,

    /// Node allowance.
    ///
    /// If the search exceeds this many nodes, it will exit as quickly as possible.
    pub max_nodes: u64,

    /// Start time of the search.
    pub starttime: Instant,

    /// Soft limit on search time.
    ///
    /// During iterative deepening, if a search concludes and this timeout is exceeded,
    /// the entire search will exit, since there probably isn't enough time remaining
    /// to conduct a search at a deeper depth.
    pub soft_timeout: Duration,

    /// Hard limit on search time.
    ///
    /// During *any* point in the search, if this limit is exceeded, the search will cancel.
    pub hard_timeout: Duration,

    /// Shuffle root moves before ordering them, so equally good moves are picked at random.
    pub randomize: bool,

    /// Percent chance, in `[0, 100]`, of ignoring a beta cutoff below the root.
    pub prune_chance: u8,

    /// Consult the tablebase, if one is installed.
    pub egtb: bool,

    /// Seed for `randomize` and `prune_chance`. Drawn from the OS if `None`.
    pub seed: Option<u64>,
}

impl SearchConfig {
    /// Constructs a new [`SearchConfig`] from the provided UCI options and position.
    ///
    /// The [`Position`] is used to determine side to move when computing the soft/hard timeouts.
    pub fn new(options: UciSearchOptions, position: &Position) -> Self {
        let mut config = Self::default();

        // If supplied, set the max depth / node allowance
        if let Some(depth) = options.depth {
            config.max_depth = (depth as u64).clamp(1, MAX_DEPTH as u64) as u8;
        }

        if let Some(nodes) = options.nodes {
            config.max_nodes = nodes as u64;
        }

        // If `movetime` was supplied, search that long.
        if let Some(movetime) = options.movetime {
            config.hard_timeout = movetime;
            config.soft_timeout = movetime;
        } else {
            // Otherwise, search based on time remaining and increment
            let (time, inc) = if position.side_to_move().is_white() {
                (options.wtime, options.winc)
            } else {
                (options.btime, options.binc)
            };

            // Only calculate timeouts if a time was provided
            if let Some(time) = time {
                let inc = inc.unwrap_or(Duration::ZERO) / TIME_INC_DIVISOR;

                config.soft_timeout = time / SOFT_TIMEOUT_DIVISOR + inc;
                config.hard_timeout = time / HARD_TIMEOUT_DIVISOR + inc;
            }
        }

        config
    }
}

impl Default for SearchConfig {
    /// A default [`SearchConfig`] will permit an "infinite" search.
    ///
    /// The word "infinite" is quoted here because the actual defaults are the `::MAX` values for each field.
    #[inline(always)]
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            max_nodes: u64::MAX,
            starttime: Instant::now(),
            soft_timeout: Duration::MAX,
            hard_timeout: Duration::MAX,
            randomize: false,
            prune_chance: 0,
            egtb: false,
            seed: None,
        }
    }
}

/// Executes a search on a position.
pub struct Search<'a, Log> {
    /// Number of nodes searched.
    nodes: u64,

    /// An atomic flag to determine if the search should be cancelled at any time.
    ///
    /// If this is ever `false`, the search must exit as soon as possible.
    is_searching: Arc<AtomicBool>,

    /// Latched once any stop condition has been seen; the search then unwinds.
    cancelled: bool,

    /// Set once the first iteration completes. Until then, stop conditions are ignored.
    has_result: bool,

    /// Configuration variables for this instance of the search.
    config: SearchConfig,

    /// Transposition table used to cache information during search.
    ttable: &'a mut TTable,

    /// Storage for quiet moves that cause a beta-cutoff during search.
    history: &'a mut HistoryTable,

    /// Killer moves of this search.
    killers: KillerTable,

    /// Perfect endgame knowledge, if installed.
    tablebase: Option<&'a dyn Tablebase>,

    /// Source of randomness for `randomize` and `prune_chance`.
    rng: StdRng,

    /// Marker for the level of logging to print.
    log: PhantomData<Log>,
}

impl<'a, Log: LogLevel> Search<'a, Log> {
    /// Construct a new [`Search`] instance to execute.
    #[inline(always)]
    pub fn new(
        is_searching: Arc<AtomicBool>,
        config: SearchConfig,
        ttable: &'a mut TTable,
        history: &'a mut HistoryTable,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };

        Self {
            nodes: 0,
            is_searching,
            cancelled: false,
            has_result: false,
            config,
            ttable,
            history,
            killers: KillerTable::default(),
            tablebase: None,
            rng,
            log: PhantomData,
        }
    }

    /// Installs a tablebase, consulted when [`SearchConfig::egtb`] is set.
    #[inline(always)]
    pub fn with_tablebase(mut self, tablebase: &'a dyn Tablebase) -> Self {
        self.tablebase = Some(tablebase);
        self
    }

    /// Start the search on the supplied [`Position`], returning a [`SearchResult`].
    ///
    /// This is the entrypoint of the search, and prints UCI info before starting iterative deepening,
    /// concluding by sending the `bestmove` message.
    ///
    /// The position is walked with make/undo and is restored before this returns. If it fails
    /// [`Position::validate`], no search is made and the error is returned.
    pub fn start(mut self, position: &mut Position) -> Result<SearchResult, BoardError> {
        let validated = position.validate();

        let res = match validated {
            Ok(()) => {
                if Log::DEBUG {
                    self.send_start_info(position);
                }
                Ok(self.iterative_deepening(position))
            }
            Err(err) => {
                tracing::error!(%err, fen = %position.to_fen(), "refusing to search a corrupt position");
                Err(err)
            }
        };

        if Log::DEBUG {
            self.send_string(format!(
                "TT stats: {} hits / {} accesses, {} collisions",
                self.ttable.hits, self.ttable.accesses, self.ttable.collisions
            ));
        }

        // Search has ended; send bestmove
        if Log::INFO {
            let bestmove = res.as_ref().ok().and_then(|res| res.bestmove);
            self.send_response(UciResponse::BestMove {
                bestmove: bestmove.map(|mv| mv.to_string()),
                ponder: None,
            });
        }

        // Search has concluded, alert other thread(s) that we are no longer searching
        self.is_searching.store(false, Ordering::Relaxed);

        res
    }

    /// Sends a [`UciResponse`] to `stdout`.
    #[inline(always)]
    fn send_response<T: fmt::Display>(&self, response: UciResponse<T>) {
        println!("{response}");
    }

    /// Helper to send a [`UciInfo`] containing only a `string` message to `stdout`.
    #[inline(always)]
    fn send_string<T: fmt::Display>(&self, string: T) {
        self.send_response(UciResponse::info_string(string));
    }

    /// Sends the limits of this search as `info string`s.
    fn send_start_info(&self, position: &Position) {
        self.send_string(format!("Starting search on {:?}", position.to_fen()));

        let soft = self.config.soft_timeout;
        let hard = self.config.hard_timeout;
        let nodes = self.config.max_nodes;
        let depth = self.config.max_depth;

        if soft < Duration::MAX {
            self.send_string(format!("Soft timeout := {}ms", soft.as_millis()));
        }
        if hard < Duration::MAX {
            self.send_string(format!("Hard timeout := {}ms", hard.as_millis()));
        }
        if nodes < u64::MAX {
            self.send_string(format!("Max nodes := {nodes} nodes"));
        }
        if depth < MAX_DEPTH {
            self.send_string(format!("Max depth := {depth}"));
        }
    }

    /// Sends UCI info about a completed iteration.
    #[inline(always)]
    fn send_iteration_info(&self, result: &SearchResult) {
        let elapsed = self.config.starttime.elapsed();
        let nps = (self.nodes as f32 / elapsed.as_secs_f32().max(f32::EPSILON)).trunc();

        let info = UciInfo::new()
            .depth(result.depth)
            .nodes(self.nodes)
            .score(result.score.into_uci())
            .nps(nps)
            .time(elapsed.as_millis())
            .pv(result.pv.moves().iter().map(|mv| mv.to_string()));

        self.send_response(UciResponse::info(info));
    }

    /// Performs [iterative deepening](https://www.chessprogramming.org/Iterative_Deepening) (ID) on the position.
    ///
    /// Searches at depth 1, then 2, and so on while time remains. After each iteration, if the
    /// `soft_timeout` is exceeded, no deeper search is started. An iteration that is cancelled part
    /// way through is thrown away and the result of the previous one is returned.
    fn iterative_deepening(&mut self, position: &mut Position) -> SearchResult {
        let root_moves = position.legal_moves();

        // Initialize `bestmove` to the first move available
        let mut result = SearchResult {
            bestmove: root_moves.first().copied(),
            ..Default::default()
        };

        // Terminal positions need no search
        if root_moves.is_empty() {
            result.score = if position.in_check() {
                Score::mated_in(0)
            } else {
                Score::DRAW
            };
            return result;
        }

        if let Some(tb_result) = self.probe_root_tablebase(position, &root_moves) {
            return tb_result;
        }

        for depth in 1..=self.config.max_depth {
            // Not enough time for another iteration
            if self.has_result && self.config.starttime.elapsed() >= self.config.soft_timeout {
                break;
            }

            let mut pv = PrincipalVariation::default();
            let score = self.negamax::<RootNode>(position, depth, 0, SearchBounds::default(), &mut pv);

            // If we've ran out of time, we shouldn't update the score, because the last search iteration was forcibly cancelled.
            // Instead, we should break out of the ID loop, using the result from the previous iteration
            if self.cancelled {
                tracing::debug!(depth, nodes = self.nodes, "search cancelled");
                if Log::DEBUG {
                    self.send_string(format!(
                        "Search cancelled during depth {depth}; falling back to depth {}",
                        result.depth
                    ));
                }
                break;
            }

            result.score = score;
            result.depth = depth;
            if let Some(mv) = pv.first() {
                result.bestmove = Some(mv);
            }
            result.pv = pv;
            self.has_result = true;

            // Send search info to the GUI
            if Log::INFO {
                self.send_iteration_info(&result);
            }

            // Re-check the stop conditions that are ignored during the first iteration
            if self.search_cancelled() {
                break;
            }
        }

        // Transfer the node count
        result.nodes = self.nodes;

        result
    }

    /// Answers the search from the tablebase, if one is enabled and knows the root position.
    fn probe_root_tablebase(
        &mut self,
        position: &Position,
        root_moves: &MoveList,
    ) -> Option<SearchResult> {
        let tablebase = self.tablebase.filter(|_| self.config.egtb)?;
        if !tablebase.can_probe(position) {
            return None;
        }

        let entry = tablebase.probe(position)?;
        let bestmove = entry.bestmove.filter(|mv| root_moves.contains(mv))?;

        tracing::debug!(fen = %position.to_fen(), %bestmove, result = ?entry.result, "tablebase hit at root");

        let mut pv = PrincipalVariation::default();
        pv.extend(bestmove, &PrincipalVariation::default());

        let result = SearchResult {
            nodes: 1,
            bestmove: Some(bestmove),
            score: entry.result.score(0),
            depth: 1,
            pv,
        };

        if Log::INFO {
            self.send_iteration_info(&result);
        }

        Some(result)
    }

    /// Primary location of search logic.
    ///
    /// Uses the [negamax](https://www.chessprogramming.org/Negamax) algorithm in a [fail soft](https://www.chessprogramming.org/Alpha-Beta#Negamax_Framework) framework.
    fn negamax<Node: NodeType>(
        &mut self,
        position: &mut Position,
        depth: u8,
        ply: usize,
        mut bounds: SearchBounds,
        pv: &mut PrincipalVariation,
    ) -> Score {
        // Clear any nodes in this PV, since we're searching from a new position
        pv.clear();

        if !Node::ROOT {
            // Repetitions and the fifty move rule end the game where they stand
            if position.is_repetition()
                || position.can_draw_by_fifty()
                || position.can_draw_by_insufficient_material()
            {
                return Score::DRAW;
            }

            if ply >= MAX_DEPTH as usize {
                return evaluate(position, position.side_to_move());
            }

            if let Some(score) = self.probe_tablebase(position, ply) {
                return score;
            }
        }

        /****************************************************************************************************
         * Check Extensions: https://www.chessprogramming.org/Check_Extensions
         *
         * Never stop searching in check; a position mid-check cannot be evaluated statically.
         ****************************************************************************************************/
        let in_check = position.in_check();
        let depth = if in_check { depth.saturating_add(1) } else { depth };

        /****************************************************************************************************
         * Quiescence Search: https://www.chessprogramming.org/Quiescence_Search
         ****************************************************************************************************/
        if depth == 0 {
            return self.quiescence(position, ply, bounds);
        }

        self.count_node();

        /****************************************************************************************************
         * TT Cutoffs: https://www.chessprogramming.org/Transposition_Table#Transposition_Table_Cutoffs
         ****************************************************************************************************/
        let key = position.key();
        let mut tt_move = None;
        if let Some((mv, score, _)) = self.ttable.probe(key, depth, ply, bounds) {
            tt_move = mv;

            // Do not cut off in PV nodes, to keep the PV intact
            if let Some(score) = score.filter(|_| !Node::PV) {
                return score;
            }
        }

        // In check, only evasions are generated
        let mut moves = if in_check {
            generate_quiet_or_tactical(position)
        } else {
            generate_all(position)
        };

        // Shuffling before a stable sort randomizes the order of equally-scored moves
        if Node::ROOT && self.config.randomize {
            moves.shuffle(&mut self.rng);
        }

        MoveScorer {
            position,
            tt_move,
            killers: &self.killers,
            history: self.history,
            ply,
        }
        .sort(&mut moves);

        let original_alpha = bounds.alpha;
        let mut best = -Score::INF;
        let mut bestmove = None;
        let mut local_pv = PrincipalVariation::default();
        let mut quiets_searched = MoveList::new();
        let mut legal_moves = 0;
        let mut skipped_cutoff = false;

        /****************************************************************************************************
         * Primary move loop
         ****************************************************************************************************/
        for mv in moves {
            if !position.is_legal(mv) {
                continue;
            }
            legal_moves += 1;

            position.make_move(mv);
            let new_depth = depth - 1;
            let mut score = Score::DRAW;

            /****************************************************************************************************
             * Principal Variation Search: https://en.wikipedia.org/wiki/Principal_variation_search#Pseudocode
             *
             * We assume our move ordering is so good that the first move searched is the best available. So,
             * every other move is searched with a null window. If one beats it, we have to do a costly re-search.
             ****************************************************************************************************/
            if !Node::PV || legal_moves > 1 {
                score = -self.negamax::<NonPvNode>(
                    position,
                    new_depth,
                    ply + 1,
                    -bounds.null_alpha(),
                    &mut local_pv,
                );
            }

            if Node::PV && (legal_moves == 1 || (score > bounds.alpha && score < bounds.beta)) {
                score = -self.negamax::<PvNode>(position, new_depth, ply + 1, -bounds, &mut local_pv);
            }

            position.undo_move();

            // A cancelled child returns garbage; unwind without using it
            if self.cancelled {
                return best;
            }

            // Artificial weakening: overlook this refutation entirely
            if !Node::ROOT && score >= bounds.beta && self.skip_cutoff() {
                skipped_cutoff = true;
                continue;
            }

            /****************************************************************************************************
             * Score evaluation & bounds adjustments
             ****************************************************************************************************/
            if score > best {
                best = score;

                // PV found
                if score > bounds.alpha {
                    bounds.alpha = score;
                    bestmove = Some(mv);

                    // Only extend the PV if we're in a PV node
                    if Node::PV {
                        pv.extend(mv, &local_pv);
                    }
                }

                // Fail high
                if score >= bounds.beta {
                    if mv.is_quiet() {
                        self.reward_quiet(position, mv, &quiets_searched, depth, ply);
                    }
                    break;
                }
            }

            if mv.is_quiet() {
                // Capacity matches the largest possible move list
                let _ = quiets_searched.try_push(mv);
            }
        }

        // If there are no legal moves, it's either mate or a draw.
        if legal_moves == 0 {
            return if in_check {
                // Offset by ply to prefer earlier mates
                Score::mated_in(ply)
            } else {
                // Drawing is better than losing
                Score::DRAW
            };
        }

        // Every move was overlooked
        if best == -Score::INF {
            return original_alpha;
        }

        // Artificial results are not worth remembering
        if !skipped_cutoff {
            self.ttable.record(
                key,
                bestmove,
                best,
                SearchBounds::new(original_alpha, bounds.beta),
                depth,
                ply,
            );
        }

        best
    }

    /// Quiescence Search (QSearch)
    ///
    /// A search that looks only at captures and promotions, or at every evasion when in check.
    /// This is called when [`Search::negamax`] reaches a depth of 0, and has no depth limit of its own.
    fn quiescence(&mut self, position: &mut Position, ply: usize, mut bounds: SearchBounds) -> Score {
        self.count_node();

        let stm = position.side_to_move();
        if ply >= MAX_DEPTH as usize {
            return evaluate(position, stm);
        }

        let in_check = position.in_check();

        // Evaluate the current position, to serve as our baseline. In check, standing still is not an option.
        let mut best = if in_check {
            -Score::INF
        } else {
            let stand_pat = evaluate(position, stm);

            // Beta cutoff; this position is "too good" and our opponent would never let us get here
            if stand_pat >= bounds.beta {
                return stand_pat;
            }
            if stand_pat > bounds.alpha {
                bounds.alpha = stand_pat;
            }
            stand_pat
        };

        let mut moves = generate_quiet_or_tactical(position);
        let tt_move = self.ttable.get(position.key()).and_then(|entry| entry.bestmove);
        MoveScorer {
            position,
            tt_move,
            killers: &self.killers,
            history: self.history,
            ply,
        }
        .sort(&mut moves);

        let mut legal_moves = 0;

        for mv in moves {
            // Captures that lose material can't raise the stand-pat score
            if !in_check && mv.is_capture() && see(position, mv) < 0 {
                continue;
            }

            if !position.is_legal(mv) {
                continue;
            }
            legal_moves += 1;

            position.make_move(mv);
            let score = -self.quiescence(position, ply + 1, -bounds);
            position.undo_move();

            if self.cancelled {
                return best;
            }

            if score > best {
                best = score;

                if score > bounds.alpha {
                    bounds.alpha = score;
                }

                if score >= bounds.beta {
                    break;
                }
            }
        }

        // Every evasion was searched, so none means mate
        if in_check && legal_moves == 0 {
            return Score::mated_in(ply);
        }

        best // fail-soft
    }

    /// Counts a visited node, polling the stop conditions every [`NODE_CHECK_INTERVAL`] nodes.
    #[inline(always)]
    fn count_node(&mut self) {
        self.nodes += 1;

        // The first iteration always completes, so there is always a result to fall back on
        if self.has_result && self.nodes % NODE_CHECK_INTERVAL == 0 && self.search_cancelled() {
            self.cancelled = true;
        }
    }

    /// Checks if we've exceeded any conditions that would warrant the search to end.
    #[inline(always)]
    fn search_cancelled(&self) -> bool {
        // Condition 1: We've exceeded the hard limit of our allotted search time
        self.config.starttime.elapsed() >= self.config.hard_timeout ||
        // Condition 2: The search was stopped by an external factor, like the `stop` command
        !self.is_searching.load(Ordering::Relaxed) ||
        // Condition 3: We've exceeded the maximum amount of nodes we're allowed to search
        self.nodes >= self.config.max_nodes
    }

    /// Rolls the pruning chance. Never touches the RNG when the chance is zero.
    #[inline(always)]
    fn skip_cutoff(&mut self) -> bool {
        let chance = self.config.prune_chance.min(100);
        chance > 0 && self.rng.random_bool(chance as f64 / 100.0)
    }

    /// Scores the position from the tablebase, if enabled and covered.
    #[inline(always)]
    fn probe_tablebase(&self, position: &Position, ply: usize) -> Option<Score> {
        let tablebase = self.tablebase.filter(|_| self.config.egtb)?;
        if !tablebase.can_probe(position) {
            return None;
        }

        tablebase.probe(position).map(|entry| entry.result.score(ply))
    }

    /****************************************************************************************************
     * Killers and History Heuristic
     *
     * If a quiet move fails high, it is probably a good move. Therefore we want to look at it early on
     * in future searches. We also penalize previously-searched quiets, since they are clearly not as good
     * as this one (as they did not cause a beta cutoff).
     ****************************************************************************************************/
    #[inline(always)]
    fn reward_quiet(
        &mut self,
        position: &Position,
        mv: Move,
        quiets_searched: &[Move],
        depth: u8,
        ply: usize,
    ) {
        let stm = position.side_to_move();
        let bonus = HistoryTable::bonus(depth);

        self.killers.store(ply, mv);
        self.history.update(stm, mv, bonus);

        for quiet in quiets_searched {
            self.history.update(stm, *quiet, -bonus);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::*;

    fn run_search(fen: &str, config: SearchConfig) -> SearchResult {
        let is_searching = Arc::new(AtomicBool::new(true));
        let mut position = Position::from_fen(fen).unwrap();

        let mut ttable = TTable::new(1);
        let mut history = HistoryTable::default();
        let res = Search::<LogNone>::new(is_searching, config, &mut ttable, &mut history)
            .start(&mut position)
            .unwrap();

        assert_eq!(position.to_fen(), fen, "search must restore the position");
        res
    }

    fn ensure_is_mate_in(fen: &str, config: SearchConfig, moves: i32) -> SearchResult {
        let res = run_search(fen, config);
        assert!(
            res.score.is_mate(),
            "Search on {fen:?} with config {config:#?} produced result that is not mate.\nResult: {res:#?}"
        );
        assert_eq!(
            res.score.moves_to_mate(),
            moves,
            "Search on {fen:?} with config {config:#?} produced result not mate in {moves}.\nResult: {res:#?}"
        );
        res
    }

    #[test]
    fn test_white_mate_in_1() {
        let fen = "k7/8/KQ6/8/8/8/8/8 w - - 0 1";
        let config = SearchConfig {
            max_depth: 2,
            ..Default::default()
        };

        // Both Queen moves next to the King mate
        let res = ensure_is_mate_in(fen, config, 1);
        let bestmove = res.bestmove.unwrap().to_string();
        assert!(bestmove == "b6a7" || bestmove == "b6b7", "{bestmove}");
    }

    #[test]
    fn test_black_mated_in_1() {
        let fen = "1k6/8/KQ6/2Q5/8/8/8/8 b - - 0 1";
        let config = SearchConfig {
            max_depth: 3,
            ..Default::default()
        };

        let res = ensure_is_mate_in(fen, config, -1);
        assert_eq!(res.bestmove.unwrap().to_string(), "b8a8");
    }

    #[test]
    fn test_stalemate() {
        let fen = "k7/8/KQ6/8/8/8/8/8 b - - 0 1";
        let res = run_search(fen, SearchConfig::default());
        assert!(res.bestmove.is_none());
        assert_eq!(res.score, Score::DRAW);
    }

    #[test]
    fn test_obvious_capture_promote() {
        // Pawn should take queen and also promote to queen
        let fen = "3q1n2/4P3/8/8/8/8/k7/7K w - - 0 1";
        let config = SearchConfig {
            max_depth: 1,
            ..Default::default()
        };

        let res = run_search(fen, config);
        assert_eq!(res.bestmove.unwrap().to_string(), "e7d8q");
    }

    #[test]
    fn test_quick_search_finds_move() {
        // If *any* legal move is available, it should be found, regardless of how much time was given.
        let config = SearchConfig {
            soft_timeout: Duration::from_millis(0),
            hard_timeout: Duration::from_millis(0),
            ..Default::default()
        };

        let res = run_search(FEN_STARTPOS, config);
        assert!(res.bestmove.is_some());
        assert_eq!(res.depth, 1);
    }

    #[test]
    fn test_pv_starts_with_bestmove() {
        let config = SearchConfig {
            max_depth: 4,
            ..Default::default()
        };

        let res = run_search(FEN_KIWIPETE, config);
        assert_eq!(res.pv.first(), res.bestmove);
        assert!(!res.pv.moves().is_empty());
    }

    #[test]
    fn test_pv_extend_truncates() {
        let pos = Position::default();
        let mv = pos.legal_moves()[0];

        let mut long = PrincipalVariation::default();
        for _ in 0..MAX_DEPTH {
            long.0.push(mv);
        }

        let mut pv = PrincipalVariation::default();
        pv.extend(mv, &long);
        assert_eq!(pv.moves().len(), MAX_DEPTH as usize);
    }
}
