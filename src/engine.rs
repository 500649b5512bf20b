/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    fmt,
    io::{self, Write},
    str::FromStr,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{channel, Receiver, Sender},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use uci_parser::{UciCommand, UciOption, UciResponse, UciSearchOptions};

use crate::{
    perft, splitperft, BoardError, EngineCommand, Evaluator, HistoryTable, LogDebug, LogInfo,
    LogLevel, LogNone, Move, MoveError, NoTablebase, Position, Search, SearchConfig, SearchResult,
    Square, TTable, Tablebase, MAX_DEPTH,
};

/// Default depth at which to run the benchmark searches.
const BENCH_DEPTH: u8 = 6;

/// Positions searched by the `bench` command.
pub const BENCHMARK_FENS: [&str; 12] = [
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
    "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
    "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
    "r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4",
    "2r3k1/pp3ppp/2n1b3/q2pP3/3P4/P1PB1N2/5PPP/R2Q1RK1 b - - 1 18",
    "6k1/5ppp/8/8/8/8/5PPP/3R2K1 w - - 0 1",
    "8/8/1k6/2b5/2pP4/8/5K2/8 b - d3 0 1",
    "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1",
    "3q1n2/4P3/8/8/8/8/k7/7K w - - 0 1",
];

/// Search parameters that persist between searches.
///
/// These are set on startup or through `setoption`, and are applied on top of the limits of each `go` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Deepest iteration any search may start. `None` is unlimited.
    pub depth: Option<u8>,

    /// Longest any search may run. `None` is unlimited.
    pub movetime: Option<Duration>,

    /// Pick at random among equally good root moves.
    pub randomize: bool,

    /// Consult the endgame tablebase.
    pub egtb: bool,

    /// Percent chance of overlooking a refutation, to weaken play.
    pub prune_chance: u8,

    /// Size of the transposition table, in megabytes.
    pub hash: usize,
}

impl EngineOptions {
    /// Narrows the limits of `config` to those of these options, and copies over the search toggles.
    pub fn apply(&self, config: &mut SearchConfig) {
        if let Some(depth) = self.depth {
            config.max_depth = config.max_depth.min(depth.clamp(1, MAX_DEPTH));
        }

        if let Some(movetime) = self.movetime {
            config.soft_timeout = config.soft_timeout.min(movetime);
            config.hard_timeout = config.hard_timeout.min(movetime);
        }

        config.randomize = self.randomize;
        config.egtb = self.egtb;
        config.prune_chance = self.prune_chance;
    }

    /// Sets the search option `name` to `value`.
    ///
    /// Spin options use `0` to mean "no limit". Check options toggle if no value is given.
    pub fn set(&mut self, name: &str, value: Option<&str>) -> Result<()> {
        match name {
            "Depth" => {
                let depth: u8 = parse_value(name, value)?;
                if depth > MAX_DEPTH {
                    bail!("Maximum value for {name} is {MAX_DEPTH}");
                }
                self.depth = (depth > 0).then_some(depth);
            }

            "MoveTime" => {
                let ms: u64 = parse_value(name, value)?;
                self.movetime = (ms > 0).then(|| Duration::from_millis(ms));
            }

            "Randomize" => self.randomize = parse_toggle(name, value, self.randomize)?,

            "EGTB" => self.egtb = parse_toggle(name, value, self.egtb)?,

            "PruneChance" => {
                let chance: u8 = parse_value(name, value)?;
                if chance > 100 {
                    bail!("{name} is a percentage. got {chance}");
                }
                self.prune_chance = chance;
            }

            "Hash" => {
                let mb: usize = parse_value(name, value)?;

                // Ensure the value is within bounds
                if mb < TTable::MIN_SIZE {
                    bail!("Minimum value for {name} is {}mb", TTable::MIN_SIZE);
                }
                if mb > TTable::MAX_SIZE {
                    bail!("Maximum value for {name} is {}mb", TTable::MAX_SIZE);
                }
                self.hash = mb;
            }

            _ => bail!("Unrecognized option {name:?}"),
        }

        Ok(())
    }

    /// Returns the current value of the option `name`, if it exists.
    pub fn get(&self, name: &str) -> Option<String> {
        let value = match name {
            "Depth" => self.depth.unwrap_or(0).to_string(),
            "MoveTime" => self.movetime.map_or(0, |t| t.as_millis()).to_string(),
            "Randomize" => self.randomize.to_string(),
            "EGTB" => self.egtb.to_string(),
            "PruneChance" => self.prune_chance.to_string(),
            "Hash" => self.hash.to_string(),
            _ => return None,
        };

        Some(value)
    }
}

impl Default for EngineOptions {
    #[inline(always)]
    fn default() -> Self {
        Self {
            depth: None,
            movetime: None,
            randomize: false,
            egtb: false,
            prune_chance: 0,
            hash: TTable::DEFAULT_SIZE,
        }
    }
}

/// Parses the value of option `name`, failing with a usage message if it is missing or malformed.
fn parse_value<T: FromStr>(name: &str, value: Option<&str>) -> Result<T> {
    let Some(value) = value else {
        bail!("usage: setoption name {name} value <value>");
    };

    match value.trim().parse() {
        Ok(parsed) => Ok(parsed),
        Err(_) => bail!("invalid value for {name}: {value:?}"),
    }
}

/// Parses a check option, flipping `current` if no value was given.
fn parse_toggle(name: &str, value: Option<&str>, current: bool) -> Result<bool> {
    match value {
        Some(_) => parse_value(name, value),
        None => Ok(!current),
    }
}

/// The Corvid chess engine.
pub struct Engine {
    /// The current state of the chess board, as known to the engine.
    ///
    /// This is modified whenever moves are played or new positions are given,
    /// and is reset whenever the engine is told to start a new game.
    position: Position,

    /// One half of a channel, responsible for sending commands to the engine to execute.
    sender: Sender<EngineCommand>,

    /// One half of a channel, responsible for receiving commands for the engine to execute.
    receiver: Receiver<EngineCommand>,

    /// Atomic flag to determine whether a search is currently running
    is_searching: Arc<AtomicBool>,

    /// Handle to the currently-running search thread, if one exists.
    search_thread: Option<JoinHandle<Result<SearchResult, BoardError>>>,

    /// Transposition table used to cache information found during search.
    ttable: Arc<Mutex<TTable>>,

    /// History table for keeping track of good/bad moves during search.
    history: Arc<Mutex<HistoryTable>>,

    /// Endgame knowledge, consulted when `options.egtb` is set.
    tablebase: Arc<dyn Tablebase>,

    /// Search parameters applied to every search.
    options: EngineOptions,

    /// Whether to display extra information during execution.
    debug: bool,
}

impl Engine {
    /// Constructs a new [`Engine`] instance to be executed with [`Engine::run`].
    #[inline(always)]
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    /// Constructs a new [`Engine`] that searches with the supplied options.
    pub fn with_options(options: EngineOptions) -> Self {
        // Construct a channel for communication
        let (sender, receiver) = channel();

        Self {
            position: Position::default(),
            sender,
            receiver,
            is_searching: Arc::default(),
            search_thread: None,
            ttable: Arc::new(Mutex::new(TTable::new(options.hash))),
            history: Arc::default(),
            tablebase: Arc::new(NoTablebase),
            options,
            debug: false,
        }
    }

    /// Installs a tablebase for searches to consult.
    #[inline(always)]
    pub fn with_tablebase(mut self, tablebase: Arc<dyn Tablebase>) -> Self {
        self.tablebase = tablebase;
        self
    }

    /// Sets whether extra diagnostics are printed.
    #[inline(always)]
    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// The position searches will start from.
    #[inline(always)]
    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Returns a string of the engine's name and current version.
    #[inline(always)]
    pub fn name(&self) -> String {
        format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }

    /// Returns a string of all authors of this engine.
    #[inline(always)]
    pub fn authors(&self) -> String {
        // Split multiple authors by comma-space
        env!("CARGO_PKG_AUTHORS").replace(':', ", ").to_string()
    }

    /// Sends an [`EngineCommand`] to the engine to be executed.
    #[inline(always)]
    pub fn send_command(&self, command: EngineCommand) {
        // The receiver lives as long as the engine does
        if let Err(err) = self.sender.send(command) {
            tracing::error!(%err, "engine command channel closed");
        }
    }

    /// Entrypoint of the engine.
    ///
    /// This function first spawns a new thread that handles user input from `stdin`.
    /// It then loops on commands received by the engine, executing them in the order received.
    /// Commands queued with [`Engine::send_command`] before this is called run first.
    pub fn run(&mut self) -> Result<()> {
        // Spawn a separate thread for handling user input
        let sender = self.sender.clone();
        thread::spawn(|| {
            if let Err(err) = input_handler(sender) {
                tracing::warn!("Input handler thread stopping: {err:#}");
            }
        });

        // Execute commands as they are received
        while let Ok(cmd) = self.receiver.recv() {
            tracing::trace!(?cmd, "received command");

            match cmd {
                EngineCommand::Bench { depth, pretty } => self.bench(depth, pretty)?,

                EngineCommand::Display => println!("{}", self.position),

                EngineCommand::Eval { pretty } => self.eval(pretty),

                EngineCommand::Exit { cleanup } => {
                    // If requested, await the completion of any ongoing search threads
                    if cleanup {
                        self.stop_search();
                    }

                    // Exit the loop so the engine can quit
                    break;
                }

                EngineCommand::Fen => println!("{}", self.position.to_fen()),

                EngineCommand::Flip => self.flip(),

                EngineCommand::HashInfo => self.hash_info(),

                EngineCommand::MakeMove { mv_string } => {
                    if let Err(e) = self.play(&mv_string) {
                        eprintln!("{e:#}");
                    }
                }

                EngineCommand::Moves { square, sort, san } => self.moves(square, sort, san),

                EngineCommand::Option { name } => {
                    let name = name.join(" ");
                    if let Some(value) = self.get_option(&name) {
                        println!("{name} := {value}");
                    } else {
                        println!("{} has no option {name:?}", self.name());
                    }
                }

                EngineCommand::Perft { depth } => {
                    println!("{}", perft(&mut self.position, depth))
                }

                EngineCommand::Splitperft { depth } => self.splitperft(depth),

                EngineCommand::Uci { cmd } => {
                    // Keep running, even on error
                    if let Err(e) = self.handle_uci_command(cmd) {
                        eprintln!("Error: {e:#}");
                    }
                }

                EngineCommand::Wait => _ = self.stop_search(),
            }
        }

        Ok(())
    }

    /// Handle the execution of a single [`UciCommand`].
    fn handle_uci_command(&mut self, uci: UciCommand) -> Result<()> {
        use UciCommand::*;
        match uci {
            Uci => self.uci(),

            Debug(status) => self.debug = status,

            IsReady => println!("{}", UciResponse::<&str>::ReadyOk),

            SetOption { name, value } => self.set_option(&name, value.as_deref())?,

            UciNewGame => self.new_game(),

            Go(options) => {
                if let Some(depth) = options.perft {
                    self.splitperft(depth as usize);
                    return Ok(());
                }

                let config = self.search_config(options);
                let handle = if self.debug {
                    self.start_search::<LogDebug>(config)
                } else {
                    self.start_search::<LogInfo>(config)
                };

                // A refused `go` must not orphan the search that is still running
                if handle.is_some() {
                    self.search_thread = handle;
                }
            }

            Position { fen, moves } => self.set_position(fen, moves)?,

            Stop => self.set_is_searching(false),

            Quit => self.send_command(EngineCommand::Exit { cleanup: false }),

            _ => bail!("{} does not support UCI command {uci:?}", self.name()),
        }

        Ok(())
    }

    /// Builds the configuration of a search from the limits of a `go` command and the engine's options.
    pub fn search_config(&self, options: UciSearchOptions) -> SearchConfig {
        let mut config = SearchConfig::new(options, &self.position);
        self.options.apply(&mut config);
        config
    }

    /// Execute the `bench` command, running a benchmark of a fixed search on a series of positions and displaying the results.
    fn bench(&mut self, depth: Option<u8>, pretty: bool) -> Result<()> {
        // Set up the benchmarking config
        let config = SearchConfig {
            max_depth: depth.unwrap_or(BENCH_DEPTH).clamp(1, MAX_DEPTH),
            ..Default::default()
        };

        let benches = BENCHMARK_FENS;
        let mut nodes = 0;
        let saved = self.position.clone();

        // Padding for printing FENs
        let width = benches.iter().map(|fen| fen.len()).max().unwrap_or_default();

        println!(
            "Running fixed-depth search (d={}) on {} positions",
            config.max_depth,
            benches.len()
        );

        // Run a fixed search on each position
        for (i, fen) in benches.into_iter().enumerate() {
            print!("{:>2}/{:>2}: {fen:<width$} := ", i + 1, benches.len());
            // flush stdout so the node count will appear on the same line after search concludes
            io::stdout().lock().flush()?;

            // Each bench is essentially a new game, so reset hash tables, etc.
            self.new_game();
            self.position = Position::from_fen(fen)?;
            self.search_thread = self.start_search::<LogNone>(config);

            // Await the search, appending the node count once concluded.
            let res = self
                .stop_search()
                .with_context(|| format!("Search failed while running benchmarks on fen {fen}"))?;
            nodes += res.nodes;
            println!("{}", res.nodes);
        }

        // Compute results
        let elapsed = config.starttime.elapsed();
        let secs = elapsed.as_secs_f32().max(f32::EPSILON);
        let nps = (nodes as f32 / secs) as u64;
        let m_nps = nodes as f32 / secs / 1_000_000.0;
        let ms = elapsed.as_millis();

        if pretty {
            // Display the results in a nice table
            println!();
            println!("+-- Benchmark Complete --+");
            println!("| time (ms)  {ms:<12}|");
            println!("|     nodes  {nodes:<12}|");
            println!("|       nps  {nps:<12}|");
            println!("|      Mnps  {m_nps:<12.2}|");
            println!("+------------------------+");
        } else {
            println!("{nodes} nodes / {elapsed:?} := {nps} nps");
        }

        // Re-set the internal game state.
        self.new_game();
        self.position = saved;

        Ok(())
    }

    /// Executes the `eval` command, printing an evaluation of the current position.
    fn eval(&self, pretty: bool) {
        let evaluator = Evaluator::new(&self.position);
        if pretty {
            println!("{evaluator}");
        } else {
            println!("{}", evaluator.eval());
        }
    }

    /// Executes the `flip` command, passing the turn to the other side.
    fn flip(&mut self) {
        // Passing while in check would let the King be captured
        if self.position.in_check() {
            eprintln!("Cannot flip the side to move while in check");
            return;
        }

        self.position.make_null_move();
    }

    /// Display info about the internal hash table(s)
    fn hash_info(&self) {
        println!("{}", self.ttable());
    }

    /// Clears all hash tables in the engine.
    ///
    /// Called in between games.
    #[inline(always)]
    fn clear_hash_tables(&mut self) {
        self.ttable().clear();
        self.history().clear();
    }

    /// Executes the `move` command, accepting either coordinate or algebraic notation.
    fn play(&mut self, notation: &str) -> Result<Move, MoveError> {
        let mv = Move::from_uci(&self.position, notation)
            .or_else(|_| Move::from_san(&self.position, notation))?;
        self.position.make_move(mv);
        Ok(mv)
    }

    /// Executes the `moves` command, displaying all available moves on the board, or for the given square.
    fn moves(&self, square: Option<Square>, sort: bool, san: bool) {
        let mut moves = self
            .position
            .legal_moves()
            .into_iter()
            .filter(|mv| square.is_none_or(|sq| mv.from() == sq))
            .map(|mv| {
                if san {
                    mv.to_san(&self.position)
                } else {
                    mv.to_string()
                }
            })
            .collect::<Vec<_>>();

        // Sort alphabetically, if necessary
        if sort {
            moves.sort();
        }

        // If there are none, print "(none)"
        if moves.is_empty() {
            println!("(none)");
        } else {
            println!("{}", moves.join(", "));
        }
    }

    /// Executes the `splitperft` command, printing the node count beneath every legal move.
    fn splitperft(&mut self, depth: usize) {
        let start = std::time::Instant::now();
        let split = splitperft(&mut self.position, depth);
        let elapsed = start.elapsed();

        let mut total = 0;
        for (mv, nodes) in &split {
            println!("{mv}\t{nodes}");
            total += nodes;
        }

        let nps = (total as f64 / elapsed.as_secs_f64().max(f64::EPSILON)) as u64;
        println!("\n{total} nodes / {elapsed:?} := {nps} nps");
    }

    /// Resets the engine's internal game state.
    ///
    /// This clears all internal caches and hash tables, as well as search history.
    /// It also cancels any ongoing searches, ignoring their results.
    #[inline(always)]
    fn new_game(&mut self) {
        self.set_is_searching(false);
        self.stop_search();
        self.clear_hash_tables();
        self.position = Position::default();
    }

    /// Set the position to the supplied FEN string (defaults to the standard startpos if not supplied),
    /// and then apply `moves` one-by-one to the position.
    ///
    /// On error, the current position is left untouched.
    pub fn set_position<T: AsRef<str>>(
        &mut self,
        fen: Option<T>,
        moves: impl IntoIterator<Item = T>,
    ) -> Result<()> {
        // Set the new position
        let mut position = if let Some(fen) = fen {
            Position::from_fen(fen.as_ref())?
        } else {
            Position::default()
        };

        // Apply the provided moves
        for mv_str in moves {
            let mv_str = mv_str.as_ref();
            let mv = Move::from_uci(&position, mv_str)
                .with_context(|| format!("Failed to apply move {mv_str:?}"))?;
            position.make_move(mv);
        }

        self.position = position;
        Ok(())
    }

    /// Sets the search flag to signal that the engine is starting/stopping a search.
    #[inline(always)]
    fn set_is_searching(&mut self, status: bool) {
        self.is_searching.store(status, Ordering::Relaxed);
    }

    /// Returns `true` if the engine is currently executing a searching.
    #[inline(always)]
    fn is_searching(&self) -> bool {
        self.is_searching.load(Ordering::Relaxed)
    }

    /// Starts a search on the current position, given the parameters in `config`.
    fn start_search<Log: LogLevel>(
        &mut self,
        config: SearchConfig,
    ) -> Option<JoinHandle<Result<SearchResult, BoardError>>> {
        // Cannot start a search if one is already running
        if self.is_searching() {
            Self::send_string("A search is already running");
            return None;
        }

        // Reap the last search, if it was never awaited
        self.stop_search();
        self.set_is_searching(true);

        // Clone the parameters that will be sent into the thread
        let mut position = self.position.clone();
        let is_searching = Arc::clone(&self.is_searching);
        let ttable = Arc::clone(&self.ttable);
        let history = Arc::clone(&self.history);
        let tablebase = Arc::clone(&self.tablebase);

        tracing::debug!(fen = %position.to_fen(), ?config, "starting search");

        // Spawn a thread to conduct the search
        let handle = thread::spawn(move || {
            // Lock the hash tables at the start of the search so that only the search thread may modify them
            let mut ttable = ttable.lock().unwrap_or_else(PoisonError::into_inner);
            let mut history = history.lock().unwrap_or_else(PoisonError::into_inner);

            // Start the search, returning the result when completed.
            Search::<Log>::new(is_searching, config, &mut ttable, &mut history)
                .with_tablebase(tablebase.as_ref())
                .start(&mut position)
        });

        Some(handle)
    }

    /// Awaits the current search thread, blocking until it finishes and returning its result.
    fn stop_search(&mut self) -> Option<SearchResult> {
        // Can't stop a search if there aren't any threads searching!
        let handle = self.search_thread.take()?;

        // Attempt to join the thread handle to retrieve the result
        let id = handle.thread().id();
        let joined = handle.join();

        // Flip the search flag so that any active threads will (hopefully) begin to clean themselves up.
        self.set_is_searching(false);

        match joined {
            Ok(Ok(res)) => {
                tracing::debug!(nodes = res.nodes, depth = res.depth, "search finished");
                Some(res)
            }
            Ok(Err(err)) => {
                tracing::error!(%err, "search aborted");
                Self::send_string(format!("Search aborted: {err}"));
                None
            }
            Err(_) => {
                Self::send_string(format!("Failed to join on thread {id:?}"));
                None
            }
        }
    }

    /// Called when the engine receives the `uci` command.
    ///
    /// Prints engine's ID, version, and authors, and lists all UCI options.
    fn uci(&self) {
        println!("id name {}\nid author {}\n", self.name(), self.authors());

        // Print all UCI options
        for opt in self.options() {
            println!("{}", UciResponse::Option(opt));
        }

        // We're ready to go!
        println!("{}", UciResponse::<&str>::UciOk)
    }

    /// Convenience function to return an iterator over all UCI options this engine supports.
    fn options(&self) -> impl Iterator<Item = UciOption> {
        [
            UciOption::button("Clear Hash"),
            UciOption::spin(
                "Hash",
                TTable::DEFAULT_SIZE as i32,
                TTable::MIN_SIZE as i32,
                TTable::MAX_SIZE as i32,
            ),
            UciOption::spin("Threads", 1, 1, 1),
            UciOption::spin("Depth", 0, 0, MAX_DEPTH as i32),
            UciOption::spin("MoveTime", 0, 0, i32::MAX),
            UciOption::check("Randomize", false),
            UciOption::check("EGTB", false),
            UciOption::spin("PruneChance", 0, 0, 100),
        ]
        .into_iter()
    }

    /// Handles the `setoption` command, setting option `name` to `value`, or toggling it if `value` is None.
    ///
    /// Will return an error if `name` isn't a valid option or `value` is not a valid value for that option.
    pub fn set_option(&mut self, name: &str, value: Option<&str>) -> Result<()> {
        match name {
            // Clear all hash tables
            "Clear Hash" => self.clear_hash_tables(),

            // Set the number of search threads
            "Threads" => {
                let threads: usize = parse_value(name, value)?;
                if threads != 1 {
                    bail!("{} currently supports only 1 thread", self.name());
                }
            }

            _ => {
                self.options.set(name, value)?;

                // Re-size the hash table
                if name == "Hash" {
                    self.ttable().resize(self.options.hash);
                }
            }
        }

        tracing::info!(name, ?value, "option set");
        if self.debug {
            let info = if let Some(value) = value {
                format!("Option {name} set to {value}")
            } else {
                format!("Option {name} toggled")
            };
            Self::send_string(info);
        }

        Ok(())
    }

    /// Returns the current value of the option `name`, if it exists on this engine.
    pub fn get_option(&self, name: &str) -> Option<String> {
        match name {
            "Clear Hash" => Some(String::default()),
            "Threads" => Some(String::from("1")),
            _ => self.options.get(name),
        }
    }

    /// Helper to send a `string` info message to `stdout`.
    #[inline(always)]
    fn send_string<T: fmt::Display>(info: T) {
        println!("{}", UciResponse::info_string(info));
    }

    /// Helper function to fetch the TTable.
    ///
    /// A search thread that panicked cannot leave the table half-written, so a poisoned lock is still usable.
    #[inline(always)]
    fn ttable(&self) -> MutexGuard<'_, TTable> {
        self.ttable.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Helper function to fetch the History table.
    #[inline(always)]
    fn history(&self) -> MutexGuard<'_, HistoryTable> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Engine {
    #[inline(always)]
    fn default() -> Self {
        Self::new()
    }
}

/// Loops endlessly to await input via `stdin`, sending all successfully-parsed commands through the supplied `sender`.
fn input_handler(sender: Sender<EngineCommand>) -> Result<()> {
    let mut buffer = String::with_capacity(2048); // Seems like a good amount of space to pre-allocate

    loop {
        // Clear the buffer, read input, and trim the trailing newline
        buffer.clear();
        let bytes = io::stdin()
            .read_line(&mut buffer)
            .context("Failed to read line when parsing UCI commands")?;

        // For ctrl + d
        if 0 == bytes {
            // Send the Quit command and exit this function
            sender
                .send(EngineCommand::Exit { cleanup: false })
                .context("Failed to send 'quit' command after receiving empty input")?;

            bail!("Engine received input of 0 bytes and is quitting");
        }

        // Trim any leading/trailing whitespace
        let buf = buffer.trim();

        // Ignore empty lines
        if buf.is_empty() {
            continue;
        }

        match buf.parse::<EngineCommand>() {
            Ok(cmd) => sender
                .send(cmd)
                .context("Failed to send command to engine")?,

            // If an invalid command was received, just print the error and continue running
            Err(err) => eprintln!("{err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FEN_KIWIPETE, FEN_STARTPOS};

    #[test]
    fn test_options_roundtrip() {
        let mut options = EngineOptions::default();

        options.set("Depth", Some("7")).unwrap();
        options.set("MoveTime", Some("1500")).unwrap();
        options.set("PruneChance", Some("25")).unwrap();
        options.set("Randomize", None).unwrap();
        options.set("EGTB", Some("true")).unwrap();

        assert_eq!(options.depth, Some(7));
        assert_eq!(options.movetime, Some(Duration::from_millis(1500)));
        assert_eq!(options.prune_chance, 25);
        assert!(options.randomize);
        assert!(options.egtb);
        assert_eq!(options.get("MoveTime").as_deref(), Some("1500"));

        // Zero lifts the limits again
        options.set("Depth", Some("0")).unwrap();
        options.set("MoveTime", Some("0")).unwrap();
        assert_eq!(options.depth, None);
        assert_eq!(options.movetime, None);
    }

    #[test]
    fn test_bad_options_are_rejected() {
        let mut options = EngineOptions::default();

        assert!(options.set("PruneChance", Some("101")).is_err());
        assert!(options.set("Depth", Some("deep")).is_err());
        assert!(options.set("Hash", Some("0")).is_err());
        assert!(options.set("Hash", None).is_err());
        assert!(options.set("Contempt", Some("10")).is_err());
        assert_eq!(options, EngineOptions::default());
    }

    #[test]
    fn test_options_narrow_the_search() {
        let options = EngineOptions {
            depth: Some(4),
            movetime: Some(Duration::from_millis(100)),
            prune_chance: 10,
            ..Default::default()
        };

        let mut config = SearchConfig {
            max_depth: 9,
            soft_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        options.apply(&mut config);

        assert_eq!(config.max_depth, 4);
        assert_eq!(config.soft_timeout, Duration::from_millis(50));
        assert_eq!(config.hard_timeout, Duration::from_millis(100));
        assert_eq!(config.prune_chance, 10);
    }

    #[test]
    fn test_second_go_keeps_the_running_search() {
        let mut engine = Engine::new();
        let go = |engine: &mut Engine| {
            let cmd = UciCommand::new("go infinite").unwrap();
            engine.handle_uci_command(cmd).unwrap();
        };

        go(&mut engine);
        go(&mut engine);
        assert!(engine.search_thread.is_some());

        engine.set_is_searching(false);
        let res = engine.stop_search().unwrap();
        assert!(res.bestmove.is_some());
        assert!(engine.search_thread.is_none());
    }

    #[test]
    fn test_set_position_with_moves() {
        let mut engine = Engine::new();
        engine
            .set_position(None, ["e2e4", "e7e5", "g1f3"])
            .unwrap();
        assert_eq!(
            engine.position().to_fen(),
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2"
        );
    }

    #[test]
    fn test_play_accepts_both_notations() {
        let mut engine = Engine::new();
        assert_eq!(engine.play("e2e4").unwrap().to_string(), "e2e4");
        assert_eq!(engine.play("e5").unwrap().to_string(), "e7e5");
        assert_eq!(engine.play("Nf3").unwrap().to_string(), "g1f3");
        assert!(matches!(engine.play("Ke7"), Ok(_)));
        assert!(matches!(engine.play("Bb5"), Ok(_)));
        assert!(engine.play("Qh4").is_err());
        assert_eq!(
            engine.position().to_fen(),
            "rnbq1bnr/ppppkppp/8/1B2p3/4P3/5N2/PPPP1PPP/RNBQK2R b KQ - 3 3"
        );
    }

    #[test]
    fn test_bad_position_keeps_the_old_one() {
        let mut engine = Engine::new();
        engine.set_position(Some(FEN_KIWIPETE), []).unwrap();

        assert!(engine.set_position(Some("not a fen"), []).is_err());
        assert!(engine.set_position(None, ["e2e5"]).is_err());
        assert_eq!(engine.position().to_fen(), FEN_KIWIPETE);
    }

    #[test]
    fn test_engine_options() {
        let mut engine = Engine::new();
        engine.set_option("Hash", Some("2")).unwrap();
        assert_eq!(engine.get_option("Hash").as_deref(), Some("2"));
        assert!(engine.set_option("Threads", Some("4")).is_err());
        assert_eq!(engine.get_option("Nonexistent"), None);

        engine.set_option("Depth", Some("3")).unwrap();
        let mut config = SearchConfig::default();
        engine.options.apply(&mut config);
        assert_eq!(config.max_depth, 3);
        assert_eq!(engine.position().to_fen(), FEN_STARTPOS);
    }
}
