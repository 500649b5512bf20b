/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{str::FromStr, time::Duration};

use anyhow::anyhow;
use clap::Parser;
use uci_parser::{UciCommand, UciParseError};

use crate::{EngineOptions, Square, TTable};

/// Command-line arguments of the engine binary.
#[derive(Debug, Clone, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Size of the transposition table, in megabytes.
    #[arg(long, default_value_t = TTable::DEFAULT_SIZE, value_name = "MB")]
    pub hash: usize,

    /// Never search deeper than this.
    #[arg(long)]
    pub depth: Option<u8>,

    /// Never search longer than this many milliseconds.
    #[arg(long, value_name = "MS")]
    pub movetime: Option<u64>,

    /// Pick at random among equally good moves.
    #[arg(long, default_value = "false")]
    pub randomize: bool,

    /// Consult the endgame tablebase.
    #[arg(long, default_value = "false")]
    pub egtb: bool,

    /// Percent chance of overlooking a refutation during search, to weaken play.
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub prune_chance: u8,

    /// Print extra diagnostics during search.
    #[arg(long, default_value = "false")]
    pub debug: bool,

    /// Commands to execute on startup, one per argument, before reading `stdin`.
    ///
    /// For example: `corvid "position startpos moves e2e4" "go depth 6" wait exit`
    #[arg(trailing_var_arg = true)]
    pub commands: Vec<String>,
}

impl Cli {
    /// The search options requested on the command line.
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            depth: self.depth.filter(|&d| d > 0),
            movetime: self
                .movetime
                .filter(|&ms| ms > 0)
                .map(Duration::from_millis),
            randomize: self.randomize,
            egtb: self.egtb,
            prune_chance: self.prune_chance,
            hash: self.hash.clamp(TTable::MIN_SIZE, TTable::MAX_SIZE),
        }
    }
}

/// A command to be sent to the engine.
#[derive(Debug, Clone, Parser)]
#[command(
    multicall = true,
    about,
    rename_all = "lower",
    override_usage("<ENGINE COMMAND> | <UCI COMMAND>")
)]
pub enum EngineCommand {
    /// Run a benchmark with the provided parameters.
    Bench {
        /// If set, the benchmarking results will be printed in a well-formatted table.
        #[arg(short, long, default_value = "false")]
        pretty: bool,

        /// Override the default benchmark depth.
        #[arg(short, long, required = false)]
        depth: Option<u8>,
    },

    /// Print a visual representation of the current board state.
    #[command(alias = "d")]
    Display,

    /// Print an evaluation of the current position.
    Eval {
        /// If set, the contribution of every piece will be printed.
        #[arg(short, long, default_value = "false")]
        pretty: bool,
    },

    /// Quit the engine.
    Exit {
        /// If set, the engine will await the completion of any search threads before exiting.
        #[arg(short, long, default_value = "false")]
        cleanup: bool,
    },

    /// Generate and print a FEN string for the current position.
    Fen,

    /// Flips the side-to-move. Equivalent to playing a nullmove.
    Flip,

    /// Display information about the transposition table.
    #[command(aliases = ["tt", "ttable"])]
    HashInfo,

    /// Apply the provided move to the game, if it is legal.
    ///
    /// Accepts coordinate (`g1f3`) or algebraic (`Nf3`) notation.
    #[command(alias = "move")]
    MakeMove { mv_string: String },

    /// Shows all legal moves in the current position, or for a specific piece.
    Moves {
        square: Option<Square>,

        /// If set, moves will be sorted in alphabetical order.
        ///
        /// By default, moves are generated in no particular order.
        #[arg(short, long, default_value = "false")]
        sort: bool,

        /// If set, moves are shown in algebraic notation (`Nf3`) instead of coordinates (`g1f3`).
        #[arg(long, default_value = "false")]
        san: bool,
    },

    /// Display the current value of the specified option.
    Option {
        name: Vec<String>, // This is a vector in order to support multi-word options
    },

    /// Performs a perft on the current position at the supplied depth, printing total node count.
    Perft { depth: usize },

    /// Performs a split perft on the current position at the supplied depth.
    #[command(alias = "sperft")]
    Splitperft { depth: usize },

    /// Wrapper over UCI commands sent to the engine.
    #[command(skip)]
    Uci { cmd: UciCommand },

    /// Await the current search, blocking until it completes.
    ///
    /// This is primarily used when executing searches on startup,
    /// to await their results before doing something else.
    Wait,
}

impl FromStr for EngineCommand {
    type Err = anyhow::Error;

    /// Attempt to parse an [`EngineCommand`] from a line of input.
    ///
    /// UCI commands are tried first, since that's the primary use case of the engine.
    /// Only unrecognized UCI commands fall back to engine-specific commands.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match UciCommand::new(s) {
            Ok(cmd) => Ok(Self::Uci { cmd }),

            Err(UciParseError::UnrecognizedCommand { cmd: _ }) => {
                Self::try_parse_from(s.split_ascii_whitespace()).map_err(|err| anyhow!("{err}"))
            }

            // It was a UCI command, but a malformed one
            Err(uci_err) => Err(anyhow!("{uci_err}")),
        }
    }
}
