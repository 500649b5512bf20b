/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use clap::Parser;
use corvid::{init_attack_tables, Cli, Engine, EngineCommand};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // stdout belongs to the protocol, so diagnostics go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    // Build the slider tables now rather than during the first search
    init_attack_tables();

    let mut engine = Engine::with_options(cli.engine_options());
    engine.set_debug(cli.debug);

    // Queue startup commands; they run before anything read from stdin
    for line in &cli.commands {
        match line.parse::<EngineCommand>() {
            Ok(cmd) => engine.send_command(cmd),
            Err(err) => eprintln!("ERROR on input {line:?}:\n{err}"),
        }
    }

    engine.run()
}
