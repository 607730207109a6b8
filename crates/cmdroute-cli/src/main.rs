//! cmdroute CLI: the `cmdroute` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export { config, json } => commands::export::run(config, json),

        Commands::Tree { config } => commands::tree::run(config),

        Commands::Reference { path, config } => commands::reference::run(path, config),

        Commands::Dispatch {
            invocation,
            interaction,
            config,
            json,
        } => commands::dispatch::run(commands::dispatch::Args {
            invocation,
            interaction,
            config,
            json,
        }),
    }
}
