use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cmdroute",
    about = "cmdroute: inspect and exercise a hierarchical command registry",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print registration descriptors for every root command
    Export {
        /// Engine config TOML (defaults apply when omitted)
        #[arg(long)]
        config: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the deploy outline of every command tree
    Tree {
        /// Engine config TOML (defaults apply when omitted)
        #[arg(long)]
        config: Option<String>,
    },

    /// Print the caller-facing reference of the leaf at a path
    Reference {
        /// Command tokens, root first (e.g. `a b c d`)
        #[arg(required = true)]
        path: Vec<String>,

        /// Engine config TOML (defaults apply when omitted)
        #[arg(long)]
        config: Option<String>,
    },

    /// Dispatch one invocation from a JSON file and report the outcome
    Dispatch {
        /// Path to the invocation JSON
        #[arg(long)]
        invocation: String,

        /// Read the file as an interaction payload (`{data, context}`)
        #[arg(long)]
        interaction: bool,

        /// Engine config TOML (defaults apply when omitted)
        #[arg(long)]
        config: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
