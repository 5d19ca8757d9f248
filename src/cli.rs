use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "maestro", version, about = "Orchestrates remote agents and flows for a single request")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute one orchestration run and print the result envelope as JSON
    Run {
        /// Path to the run request (JSON: message, agents, configs, files)
        #[arg(short, long)]
        request: PathBuf,

        /// Model used by the decision oracle (e.g., "gpt-4o-mini", "llama3.2")
        #[arg(short, long)]
        model: Option<String>,

        /// Base URL of the agent router
        #[arg(long)]
        router_url: Option<String>,

        /// Per-dispatch timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Maximum number of decision rounds
        #[arg(long)]
        max_rounds: Option<usize>,

        /// Path to config file (overrides default search)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the flows and single agents a request offers to the oracle
    Catalog {
        /// Path to the run request
        #[arg(short, long)]
        request: PathBuf,
    },
}
