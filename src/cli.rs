//! Command line interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "stateline")]
#[command(about = "Build and query a state history from a kernel trace")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build the state history and report build statistics.
    Analyze {
        /// JSON trace file.
        trace: PathBuf,

        /// Dump the full state at this timestamp as JSON (repeatable).
        #[arg(long = "state-at", value_name = "TS")]
        state_at: Vec<u64>,

        #[command(flatten)]
        opts: CommonOpts,
    },

    /// Build the state history, then dump closed intervals as JSON records.
    Dump {
        /// JSON trace file.
        trace: PathBuf,

        /// Only dump attributes whose path starts with this prefix
        /// (repeatable; e.g. "Threads/42").
        #[arg(long = "path", value_name = "PREFIX")]
        paths: Vec<String>,

        #[command(flatten)]
        opts: CommonOpts,
    },
}

#[derive(Args)]
pub struct CommonOpts {
    /// History backend to build into.
    #[arg(long, value_enum, default_value_t = BackendKind::Memory)]
    pub backend: BackendKind,

    /// JSON file remapping event and field names for non-LTTng traces.
    #[arg(long, value_name = "FILE")]
    pub layout: Option<PathBuf>,

    /// Report per-event handler errors on stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// Keep the full interval history in memory (queryable).
    Memory,
    /// Discard closed intervals; write path only, for benchmarking.
    Null,
}
