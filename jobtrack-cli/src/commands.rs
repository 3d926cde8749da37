use std::path::PathBuf;

use clap::Subcommand;

use crate::args::*;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse and check a job plan without running it.
    Validate {
        path: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Run a job plan and print its final progress tree.
    Run {
        path: PathBuf,
        /// Request cancellation once the job has run this long.
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Fail, rather than complete, a process the job left open.
        #[arg(long)]
        no_auto_complete: bool,
        /// Include the retained notifications in the output.
        #[arg(long)]
        events: bool,
        #[command(flatten)]
        tracker: TrackerArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
}
