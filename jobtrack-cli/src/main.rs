use clap::Parser;

use jobtrack_exec::telemetry::{init_tracing, LogFormat};

mod args;
mod cmd;
mod commands;
mod exit_codes;
mod output;
mod plan;

pub use args::*;
use commands::Command;

#[derive(Debug, Parser)]
#[command(name = "jobtrack", version, about = "Run background jobs with tracked progress")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(LogFormat::from_env());

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create tokio runtime: {e}");
            std::process::exit(exit_codes::RUNTIME_ERROR);
        }
    };

    let exit_code = rt.block_on(run_command(cli.command));
    std::process::exit(exit_code);
}

async fn run_command(command: Command) -> i32 {
    match command {
        Command::Validate { path, output } => cmd::validate::validate_cmd(&path, output).await,
        Command::Run {
            path,
            timeout_ms,
            no_auto_complete,
            events,
            tracker,
            output,
        } => {
            cmd::run::run_cmd(&path, timeout_ms, !no_auto_complete, events, tracker, output).await
        }
    }
}
