use std::fmt::Write as _;

use serde::Serialize;

use jobtrack_core::{Process, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn print_result<T: Serialize>(format: OutputFormat, quiet: bool, result: &T) {
    if quiet {
        return;
    }
    match format {
        OutputFormat::Text => {
            if let Ok(json) = serde_json::to_string_pretty(result) {
                println!("{json}");
            }
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string(result) {
                println!("{json}");
            }
        }
    }
}

pub fn print_error(format: OutputFormat, quiet: bool, message: &str) {
    if quiet {
        return;
    }
    match format {
        OutputFormat::Text => eprintln!("error: {message}"),
        OutputFormat::Json => {
            let err = serde_json::json!({"error": message});
            eprintln!("{}", serde_json::to_string(&err).unwrap_or_default());
        }
    }
}

/// Human-readable rendering of a progress tree, one line per stage.
pub fn render_process(process: &Process) -> String {
    let mut out = String::new();
    let _ = write!(out, "{} {}", process.status, process.description);
    if let Some(ms) = process.duration_ms() {
        let _ = write!(out, " ({ms} ms)");
    }
    if let Some(message) = &process.message {
        let _ = write!(out, ": {message}");
    }
    out.push('\n');
    for stage in &process.stages {
        render_stage(&mut out, stage);
    }
    out
}

fn render_stage(out: &mut String, stage: &Stage) {
    let _ = write!(
        out,
        "  [{}] {} ({}) ok={} failed={} skipped={}",
        stage.status,
        stage.description,
        stage.fault_tolerance,
        stage.successes,
        stage.failures,
        stage.skipped
    );
    if let Some(percent) = stage.percent() {
        let _ = write!(out, " {percent:.0}%");
    }
    if let Some(message) = &stage.message {
        let _ = write!(out, " - {message}");
    }
    out.push('\n');
}
