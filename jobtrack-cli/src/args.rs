use clap::Args;

use crate::output::OutputFormat;

#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Args, Clone)]
pub struct TrackerArgs {
    /// Only emit process-level notifications.
    #[arg(long)]
    pub no_stage_notifications: bool,
    /// Check for cancellation at stage boundaries only.
    #[arg(long)]
    pub no_item_cancellation_checks: bool,
    /// Notifications retained for the run.
    #[arg(long, default_value_t = 500)]
    pub max_notifications: usize,
}
