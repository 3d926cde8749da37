#![forbid(unsafe_code)]

//! Progress tracking engine for background jobs.
//!
//! Jobs report through [`JobProgress`]; the [`ControlledJobProgress`] tracker
//! keeps the process tree, applies each stage's fault tolerance and pushes
//! notifications to a [`Notifier`]. [`JobRunner`] runs jobs on a blocking pool
//! and guarantees the terminal notification.

pub mod notify;
pub mod progress;
pub mod runner;
pub mod telemetry;

pub use crate::notify::{
    CompositeNotifier, JobMetrics, MetricsCollector, MetricsNotifier, NoOpNotifier, Notifier,
    RecordingNotifier, TracingNotifier,
};
pub use crate::progress::{
    ControlledJobProgress, Flow, JobProgress, NoopJobProgress, RunStage, StageTally, TrackerConfig,
};
pub use crate::runner::{Job, JobError, JobExecution, JobRunner, RunnerConfig, RunnerError};
