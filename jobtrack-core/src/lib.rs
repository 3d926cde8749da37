#![forbid(unsafe_code)]

//! Progress tree, fault-tolerance policies and job model shared by the jobtrack crates.
//!
//! The tracker that mutates these types lives in `jobtrack-exec`.

pub mod error;
pub mod types;

pub use crate::error::{ParametersError, ProgressError};
pub use crate::types::{
    CancellationFlag, FaultTolerance, Item, ItemStatus, JobConfiguration, JobReport, JobType,
    Notification, NotificationLevel, Process, ProcessStatus, ProcessSummary, ProgressEvent, Stage,
    StageStatus,
};
