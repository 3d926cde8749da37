use thiserror::Error;

use crate::types::{JobType, ProcessStatus};

/// Misuse of the progress API by a job. These are bugs in the calling job,
/// never runtime data conditions, and no fault-tolerance policy applies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressError {
    #[error("process already started; a tracker runs a single process")]
    ProcessAlreadyStarted,
    #[error("no process started yet")]
    ProcessNotStarted,
    #[error("process already sealed as {status}")]
    Sealed { status: ProcessStatus },
    #[error("no stage is open")]
    NoOpenStage,
    #[error("cannot start stage `{requested}` while item `{item}` of stage `{open}` is running")]
    NestedStage {
        open: String,
        item: String,
        requested: String,
    },
    #[error("item `{open}` is still running; cannot start item `{requested}`")]
    ItemAlreadyOpen { open: String, requested: String },
    #[error("no item is running")]
    NoOpenItem,
}

/// A job's opaque parameters were absent or not of the expected shape.
#[derive(Debug, Error)]
pub enum ParametersError {
    #[error("job {job_type} requires parameters but none were given")]
    Missing { job_type: JobType },
    #[error("invalid parameters for job {job_type}: {source}")]
    Invalid {
        job_type: JobType,
        #[source]
        source: serde_json::Error,
    },
}
