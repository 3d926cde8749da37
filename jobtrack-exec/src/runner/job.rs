use jobtrack_core::{JobConfiguration, JobReport, JobType, ParametersError, ProgressError};

use crate::progress::JobProgress;

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Parameters(#[from] ParametersError),
    #[error("{0}")]
    Failed(String),
}

impl JobError {
    pub fn failed(message: impl Into<String>) -> Self {
        JobError::Failed(message.into())
    }
}

/// A unit of background work run by the [`JobRunner`](crate::JobRunner).
///
/// `execute` runs on a blocking thread and reports through `progress`. An
/// `Err` (or a panic) fails the process; returning `Ok` with the process left
/// open lets the runner seal it. The report is attached as the job summary
/// when the process completed.
pub trait Job: Send + Sync {
    fn job_type(&self) -> JobType;

    /// Jobs returning false get a tracker that records nothing; the runner
    /// still emits their terminal notification.
    fn tracks_progress(&self) -> bool {
        true
    }

    fn execute(
        &self,
        config: &JobConfiguration,
        progress: &mut dyn JobProgress,
    ) -> Result<Option<JobReport>, JobError>;
}
