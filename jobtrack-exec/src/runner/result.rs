use uuid::Uuid;

use jobtrack_core::{JobReport, JobType, Process, ProcessStatus};

/// Outcome of one job run.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobExecution {
    pub job_id: Uuid,
    pub job_type: JobType,
    pub status: ProcessStatus,
    /// The final tree; empty for jobs that do not track progress.
    pub process: Process,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<JobReport>,
}

impl JobExecution {
    pub fn succeeded(&self) -> bool {
        self.status == ProcessStatus::Completed
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("job configuration {job_id} is for {expected}, job is {actual}")]
    JobTypeMismatch {
        job_id: Uuid,
        expected: JobType,
        actual: JobType,
    },
    #[error("task join error: {0}")]
    TaskJoin(String),
}
