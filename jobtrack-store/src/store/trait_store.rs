use async_trait::async_trait;
use uuid::Uuid;

use jobtrack_core::ProcessStatus;

use crate::store::types::*;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Append a notification and return its sequence number.
    async fn append_notification(&self, record: NewNotification) -> Result<u64, StoreError>;

    /// Retained notifications of a job, oldest first.
    async fn get_notifications(&self, job_id: Uuid) -> Result<Vec<StoredNotification>, StoreError>;

    async fn get_notifications_after(
        &self,
        job_id: Uuid,
        after_id: u64,
        limit: usize,
    ) -> Result<Vec<StoredNotification>, StoreError>;

    async fn latest_notification(
        &self,
        job_id: Uuid,
    ) -> Result<Option<StoredNotification>, StoreError>;

    /// Replaces any summary stored earlier for the same job.
    async fn put_job_summary(&self, summary: NewJobSummary) -> Result<(), StoreError>;

    async fn get_job_summary(&self, job_id: Uuid) -> Result<Option<JobSummary>, StoreError>;

    /// `Running` until a terminal notification arrived, `None` for unknown jobs.
    async fn get_job_status(&self, job_id: Uuid) -> Result<Option<ProcessStatus>, StoreError>;

    /// Forget everything retained for a job.
    async fn clear_job(&self, job_id: Uuid) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("job not found: {0}")]
    JobNotFound(Uuid),
    #[error("store notifier is closed")]
    Closed,
    #[error("store error: {0}")]
    Other(String),
}
