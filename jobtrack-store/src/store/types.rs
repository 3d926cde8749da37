use chrono::{DateTime, Utc};
use uuid::Uuid;

use jobtrack_core::{JobReport, JobType, Notification, ProcessStatus, ProgressEvent};

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Notifications kept per job; older ones are dropped first.
    pub max_notifications_per_job: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_notifications_per_job: 500,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub job_id: Uuid,
    pub job_type: JobType,
    pub notification: Notification,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredNotification {
    /// Store-wide sequence number, increasing in arrival order.
    pub id: u64,
    pub job_id: Uuid,
    pub job_type: JobType,
    pub notification: Notification,
}

impl StoredNotification {
    /// Final status when this is the terminal notification of its process.
    pub fn final_status(&self) -> Option<ProcessStatus> {
        match &self.notification.event {
            ProgressEvent::ProcessFinished { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewJobSummary {
    pub job_id: Uuid,
    pub job_type: JobType,
    pub report: JobReport,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub job_id: Uuid,
    pub job_type: JobType,
    pub report: JobReport,
    pub recorded_at: DateTime<Utc>,
}
