use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

use jobtrack_core::{JobConfiguration, JobReport, Notification};

use crate::notify::Notifier;

/// Keeps everything it receives in memory. Meant for tests and debugging.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<(Uuid, Notification)>>,
    summaries: Mutex<Vec<(Uuid, JobReport)>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<(Uuid, Notification)> {
        lock(&self.notifications).clone()
    }

    /// Notifications of one job, oldest first.
    pub fn for_job(&self, job_id: Uuid) -> Vec<Notification> {
        lock(&self.notifications)
            .iter()
            .filter(|(id, _)| *id == job_id)
            .map(|(_, n)| n.clone())
            .collect()
    }

    pub fn terminal_count(&self, job_id: Uuid) -> usize {
        lock(&self.notifications)
            .iter()
            .filter(|(id, n)| *id == job_id && n.terminal)
            .count()
    }

    pub fn summaries(&self) -> Vec<(Uuid, JobReport)> {
        lock(&self.summaries).clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, job: &JobConfiguration, notification: &Notification) {
        lock(&self.notifications).push((job.id, notification.clone()));
    }

    fn add_job_summary(&self, job: &JobConfiguration, report: &JobReport) {
        lock(&self.summaries).push((job.id, report.clone()));
    }
}
