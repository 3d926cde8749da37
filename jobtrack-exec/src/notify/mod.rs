mod metrics;
mod recording;

use std::sync::Arc;

use jobtrack_core::{JobConfiguration, JobReport, Notification, NotificationLevel};

pub use metrics::{JobMetrics, MetricsCollector, MetricsNotifier};
pub use recording::RecordingNotifier;

/// Sink for tracker notifications and job summaries.
///
/// Called synchronously from the thread running the job, in emission order.
/// Implementations must not block for long; hand off to a channel instead.
pub trait Notifier: Send + Sync {
    fn notify(&self, job: &JobConfiguration, notification: &Notification);

    fn add_job_summary(&self, job: &JobConfiguration, report: &JobReport);
}

pub struct CompositeNotifier {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl Default for CompositeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeNotifier {
    pub fn new() -> Self {
        Self {
            notifiers: Vec::new(),
        }
    }

    pub fn add(&mut self, notifier: Arc<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    pub fn with(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.add(notifier);
        self
    }
}

impl Notifier for CompositeNotifier {
    fn notify(&self, job: &JobConfiguration, notification: &Notification) {
        for notifier in &self.notifiers {
            notifier.notify(job, notification);
        }
    }

    fn add_job_summary(&self, job: &JobConfiguration, report: &JobReport) {
        for notifier in &self.notifiers {
            notifier.add_job_summary(job, report);
        }
    }
}

/// Forwards notifications to `tracing` under the `jobtrack::notify` target.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, job: &JobConfiguration, notification: &Notification) {
        let job_id = &job.id;
        let job_type = job.job_type.as_str();
        let message = notification.message.as_str();
        let terminal = notification.terminal;
        match notification.level {
            NotificationLevel::Debug => {
                tracing::debug!(target: "jobtrack::notify", %job_id, job_type, terminal, "{message}")
            }
            NotificationLevel::Info => {
                tracing::info!(target: "jobtrack::notify", %job_id, job_type, terminal, "{message}")
            }
            NotificationLevel::Warn => {
                tracing::warn!(target: "jobtrack::notify", %job_id, job_type, terminal, "{message}")
            }
            NotificationLevel::Error => {
                tracing::error!(target: "jobtrack::notify", %job_id, job_type, terminal, "{message}")
            }
        }
    }

    fn add_job_summary(&self, job: &JobConfiguration, report: &JobReport) {
        tracing::info!(
            target: "jobtrack::notify",
            job_id = %job.id,
            summary_type = %report.summary_type,
            "job summary attached"
        );
    }
}

pub struct NoOpNotifier;

impl Notifier for NoOpNotifier {
    fn notify(&self, _job: &JobConfiguration, _notification: &Notification) {}

    fn add_job_summary(&self, _job: &JobConfiguration, _report: &JobReport) {}
}
