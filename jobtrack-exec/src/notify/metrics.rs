use std::sync::{Arc, Mutex};
use std::time::Duration;

use jobtrack_core::{
    JobConfiguration, JobReport, Notification, ProcessStatus, ProgressEvent, StageStatus,
};

use crate::notify::Notifier;

/// Counters aggregated over every job seen by one collector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobMetrics {
    pub processes_started: usize,
    pub processes_completed: usize,
    pub processes_failed: usize,
    pub processes_cancelled: usize,
    pub stages_completed: usize,
    pub stages_failed: usize,
    pub stages_skipped: usize,
    pub items_succeeded: usize,
    pub items_failed: usize,
    pub items_skipped: usize,
    pub summaries: usize,
    pub total_duration: Duration,
}

impl JobMetrics {
    pub fn record_process_started(&mut self) {
        self.processes_started += 1;
    }

    pub fn record_stage(&mut self, status: StageStatus) {
        match status {
            StageStatus::Completed => self.stages_completed += 1,
            StageStatus::Failed => self.stages_failed += 1,
            StageStatus::Skipped => self.stages_skipped += 1,
            StageStatus::Running | StageStatus::Cancelled => {}
        }
    }

    pub fn record_finished(&mut self, status: ProcessStatus, event: &ProgressEvent) {
        match status {
            ProcessStatus::Completed => self.processes_completed += 1,
            ProcessStatus::Failed => self.processes_failed += 1,
            ProcessStatus::Cancelled => self.processes_cancelled += 1,
            ProcessStatus::Running => {}
        }
        if let ProgressEvent::ProcessFinished {
            summary, process, ..
        } = event
        {
            self.items_succeeded += summary.items_succeeded;
            self.items_failed += summary.items_failed;
            self.items_skipped += summary.items_skipped;
            if let Some(ms) = process.duration_ms() {
                self.total_duration += Duration::from_millis(ms.max(0) as u64);
            }
        }
    }

    pub fn record_summary(&mut self) {
        self.summaries += 1;
    }

    pub fn processes_finished(&self) -> usize {
        self.processes_completed + self.processes_failed + self.processes_cancelled
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "processes": {
                "started": self.processes_started,
                "completed": self.processes_completed,
                "failed": self.processes_failed,
                "cancelled": self.processes_cancelled,
            },
            "stages": {
                "completed": self.stages_completed,
                "failed": self.stages_failed,
                "skipped": self.stages_skipped,
            },
            "items": {
                "succeeded": self.items_succeeded,
                "failed": self.items_failed,
                "skipped": self.items_skipped,
            },
            "summaries": self.summaries,
            "duration_ms": self.total_duration.as_millis() as u64,
        })
    }
}

#[derive(Debug, Default)]
pub struct MetricsCollector {
    metrics: Mutex<JobMetrics>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    fn update(&self, f: impl FnOnce(&mut JobMetrics)) {
        let mut metrics = self
            .metrics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut metrics);
    }

    pub fn get_metrics(&self) -> JobMetrics {
        self.metrics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// Counts what passes through, then forwards to `base`.
pub struct MetricsNotifier {
    collector: Arc<MetricsCollector>,
    base: Arc<dyn Notifier>,
}

impl MetricsNotifier {
    pub fn new(collector: Arc<MetricsCollector>, base: Arc<dyn Notifier>) -> Self {
        Self { collector, base }
    }
}

impl Notifier for MetricsNotifier {
    fn notify(&self, job: &JobConfiguration, notification: &Notification) {
        match &notification.event {
            ProgressEvent::ProcessStarted { .. } => {
                self.collector.update(JobMetrics::record_process_started);
            }
            ProgressEvent::StageFinished { status, .. } => {
                let status = *status;
                self.collector.update(|m| m.record_stage(status));
            }
            ProgressEvent::ProcessFinished { status, .. } => {
                let status = *status;
                self.collector
                    .update(|m| m.record_finished(status, &notification.event));
            }
            ProgressEvent::StageStarted { .. } => {}
        }

        self.base.notify(job, notification);
    }

    fn add_job_summary(&self, job: &JobConfiguration, report: &JobReport) {
        self.collector.update(JobMetrics::record_summary);
        self.base.add_job_summary(job, report);
    }
}
