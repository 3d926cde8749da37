use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{info, warn};

use jobtrack_core::{
    JobConfiguration, JobReport, Notification, NotificationLevel, Process, ProcessStatus,
    ProgressEvent,
};

use crate::notify::Notifier;
use crate::progress::{ControlledJobProgress, JobProgress, NoopJobProgress};
use crate::runner::job::Job;
use crate::runner::result::{JobExecution, RunnerError};
use crate::runner::types::RunnerConfig;

/// Runs jobs on tokio's blocking pool with a controlled tracker.
pub struct JobRunner {
    config: RunnerConfig,
    notifier: Arc<dyn Notifier>,
}

impl JobRunner {
    pub fn new(config: RunnerConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self { config, notifier }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run `job` to completion. Every run ends with exactly one terminal
    /// notification, whether the job returned, failed, panicked or timed out.
    pub async fn run(
        &self,
        job: Arc<dyn Job>,
        configuration: JobConfiguration,
    ) -> Result<JobExecution, RunnerError> {
        if job.job_type() != configuration.job_type {
            return Err(RunnerError::JobTypeMismatch {
                job_id: configuration.id,
                expected: configuration.job_type,
                actual: job.job_type(),
            });
        }

        let task = JobTask {
            job,
            configuration: configuration.clone(),
            notifier: self.notifier.clone(),
            config: self.config.clone(),
        };
        let mut handle = tokio::task::spawn_blocking(move || task.execute());

        let joined = match self.config.timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(
                        job_id = %configuration.id,
                        timeout_ms = limit.as_millis() as u64,
                        "job timed out, requesting cancellation"
                    );
                    configuration.request_cancellation();
                    handle.await
                }
            },
            None => handle.await,
        };
        joined.map_err(|e| RunnerError::TaskJoin(e.to_string()))
    }
}

struct JobTask {
    job: Arc<dyn Job>,
    configuration: JobConfiguration,
    notifier: Arc<dyn Notifier>,
    config: RunnerConfig,
}

impl JobTask {
    fn execute(self) -> JobExecution {
        info!(
            job_id = %self.configuration.id,
            job_type = %self.configuration.job_type,
            name = %self.configuration.name,
            "job starting"
        );
        if self.job.tracks_progress() {
            self.execute_tracked()
        } else {
            self.execute_untracked()
        }
    }

    fn execute_tracked(self) -> JobExecution {
        let mut progress = ControlledJobProgress::with_config(
            self.configuration.clone(),
            self.notifier.clone(),
            self.config.tracker.clone(),
        );
        let outcome = invoke(self.job.as_ref(), &self.configuration, &mut progress);

        if !progress.is_started() {
            if let Err(err) = progress.starting_process(&self.configuration.name) {
                warn!(job_id = %self.configuration.id, error = %err, "could not open process");
            }
        }
        let sealed = match &outcome {
            Ok(_) if self.config.auto_complete => progress.completed_process(None),
            Ok(_) => progress.failed_process("job returned without sealing its process"),
            Err(error) => progress.failed_process(error),
        };
        if let Err(err) = sealed {
            warn!(job_id = %self.configuration.id, error = %err, "could not seal process");
        }

        let status = progress.status().unwrap_or(ProcessStatus::Failed);
        let process = progress
            .progress()
            .unwrap_or_else(|| Process::new(self.configuration.name.clone()));
        self.finish(status, process, outcome)
    }

    fn execute_untracked(self) -> JobExecution {
        let mut progress = NoopJobProgress::watching(self.configuration.cancellation().clone());
        let mut process = Process::new(self.configuration.name.clone());
        let outcome = invoke(self.job.as_ref(), &self.configuration, &mut progress);

        let (status, level, message) = if self.configuration.is_cancellation_requested() {
            (ProcessStatus::Cancelled, NotificationLevel::Warn, Some("Job was cancelled".to_string()))
        } else {
            match &outcome {
                Ok(_) => (ProcessStatus::Completed, NotificationLevel::Info, None),
                Err(error) => (ProcessStatus::Failed, NotificationLevel::Error, Some(error.clone())),
            }
        };
        process.finish(status, message);
        let notification = Notification::new(
            level,
            format!("Process `{}` {}", process.description, status.as_str().to_lowercase()),
            ProgressEvent::finished(&process),
        );
        self.notifier.notify(&self.configuration, &notification);
        self.finish(status, process, outcome)
    }

    fn finish(
        self,
        status: ProcessStatus,
        process: Process,
        outcome: Result<Option<JobReport>, String>,
    ) -> JobExecution {
        let (report, error) = match outcome {
            Ok(report) => (report, None),
            Err(error) => (None, Some(error)),
        };
        if status == ProcessStatus::Completed {
            if let Some(report) = &report {
                self.notifier.add_job_summary(&self.configuration, report);
            }
        }
        info!(
            job_id = %self.configuration.id,
            status = %status,
            duration_ms = process.duration_ms().unwrap_or_default(),
            "job finished"
        );
        JobExecution {
            job_id: self.configuration.id,
            job_type: self.configuration.job_type,
            status,
            process,
            error,
            report,
        }
    }
}

fn invoke(
    job: &dyn Job,
    configuration: &JobConfiguration,
    progress: &mut dyn JobProgress,
) -> Result<Option<JobReport>, String> {
    match panic::catch_unwind(AssertUnwindSafe(|| job.execute(configuration, progress))) {
        Ok(Ok(report)) => Ok(report),
        Ok(Err(err)) => Err(err.to_string()),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("job panicked: {detail}")
}
