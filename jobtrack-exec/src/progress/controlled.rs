use std::sync::Arc;

use tracing::{debug, error, info, trace, warn};

use jobtrack_core::{
    FaultTolerance, Item, ItemStatus, JobConfiguration, Notification, NotificationLevel, Process,
    ProcessStatus, ProgressError, ProgressEvent, Stage, StageStatus,
};

use crate::notify::Notifier;
use crate::progress::{Flow, JobProgress, StageTally, TrackerConfig};

const CANCELLED_MESSAGE: &str = "Job was cancelled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Process,
    /// `cut_short` is set once a `SKIP_STAGE` failure ended item processing.
    Stage { cut_short: bool },
    Item,
    Sealed(ProcessStatus),
}

/// The tracker handed to jobs by the runner.
///
/// Owns one process tree, drives it through an explicit phase machine and
/// pushes every transition to a [`Notifier`]. Exactly one terminal
/// notification is emitted per process, whatever path seals it.
pub struct ControlledJobProgress {
    job: JobConfiguration,
    notifier: Arc<dyn Notifier>,
    config: TrackerConfig,
    phase: Phase,
    process: Option<Process>,
}

impl ControlledJobProgress {
    pub fn new(job: JobConfiguration, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_config(job, notifier, TrackerConfig::default())
    }

    pub fn with_config(
        job: JobConfiguration,
        notifier: Arc<dyn Notifier>,
        config: TrackerConfig,
    ) -> Self {
        Self {
            job,
            notifier,
            config,
            phase: Phase::Idle,
            process: None,
        }
    }

    pub fn job(&self) -> &JobConfiguration {
        &self.job
    }

    pub fn process(&self) -> Option<&Process> {
        self.process.as_ref()
    }

    /// Clone of the current tree.
    pub fn progress(&self) -> Option<Process> {
        self.process.clone()
    }

    pub fn status(&self) -> Option<ProcessStatus> {
        self.process.as_ref().map(|p| p.status)
    }

    pub fn is_started(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn is_sealed(&self) -> bool {
        matches!(self.phase, Phase::Sealed(_))
    }

    fn open_stage(&self) -> Option<&Stage> {
        self.process.as_ref().and_then(Process::open_stage)
    }

    fn open_stage_mut(&mut self) -> Option<&mut Stage> {
        self.process.as_mut().and_then(Process::open_stage_mut)
    }

    fn require_stage(&self) -> Result<&Stage, ProgressError> {
        match self.phase {
            Phase::Idle => Err(ProgressError::ProcessNotStarted),
            Phase::Sealed(status) => Err(ProgressError::Sealed { status }),
            Phase::Process => Err(ProgressError::NoOpenStage),
            Phase::Stage { .. } | Phase::Item => {
                self.open_stage().ok_or(ProgressError::NoOpenStage)
            }
        }
    }

    fn running_item_id(&self) -> String {
        self.open_stage()
            .and_then(|s| s.items.last())
            .map(|i| i.id.clone())
            .unwrap_or_default()
    }

    fn emit(&self, level: NotificationLevel, message: String, event: ProgressEvent) {
        let notification = Notification::new(level, message, event);
        self.notifier.notify(&self.job, &notification);
    }

    fn emit_stage_finished(&self) {
        if !self.config.stage_notifications {
            return;
        }
        let Some(stage) = self.process.as_ref().and_then(|p| p.stages.last()) else {
            return;
        };
        let level = match stage.status {
            StageStatus::Failed | StageStatus::Cancelled => NotificationLevel::Warn,
            _ => NotificationLevel::Info,
        };
        let mut message = format!(
            "Stage `{}` {}",
            stage.description,
            stage.status.as_str().to_lowercase()
        );
        if let Some(detail) = &stage.message {
            message.push_str(": ");
            message.push_str(detail);
        }
        self.emit(
            level,
            message,
            ProgressEvent::StageFinished {
                description: stage.description.clone(),
                status: stage.status,
                successes: stage.successes,
                failures: stage.failures,
                skipped: stage.skipped,
                percent: stage.percent(),
            },
        );
    }

    fn emit_process_finished(&self) {
        let Some(process) = self.process.as_ref() else {
            return;
        };
        let (level, message) = match process.status {
            ProcessStatus::Completed => (
                NotificationLevel::Info,
                format!("Process `{}` completed", process.description),
            ),
            ProcessStatus::Cancelled => (
                NotificationLevel::Warn,
                format!("Process `{}` cancelled", process.description),
            ),
            _ => (
                NotificationLevel::Error,
                format!(
                    "Process `{}` failed: {}",
                    process.description,
                    process.message.as_deref().unwrap_or("unknown error")
                ),
            ),
        };
        self.emit(level, message, ProgressEvent::finished(process));
    }

    /// Close the open stage with the verdict of its policy.
    fn conclude_stage(&mut self, message: Option<&str>) -> bool {
        let cut_short = matches!(self.phase, Phase::Stage { cut_short: true });
        let limit = self.config.failure_log_limit;
        let Some(stage) = self.open_stage_mut() else {
            self.phase = Phase::Process;
            return false;
        };
        skip_open_item(stage);
        if cut_short {
            stage.skipped += stage.work_items.saturating_sub(stage.attempted());
        }
        let succeeded = stage
            .fault_tolerance
            .stage_succeeds(stage.successes, stage.failures);
        let message = match message {
            Some(m) => Some(m.to_string()),
            None => failure_digest(stage, limit),
        };
        let status = if succeeded {
            StageStatus::Completed
        } else {
            StageStatus::Failed
        };
        stage.finish(status, message);
        let fails_process = !succeeded && stage.fault_tolerance.fails_process();
        let description = stage.description.clone();
        let detail = stage.message.clone();

        self.phase = Phase::Process;
        if succeeded {
            info!(job_id = %self.job.id, stage = %description, "stage completed");
        } else {
            warn!(job_id = %self.job.id, stage = %description, "stage failed");
        }
        self.emit_stage_finished();

        if fails_process {
            let error = detail.unwrap_or_else(|| format!("Stage `{description}` failed"));
            self.seal_failed(&error);
        }
        succeeded
    }

    fn finish_stage(&mut self, status: StageStatus, message: Option<String>) {
        if let Some(stage) = self.open_stage_mut() {
            skip_open_item(stage);
            stage.finish(status, message);
        }
        self.phase = Phase::Process;
        debug!(job_id = %self.job.id, status = %status, "stage closed explicitly");
        self.emit_stage_finished();
    }

    fn seal_failed(&mut self, error: &str) {
        let stage_closed = match self.open_stage_mut() {
            Some(stage) => {
                let had_item = match stage.open_item_mut() {
                    Some(item) => {
                        item.status = ItemStatus::Error;
                        item.message = Some(error.to_string());
                        true
                    }
                    None => false,
                };
                if had_item {
                    stage.failures += 1;
                }
                stage.finish(StageStatus::Failed, Some(error.to_string()));
                true
            }
            None => false,
        };
        if stage_closed {
            self.emit_stage_finished();
        }
        if let Some(process) = self.process.as_mut() {
            process.finish(ProcessStatus::Failed, Some(error.to_string()));
        }
        self.phase = Phase::Sealed(ProcessStatus::Failed);
        error!(job_id = %self.job.id, job_type = %self.job.job_type, error, "process failed");
        self.emit_process_finished();
    }

    fn seal_cancelled(&mut self) {
        let stage_closed = match self.open_stage_mut() {
            Some(stage) => {
                abandon_open_item(stage, ItemStatus::Skipped, CANCELLED_MESSAGE);
                stage.skipped += stage.work_items.saturating_sub(stage.attempted());
                stage.finish(StageStatus::Cancelled, Some(CANCELLED_MESSAGE.to_string()));
                true
            }
            None => false,
        };
        if stage_closed {
            self.emit_stage_finished();
        }
        if let Some(process) = self.process.as_mut() {
            process.finish(ProcessStatus::Cancelled, Some(CANCELLED_MESSAGE.to_string()));
        }
        self.phase = Phase::Sealed(ProcessStatus::Cancelled);
        warn!(job_id = %self.job.id, job_type = %self.job.job_type, "process cancelled");
        self.emit_process_finished();
    }
}

fn abandon_open_item(stage: &mut Stage, status: ItemStatus, message: &str) {
    if let Some(item) = stage.open_item_mut() {
        item.status = status;
        item.message = Some(message.to_string());
    }
}

/// An item still running when its stage closes counts as skipped.
fn skip_open_item(stage: &mut Stage) {
    if stage.has_open_item() {
        abandon_open_item(stage, ItemStatus::Skipped, "stage closed before the item finished");
        stage.skipped += 1;
    }
}

/// "2 of 5 items failed: a: boom; b: boom" with at most `limit` item errors.
fn failure_digest(stage: &Stage, limit: usize) -> Option<String> {
    if stage.failures == 0 {
        return None;
    }
    let mut digest = format!("{} of {} items failed", stage.failures, stage.attempted());
    let errors: Vec<String> = stage
        .items
        .iter()
        .filter(|i| i.status == ItemStatus::Error)
        .take(limit)
        .map(|i| match &i.message {
            Some(m) => format!("{}: {}", i.id, m),
            None => i.id.clone(),
        })
        .collect();
    if !errors.is_empty() {
        digest.push_str(": ");
        digest.push_str(&errors.join("; "));
    }
    Some(digest)
}

impl JobProgress for ControlledJobProgress {
    fn is_cancelled(&self) -> bool {
        match self.phase {
            Phase::Sealed(status) => status == ProcessStatus::Cancelled,
            _ => self.job.is_cancellation_requested(),
        }
    }

    fn poll_cancellation(&mut self) -> bool {
        match self.phase {
            Phase::Sealed(status) => status == ProcessStatus::Cancelled,
            Phase::Idle => self.job.is_cancellation_requested(),
            _ if self.job.is_cancellation_requested() => {
                self.seal_cancelled();
                true
            }
            _ => false,
        }
    }

    fn starting_process(&mut self, description: &str) -> Result<(), ProgressError> {
        if self.phase != Phase::Idle {
            return Err(ProgressError::ProcessAlreadyStarted);
        }
        self.process = Some(Process::new(description));
        self.phase = Phase::Process;
        info!(job_id = %self.job.id, job_type = %self.job.job_type, description, "process started");
        self.emit(
            NotificationLevel::Info,
            format!("Process `{description}` started"),
            ProgressEvent::ProcessStarted {
                description: description.to_string(),
            },
        );
        Ok(())
    }

    fn completed_process(&mut self, message: Option<&str>) -> Result<(), ProgressError> {
        match self.phase {
            Phase::Idle => return Err(ProgressError::ProcessNotStarted),
            Phase::Sealed(_) => return Ok(()),
            _ => {}
        }
        if self.poll_cancellation() {
            return Ok(());
        }
        if matches!(self.phase, Phase::Stage { .. } | Phase::Item) {
            self.conclude_stage(None);
            if self.is_sealed() {
                return Ok(());
            }
        }
        if let Some(process) = self.process.as_mut() {
            process.finish(ProcessStatus::Completed, message.map(str::to_string));
        }
        self.phase = Phase::Sealed(ProcessStatus::Completed);
        info!(job_id = %self.job.id, job_type = %self.job.job_type, "process completed");
        self.emit_process_finished();
        Ok(())
    }

    fn failed_process(&mut self, error: &str) -> Result<(), ProgressError> {
        match self.phase {
            Phase::Idle => return Err(ProgressError::ProcessNotStarted),
            Phase::Sealed(_) => return Ok(()),
            _ => {}
        }
        if self.poll_cancellation() {
            return Ok(());
        }
        self.seal_failed(error);
        Ok(())
    }

    fn starting_stage_with(
        &mut self,
        description: &str,
        work_items: usize,
        fault_tolerance: FaultTolerance,
    ) -> Result<(), ProgressError> {
        if self.poll_cancellation() {
            return Ok(());
        }
        match self.phase {
            Phase::Idle => return Err(ProgressError::ProcessNotStarted),
            Phase::Sealed(status) => return Err(ProgressError::Sealed { status }),
            Phase::Item => {
                return Err(ProgressError::NestedStage {
                    open: self
                        .open_stage()
                        .map(|s| s.description.clone())
                        .unwrap_or_default(),
                    item: self.running_item_id(),
                    requested: description.to_string(),
                })
            }
            Phase::Stage { .. } => {
                self.conclude_stage(None);
                if let Phase::Sealed(status) = self.phase {
                    return Err(ProgressError::Sealed { status });
                }
            }
            Phase::Process => {}
        }

        if let Some(process) = self.process.as_mut() {
            process
                .stages
                .push(Stage::new(description, work_items, fault_tolerance));
        }
        self.phase = Phase::Stage { cut_short: false };
        debug!(
            job_id = %self.job.id,
            stage = description,
            work_items,
            fault_tolerance = %fault_tolerance,
            "stage started"
        );
        if self.config.stage_notifications {
            self.emit(
                NotificationLevel::Info,
                format!("Stage `{description}` started"),
                ProgressEvent::StageStarted {
                    description: description.to_string(),
                    work_items,
                    fault_tolerance,
                },
            );
        }
        Ok(())
    }

    fn completed_stage(&mut self, message: Option<&str>) -> Result<(), ProgressError> {
        match self.phase {
            Phase::Idle => Err(ProgressError::ProcessNotStarted),
            Phase::Sealed(_) | Phase::Process => Ok(()),
            Phase::Stage { .. } | Phase::Item => {
                self.finish_stage(StageStatus::Completed, message.map(str::to_string));
                Ok(())
            }
        }
    }

    fn failed_stage(&mut self, error: &str) -> Result<(), ProgressError> {
        match self.phase {
            Phase::Idle => Err(ProgressError::ProcessNotStarted),
            Phase::Sealed(_) | Phase::Process => Ok(()),
            Phase::Stage { .. } | Phase::Item => {
                let fault_tolerance = self.require_stage()?.fault_tolerance;
                if fault_tolerance.fails_process() && self.poll_cancellation() {
                    debug!(job_id = %self.job.id, error, "stage failed after cancellation");
                    return Ok(());
                }
                self.finish_stage(StageStatus::Failed, Some(error.to_string()));
                if fault_tolerance.fails_process() {
                    self.seal_failed(error);
                }
                Ok(())
            }
        }
    }

    fn skipped_stage(&mut self, reason: Option<&str>) -> Result<(), ProgressError> {
        match self.phase {
            Phase::Idle => Err(ProgressError::ProcessNotStarted),
            Phase::Sealed(ProcessStatus::Cancelled) | Phase::Process => Ok(()),
            Phase::Sealed(status) => Err(ProgressError::Sealed { status }),
            Phase::Stage { .. } | Phase::Item => {
                self.finish_stage(StageStatus::Skipped, reason.map(str::to_string));
                Ok(())
            }
        }
    }

    fn close_stage(&mut self, message: Option<&str>) -> Result<bool, ProgressError> {
        if self.phase == Phase::Sealed(ProcessStatus::Cancelled) {
            return Ok(false);
        }
        self.require_stage()?;
        Ok(self.conclude_stage(message))
    }

    fn fault_tolerance(&self) -> Result<FaultTolerance, ProgressError> {
        self.require_stage().map(|s| s.fault_tolerance)
    }

    fn stage_tally(&self) -> Result<StageTally, ProgressError> {
        self.require_stage().map(|s| StageTally {
            successes: s.successes,
            failures: s.failures,
            skipped: s.skipped,
        })
    }

    fn starting_work_item(&mut self, id: &str) -> Result<bool, ProgressError> {
        let cancelled = if self.config.item_cancellation_checks {
            self.poll_cancellation()
        } else {
            self.phase == Phase::Sealed(ProcessStatus::Cancelled)
        };
        if cancelled {
            return Ok(false);
        }
        match self.phase {
            Phase::Idle => Err(ProgressError::ProcessNotStarted),
            Phase::Sealed(status) => Err(ProgressError::Sealed { status }),
            Phase::Process => Err(ProgressError::NoOpenStage),
            Phase::Item => Err(ProgressError::ItemAlreadyOpen {
                open: self.running_item_id(),
                requested: id.to_string(),
            }),
            Phase::Stage { cut_short: true } => Ok(false),
            Phase::Stage { cut_short: false } => {
                let Some(stage) = self.open_stage_mut() else {
                    return Err(ProgressError::NoOpenStage);
                };
                stage.items.push(Item::new(id));
                self.phase = Phase::Item;
                trace!(job_id = %self.job.id, item = id, "item started");
                Ok(true)
            }
        }
    }

    fn completed_work_item(&mut self, message: Option<&str>) -> Result<(), ProgressError> {
        match self.phase {
            Phase::Idle => return Err(ProgressError::ProcessNotStarted),
            Phase::Sealed(_) => return Ok(()),
            Phase::Process | Phase::Stage { .. } => return Err(ProgressError::NoOpenItem),
            Phase::Item => {}
        }
        let Some(stage) = self.open_stage_mut() else {
            return Err(ProgressError::NoOpenItem);
        };
        if let Some(item) = stage.open_item_mut() {
            item.status = ItemStatus::Success;
            item.message = message.map(str::to_string);
        }
        stage.successes += 1;
        self.phase = Phase::Stage { cut_short: false };
        trace!(job_id = %self.job.id, "item completed");
        Ok(())
    }

    fn failed_work_item(&mut self, error: &str) -> Result<Flow, ProgressError> {
        match self.phase {
            Phase::Idle => return Err(ProgressError::ProcessNotStarted),
            Phase::Sealed(_) => return Ok(Flow::Abort),
            Phase::Process | Phase::Stage { .. } => return Err(ProgressError::NoOpenItem),
            Phase::Item => {}
        }
        let Some(stage) = self.open_stage_mut() else {
            return Err(ProgressError::NoOpenItem);
        };
        let item_id = match stage.open_item_mut() {
            Some(item) => {
                item.status = ItemStatus::Error;
                item.message = Some(error.to_string());
                item.id.clone()
            }
            None => String::new(),
        };
        stage.failures += 1;
        let fault_tolerance = stage.fault_tolerance;
        warn!(
            job_id = %self.job.id,
            item = %item_id,
            fault_tolerance = %fault_tolerance,
            error,
            "item failed"
        );

        if fault_tolerance.continues_after_item_failure() {
            self.phase = Phase::Stage { cut_short: false };
            return Ok(Flow::Continue);
        }
        if !fault_tolerance.fails_process() {
            self.phase = Phase::Stage { cut_short: true };
            return Ok(Flow::SkipStage);
        }
        self.phase = Phase::Stage { cut_short: false };
        // A failure caused by cancellation seals the process as cancelled.
        if !self.poll_cancellation() {
            self.seal_failed(error);
        }
        Ok(Flow::Abort)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;
    use jobtrack_core::JobType;

    fn tracker() -> (ControlledJobProgress, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        let job = JobConfiguration::new(JobType::MetadataImport, "import");
        (ControlledJobProgress::new(job, notifier.clone()), notifier)
    }

    #[test]
    fn stage_before_process_is_rejected() {
        let (mut progress, notifier) = tracker();
        assert_eq!(
            progress.starting_stage("x"),
            Err(ProgressError::ProcessNotStarted)
        );
        assert!(notifier.notifications().is_empty());
    }

    #[test]
    fn starting_process_twice_is_rejected() {
        let (mut progress, _) = tracker();
        progress.starting_process("import").unwrap();
        assert_eq!(
            progress.starting_process("again"),
            Err(ProgressError::ProcessAlreadyStarted)
        );
    }

    #[test]
    fn item_cannot_open_while_another_runs() {
        let (mut progress, _) = tracker();
        progress.starting_process("import").unwrap();
        progress
            .starting_stage_with("s", 2, FaultTolerance::SkipItem)
            .unwrap();
        assert!(progress.starting_work_item("a").unwrap());
        assert_eq!(
            progress.starting_work_item("b"),
            Err(ProgressError::ItemAlreadyOpen {
                open: "a".into(),
                requested: "b".into()
            })
        );
        assert!(matches!(
            progress.starting_stage("next"),
            Err(ProgressError::NestedStage { .. })
        ));
    }

    #[test]
    fn implicit_close_uses_policy_verdict() {
        let (mut progress, _) = tracker();
        progress.starting_process("import").unwrap();
        progress
            .starting_stage_with("lenient", 2, FaultTolerance::SkipItem)
            .unwrap();
        progress.starting_work_item("a").unwrap();
        progress.failed_work_item("bad").unwrap();
        progress.starting_stage("next").unwrap();

        let tree = progress.progress().unwrap();
        assert_eq!(tree.stages[0].status, StageStatus::Completed);
        assert_eq!(
            tree.stages[0].message.as_deref(),
            Some("1 of 1 items failed: a: bad")
        );
        assert_eq!(tree.stages[1].status, StageStatus::Running);
    }

    #[test]
    fn sealed_process_rejects_new_stages_but_ignores_terminals() {
        let (mut progress, notifier) = tracker();
        progress.starting_process("import").unwrap();
        progress.completed_process(None).unwrap();

        assert_eq!(
            progress.starting_stage("late"),
            Err(ProgressError::Sealed {
                status: ProcessStatus::Completed
            })
        );
        progress.failed_process("late failure").unwrap();
        assert_eq!(progress.status(), Some(ProcessStatus::Completed));
        assert_eq!(notifier.terminal_count(progress.job().id), 1);
    }

    #[test]
    fn explicit_stage_terminal_is_idempotent() {
        let (mut progress, _) = tracker();
        progress.starting_process("import").unwrap();
        progress.starting_stage("s").unwrap();
        progress.completed_stage(Some("done")).unwrap();
        progress.completed_stage(Some("again")).unwrap();
        progress.failed_stage("late").unwrap();

        let tree = progress.progress().unwrap();
        assert_eq!(tree.stages.len(), 1);
        assert_eq!(tree.stages[0].status, StageStatus::Completed);
        assert_eq!(tree.stages[0].message.as_deref(), Some("done"));
    }

    #[test]
    fn digest_respects_limit() {
        let mut stage = Stage::new("s", 0, FaultTolerance::SkipItem);
        for id in ["a", "b", "c"] {
            let mut item = Item::new(id);
            item.status = ItemStatus::Error;
            item.message = Some("x".into());
            stage.items.push(item);
            stage.failures += 1;
        }
        assert_eq!(
            failure_digest(&stage, 2).as_deref(),
            Some("3 of 3 items failed: a: x; b: x")
        );
        assert_eq!(
            failure_digest(&stage, 0).as_deref(),
            Some("3 of 3 items failed")
        );
    }
}
