use std::sync::Arc;

use jobtrack_core::{
    FaultTolerance, ItemStatus, JobConfiguration, JobType, ProcessStatus, ProgressError,
    StageStatus,
};
use jobtrack_exec::{
    ControlledJobProgress, JobError, JobProgress, RecordingNotifier, RunStage, TrackerConfig,
};

fn tracker(config: TrackerConfig) -> (ControlledJobProgress, JobConfiguration, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::new());
    let job = JobConfiguration::new(JobType::TrackerImport, "events");
    let progress = ControlledJobProgress::with_config(job.clone(), notifier.clone(), config);
    (progress, job, notifier)
}

#[test]
fn no_stage_starts_after_cancellation() {
    let (mut progress, job, notifier) = tracker(TrackerConfig::default());
    progress.starting_process("events").unwrap();
    progress.starting_stage("validate").unwrap();
    progress.completed_stage(None).unwrap();

    job.request_cancellation();
    assert!(progress.is_cancelled());
    progress.starting_stage("persist").unwrap();
    progress.completed_process(None).unwrap();
    progress.failed_process("too late").unwrap();

    let tree = progress.progress().unwrap();
    assert_eq!(tree.status, ProcessStatus::Cancelled);
    assert_eq!(tree.stages.len(), 1);
    assert_eq!(tree.stages[0].status, StageStatus::Completed);
    assert_eq!(notifier.terminal_count(job.id), 1);
}

#[test]
fn cancellation_between_items_stops_the_stage() {
    let (mut progress, job, notifier) = tracker(TrackerConfig::default());
    progress.starting_process("events").unwrap();
    progress
        .starting_stage_with("persist", 4, FaultTolerance::SkipItem)
        .unwrap();

    let mut processed = Vec::new();
    let ok = progress
        .run_stage_items(
            1..=4,
            |n| n.to_string(),
            |n| {
                processed.push(n);
                if n == 2 {
                    job.request_cancellation();
                }
                Ok::<_, String>(())
            },
            |s, f| format!("{s}/{f}"),
        )
        .unwrap();

    assert!(!ok);
    assert_eq!(processed, vec![1, 2]);
    let tree = progress.progress().unwrap();
    assert_eq!(tree.status, ProcessStatus::Cancelled);
    let stage = &tree.stages[0];
    assert_eq!(stage.status, StageStatus::Cancelled);
    assert_eq!((stage.successes, stage.skipped), (2, 2));
    assert!(stage.items.iter().all(|i| i.status == ItemStatus::Success));
    assert_eq!(notifier.terminal_count(job.id), 1);
}

#[test]
fn item_checks_can_be_limited_to_stage_boundaries() {
    let config = TrackerConfig {
        item_cancellation_checks: false,
        ..Default::default()
    };
    let (mut progress, job, _) = tracker(config);
    progress.starting_process("events").unwrap();
    progress
        .starting_stage_with("persist", 3, FaultTolerance::SkipItem)
        .unwrap();

    let mut processed = 0;
    progress
        .run_stage_items(
            1..=3,
            |n| n.to_string(),
            |n| {
                processed += 1;
                if n == 1 {
                    job.request_cancellation();
                }
                Ok::<_, String>(())
            },
            |s, f| format!("{s}/{f}"),
        )
        .unwrap();
    assert_eq!(processed, 3);

    progress.starting_stage("next").unwrap();
    assert_eq!(progress.status(), Some(ProcessStatus::Cancelled));
}

#[test]
fn run_stage_skips_work_once_cancelled() {
    let (mut progress, job, _) = tracker(TrackerConfig::default());
    progress.starting_process("events").unwrap();
    progress.starting_stage("load").unwrap();
    job.request_cancellation();

    let mut ran = false;
    let value = progress
        .run_stage(|| {
            ran = true;
            Ok::<_, ProgressError>(1)
        })
        .unwrap();
    assert_eq!(value, None);
    assert!(!ran);
    assert_eq!(progress.status(), Some(ProcessStatus::Cancelled));
}

#[test]
fn fail_fast_item_interrupted_by_cancellation_ends_cancelled() {
    let (mut progress, job, notifier) = tracker(TrackerConfig::default());
    progress.starting_process("events").unwrap();
    progress
        .starting_stage_with("persist", 3, FaultTolerance::None)
        .unwrap();

    let mut processed = Vec::new();
    let ok = progress
        .run_stage_items(
            1..=3,
            |n| n.to_string(),
            |n| {
                processed.push(n);
                job.request_cancellation();
                Err::<(), _>("interrupted")
            },
            |s, f| format!("{s}/{f}"),
        )
        .unwrap();

    assert!(!ok);
    assert_eq!(processed, vec![1]);
    let tree = progress.progress().unwrap();
    assert_eq!(tree.status, ProcessStatus::Cancelled);
    let stage = &tree.stages[0];
    assert_eq!(stage.status, StageStatus::Cancelled);
    assert_eq!((stage.failures, stage.skipped), (1, 2));
    assert_eq!(stage.items[0].status, ItemStatus::Error);
    assert_eq!(notifier.terminal_count(job.id), 1);
}

#[test]
fn fail_fast_stage_body_interrupted_by_cancellation_ends_cancelled() {
    let (mut progress, job, notifier) = tracker(TrackerConfig::default());
    progress.starting_process("events").unwrap();
    progress.starting_stage("load").unwrap();

    let result = progress.run_stage(|| {
        job.request_cancellation();
        Err::<(), _>(JobError::failed("connection reset"))
    });
    assert!(matches!(result, Ok(None)));

    progress.completed_process(None).unwrap();
    let tree = progress.progress().unwrap();
    assert_eq!(tree.status, ProcessStatus::Cancelled);
    assert_eq!(tree.stages[0].status, StageStatus::Cancelled);
    assert_eq!(notifier.terminal_count(job.id), 1);
}
