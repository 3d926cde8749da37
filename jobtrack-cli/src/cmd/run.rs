use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use jobtrack_core::ProcessStatus;
use jobtrack_exec::{
    CompositeNotifier, JobExecution, JobRunner, MetricsCollector, MetricsNotifier, RunnerConfig,
    TracingNotifier, TrackerConfig,
};
use jobtrack_store::{InMemoryJobStore, JobStore, StoreConfig, StoreNotifier, StoredNotification};

use crate::exit_codes;
use crate::output::{print_error, print_result, render_process, OutputFormat};
use crate::plan::{JobPlan, PlanError, PlannedJob};
use crate::{OutputArgs, TrackerArgs};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunResult {
    execution: JobExecution,
    metrics: serde_json::Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    notifications: Vec<StoredNotification>,
}

pub async fn run_cmd(
    path: &Path,
    timeout_ms: Option<u64>,
    auto_complete: bool,
    events: bool,
    tracker: TrackerArgs,
    output: OutputArgs,
) -> i32 {
    let plan = match JobPlan::load(path) {
        Ok((plan, _)) => plan,
        Err(err @ PlanError::Io { .. }) => {
            print_error(output.format, output.quiet, &err.to_string());
            return exit_codes::RUNTIME_ERROR;
        }
        Err(err) => {
            print_error(output.format, output.quiet, &err.to_string());
            return exit_codes::VALIDATION_FAILED;
        }
    };

    let store = Arc::new(InMemoryJobStore::new(StoreConfig {
        max_notifications_per_job: tracker.max_notifications,
    }));
    let store_notifier = StoreNotifier::spawn(store.clone());
    let collector = Arc::new(MetricsCollector::new());
    let sinks = CompositeNotifier::new()
        .with(Arc::new(TracingNotifier))
        .with(Arc::new(store_notifier.clone()));
    let notifier = Arc::new(MetricsNotifier::new(collector.clone(), Arc::new(sinks)));

    let config = RunnerConfig {
        timeout: timeout_ms.map(Duration::from_millis),
        auto_complete,
        tracker: TrackerConfig {
            stage_notifications: !tracker.no_stage_notifications,
            item_cancellation_checks: !tracker.no_item_cancellation_checks,
            ..TrackerConfig::default()
        },
    };
    let runner = JobRunner::new(config, notifier);
    let job_config = plan.configuration();
    let job = Arc::new(PlannedJob::new(plan));

    let execution = match runner.run(job, job_config.clone()).await {
        Ok(execution) => execution,
        Err(err) => {
            print_error(output.format, output.quiet, &err.to_string());
            return exit_codes::RUNTIME_ERROR;
        }
    };

    if let Err(err) = store_notifier.flush().await {
        tracing::warn!(error = %err, "notifications were not all retained");
    }
    let notifications = if events {
        match store.get_notifications(job_config.id).await {
            Ok(list) => list,
            Err(err) => {
                tracing::warn!(error = %err, "could not read retained notifications");
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    let code = exit_code(execution.status);
    if output.format == OutputFormat::Text && !output.quiet {
        print!("{}", render_process(&execution.process));
        if let Some(error) = &execution.error {
            eprintln!("error: {error}");
        }
        for stored in &notifications {
            println!(
                "#{} {} {}",
                stored.id,
                stored.notification.level.as_str(),
                stored.notification.message
            );
        }
    } else {
        let result = RunResult {
            execution,
            metrics: collector.get_metrics().to_json(),
            notifications,
        };
        print_result(output.format, output.quiet, &result);
    }
    code
}

fn exit_code(status: ProcessStatus) -> i32 {
    match status {
        ProcessStatus::Completed => exit_codes::SUCCESS,
        ProcessStatus::Cancelled => exit_codes::JOB_CANCELLED,
        ProcessStatus::Failed | ProcessStatus::Running => exit_codes::JOB_FAILED,
    }
}
