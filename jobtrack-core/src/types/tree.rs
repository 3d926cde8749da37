use chrono::{DateTime, Utc};

use crate::types::{FaultTolerance, ItemStatus, ProcessStatus, StageStatus};

/// Root of one job execution.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Process {
    pub description: String,
    pub status: ProcessStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stages: Vec<Stage>,
}

impl Process {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            status: ProcessStatus::Running,
            message: None,
            started_at: Utc::now(),
            finished_at: None,
            stages: Vec::new(),
        }
    }

    /// The stage still running, if any. Only the last stage can be open.
    pub fn open_stage(&self) -> Option<&Stage> {
        self.stages.last().filter(|s| !s.status.is_terminal())
    }

    pub fn open_stage_mut(&mut self) -> Option<&mut Stage> {
        self.stages.last_mut().filter(|s| !s.status.is_terminal())
    }

    pub fn finish(&mut self, status: ProcessStatus, message: Option<String>) {
        self.status = status;
        self.message = message;
        self.finished_at = Some(Utc::now());
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }

    pub fn summary(&self) -> ProcessSummary {
        ProcessSummary::of(self)
    }
}

/// One bounded phase of a process.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub description: String,
    /// Advisory estimate of the number of items; 0 when unknown.
    pub work_items: usize,
    pub fault_tolerance: FaultTolerance,
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub successes: usize,
    pub failures: usize,
    /// Declared items never attempted because the stage was cut short.
    pub skipped: usize,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Stage {
    pub fn new(
        description: impl Into<String>,
        work_items: usize,
        fault_tolerance: FaultTolerance,
    ) -> Self {
        Self {
            description: description.into(),
            work_items,
            fault_tolerance,
            status: StageStatus::Running,
            message: None,
            successes: 0,
            failures: 0,
            skipped: 0,
            started_at: Utc::now(),
            finished_at: None,
            items: Vec::new(),
        }
    }

    pub fn attempted(&self) -> usize {
        self.successes + self.failures
    }

    /// Share of the declared estimate already attempted, capped at 100.
    pub fn percent(&self) -> Option<f64> {
        if self.work_items == 0 {
            return None;
        }
        let done = self.attempted().min(self.work_items);
        Some(done as f64 * 100.0 / self.work_items as f64)
    }

    pub fn open_item_mut(&mut self) -> Option<&mut Item> {
        self.items
            .last_mut()
            .filter(|i| i.status == ItemStatus::Running)
    }

    pub fn has_open_item(&self) -> bool {
        self.items
            .last()
            .is_some_and(|i| i.status == ItemStatus::Running)
    }

    pub fn finish(&mut self, status: StageStatus, message: Option<String>) {
        self.status = status;
        if message.is_some() {
            self.message = message;
        }
        self.finished_at = Some(Utc::now());
    }
}

/// One unit of work inside a stage iterating a collection.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Item {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: ItemStatus::Running,
            message: None,
        }
    }
}

/// Counts derived from a progress tree, carried by terminal notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSummary {
    pub stages_completed: usize,
    pub stages_failed: usize,
    pub stages_skipped: usize,
    pub stages_cancelled: usize,
    pub items_succeeded: usize,
    pub items_failed: usize,
    pub items_skipped: usize,
}

impl ProcessSummary {
    pub fn of(process: &Process) -> Self {
        let mut summary = Self::default();
        for stage in &process.stages {
            match stage.status {
                StageStatus::Completed => summary.stages_completed += 1,
                StageStatus::Failed => summary.stages_failed += 1,
                StageStatus::Skipped => summary.stages_skipped += 1,
                StageStatus::Cancelled => summary.stages_cancelled += 1,
                StageStatus::Running => {}
            }
            summary.items_succeeded += stage.successes;
            summary.items_failed += stage.failures;
            summary.items_skipped += stage.skipped;
        }
        summary
    }

    pub fn stages_total(&self) -> usize {
        self.stages_completed + self.stages_failed + self.stages_skipped + self.stages_cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_stage_is_last_running_stage() {
        let mut process = Process::new("import");
        assert!(process.open_stage().is_none());

        process.stages.push(Stage::new("a", 0, FaultTolerance::None));
        assert_eq!(process.open_stage().unwrap().description, "a");

        process.stages[0].finish(StageStatus::Completed, None);
        assert!(process.open_stage().is_none());
    }

    #[test]
    fn percent_uses_estimate_and_caps() {
        let mut stage = Stage::new("x", 4, FaultTolerance::SkipItem);
        assert_eq!(stage.percent(), Some(0.0));
        stage.successes = 1;
        stage.failures = 1;
        assert_eq!(stage.percent(), Some(50.0));
        stage.successes = 10;
        assert_eq!(stage.percent(), Some(100.0));

        let unknown = Stage::new("y", 0, FaultTolerance::None);
        assert_eq!(unknown.percent(), None);
    }

    #[test]
    fn summary_counts_stages_and_items() {
        let mut process = Process::new("p");
        let mut a = Stage::new("a", 3, FaultTolerance::SkipItem);
        a.successes = 2;
        a.failures = 1;
        a.finish(StageStatus::Completed, None);
        let mut b = Stage::new("b", 5, FaultTolerance::SkipStage);
        b.failures = 1;
        b.skipped = 4;
        b.finish(StageStatus::Failed, Some("boom".into()));
        process.stages = vec![a, b];

        let summary = process.summary();
        assert_eq!(summary.stages_completed, 1);
        assert_eq!(summary.stages_failed, 1);
        assert_eq!(summary.stages_total(), 2);
        assert_eq!(summary.items_succeeded, 2);
        assert_eq!(summary.items_failed, 2);
        assert_eq!(summary.items_skipped, 4);
    }

    #[test]
    fn stage_finish_keeps_earlier_message_when_none_given() {
        let mut stage = Stage::new("s", 0, FaultTolerance::None);
        stage.message = Some("first error".into());
        stage.finish(StageStatus::Failed, None);
        assert_eq!(stage.message.as_deref(), Some("first error"));
        assert!(stage.finished_at.is_some());
    }
}
