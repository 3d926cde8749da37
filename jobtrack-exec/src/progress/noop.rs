use jobtrack_core::{CancellationFlag, FaultTolerance, ProgressError};

use crate::progress::{Flow, JobProgress, StageTally};

/// A tracker that records nothing.
///
/// Work still runs under the declared policies so errors surface the same way
/// they would under tracking; only the tree and the notifications are missing.
#[derive(Debug, Default)]
pub struct NoopJobProgress {
    cancellation: Option<CancellationFlag>,
    fault_tolerance: FaultTolerance,
    tally: StageTally,
}

impl NoopJobProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe `flag` so cooperative cancellation still reaches the job.
    pub fn watching(flag: CancellationFlag) -> Self {
        Self {
            cancellation: Some(flag),
            ..Self::default()
        }
    }
}

impl JobProgress for NoopJobProgress {
    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationFlag::is_requested)
    }

    fn poll_cancellation(&mut self) -> bool {
        self.is_cancelled()
    }

    fn starting_process(&mut self, _description: &str) -> Result<(), ProgressError> {
        Ok(())
    }

    fn completed_process(&mut self, _message: Option<&str>) -> Result<(), ProgressError> {
        Ok(())
    }

    fn failed_process(&mut self, _error: &str) -> Result<(), ProgressError> {
        Ok(())
    }

    fn starting_stage_with(
        &mut self,
        _description: &str,
        _work_items: usize,
        fault_tolerance: FaultTolerance,
    ) -> Result<(), ProgressError> {
        self.fault_tolerance = fault_tolerance;
        self.tally = StageTally::default();
        Ok(())
    }

    fn completed_stage(&mut self, _message: Option<&str>) -> Result<(), ProgressError> {
        Ok(())
    }

    fn failed_stage(&mut self, _error: &str) -> Result<(), ProgressError> {
        Ok(())
    }

    fn skipped_stage(&mut self, _reason: Option<&str>) -> Result<(), ProgressError> {
        Ok(())
    }

    fn close_stage(&mut self, _message: Option<&str>) -> Result<bool, ProgressError> {
        Ok(self
            .fault_tolerance
            .stage_succeeds(self.tally.successes, self.tally.failures))
    }

    fn fault_tolerance(&self) -> Result<FaultTolerance, ProgressError> {
        Ok(self.fault_tolerance)
    }

    fn stage_tally(&self) -> Result<StageTally, ProgressError> {
        Ok(self.tally)
    }

    fn starting_work_item(&mut self, _id: &str) -> Result<bool, ProgressError> {
        Ok(!self.is_cancelled())
    }

    fn completed_work_item(&mut self, _message: Option<&str>) -> Result<(), ProgressError> {
        self.tally.successes += 1;
        Ok(())
    }

    fn failed_work_item(&mut self, _error: &str) -> Result<Flow, ProgressError> {
        self.tally.failures += 1;
        Ok(match self.fault_tolerance {
            FaultTolerance::None => Flow::Abort,
            FaultTolerance::SkipStage => Flow::SkipStage,
            FaultTolerance::SkipItem | FaultTolerance::SkipItemOutlier => Flow::Continue,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::RunStage;

    #[derive(Debug, thiserror::Error)]
    enum Boom {
        #[error("boom")]
        Boom,
        #[error(transparent)]
        Progress(#[from] ProgressError),
    }

    #[test]
    fn fail_fast_error_still_propagates() {
        let mut progress = NoopJobProgress::new();
        progress.starting_stage("load").unwrap();
        let result: Result<Option<()>, Boom> = progress.run_stage(|| Err(Boom::Boom));
        assert!(matches!(result, Err(Boom::Boom)));
    }

    #[test]
    fn tolerant_items_keep_going() {
        let mut progress = NoopJobProgress::new();
        progress
            .starting_stage_with("items", 3, FaultTolerance::SkipItem)
            .unwrap();
        let mut seen = Vec::new();
        let ok = progress
            .run_stage_items(
                [1, 2, 3],
                |n| n.to_string(),
                |n| {
                    seen.push(n);
                    if n == 2 {
                        Err("bad")
                    } else {
                        Ok(())
                    }
                },
                |s, f| format!("{s}/{f}"),
            )
            .unwrap();
        assert!(ok);
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn watched_flag_stops_items() {
        let flag = CancellationFlag::new();
        let mut progress = NoopJobProgress::watching(flag.clone());
        progress.starting_stage("s").unwrap();
        flag.request();
        assert!(!progress.starting_work_item("a").unwrap());
        assert!(progress.is_cancelled());
    }
}
