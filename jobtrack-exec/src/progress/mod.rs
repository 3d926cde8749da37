//! The contract jobs use to report progress, and the trackers implementing it.
//!
//! [`JobProgress`] holds the object-safe primitives a tracker implements.
//! [`RunStage`] layers the supervised loops (`run_stage`, `run_stage_items`)
//! on top of them for every tracker, including `dyn JobProgress`.

mod config;
mod controlled;
mod noop;

use std::fmt;

use jobtrack_core::{FaultTolerance, ProgressError};

pub use config::TrackerConfig;
pub use controlled::ControlledJobProgress;
pub use noop::NoopJobProgress;

/// What a caller should do after reporting a failed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Move on to the next item.
    Continue,
    /// Stop iterating this stage; the process goes on.
    SkipStage,
    /// The process is over (failed or cancelled); stop everything.
    Abort,
}

/// Counters of the open stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTally {
    pub successes: usize,
    pub failures: usize,
    pub skipped: usize,
}

pub trait JobProgress {
    /// True once cancellation was requested for the job or observed by the tracker.
    fn is_cancelled(&self) -> bool;

    /// Check the cancellation flag and, the first time it is seen set, seal the
    /// process as cancelled. Returns whether the job is cancelled.
    fn poll_cancellation(&mut self) -> bool;

    fn starting_process(&mut self, description: &str) -> Result<(), ProgressError>;

    fn completed_process(&mut self, message: Option<&str>) -> Result<(), ProgressError>;

    fn failed_process(&mut self, error: &str) -> Result<(), ProgressError>;

    /// Start a fail-fast stage without an item estimate.
    fn starting_stage(&mut self, description: &str) -> Result<(), ProgressError> {
        self.starting_stage_with(description, 0, FaultTolerance::None)
    }

    /// Start a stage, closing any stage left open.
    fn starting_stage_with(
        &mut self,
        description: &str,
        work_items: usize,
        fault_tolerance: FaultTolerance,
    ) -> Result<(), ProgressError>;

    fn completed_stage(&mut self, message: Option<&str>) -> Result<(), ProgressError>;

    fn failed_stage(&mut self, error: &str) -> Result<(), ProgressError>;

    fn skipped_stage(&mut self, reason: Option<&str>) -> Result<(), ProgressError>;

    /// Close the open stage with the verdict its policy gives for the recorded
    /// counters. Returns whether the stage counts as successful.
    fn close_stage(&mut self, message: Option<&str>) -> Result<bool, ProgressError>;

    fn fault_tolerance(&self) -> Result<FaultTolerance, ProgressError>;

    fn stage_tally(&self) -> Result<StageTally, ProgressError>;

    /// Open an item. Returns false when the item must not run, because the job
    /// was cancelled or the stage was cut short.
    fn starting_work_item(&mut self, id: &str) -> Result<bool, ProgressError>;

    fn completed_work_item(&mut self, message: Option<&str>) -> Result<(), ProgressError>;

    fn failed_work_item(&mut self, error: &str) -> Result<Flow, ProgressError>;
}

/// Supervised execution of stage bodies, available on every [`JobProgress`].
pub trait RunStage: JobProgress {
    /// Run `work` as the body of the open stage and close the stage.
    ///
    /// A failure under [`FaultTolerance::None`] fails the process and hands
    /// the original error back. Under any other policy it is recorded on the
    /// stage and `Ok(None)` is returned. Cancellation yields `Ok(None)`, both
    /// before `work` runs and when `work` fails after cancellation was requested.
    fn run_stage<T, E, F>(&mut self, work: F) -> Result<Option<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: fmt::Display + From<ProgressError>,
    {
        if self.poll_cancellation() {
            return Ok(None);
        }
        let fault_tolerance = self.fault_tolerance()?;
        match work() {
            Ok(value) => {
                self.completed_stage(None)?;
                Ok(Some(value))
            }
            Err(err) => {
                self.failed_stage(&err.to_string())?;
                if fault_tolerance.fails_process() && !self.is_cancelled() {
                    Err(err)
                } else {
                    Ok(None)
                }
            }
        }
    }

    /// Like [`RunStage::run_stage`], substituting `fallback` for a tolerated
    /// failure or a cancelled job.
    fn run_stage_or<T, E, F>(&mut self, fallback: T, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: fmt::Display + From<ProgressError>,
    {
        Ok(self.run_stage(work)?.unwrap_or(fallback))
    }

    /// Process every item of `items` in order under the open stage's policy.
    ///
    /// `summarizer(successes, failures)` becomes the stage message. Returns
    /// whether the stage counts as successful for the rest of the process.
    fn run_stage_items<I, E, Id, P, S>(
        &mut self,
        items: I,
        id_fn: Id,
        mut processor: P,
        summarizer: S,
    ) -> Result<bool, ProgressError>
    where
        I: IntoIterator,
        Id: FnMut(&I::Item) -> String,
        P: FnMut(I::Item) -> Result<(), E>,
        E: fmt::Display,
        S: FnOnce(usize, usize) -> String,
    {
        self.run_stage_items_with(items, id_fn, |item| processor(item), |_| None, summarizer)
    }

    /// [`RunStage::run_stage_items`] for processors producing a value;
    /// `item_summary` turns it into the item's completion message.
    fn run_stage_items_with<I, R, E, Id, P, D, S>(
        &mut self,
        items: I,
        mut id_fn: Id,
        mut processor: P,
        mut item_summary: D,
        summarizer: S,
    ) -> Result<bool, ProgressError>
    where
        I: IntoIterator,
        Id: FnMut(&I::Item) -> String,
        P: FnMut(I::Item) -> Result<R, E>,
        E: fmt::Display,
        D: FnMut(&R) -> Option<String>,
        S: FnOnce(usize, usize) -> String,
    {
        if self.poll_cancellation() {
            return Ok(false);
        }
        self.fault_tolerance()?;

        for item in items {
            let id = id_fn(&item);
            if !self.starting_work_item(&id)? {
                if self.is_cancelled() {
                    return Ok(false);
                }
                break;
            }
            match processor(item) {
                Ok(result) => {
                    let message = item_summary(&result);
                    self.completed_work_item(message.as_deref())?;
                }
                Err(err) => match self.failed_work_item(&err.to_string())? {
                    Flow::Continue => {}
                    Flow::SkipStage => break,
                    Flow::Abort => return Ok(false),
                },
            }
        }

        let tally = self.stage_tally()?;
        let summary = summarizer(tally.successes, tally.failures);
        self.close_stage(Some(&summary))
    }
}

impl<P: JobProgress + ?Sized> RunStage for P {}
