use std::time::Duration;

use crate::progress::TrackerConfig;

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Cancellation is requested once a job runs longer than this.
    pub timeout: Option<Duration>,
    /// Complete a process the job returned from without sealing it.
    /// When false such a process is failed instead.
    pub auto_complete: bool,
    pub tracker: TrackerConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            auto_complete: true,
            tracker: TrackerConfig::default(),
        }
    }
}
