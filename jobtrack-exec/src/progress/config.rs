#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Emit started/finished notifications for stages, not only for the process.
    pub stage_notifications: bool,
    /// Poll the cancellation flag before each item in addition to each stage.
    pub item_cancellation_checks: bool,
    /// Item errors copied into the message of a stage closed without one.
    pub failure_log_limit: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            stage_notifications: true,
            item_cancellation_checks: true,
            failure_log_limit: 3,
        }
    }
}
