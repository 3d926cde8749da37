mod job;
mod notification;
mod status;
mod tolerance;
mod tree;

pub use job::{CancellationFlag, JobConfiguration, JobReport, JobType};
pub use notification::{Notification, NotificationLevel, ProgressEvent};
pub use status::{ItemStatus, ProcessStatus, StageStatus};
pub use tolerance::FaultTolerance;
pub use tree::{Item, Process, ProcessSummary, Stage};
