mod job;
mod result;
mod scheduler;
mod types;

pub use job::{Job, JobError};
pub use result::{JobExecution, RunnerError};
pub use scheduler::JobRunner;
pub use types::RunnerConfig;
