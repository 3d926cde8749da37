#![forbid(unsafe_code)]

//! Retention of job notifications and summaries.

pub mod notifier;
pub mod store;

pub use crate::notifier::StoreNotifier;
pub use crate::store::{
    InMemoryJobStore, JobStore, JobSummary, NewJobSummary, NewNotification, StoreConfig,
    StoreError, StoredNotification,
};
