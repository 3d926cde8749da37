mod memory;
mod trait_store;
mod types;

pub use memory::InMemoryJobStore;
pub use trait_store::{JobStore, StoreError};
pub use types::{
    JobSummary, NewJobSummary, NewNotification, StoreConfig, StoredNotification,
};
