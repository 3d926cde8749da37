use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use jobtrack_core::ProcessStatus;

use crate::store::trait_store::{JobStore, StoreError};
use crate::store::types::*;

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    notifications: HashMap<Uuid, VecDeque<StoredNotification>>,
    /// Terminal status per job, kept even after its notification is evicted.
    finished: HashMap<Uuid, ProcessStatus>,
    summaries: HashMap<Uuid, JobSummary>,
}

/// Process-local retention of notifications and summaries. Nothing survives a
/// restart.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    config: StoreConfig,
    state: RwLock<State>,
}

impl InMemoryJobStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            state: RwLock::new(State::default()),
        }
    }

    pub async fn job_ids(&self) -> Vec<Uuid> {
        let state = self.state.read().await;
        let mut ids: Vec<Uuid> = state.notifications.keys().copied().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn append_notification(&self, record: NewNotification) -> Result<u64, StoreError> {
        let limit = self.config.max_notifications_per_job.max(1);
        let mut state = self.state.write().await;
        state.next_id += 1;
        let stored = StoredNotification {
            id: state.next_id,
            job_id: record.job_id,
            job_type: record.job_type,
            notification: record.notification,
        };
        if let Some(status) = stored.final_status() {
            state.finished.insert(record.job_id, status);
        }

        let queue = state.notifications.entry(record.job_id).or_default();
        queue.push_back(stored);
        while queue.len() > limit {
            queue.pop_front();
        }
        Ok(state.next_id)
    }

    async fn get_notifications(&self, job_id: Uuid) -> Result<Vec<StoredNotification>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .notifications
            .get(&job_id)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_notifications_after(
        &self,
        job_id: Uuid,
        after_id: u64,
        limit: usize,
    ) -> Result<Vec<StoredNotification>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .notifications
            .get(&job_id)
            .map(|q| {
                q.iter()
                    .filter(|n| n.id > after_id)
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn latest_notification(
        &self,
        job_id: Uuid,
    ) -> Result<Option<StoredNotification>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .notifications
            .get(&job_id)
            .and_then(|q| q.back().cloned()))
    }

    async fn put_job_summary(&self, summary: NewJobSummary) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.summaries.insert(
            summary.job_id,
            JobSummary {
                job_id: summary.job_id,
                job_type: summary.job_type,
                report: summary.report,
                recorded_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get_job_summary(&self, job_id: Uuid) -> Result<Option<JobSummary>, StoreError> {
        let state = self.state.read().await;
        Ok(state.summaries.get(&job_id).cloned())
    }

    async fn get_job_status(&self, job_id: Uuid) -> Result<Option<ProcessStatus>, StoreError> {
        let state = self.state.read().await;
        if let Some(status) = state.finished.get(&job_id) {
            return Ok(Some(*status));
        }
        Ok(state
            .notifications
            .contains_key(&job_id)
            .then_some(ProcessStatus::Running))
    }

    async fn clear_job(&self, job_id: Uuid) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let had_notifications = state.notifications.remove(&job_id).is_some();
        let had_summary = state.summaries.remove(&job_id).is_some();
        state.finished.remove(&job_id);
        if had_notifications || had_summary {
            Ok(())
        } else {
            Err(StoreError::JobNotFound(job_id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobtrack_core::{JobType, Notification, NotificationLevel, ProgressEvent};

    fn started(job_id: Uuid, n: usize) -> NewNotification {
        NewNotification {
            job_id,
            job_type: JobType::MetadataImport,
            notification: Notification::new(
                NotificationLevel::Info,
                format!("note {n}"),
                ProgressEvent::ProcessStarted {
                    description: "import".into(),
                },
            ),
        }
    }

    #[tokio::test]
    async fn retention_drops_oldest_first() {
        let store = InMemoryJobStore::new(StoreConfig {
            max_notifications_per_job: 2,
        });
        let job_id = Uuid::new_v4();
        for n in 0..4 {
            store.append_notification(started(job_id, n)).await.unwrap();
        }

        let kept: Vec<_> = store
            .get_notifications(job_id)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.notification.message)
            .collect();
        assert_eq!(kept, vec!["note 2", "note 3"]);
    }

    #[tokio::test]
    async fn pagination_uses_sequence_ids() {
        let store = InMemoryJobStore::default();
        let job_id = Uuid::new_v4();
        let other = Uuid::new_v4();
        let first = store.append_notification(started(job_id, 0)).await.unwrap();
        store.append_notification(started(other, 1)).await.unwrap();
        store.append_notification(started(job_id, 2)).await.unwrap();
        store.append_notification(started(job_id, 3)).await.unwrap();

        let page = store.get_notifications_after(job_id, first, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].notification.message, "note 2");
    }

    #[tokio::test]
    async fn clearing_unknown_job_is_an_error() {
        let store = InMemoryJobStore::default();
        let err = store.clear_job(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::JobNotFound(_)));
    }
}
