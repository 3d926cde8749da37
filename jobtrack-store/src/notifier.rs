use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use jobtrack_core::{JobConfiguration, JobReport, Notification};
use jobtrack_exec::Notifier;

use crate::store::{JobStore, NewJobSummary, NewNotification, StoreError};

enum Command {
    Notify(NewNotification),
    Summary(NewJobSummary),
    Flush(oneshot::Sender<()>),
}

/// Bridges the synchronous tracker to an async [`JobStore`].
///
/// Notifications go through an unbounded channel to a single writer task, so
/// the store sees them in emission order and the job thread never waits on
/// the store.
#[derive(Clone)]
pub struct StoreNotifier {
    tx: mpsc::UnboundedSender<Command>,
}

impl StoreNotifier {
    /// Spawns the writer task; must be called inside a tokio runtime.
    pub fn spawn(store: Arc<dyn JobStore>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Command>();
        tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                match command {
                    Command::Notify(record) => {
                        let job_id = record.job_id;
                        if let Err(err) = store.append_notification(record).await {
                            warn!(%job_id, error = %err, "dropping notification");
                        }
                    }
                    Command::Summary(summary) => {
                        let job_id = summary.job_id;
                        if let Err(err) = store.put_job_summary(summary).await {
                            warn!(%job_id, error = %err, "dropping job summary");
                        }
                    }
                    Command::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
        });
        Self { tx }
    }

    /// Resolves once everything sent before the call has reached the store.
    pub async fn flush(&self) -> Result<(), StoreError> {
        let (ack, done) = oneshot::channel();
        self.tx
            .send(Command::Flush(ack))
            .map_err(|_| StoreError::Closed)?;
        done.await.map_err(|_| StoreError::Closed)
    }

    fn send(&self, command: Command) {
        if self.tx.send(command).is_err() {
            warn!("store writer has stopped, dropping record");
        }
    }
}

impl Notifier for StoreNotifier {
    fn notify(&self, job: &JobConfiguration, notification: &Notification) {
        self.send(Command::Notify(NewNotification {
            job_id: job.id,
            job_type: job.job_type,
            notification: notification.clone(),
        }));
    }

    fn add_job_summary(&self, job: &JobConfiguration, report: &JobReport) {
        self.send(Command::Summary(NewJobSummary {
            job_id: job.id,
            job_type: job.job_type,
            report: report.clone(),
        }));
    }
}
