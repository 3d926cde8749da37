use chrono::{DateTime, Utc};

use crate::types::{FaultTolerance, Process, ProcessStatus, ProcessSummary, StageStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl NotificationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationLevel::Debug => "DEBUG",
            NotificationLevel::Info => "INFO",
            NotificationLevel::Warn => "WARN",
            NotificationLevel::Error => "ERROR",
        }
    }
}

/// Structured payload of a notification.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ProgressEvent {
    ProcessStarted {
        description: String,
    },
    StageStarted {
        description: String,
        work_items: usize,
        fault_tolerance: FaultTolerance,
    },
    StageFinished {
        description: String,
        status: StageStatus,
        successes: usize,
        failures: usize,
        skipped: usize,
        /// Share of the declared estimate attempted; absent without an estimate.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        percent: Option<f64>,
    },
    ProcessFinished {
        status: ProcessStatus,
        summary: ProcessSummary,
        /// Snapshot of the tree at the moment the process was sealed.
        process: Box<Process>,
    },
}

impl ProgressEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressEvent::ProcessFinished { .. })
    }

    pub fn finished(process: &Process) -> Self {
        ProgressEvent::ProcessFinished {
            status: process.status,
            summary: process.summary(),
            process: Box::new(process.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub time: DateTime<Utc>,
    pub level: NotificationLevel,
    pub message: String,
    /// True only for the single event that seals a process.
    pub terminal: bool,
    pub event: ProgressEvent,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>, event: ProgressEvent) -> Self {
        Self {
            time: Utc::now(),
            level,
            message: message.into(),
            terminal: event.is_terminal(),
            event,
        }
    }
}
