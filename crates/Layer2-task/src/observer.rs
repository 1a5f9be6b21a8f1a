//! Monitor observers
//!
//! A TaskMonitor reports two kinds of notifications: the first observation
//! of a completed task, and failures. Observers never influence polling; a
//! failing hook is logged and ignored.

use region_client::TaskStatusRecord;
use region_foundation::{Error, Result};
use std::fmt;
use tokio::sync::mpsc;

/// Failure reported to [`MonitorObserver::on_error`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// Status request failed (network, timeout, 5xx, undecodable body)
    Transport(String),

    /// Status request returned 404
    NotFound,

    /// Task entered `failed`
    TaskFailed(String),

    /// Task entered `stopped`
    TaskStopped(String),

    /// Stop request was rejected or could not be sent
    StopFailed(String),
}

impl MonitorEvent {
    /// Text for the error panel
    pub fn message(&self) -> String {
        match self {
            MonitorEvent::Transport(msg)
            | MonitorEvent::TaskFailed(msg)
            | MonitorEvent::TaskStopped(msg) => msg.clone(),
            MonitorEvent::NotFound => NOT_FOUND_MESSAGE.to_string(),
            MonitorEvent::StopFailed(msg) => format!("Failed to stop research: {}", msg),
        }
    }

    /// Whether the remote task itself ended unsuccessfully
    pub fn is_task_outcome(&self) -> bool {
        matches!(self, MonitorEvent::TaskFailed(_) | MonitorEvent::TaskStopped(_))
    }
}

impl fmt::Display for MonitorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

pub(crate) const NOT_FOUND_MESSAGE: &str = "Research task not found";

/// Hooks invoked by a TaskMonitor
pub trait MonitorObserver: Send + Sync {
    /// First observation of `completed` within a binding
    fn on_complete(&self, _record: &TaskStatusRecord) -> Result<()> {
        Ok(())
    }

    /// Poll failure, stop failure, or a transition into failed/stopped
    fn on_error(&self, _event: &MonitorEvent) -> Result<()> {
        Ok(())
    }
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl MonitorObserver for NoopObserver {}

/// Notification forwarded by [`ChannelObserver`]
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorNotification {
    Completed(TaskStatusRecord),
    Error(MonitorEvent),
}

/// Forwards notifications to an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<MonitorNotification>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MonitorNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, notification: MonitorNotification) -> Result<()> {
        self.tx
            .send(notification)
            .map_err(|_| Error::Internal("monitor notification receiver dropped".to_string()))
    }
}

impl MonitorObserver for ChannelObserver {
    fn on_complete(&self, record: &TaskStatusRecord) -> Result<()> {
        self.send(MonitorNotification::Completed(record.clone()))
    }

    fn on_error(&self, event: &MonitorEvent) -> Result<()> {
        self.send(MonitorNotification::Error(event.clone()))
    }
}
