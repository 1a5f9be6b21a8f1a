//! Derived presentation state
//!
//! Pure functions from [`MonitorState`] to what a renderer needs: which
//! phase to show, badge tone and label, progress style, the action offered
//! for the current status, and the report preview. Nothing here touches
//! the network or the monitor's bookkeeping.

use crate::monitor::MonitorState;
use region_client::{ResearchStatus, TaskStatusRecord};
use region_foundation::strings::{take_chars, ELLIPSIS};

/// Label shown when the server sends no `current_step`
pub const DEFAULT_STEP_LABEL: &str = "Initializing";

/// Colour family of a badge or progress bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BadgeTone {
    Info,
    Primary,
    Success,
    Danger,
    Warning,
    Secondary,
}

impl BadgeTone {
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeTone::Info => "info",
            BadgeTone::Primary => "primary",
            BadgeTone::Success => "success",
            BadgeTone::Danger => "danger",
            BadgeTone::Warning => "warning",
            BadgeTone::Secondary => "secondary",
        }
    }
}

/// Status badge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBadge {
    pub tone: BadgeTone,
    pub label: String,
}

impl StatusBadge {
    /// Unrecognized statuses get a secondary badge labelled with the raw value
    pub fn for_status(status: &ResearchStatus) -> Self {
        let tone = match status {
            ResearchStatus::Queued => BadgeTone::Info,
            ResearchStatus::Starting | ResearchStatus::Running => BadgeTone::Primary,
            ResearchStatus::Completed => BadgeTone::Success,
            ResearchStatus::Failed => BadgeTone::Danger,
            ResearchStatus::Stopped => BadgeTone::Warning,
            ResearchStatus::Other(_) => BadgeTone::Secondary,
        };
        Self {
            tone,
            label: status.display_name().to_string(),
        }
    }
}

/// Progress bar colour. Only running is primary; starting and unknown
/// statuses use info.
pub fn progress_tone(status: &ResearchStatus) -> BadgeTone {
    match status {
        ResearchStatus::Starting | ResearchStatus::Other(_) => BadgeTone::Info,
        other => StatusBadge::for_status(other).tone,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStyle {
    Animated,
    Static,
}

impl ProgressStyle {
    pub fn for_status(status: &ResearchStatus) -> Self {
        match status {
            ResearchStatus::Queued | ResearchStatus::Starting | ResearchStatus::Running => {
                ProgressStyle::Animated
            }
            _ => ProgressStyle::Static,
        }
    }
}

/// Status-specific control below the progress bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affordance {
    None,
    /// Offer to stop the task
    Stop,
    /// Show the report section
    Report,
    /// Show the task's failure message
    ErrorPanel,
}

impl Affordance {
    pub fn for_status(status: &ResearchStatus) -> Self {
        match status {
            ResearchStatus::Starting | ResearchStatus::Running => Affordance::Stop,
            ResearchStatus::Completed => Affordance::Report,
            ResearchStatus::Failed => Affordance::ErrorPanel,
            _ => Affordance::None,
        }
    }
}

/// Report section
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportView {
    /// Task is not completed
    Hidden,
    /// Report requested, body not yet available
    Loading,
    /// Report request failed; the status display is unaffected
    Unavailable(String),
    /// First N characters plus an ellipsis when truncated; always offers expand
    Collapsed { preview: String, truncated: bool },
    /// Full body; offers collapse
    Expanded { body: String },
}

impl ReportView {
    pub fn is_visible(&self) -> bool {
        !matches!(self, ReportView::Hidden)
    }
}

/// Build the report section from the report state
pub fn derive_report(
    status: &ResearchStatus,
    body: Option<&str>,
    report_error: Option<&str>,
    expanded: bool,
    preview_chars: usize,
) -> ReportView {
    if *status != ResearchStatus::Completed {
        return ReportView::Hidden;
    }

    match (body, report_error) {
        (Some(body), _) if expanded => ReportView::Expanded {
            body: body.to_string(),
        },
        (Some(body), _) => {
            let (head, truncated) = take_chars(body, preview_chars);
            let preview = if truncated {
                format!("{}{}", head, ELLIPSIS)
            } else {
                head.into_owned()
            };
            ReportView::Collapsed { preview, truncated }
        }
        (None, Some(err)) => ReportView::Unavailable(err.to_string()),
        (None, None) => ReportView::Loading,
    }
}

/// Everything shown once a snapshot exists
#[derive(Debug, Clone, PartialEq)]
pub struct ReadyView {
    pub task_id: String,
    pub region_name: String,
    pub status: ResearchStatus,
    pub badge: StatusBadge,
    /// Clamped to 0..=100
    pub progress: u16,
    pub progress_tone: BadgeTone,
    pub progress_style: ProgressStyle,
    pub step: String,
    pub affordance: Affordance,
    /// Error panel text layered over the snapshot
    pub error: Option<String>,
    pub report: ReportView,
    pub start_time: Option<String>,
    pub updated_at: Option<String>,
    pub end_time: Option<String>,
    pub stopping: bool,
    pub polling: bool,
}

impl ReadyView {
    fn from_record(record: &TaskStatusRecord, state: &MonitorState, preview_chars: usize) -> Self {
        let status = record.status.clone();
        Self {
            task_id: record.task_id.clone(),
            region_name: record.region_name.clone().unwrap_or_default(),
            badge: StatusBadge::for_status(&status),
            progress: record.progress_percent(),
            progress_tone: progress_tone(&status),
            progress_style: ProgressStyle::for_status(&status),
            step: record
                .current_step
                .clone()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_STEP_LABEL.to_string()),
            affordance: Affordance::for_status(&status),
            error: state.error.clone(),
            report: derive_report(
                &status,
                state.report.as_ref().map(|r| r.report.as_str()),
                state.report_error.as_deref(),
                state.report_expanded,
                preview_chars,
            ),
            start_time: record.start_time.clone(),
            updated_at: record.updated_at.clone(),
            end_time: record.end_time.clone(),
            stopping: state.stopping,
            polling: state.polling,
            status,
        }
    }

    /// The stop control is offered and no stop request is in flight
    pub fn can_stop(&self) -> bool {
        self.affordance == Affordance::Stop && !self.stopping
    }
}

/// Display phase, checked in order: loading, error, not found, ready
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorView {
    /// No snapshot and the first fetch has not resolved
    Loading,
    /// No snapshot; the fetch failed
    Error(String),
    /// No snapshot; the server does not know the task
    NotFound { task_id: String },
    Ready(Box<ReadyView>),
}

impl MonitorView {
    pub fn derive(state: &MonitorState, preview_chars: usize) -> Self {
        match &state.status {
            Some(record) => MonitorView::Ready(Box::new(ReadyView::from_record(
                record,
                state,
                preview_chars,
            ))),
            None if state.loading => MonitorView::Loading,
            None => match (&state.error, state.not_found) {
                (Some(err), false) => MonitorView::Error(err.clone()),
                _ => MonitorView::NotFound {
                    task_id: state.task_id.clone().unwrap_or_default(),
                },
            },
        }
    }

    pub fn ready(&self) -> Option<&ReadyView> {
        match self {
            MonitorView::Ready(view) => Some(view),
            _ => None,
        }
    }
}
