//! # region-task
//!
//! Client-side task tracking for the region research console.
//!
//! ## Features
//!
//! - **TaskMonitor**: polls one research task, tracks errors and the
//!   report, discards stale and out-of-order responses
//! - Observer hooks for completion and failures
//! - Derived view state (badges, progress style, report preview)
//! - Debounced municipality typeahead
//! - Paginated, filterable research history

pub mod debounce;
pub mod history;
pub mod monitor;
pub mod observer;
pub mod search;
pub mod view;

// Monitor
pub use monitor::{MonitorConfig, MonitorState, TaskMonitor, FAILED_MESSAGE, STOPPED_MESSAGE};
pub use observer::{
    ChannelObserver, MonitorEvent, MonitorNotification, MonitorObserver, NoopObserver,
};
pub use view::{
    Affordance, BadgeTone, MonitorView, ProgressStyle, ReadyView, ReportView, StatusBadge,
    DEFAULT_STEP_LABEL,
};

// Input and listing helpers
pub use debounce::Debouncer;
pub use history::HistoryBrowser;
pub use search::{MunicipalitySearch, SearchConfig, SearchState};
