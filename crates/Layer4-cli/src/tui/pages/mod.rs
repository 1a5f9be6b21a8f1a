//! TUI pages

mod monitor;
mod search;

pub use monitor::{MonitorAction, MonitorPage};
pub use search::{SearchAction, SearchPage};
