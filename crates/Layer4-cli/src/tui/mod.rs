//! TUI (Terminal User Interface) module

mod app;
mod components;
mod event;
mod pages;
pub mod theme;
mod widgets;

pub use app::{run_monitor, run_search};
pub use theme::Theme;
