//! Storage module
//!
//! - `json`: JSON - console config files (global and per-project)

mod json;

pub use json::JsonStore;
