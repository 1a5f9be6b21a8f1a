//! # region-foundation
//!
//! Foundation layer for the region research console:
//! - Error: shared error type and `Result` alias
//! - Config: console settings (global + project JSON, env overrides)
//! - Storage: JsonStore for config files
//! - Strings / Time: character-safe previews and relative timestamps
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  region-cli (TUI + subcommands)              │
//! │        │                                     │
//! │        ▼                                     │
//! │  region-task (TaskMonitor, Debouncer, ...)   │
//! │        │                                     │
//! │        ▼                                     │
//! │  region-client (REST API, retry)             │
//! │        │                                     │
//! │        ▼                                     │
//! │  region-foundation (this crate)              │
//! └──────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod storage;
pub mod strings;
pub mod time;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config
// ============================================================================
pub use config::{ConsoleConfig, ConsoleSettings, ThemeName, CONSOLE_CONFIG_FILE};

// ============================================================================
// Storage
// ============================================================================
pub use storage::JsonStore;
