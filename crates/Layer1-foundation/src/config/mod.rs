//! Config - console settings
//!
//! - `console.rs` - ConsoleSettings (file layer) and ConsoleConfig (resolved)

mod console;

pub use console::{
    ConsoleConfig, ConsoleSettings, ThemeName, CONSOLE_CONFIG_FILE, DEFAULT_API_URL,
    DEFAULT_PER_PAGE, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_REPORT_PREVIEW_CHARS,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SEARCH_DEBOUNCE_MS, DEFAULT_SEARCH_LIMIT,
    DEFAULT_SEARCH_MIN_CHARS, ENV_API_URL, ENV_POLL_SECS,
};
