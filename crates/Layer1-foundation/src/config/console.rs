//! Console Config
//!
//! `ConsoleSettings` is the on-disk shape (every field optional so a project
//! file can override only what it names). `ConsoleConfig` is the resolved
//! value the rest of the console reads.

use crate::storage::JsonStore;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Config file name inside a store
pub const CONSOLE_CONFIG_FILE: &str = "config.json";

/// Env var overriding the API base URL
pub const ENV_API_URL: &str = "REGION_CONSOLE_API_URL";

/// Env var overriding the poll interval (seconds)
pub const ENV_POLL_SECS: &str = "REGION_CONSOLE_POLL_SECS";

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_REPORT_PREVIEW_CHARS: usize = 500;
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_SEARCH_MIN_CHARS: usize = 2;
pub const DEFAULT_SEARCH_LIMIT: u32 = 15;
pub const DEFAULT_PER_PAGE: u32 = 10;

// ============================================================================
// Theme
// ============================================================================

/// TUI color theme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeName {
    #[default]
    Dark,
    Light,
}

// ============================================================================
// Settings (file layer)
// ============================================================================

/// Partial settings as stored in `config.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_secs: Option<u64>,

    /// Stop the poll timer once the task reaches a terminal status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_on_terminal: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_preview_chars: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_debounce_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_min_chars: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_limit: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_per_page: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<ThemeName>,
}

impl ConsoleSettings {
    /// Overlay `other` on top of `self`; fields set in `other` win
    pub fn merge(&mut self, other: ConsoleSettings) {
        if other.api_base_url.is_some() {
            self.api_base_url = other.api_base_url;
        }
        if other.request_timeout_secs.is_some() {
            self.request_timeout_secs = other.request_timeout_secs;
        }
        if other.poll_interval_secs.is_some() {
            self.poll_interval_secs = other.poll_interval_secs;
        }
        if other.stop_on_terminal.is_some() {
            self.stop_on_terminal = other.stop_on_terminal;
        }
        if other.report_preview_chars.is_some() {
            self.report_preview_chars = other.report_preview_chars;
        }
        if other.search_debounce_ms.is_some() {
            self.search_debounce_ms = other.search_debounce_ms;
        }
        if other.search_min_chars.is_some() {
            self.search_min_chars = other.search_min_chars;
        }
        if other.search_limit.is_some() {
            self.search_limit = other.search_limit;
        }
        if other.default_per_page.is_some() {
            self.default_per_page = other.default_per_page;
        }
        if other.theme.is_some() {
            self.theme = other.theme;
        }
    }

    /// Apply overrides from an env lookup function
    ///
    /// Takes a lookup closure instead of reading `std::env` directly so
    /// tests do not race on process-wide state.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL) {
            if !url.trim().is_empty() {
                self.api_base_url = Some(url);
            }
        }
        if let Some(secs) = lookup(ENV_POLL_SECS) {
            let secs = secs.trim().parse::<u64>().map_err(|e| {
                Error::Config(format!("Invalid {} value '{}': {}", ENV_POLL_SECS, secs, e))
            })?;
            self.poll_interval_secs = Some(secs);
        }
        Ok(())
    }

    /// Fill unset fields with defaults and validate
    pub fn resolve(self) -> Result<ConsoleConfig> {
        let config = ConsoleConfig {
            api_base_url: self
                .api_base_url
                .unwrap_or_else(|| DEFAULT_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            request_timeout: Duration::from_secs(
                self.request_timeout_secs
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            poll_interval: Duration::from_secs(
                self.poll_interval_secs.unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
            ),
            stop_on_terminal: self.stop_on_terminal.unwrap_or(false),
            report_preview_chars: self
                .report_preview_chars
                .unwrap_or(DEFAULT_REPORT_PREVIEW_CHARS),
            search_debounce: Duration::from_millis(
                self.search_debounce_ms.unwrap_or(DEFAULT_SEARCH_DEBOUNCE_MS),
            ),
            search_min_chars: self.search_min_chars.unwrap_or(DEFAULT_SEARCH_MIN_CHARS),
            search_limit: self.search_limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
            default_per_page: self.default_per_page.unwrap_or(DEFAULT_PER_PAGE),
            theme: self.theme.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Resolved config
// ============================================================================

/// Resolved console configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleConfig {
    /// API base URL without trailing slash
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub stop_on_terminal: bool,
    pub report_preview_chars: usize,
    pub search_debounce: Duration,
    pub search_min_chars: usize,
    pub search_limit: u32,
    pub default_per_page: u32,
    pub theme: ThemeName,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            stop_on_terminal: false,
            report_preview_chars: DEFAULT_REPORT_PREVIEW_CHARS,
            search_debounce: Duration::from_millis(DEFAULT_SEARCH_DEBOUNCE_MS),
            search_min_chars: DEFAULT_SEARCH_MIN_CHARS,
            search_limit: DEFAULT_SEARCH_LIMIT,
            default_per_page: DEFAULT_PER_PAGE,
            theme: ThemeName::Dark,
        }
    }
}

impl ConsoleConfig {
    // ========================================================================
    // Load
    // ========================================================================

    /// Global + project files, then process environment
    pub fn load() -> Result<Self> {
        let global = JsonStore::global().ok();
        let project = JsonStore::current_project().ok();
        Self::load_from(global.as_ref(), project.as_ref(), |key| {
            std::env::var(key).ok()
        })
    }

    /// Load from explicit stores and env lookup
    pub fn load_from<F>(
        global: Option<&JsonStore>,
        project: Option<&JsonStore>,
        env: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = ConsoleSettings::default();

        for store in [global, project].into_iter().flatten() {
            if let Some(layer) = store.load_optional::<ConsoleSettings>(CONSOLE_CONFIG_FILE)? {
                debug!("Loaded console settings from {}", store.base_dir().display());
                settings.merge(layer);
            }
        }

        settings.apply_env(env)?;
        settings.resolve()
    }

    /// Persist settings to the global store
    pub fn save_global(settings: &ConsoleSettings) -> Result<()> {
        JsonStore::global()?.save(CONSOLE_CONFIG_FILE, settings)
    }

    // ========================================================================
    // Validation / builder
    // ========================================================================

    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(Error::Config("apiBaseUrl must not be empty".to_string()));
        }
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(Error::Config(format!(
                "apiBaseUrl must be an http(s) URL, got '{}'",
                self.api_base_url
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::Config("pollIntervalSecs must be > 0".to_string()));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::Config("requestTimeoutSecs must be > 0".to_string()));
        }
        if self.default_per_page == 0 || self.default_per_page > 100 {
            return Err(Error::Config(
                "defaultPerPage must be between 1 and 100".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}
