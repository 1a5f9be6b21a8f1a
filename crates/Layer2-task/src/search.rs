//! Municipality typeahead
//!
//! Keystrokes update the query immediately; the lookup itself goes through
//! a [`Debouncer`]. Queries shorter than the minimum clear the results
//! without a request. Lookup failures are logged and leave an empty list.

use crate::debounce::Debouncer;
use region_client::{CreateResearchRequest, Municipality, MunicipalityApi};
use region_foundation::ConsoleConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub debounce: Duration,
    /// Minimum characters before a lookup is sent
    pub min_chars: usize,
    pub limit: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            min_chars: 2,
            limit: 15,
        }
    }
}

impl From<&ConsoleConfig> for SearchConfig {
    fn from(config: &ConsoleConfig) -> Self {
        Self {
            debounce: config.search_debounce,
            min_chars: config.search_min_chars,
            limit: config.search_limit,
        }
    }
}

/// Observable typeahead state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    pub query: String,
    pub results: Vec<Municipality>,
    pub loading: bool,
    /// Dropdown visible
    pub open: bool,
    pub selected: Option<Municipality>,
    /// Sequence of the last lookup sent
    issued: u64,
}

impl SearchState {
    /// Dropdown placeholder when there are no results
    pub fn empty_label(&self) -> &'static str {
        if self.loading {
            "Searching..."
        } else {
            "No results"
        }
    }
}

struct SearchCore {
    api: Arc<dyn MunicipalityApi>,
    config: SearchConfig,
    state: watch::Sender<SearchState>,
}

impl SearchCore {
    async fn lookup(&self, query: String) {
        let trimmed = query.trim();
        if trimmed.chars().count() < self.config.min_chars {
            self.state.send_if_modified(|state| {
                // Drop whatever lookup is still in flight
                state.issued += 1;
                let changed = !state.results.is_empty() || state.loading;
                state.results.clear();
                state.loading = false;
                changed
            });
            return;
        }

        let mut seq = 0;
        self.state.send_modify(|state| {
            state.issued += 1;
            seq = state.issued;
            state.loading = true;
        });

        debug!("Municipality lookup #{}: {}", seq, trimmed);
        let result = self.api.search(trimmed, self.config.limit).await;

        self.state.send_if_modified(|state| {
            if state.issued != seq {
                return false;
            }
            state.loading = false;
            state.results = match result {
                Ok(found) => found,
                Err(e) => {
                    warn!("Municipality search failed: {}", e);
                    Vec::new()
                }
            };
            true
        });
    }
}

/// Debounced municipality picker
pub struct MunicipalitySearch {
    core: Arc<SearchCore>,
    debouncer: Debouncer<String>,
}

impl MunicipalitySearch {
    pub fn new(api: Arc<dyn MunicipalityApi>, config: SearchConfig) -> Self {
        let (state, _) = watch::channel(SearchState::default());
        let core = Arc::new(SearchCore {
            api,
            config,
            state,
        });

        let lookup_core = Arc::clone(&core);
        let debouncer = Debouncer::new(core.config.debounce, move |query: String| {
            let core = Arc::clone(&lookup_core);
            tokio::spawn(async move { core.lookup(query).await });
        });

        Self { core, debouncer }
    }

    /// New input text. Clearing the field also clears the selection.
    pub fn set_query(&self, query: impl Into<String>) {
        let query = query.into();
        self.core.state.send_modify(|state| {
            state.open = !query.is_empty();
            if query.is_empty() {
                state.selected = None;
            }
            state.query = query.clone();
        });
        self.debouncer.call(query);
    }

    /// Pick a result by index; closes the dropdown
    pub fn select(&self, index: usize) -> Option<Municipality> {
        let mut picked = None;
        self.core.state.send_if_modified(|state| {
            let Some(municipality) = state.results.get(index).cloned() else {
                return false;
            };
            state.issued += 1;
            state.loading = false;
            state.query = municipality.name.clone();
            state.open = false;
            state.selected = Some(municipality.clone());
            picked = Some(municipality);
            true
        });
        if picked.is_some() {
            self.debouncer.cancel();
        }
        picked
    }

    /// Reopen the dropdown if the query is long enough
    pub fn focus(&self) {
        let min_chars = self.core.config.min_chars;
        self.core.state.send_if_modified(|state| {
            let open = state.query.chars().count() >= min_chars;
            let changed = state.open != open;
            state.open = open;
            changed
        });
    }

    /// Creation request pre-filled from the selection
    pub fn request_for_selection(&self) -> Option<CreateResearchRequest> {
        self.core
            .state
            .borrow()
            .selected
            .as_ref()
            .map(CreateResearchRequest::for_municipality)
    }

    pub fn state(&self) -> SearchState {
        self.core.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.core.state.subscribe()
    }
}
