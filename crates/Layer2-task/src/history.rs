//! Research history browser
//!
//! Holds the filters and the last fetched page of `GET /api/research/`.
//! Changing a filter goes back to page 1. Page numbers are clamped to the
//! range the server last reported. A failed fetch keeps the previous page.

use region_client::{ResearchApi, ResearchPage, ResearchQuery, ResearchStatus, MAX_PER_PAGE};
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::{debug, warn};

/// Pages shown on either side of the current one in a pager
const PAGER_RADIUS: u32 = 2;

pub struct HistoryBrowser {
    api: Arc<dyn ResearchApi>,
    query: ResearchQuery,
    page: Option<ResearchPage>,
    loading: bool,
    error: Option<String>,
}

impl HistoryBrowser {
    pub fn new(api: Arc<dyn ResearchApi>, per_page: u32) -> Self {
        Self {
            api,
            query: ResearchQuery {
                per_page: per_page.clamp(1, MAX_PER_PAGE),
                ..Default::default()
            },
            page: None,
            loading: false,
            error: None,
        }
    }

    // ========================================================================
    // Filters
    // ========================================================================

    pub fn set_status_filter(&mut self, status: Option<ResearchStatus>) {
        if self.query.status != status {
            self.query.status = status;
            self.query.page = 1;
        }
    }

    pub fn set_region_filter(&mut self, region: Option<String>) {
        let region = region
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        if self.query.region_name != region {
            self.query.region_name = region;
            self.query.page = 1;
        }
    }

    pub fn set_municipality_filter(&mut self, municipality_id: Option<i64>) {
        if self.query.municipality_id != municipality_id {
            self.query.municipality_id = municipality_id;
            self.query.page = 1;
        }
    }

    pub fn clear_filters(&mut self) {
        self.set_status_filter(None);
        self.set_region_filter(None);
        self.set_municipality_filter(None);
    }

    // ========================================================================
    // Paging
    // ========================================================================

    /// Last page known from the server; 1 before anything was loaded
    pub fn last_page(&self) -> u32 {
        self.page.as_ref().map(|p| p.pages).unwrap_or(0).max(1)
    }

    /// Select `page`, clamped to `1..=last_page()` once a page is known
    pub fn go_to_page(&mut self, page: u32) {
        self.query.page = match &self.page {
            Some(_) => page.clamp(1, self.last_page()),
            None => page.max(1),
        };
    }

    pub fn next_page(&mut self) {
        self.go_to_page(self.query.page.saturating_add(1));
    }

    pub fn prev_page(&mut self) {
        self.go_to_page(self.query.page.saturating_sub(1));
    }

    /// Page numbers for a pager around the current page
    pub fn page_window(&self) -> RangeInclusive<u32> {
        let current = self.query.page;
        let start = current.saturating_sub(PAGER_RADIUS).max(1);
        let end = (current + PAGER_RADIUS).min(self.last_page());
        start..=end.max(start)
    }

    // ========================================================================
    // Fetch
    // ========================================================================

    /// Fetch the selected page.
    ///
    /// When the server reports fewer pages than the one requested (the
    /// list shrank, or an explicit page was out of range) the last page is
    /// fetched instead.
    pub async fn load(&mut self) {
        self.loading = true;
        let mut result = self.api.list(&self.query).await;

        if let Ok(page) = &result {
            if page.pages > 0 && self.query.page > page.pages {
                debug!(
                    "Page {} beyond last page {}, refetching",
                    self.query.page, page.pages
                );
                self.query.page = page.pages;
                result = self.api.list(&self.query).await;
            }
        }

        self.loading = false;
        match result {
            Ok(page) => {
                debug!(
                    "Loaded research page {}/{} ({} items)",
                    page.page,
                    page.pages,
                    page.items.len()
                );
                self.error = None;
                self.page = Some(page);
            }
            Err(e) => {
                warn!("Failed to load research list: {}", e);
                self.error = Some(e.user_message());
            }
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn query(&self) -> &ResearchQuery {
        &self.query
    }

    pub fn page(&self) -> Option<&ResearchPage> {
        self.page.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// "Page 2 of 5 (42 research tasks)"
    pub fn summary(&self) -> Option<String> {
        self.page.as_ref().map(|p| {
            format!(
                "Page {} of {} ({} research task{})",
                p.page,
                p.pages.max(1),
                p.total,
                if p.total == 1 { "" } else { "s" }
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use region_client::{
        ClientError, ClientResult, CreateResearchRequest, ReportRecord, TaskStatusRecord,
    };
    use std::sync::Mutex;

    /// 23 tasks, paged server-side
    struct FakeList {
        queries: Mutex<Vec<ResearchQuery>>,
        fail: Mutex<bool>,
    }

    impl FakeList {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                queries: Mutex::new(Vec::new()),
                fail: Mutex::new(false),
            })
        }

        fn set_fail(&self, fail: bool) {
            *self.fail.lock().unwrap() = fail;
        }

        fn last_query(&self) -> ResearchQuery {
            self.queries.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl ResearchApi for FakeList {
        async fn get_status(&self, _task_id: &str) -> ClientResult<TaskStatusRecord> {
            unimplemented!("not used by the history browser")
        }

        async fn stop(&self, _task_id: &str) -> ClientResult<()> {
            unimplemented!("not used by the history browser")
        }

        async fn get_report(&self, _task_id: &str) -> ClientResult<ReportRecord> {
            unimplemented!("not used by the history browser")
        }

        async fn list(&self, query: &ResearchQuery) -> ClientResult<ResearchPage> {
            self.queries.lock().unwrap().push(query.clone());
            if *self.fail.lock().unwrap() {
                return Err(ClientError::from_http_status(
                    500,
                    r#"{"error": "database unavailable"}"#,
                ));
            }
            let total = 23u64;
            let pages = ((total + query.per_page as u64 - 1) / query.per_page as u64) as u32;
            let start = (query.page - 1) * query.per_page;
            let end = (start + query.per_page).min(total as u32);
            let items = (start..end)
                .map(|i| TaskStatusRecord::new(format!("t{}", i), ResearchStatus::Completed, 100))
                .collect();
            Ok(ResearchPage {
                items,
                total,
                pages,
                page: query.page,
                per_page: query.per_page,
            })
        }

        async fn create(&self, _request: &CreateResearchRequest) -> ClientResult<TaskStatusRecord> {
            unimplemented!("not used by the history browser")
        }
    }

    #[tokio::test]
    async fn test_load_and_page() {
        let api = FakeList::new();
        let mut browser = HistoryBrowser::new(api.clone(), 10);
        browser.load().await;

        assert_eq!(browser.page().unwrap().items.len(), 10);
        assert_eq!(browser.last_page(), 3);
        assert_eq!(
            browser.summary().unwrap(),
            "Page 1 of 3 (23 research tasks)"
        );

        browser.next_page();
        browser.next_page();
        browser.next_page();
        assert_eq!(browser.query().page, 3);
        browser.load().await;
        assert_eq!(browser.page().unwrap().items.len(), 3);

        browser.go_to_page(0);
        assert_eq!(browser.query().page, 1);
    }

    #[tokio::test]
    async fn test_filter_change_resets_page() {
        let api = FakeList::new();
        let mut browser = HistoryBrowser::new(api.clone(), 10);
        browser.load().await;
        browser.go_to_page(3);

        browser.set_status_filter(Some(ResearchStatus::Failed));
        assert_eq!(browser.query().page, 1);

        browser.go_to_page(2);
        browser.set_region_filter(Some("  Gdańsk ".into()));
        assert_eq!(browser.query().page, 1);
        assert_eq!(browser.query().region_name.as_deref(), Some("Gdańsk"));

        // Same filter again keeps the page
        browser.go_to_page(2);
        browser.set_region_filter(Some("Gdańsk".into()));
        assert_eq!(browser.query().page, 2);

        browser.load().await;
        let sent = api.last_query();
        assert_eq!(sent.status, Some(ResearchStatus::Failed));
        assert_eq!(sent.page, 2);
    }

    #[tokio::test]
    async fn test_out_of_range_page_refetches_last() {
        let api = FakeList::new();
        let mut browser = HistoryBrowser::new(api.clone(), 10);
        browser.go_to_page(9);
        browser.load().await;

        assert_eq!(browser.query().page, 3);
        assert_eq!(browser.page().unwrap().page, 3);
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_page() {
        let api = FakeList::new();
        let mut browser = HistoryBrowser::new(api.clone(), 10);
        browser.load().await;

        api.set_fail(true);
        browser.next_page();
        browser.load().await;

        assert_eq!(browser.error(), Some("database unavailable"));
        assert_eq!(browser.page().unwrap().page, 1);
        assert!(!browser.is_loading());

        api.set_fail(false);
        browser.load().await;
        assert!(browser.error().is_none());
        assert_eq!(browser.page().unwrap().page, 2);
    }

    #[tokio::test]
    async fn test_page_window() {
        let api = FakeList::new();
        let mut browser = HistoryBrowser::new(api.clone(), 2);
        browser.load().await;
        assert_eq!(browser.last_page(), 12);
        assert_eq!(browser.page_window(), 1..=3);

        browser.go_to_page(6);
        assert_eq!(browser.page_window(), 4..=8);

        browser.go_to_page(12);
        assert_eq!(browser.page_window(), 10..=12);
    }
}
