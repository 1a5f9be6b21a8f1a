//! TaskMonitor
//!
//! Polls one research task and keeps a display-ready snapshot of it.
//!
//! ## Lifecycle
//!
//! ```text
//! initialize(id) ──► immediate poll ──► every poll_interval: poll ...
//!        │                                      │
//!        │ (different id)                       │ stop_on_terminal && terminal
//!        ▼                                      ▼
//!   new binding, state reset               timer ends; refresh() still works
//!
//! dispose() ──► timer aborted, no further state writes
//! ```
//!
//! All state lives in one `watch` channel. Each write checks, under the
//! channel lock, that the binding it was issued for is still current and
//! the monitor is not disposed. Responses carry a sequence number and are
//! applied only when newer than the last applied one, so overlapping polls
//! (timer, refresh, stop) resolve to the freshest answer.

use crate::observer::{MonitorEvent, MonitorObserver, NoopObserver, NOT_FOUND_MESSAGE};
use crate::view::MonitorView;
use region_client::{ClientError, ReportRecord, ResearchApi, ResearchStatus, TaskStatusRecord};
use region_foundation::ConsoleConfig;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Generic message when a failed task has no `error_message`
pub const FAILED_MESSAGE: &str = "Research failed";

/// Generic message when a stopped task has no `error_message`
pub const STOPPED_MESSAGE: &str = "Research was stopped";

// ============================================================================
// Config
// ============================================================================

/// Monitor configuration
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Delay between polls
    pub poll_interval: Duration,
    /// End the timer once a terminal status is observed
    pub stop_on_terminal: bool,
    /// Characters shown in the collapsed report
    pub report_preview_chars: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            stop_on_terminal: false,
            report_preview_chars: 500,
        }
    }
}

impl From<&ConsoleConfig> for MonitorConfig {
    fn from(config: &ConsoleConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            stop_on_terminal: config.stop_on_terminal,
            report_preview_chars: config.report_preview_chars,
        }
    }
}

// ============================================================================
// State
// ============================================================================

/// Issue/apply counters for one kind of request
#[derive(Debug, Clone, Copy, Default)]
struct Sequencer {
    issued: u64,
    applied: u64,
}

impl Sequencer {
    fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Accept `seq` if it is newer than anything applied so far
    fn accept(&mut self, seq: u64) -> bool {
        if seq <= self.applied {
            return false;
        }
        self.applied = seq;
        true
    }
}

/// Bookkeeping for the current task binding
#[derive(Debug, Clone, Default)]
struct Binding {
    epoch: u64,
    disposed: bool,
    status_seq: Sequencer,
    report_seq: Sequencer,
    completion_seen: bool,
    last_status: Option<ResearchStatus>,
}

impl Binding {
    fn is_current(&self, epoch: u64) -> bool {
        !self.disposed && self.epoch == epoch
    }
}

/// Observable monitor state
#[derive(Debug, Clone, Default)]
pub struct MonitorState {
    /// Bound task
    pub task_id: Option<String>,
    /// Last successfully fetched snapshot
    pub status: Option<TaskStatusRecord>,
    /// True until the first fetch of the binding resolves
    pub loading: bool,
    /// Error panel text
    pub error: Option<String>,
    /// The last status request returned 404
    pub not_found: bool,
    pub report: Option<ReportRecord>,
    pub report_loading: bool,
    pub report_error: Option<String>,
    pub report_expanded: bool,
    /// Stop request in flight
    pub stopping: bool,
    /// Poll timer running
    pub polling: bool,
    binding: Binding,
}

impl MonitorState {
    pub fn is_disposed(&self) -> bool {
        self.binding.disposed
    }

    pub fn status(&self) -> Option<&ResearchStatus> {
        self.status.as_ref().map(|record| &record.status)
    }

    /// Current epoch and task id, unless disposed or unbound
    fn current_binding(&self) -> Option<(u64, String)> {
        if self.binding.disposed {
            return None;
        }
        self.task_id
            .clone()
            .map(|task_id| (self.binding.epoch, task_id))
    }
}

/// What a status response changed, acted on after the state lock is released
#[derive(Debug, Default)]
struct PollOutcome {
    /// Binding changed or monitor disposed while the request was in flight
    stale: bool,
    /// A newer response was already applied
    superseded: bool,
    events: Vec<MonitorEvent>,
    completed: Option<TaskStatusRecord>,
    terminal: bool,
}

// ============================================================================
// Core (shared with the driver task)
// ============================================================================

struct MonitorCore {
    api: Arc<dyn ResearchApi>,
    observer: Arc<dyn MonitorObserver>,
    config: MonitorConfig,
    state: watch::Sender<MonitorState>,
}

impl MonitorCore {
    /// Apply `modify` if `epoch` is still current; returns whether it ran
    fn update<F>(&self, epoch: u64, modify: F) -> bool
    where
        F: FnOnce(&mut MonitorState),
    {
        let mut applied = false;
        self.state.send_if_modified(|state| {
            if !state.binding.is_current(epoch) {
                return false;
            }
            modify(state);
            applied = true;
            true
        });
        applied
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.state.borrow().binding.is_current(epoch)
    }

    /// One status round trip. Returns false when the timer should end.
    async fn poll(&self, epoch: u64) -> bool {
        let mut issued = None;
        self.state.send_if_modified(|state| {
            if state.binding.is_current(epoch) {
                let seq = state.binding.status_seq.issue();
                issued = state.task_id.clone().map(|task_id| (task_id, seq));
            }
            false
        });
        let Some((task_id, seq)) = issued else {
            return false;
        };

        let result = self.api.get_status(&task_id).await;
        let outcome = self.apply_status(epoch, seq, result);

        if outcome.stale || !self.is_current(epoch) {
            debug!("Dropping status response for {} (binding changed)", task_id);
            return false;
        }
        if outcome.superseded {
            debug!("Dropping outdated status response #{} for {}", seq, task_id);
            return true;
        }

        for event in &outcome.events {
            match event {
                MonitorEvent::Transport(msg) => warn!("Polling {} failed: {}", task_id, msg),
                MonitorEvent::NotFound => warn!("Research task {} not found", task_id),
                other => info!("Research {} ended: {}", task_id, other),
            }
            self.notify_error(event);
        }

        if let Some(record) = &outcome.completed {
            info!("Research {} completed", task_id);
            if let Err(e) = self.observer.on_complete(record) {
                warn!("on_complete hook failed: {}", e);
            }
            self.load_report(epoch, &task_id).await;
        }

        !(self.config.stop_on_terminal && outcome.terminal)
    }

    fn apply_status(
        &self,
        epoch: u64,
        seq: u64,
        result: Result<TaskStatusRecord, ClientError>,
    ) -> PollOutcome {
        let mut outcome = PollOutcome::default();
        self.state.send_if_modified(|state| {
            if !state.binding.is_current(epoch) {
                outcome.stale = true;
                return false;
            }
            if !state.binding.status_seq.accept(seq) {
                outcome.superseded = true;
                return false;
            }

            state.loading = false;
            match result {
                Ok(record) => apply_record(state, record, &mut outcome),
                Err(err) => apply_failure(state, err, &mut outcome),
            }
            true
        });
        outcome
    }

    async fn load_report(&self, epoch: u64, task_id: &str) {
        let mut issued = None;
        self.update(epoch, |state| {
            state.report_loading = true;
            issued = Some(state.binding.report_seq.issue());
        });
        let Some(seq) = issued else {
            return;
        };

        let result = self.api.get_report(task_id).await;
        if let Err(e) = &result {
            warn!("Failed to fetch report for {}: {}", task_id, e);
        }

        self.update(epoch, |state| {
            if !state.binding.report_seq.accept(seq) {
                return;
            }
            state.report_loading = false;
            match result {
                Ok(report) => {
                    debug!("Report for {}: {} chars", task_id, report.report.chars().count());
                    state.report = Some(report);
                    state.report_error = None;
                }
                Err(err) => state.report_error = Some(err.user_message()),
            }
        });
    }

    fn notify_error(&self, event: &MonitorEvent) {
        if let Err(e) = self.observer.on_error(event) {
            warn!("on_error hook failed: {}", e);
        }
    }
}

fn apply_record(state: &mut MonitorState, record: TaskStatusRecord, outcome: &mut PollOutcome) {
    debug!(
        "Status {}: {} ({}%)",
        record.task_id, record.status, record.progress
    );

    state.error = None;
    state.not_found = false;

    let status = record.status.clone();
    let entered = state.binding.last_status.as_ref() != Some(&status);
    state.binding.last_status = Some(status.clone());

    let message = || {
        record
            .error_message
            .clone()
            .filter(|m| !m.trim().is_empty())
    };

    match status {
        ResearchStatus::Failed => {
            let msg = message().unwrap_or_else(|| FAILED_MESSAGE.to_string());
            state.error = Some(msg.clone());
            if entered {
                outcome.events.push(MonitorEvent::TaskFailed(msg));
            }
        }
        ResearchStatus::Stopped => {
            let msg = message().unwrap_or_else(|| STOPPED_MESSAGE.to_string());
            state.error = Some(msg.clone());
            if entered {
                outcome.events.push(MonitorEvent::TaskStopped(msg));
            }
        }
        ResearchStatus::Completed if !state.binding.completion_seen => {
            state.binding.completion_seen = true;
            outcome.completed = Some(record.clone());
        }
        _ => {}
    }

    outcome.terminal = record.status.is_terminal();
    state.status = Some(record);
}

fn apply_failure(state: &mut MonitorState, err: ClientError, outcome: &mut PollOutcome) {
    if err.is_not_found() {
        state.not_found = true;
        state.error = Some(NOT_FOUND_MESSAGE.to_string());
        outcome.events.push(MonitorEvent::NotFound);
    } else {
        let msg = err.user_message();
        state.error = Some(msg.clone());
        outcome.events.push(MonitorEvent::Transport(msg));
    }
}

/// Immediate poll, then one poll per interval until told to stop
async fn drive(core: Arc<MonitorCore>, epoch: u64) {
    let period = core.config.poll_interval;
    let mut keep_polling = core.poll(epoch).await;

    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    while keep_polling {
        timer.tick().await;
        keep_polling = core.poll(epoch).await;
    }

    if core.update(epoch, |state| state.polling = false) {
        info!("Polling stopped at terminal status");
    }
}

// ============================================================================
// TaskMonitor
// ============================================================================

/// Polling monitor for one research task at a time
pub struct TaskMonitor {
    core: Arc<MonitorCore>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl TaskMonitor {
    pub fn new(api: Arc<dyn ResearchApi>, config: MonitorConfig) -> Self {
        Self::build(api, Arc::new(NoopObserver), config)
    }

    /// Replace the observer. Call before `initialize`; state is not carried over.
    pub fn with_observer(self, observer: Arc<dyn MonitorObserver>) -> Self {
        Self::build(Arc::clone(&self.core.api), observer, self.core.config.clone())
    }

    fn build(
        api: Arc<dyn ResearchApi>,
        observer: Arc<dyn MonitorObserver>,
        config: MonitorConfig,
    ) -> Self {
        let (state, _) = watch::channel(MonitorState::default());
        Self {
            core: Arc::new(MonitorCore {
                api,
                observer,
                config,
                state,
            }),
            driver: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.core.config
    }

    fn lock_driver(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.driver.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ========================================================================
    // Binding
    // ========================================================================

    /// Bind to `task_id` and start polling.
    ///
    /// Binding the id that is already bound does nothing. A different id
    /// resets all state (snapshot, errors, report, expansion) and replaces
    /// the timer. Must be called from within a tokio runtime.
    pub fn initialize(&self, task_id: impl Into<String>) {
        let task_id = task_id.into();
        let mut driver = self.lock_driver();

        let mut next_epoch = None;
        self.core.state.send_if_modified(|state| {
            if state.binding.disposed || state.task_id.as_deref() == Some(task_id.as_str()) {
                return false;
            }
            let epoch = state.binding.epoch + 1;
            *state = MonitorState {
                task_id: Some(task_id.clone()),
                loading: true,
                polling: true,
                binding: Binding {
                    epoch,
                    ..Default::default()
                },
                ..Default::default()
            };
            next_epoch = Some(epoch);
            true
        });

        let Some(epoch) = next_epoch else {
            debug!("Monitor already bound to {} (or disposed)", task_id);
            return;
        };

        info!("Monitoring research {}", task_id);
        let handle = tokio::spawn(drive(Arc::clone(&self.core), epoch));
        if let Some(previous) = driver.replace(handle) {
            previous.abort();
        }
    }

    /// Stop the timer. Later responses are dropped. Safe to call repeatedly.
    pub fn dispose(&self) {
        let mut driver = self.lock_driver();

        let first = self.core.state.send_if_modified(|state| {
            if state.binding.disposed {
                return false;
            }
            state.binding.disposed = true;
            state.polling = false;
            true
        });

        if let Some(handle) = driver.take() {
            handle.abort();
        }
        if first {
            debug!("Monitor disposed");
        }
    }

    // ========================================================================
    // Actions
    // ========================================================================

    /// Poll now, outside the timer
    pub async fn refresh(&self) {
        if let Some((epoch, _)) = self.current_binding() {
            self.core.poll(epoch).await;
        }
    }

    /// Ask the server to stop the task, then poll.
    ///
    /// The snapshot is not changed until that poll resolves. A failed stop
    /// request leaves the snapshot alone and shows an error instead.
    pub async fn stop(&self) {
        let Some((epoch, task_id)) = self.current_binding() else {
            return;
        };

        self.core.update(epoch, |state| state.stopping = true);
        info!("Stopping research {}", task_id);

        match self.core.api.stop(&task_id).await {
            Ok(()) => {
                self.core.update(epoch, |state| state.stopping = false);
                self.core.poll(epoch).await;
            }
            Err(err) => {
                warn!("Failed to stop research {}: {}", task_id, err);
                let event = MonitorEvent::StopFailed(err.user_message());
                let shown = self.core.update(epoch, |state| {
                    state.stopping = false;
                    state.error = Some(event.message());
                });
                if shown {
                    self.core.notify_error(&event);
                }
            }
        }
    }

    /// Fetch the report now, regardless of status
    pub async fn fetch_report(&self) {
        if let Some((epoch, task_id)) = self.current_binding() {
            self.core.load_report(epoch, &task_id).await;
        }
    }

    pub fn toggle_report(&self) {
        self.modify_current(|state| {
            state.report_expanded = !state.report_expanded;
            true
        });
    }

    pub fn set_report_expanded(&self, expanded: bool) {
        self.modify_current(|state| {
            let changed = state.report_expanded != expanded;
            state.report_expanded = expanded;
            changed
        });
    }

    fn modify_current<F>(&self, modify: F)
    where
        F: FnOnce(&mut MonitorState) -> bool,
    {
        self.core.state.send_if_modified(|state| {
            if state.binding.disposed || state.task_id.is_none() {
                return false;
            }
            modify(state)
        });
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    fn current_binding(&self) -> Option<(u64, String)> {
        self.core.state.borrow().current_binding()
    }

    pub fn task_id(&self) -> Option<String> {
        self.core.state.borrow().task_id.clone()
    }

    /// Snapshot of the current state
    pub fn state(&self) -> MonitorState {
        self.core.state.borrow().clone()
    }

    /// Receiver notified on every visible change
    pub fn subscribe(&self) -> watch::Receiver<MonitorState> {
        self.core.state.subscribe()
    }

    /// Derived presentation state
    pub fn view(&self) -> MonitorView {
        MonitorView::derive(&self.core.state.borrow(), self.core.config.report_preview_chars)
    }

    pub fn is_disposed(&self) -> bool {
        self.core.state.borrow().is_disposed()
    }
}

impl Drop for TaskMonitor {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{ChannelObserver, MonitorNotification};
    use crate::view::{Affordance, ReportView};
    use async_trait::async_trait;
    use region_client::{
        ClientResult, CreateResearchRequest, ResearchPage, ResearchQuery,
    };
    use region_foundation::{Error, Result};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // ------------------------------------------------------------------------
    // Scripted API
    // ------------------------------------------------------------------------

    type Scripted<T> = (Duration, ClientResult<T>);

    /// Replies from a script; the last entry repeats once the rest is used up
    struct FakeApi {
        statuses: Mutex<VecDeque<Scripted<TaskStatusRecord>>>,
        report: Mutex<ClientResult<ReportRecord>>,
        stop_result: Mutex<ClientResult<()>>,
        calls: Mutex<Vec<&'static str>>,
        status_calls: AtomicUsize,
        report_calls: AtomicUsize,
    }

    impl FakeApi {
        fn new() -> Self {
            Self {
                statuses: Mutex::new(VecDeque::new()),
                report: Mutex::new(Err(ClientError::NotFound("no report".into()))),
                stop_result: Mutex::new(Ok(())),
                calls: Mutex::new(Vec::new()),
                status_calls: AtomicUsize::new(0),
                report_calls: AtomicUsize::new(0),
            }
        }

        fn status(self, result: ClientResult<TaskStatusRecord>) -> Self {
            self.delayed_status(Duration::ZERO, result)
        }

        fn delayed_status(self, delay: Duration, result: ClientResult<TaskStatusRecord>) -> Self {
            self.statuses.lock().unwrap().push_back((delay, result));
            self
        }

        fn report(self, result: ClientResult<ReportRecord>) -> Self {
            *self.report.lock().unwrap() = result;
            self
        }

        fn stop_result(self, result: ClientResult<()>) -> Self {
            *self.stop_result.lock().unwrap() = result;
            self
        }

        fn status_calls(&self) -> usize {
            self.status_calls.load(Ordering::SeqCst)
        }

        fn report_calls(&self) -> usize {
            self.report_calls.load(Ordering::SeqCst)
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ResearchApi for FakeApi {
        async fn get_status(&self, _task_id: &str) -> ClientResult<TaskStatusRecord> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            self.calls.lock().unwrap().push("status");
            let (delay, result) = {
                let mut script = self.statuses.lock().unwrap();
                if script.len() > 1 {
                    script.pop_front().unwrap()
                } else {
                    script.front().cloned().unwrap()
                }
            };
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            result
        }

        async fn stop(&self, _task_id: &str) -> ClientResult<()> {
            self.calls.lock().unwrap().push("stop");
            self.stop_result.lock().unwrap().clone()
        }

        async fn get_report(&self, _task_id: &str) -> ClientResult<ReportRecord> {
            self.report_calls.fetch_add(1, Ordering::SeqCst);
            self.calls.lock().unwrap().push("report");
            self.report.lock().unwrap().clone()
        }

        async fn list(&self, _query: &ResearchQuery) -> ClientResult<ResearchPage> {
            unimplemented!("not used by the monitor")
        }

        async fn create(&self, _request: &CreateResearchRequest) -> ClientResult<TaskStatusRecord> {
            unimplemented!("not used by the monitor")
        }
    }

    struct FailingObserver;

    impl MonitorObserver for FailingObserver {
        fn on_complete(&self, _record: &TaskStatusRecord) -> Result<()> {
            Err(Error::Internal("hook exploded".into()))
        }

        fn on_error(&self, _event: &MonitorEvent) -> Result<()> {
            Err(Error::Internal("hook exploded".into()))
        }
    }

    fn record(status: ResearchStatus, progress: i64) -> TaskStatusRecord {
        TaskStatusRecord::new("t1", status, progress).with_region_name("Gdańsk")
    }

    fn running(progress: i64) -> ClientResult<TaskStatusRecord> {
        Ok(record(ResearchStatus::Running, progress))
    }

    fn completed() -> ClientResult<TaskStatusRecord> {
        Ok(record(ResearchStatus::Completed, 100))
    }

    fn monitor(api: &Arc<FakeApi>) -> TaskMonitor {
        TaskMonitor::new(api.clone(), MonitorConfig::default())
    }

    async fn first_fetch(monitor: &TaskMonitor) {
        let mut rx = monitor.subscribe();
        rx.wait_for(|state| !state.loading).await.unwrap();
    }

    /// Let spawned tasks run until the fake has seen `n` status calls
    async fn wait_for_status_calls(api: &FakeApi, n: usize) {
        while api.status_calls() < n {
            tokio::task::yield_now().await;
        }
    }

    fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<MonitorNotification>) -> Vec<MonitorNotification> {
        let mut out = Vec::new();
        while let Ok(n) = rx.try_recv() {
            out.push(n);
        }
        out
    }

    // ------------------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_initialize_then_first_poll() {
        let api = Arc::new(FakeApi::new().status(running(40)));
        let monitor = monitor(&api);
        assert!(monitor.state().task_id.is_none());

        monitor.initialize("t1");
        assert!(monitor.state().loading);
        assert_eq!(monitor.view(), MonitorView::Loading);

        first_fetch(&monitor).await;
        let state = monitor.state();
        assert!(!state.loading);
        assert!(state.polling);
        assert_eq!(state.status.unwrap().progress, 40);
        assert_eq!(api.status_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_scenario_view() {
        let api = Arc::new(FakeApi::new().status(running(40)));
        let monitor = monitor(&api);
        monitor.initialize("t1");
        first_fetch(&monitor).await;

        let view = monitor.view();
        let ready = view.ready().unwrap();
        assert_eq!(ready.progress, 40);
        assert_eq!(ready.affordance, Affordance::Stop);
        assert_eq!(ready.report, ReportView::Hidden);
        assert_eq!(ready.region_name, "Gdańsk");
        assert_eq!(api.report_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_on_interval_and_keeps_polling_terminal() {
        let api = Arc::new(
            FakeApi::new()
                .status(running(50))
                .status(completed())
                .report(Ok(ReportRecord::new("# Raport"))),
        );
        let monitor = monitor(&api);
        monitor.initialize("t1");
        first_fetch(&monitor).await;
        assert_eq!(api.status_calls(), 1);

        // Ticks at 5s, 10s, 15s
        tokio::time::sleep(Duration::from_millis(15_500)).await;
        assert_eq!(api.status_calls(), 4);
        assert!(monitor.state().polling);
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_fetched_once_after_completion() {
        let (observer, mut rx) = ChannelObserver::new();
        let api = Arc::new(
            FakeApi::new()
                .status(completed())
                .report(Ok(ReportRecord::new("X".repeat(600)))),
        );
        let monitor = monitor(&api).with_observer(Arc::new(observer));
        monitor.initialize("t1");
        first_fetch(&monitor).await;

        tokio::time::sleep(Duration::from_secs(21)).await;
        assert_eq!(api.status_calls(), 5);
        assert_eq!(api.report_calls(), 1);

        let completions = drain(&mut rx)
            .into_iter()
            .filter(|n| matches!(n, MonitorNotification::Completed(_)))
            .count();
        assert_eq!(completions, 1);

        match monitor.view().ready().unwrap().report.clone() {
            ReportView::Collapsed { preview, truncated } => {
                assert!(truncated);
                assert_eq!(preview.chars().count(), 503);
            }
            other => panic!("expected collapsed report, got {:?}", other),
        }

        monitor.toggle_report();
        match monitor.view().ready().unwrap().report.clone() {
            ReportView::Expanded { body } => assert_eq!(body.chars().count(), 600),
            other => panic!("expected expanded report, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_failure_is_soft() {
        let api = Arc::new(
            FakeApi::new()
                .status(completed())
                .report(Err(ClientError::Server {
                    status: 500,
                    message: "report generation failed".into(),
                })),
        );
        let monitor = monitor(&api);
        monitor.initialize("t1");
        first_fetch(&monitor).await;
        tokio::task::yield_now().await;

        let state = monitor.state();
        assert!(state.error.is_none());
        assert_eq!(state.report_error.as_deref(), Some("report generation failed"));
        assert_eq!(
            monitor.view().ready().unwrap().report,
            ReportView::Unavailable("report generation failed".into())
        );

        // Manual fetch still possible
        monitor.fetch_report().await;
        assert_eq!(api.report_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_keeps_snapshot() {
        let (observer, mut rx) = ChannelObserver::new();
        let api = Arc::new(
            FakeApi::new()
                .status(running(40))
                .status(Err(ClientError::Network("connection reset".into()))),
        );
        let monitor = monitor(&api).with_observer(Arc::new(observer));
        monitor.initialize("t1");
        first_fetch(&monitor).await;

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(api.status_calls(), 3);

        let view = monitor.view();
        let ready = view.ready().unwrap();
        assert_eq!(ready.progress, 40);
        assert_eq!(
            ready.error.as_deref(),
            Some("Network error: connection reset")
        );

        // Every failed poll is reported
        let transport = drain(&mut rx)
            .into_iter()
            .filter(|n| matches!(n, MonitorNotification::Error(MonitorEvent::Transport(_))))
            .count();
        assert_eq!(transport, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_poll_clears_error() {
        let api = Arc::new(
            FakeApi::new()
                .status(Err(ClientError::Timeout("10s".into())))
                .status(running(60)),
        );
        let monitor = monitor(&api);
        monitor.initialize("t1");
        first_fetch(&monitor).await;
        assert!(matches!(monitor.view(), MonitorView::Error(_)));

        monitor.refresh().await;
        let state = monitor.state();
        assert!(state.error.is_none());
        assert_eq!(state.status.unwrap().progress, 60);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_without_snapshot() {
        let (observer, mut rx) = ChannelObserver::new();
        let api = Arc::new(FakeApi::new().status(Err(ClientError::NotFound("missing".into()))));
        let monitor = monitor(&api).with_observer(Arc::new(observer));
        monitor.initialize("t404");
        first_fetch(&monitor).await;

        assert_eq!(
            monitor.view(),
            MonitorView::NotFound {
                task_id: "t404".into()
            }
        );
        assert_eq!(
            drain(&mut rx),
            vec![MonitorNotification::Error(MonitorEvent::NotFound)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_transition_reported_once() {
        let (observer, mut rx) = ChannelObserver::new();
        let api = Arc::new(
            FakeApi::new()
                .status(running(30))
                .status(Ok(record(ResearchStatus::Failed, 30).with_error_message("Search quota exceeded"))),
        );
        let monitor = monitor(&api).with_observer(Arc::new(observer));
        monitor.initialize("t1");
        first_fetch(&monitor).await;

        tokio::time::sleep(Duration::from_millis(15_500)).await;
        assert_eq!(api.status_calls(), 4);

        let state = monitor.state();
        assert_eq!(state.error.as_deref(), Some("Search quota exceeded"));
        assert_eq!(
            drain(&mut rx),
            vec![MonitorNotification::Error(MonitorEvent::TaskFailed(
                "Search quota exceeded".into()
            ))]
        );
        assert_eq!(
            monitor.view().ready().unwrap().affordance,
            Affordance::ErrorPanel
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_without_message_uses_generic_text() {
        let api = Arc::new(FakeApi::new().status(Ok(record(ResearchStatus::Stopped, 70))));
        let monitor = monitor(&api);
        monitor.initialize("t1");
        first_fetch(&monitor).await;
        assert_eq!(monitor.state().error.as_deref(), Some(STOPPED_MESSAGE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_then_poll_without_optimistic_change() {
        let api = Arc::new(
            FakeApi::new()
                .status(running(40))
                .delayed_status(Duration::from_secs(1), Ok(record(ResearchStatus::Stopped, 40))),
        );
        let monitor = Arc::new(monitor(&api));
        monitor.initialize("t1");
        first_fetch(&monitor).await;

        let stopping = {
            let monitor = Arc::clone(&monitor);
            tokio::spawn(async move { monitor.stop().await })
        };
        wait_for_status_calls(&api, 2).await;

        // Stop sent, poll in flight, snapshot untouched
        assert_eq!(api.calls(), vec!["status", "stop", "status"]);
        assert_eq!(monitor.state().status(), Some(&ResearchStatus::Running));

        stopping.await.unwrap();
        assert_eq!(monitor.state().status(), Some(&ResearchStatus::Stopped));
        assert!(!monitor.state().stopping);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_failure_layers_error() {
        let (observer, mut rx) = ChannelObserver::new();
        let api = Arc::new(
            FakeApi::new()
                .status(running(40))
                .stop_result(Err(ClientError::InvalidRequest {
                    status: 400,
                    message: "Research is not running".into(),
                })),
        );
        let monitor = monitor(&api).with_observer(Arc::new(observer));
        monitor.initialize("t1");
        first_fetch(&monitor).await;

        monitor.stop().await;
        let view = monitor.view();
        let ready = view.ready().unwrap();
        assert_eq!(ready.status, ResearchStatus::Running);
        assert_eq!(
            ready.error.as_deref(),
            Some("Failed to stop research: Research is not running")
        );
        assert_eq!(api.status_calls(), 1);
        assert!(matches!(
            drain(&mut rx).as_slice(),
            [MonitorNotification::Error(MonitorEvent::StopFailed(_))]
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_order_responses_are_discarded() {
        let api = Arc::new(
            FakeApi::new()
                .status(running(5))
                .delayed_status(Duration::from_secs(2), running(10))
                .status(running(50)),
        );
        let monitor = Arc::new(monitor(&api));
        monitor.initialize("t1");
        first_fetch(&monitor).await;

        let slow = {
            let monitor = Arc::clone(&monitor);
            tokio::spawn(async move { monitor.refresh().await })
        };
        wait_for_status_calls(&api, 2).await;

        monitor.refresh().await;
        assert_eq!(monitor.state().status.unwrap().progress, 50);

        slow.await.unwrap();
        assert_eq!(monitor.state().status.unwrap().progress, 50);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_writes_after_dispose() {
        let api = Arc::new(
            FakeApi::new()
                .status(running(5))
                .delayed_status(Duration::from_secs(1), running(90)),
        );
        let monitor = Arc::new(monitor(&api));
        monitor.initialize("t1");
        first_fetch(&monitor).await;

        let pending = {
            let monitor = Arc::clone(&monitor);
            tokio::spawn(async move { monitor.refresh().await })
        };
        wait_for_status_calls(&api, 2).await;

        let mut rx = monitor.subscribe();
        rx.mark_unchanged();
        monitor.dispose();
        rx.mark_unchanged();

        pending.await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert!(!rx.has_changed().unwrap());
        assert_eq!(monitor.state().status.unwrap().progress, 5);
        assert_eq!(api.status_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_is_idempotent() {
        let api = Arc::new(FakeApi::new().status(running(5)));
        let monitor = monitor(&api);
        monitor.initialize("t1");
        monitor.dispose();
        monitor.dispose();
        assert!(monitor.is_disposed());
        assert!(!monitor.state().polling);

        // A disposed monitor cannot be re-bound
        monitor.initialize("t2");
        assert_eq!(monitor.task_id().as_deref(), Some("t1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_id_is_noop() {
        let api = Arc::new(FakeApi::new().status(running(5)));
        let monitor = monitor(&api);
        monitor.initialize("t1");
        first_fetch(&monitor).await;

        monitor.initialize("t1");
        tokio::task::yield_now().await;
        assert_eq!(api.status_calls(), 1);
        assert!(!monitor.state().loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_changing_task_resets_state() {
        let api = Arc::new(
            FakeApi::new()
                .status(completed())
                .delayed_status(Duration::from_secs(1), running(10))
                .report(Ok(ReportRecord::new("body"))),
        );
        let monitor = monitor(&api);
        monitor.initialize("t1");
        first_fetch(&monitor).await;
        tokio::task::yield_now().await;
        monitor.set_report_expanded(true);
        assert!(monitor.state().report_expanded);
        assert!(monitor.state().report.is_some());

        monitor.initialize("t2");
        let state = monitor.state();
        assert_eq!(state.task_id.as_deref(), Some("t2"));
        assert!(state.loading);
        assert!(state.status.is_none());
        assert!(state.error.is_none());
        assert!(state.report.is_none());
        assert!(!state.report_expanded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_on_terminal_ends_timer() {
        let api = Arc::new(
            FakeApi::new()
                .status(completed())
                .report(Ok(ReportRecord::new("done"))),
        );
        let config = MonitorConfig {
            stop_on_terminal: true,
            ..Default::default()
        };
        let monitor = TaskMonitor::new(api.clone(), config);
        monitor.initialize("t1");
        first_fetch(&monitor).await;

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(api.status_calls(), 1);
        assert!(!monitor.state().polling);

        monitor.refresh().await;
        assert_eq!(api.status_calls(), 2);
        assert_eq!(api.report_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_hooks_do_not_break_polling() {
        let api = Arc::new(
            FakeApi::new()
                .status(Err(ClientError::Network("down".into())))
                .status(completed())
                .report(Ok(ReportRecord::new("done"))),
        );
        let monitor = monitor(&api).with_observer(Arc::new(FailingObserver));
        monitor.initialize("t1");
        first_fetch(&monitor).await;

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(api.status_calls(), 3);
        assert_eq!(monitor.state().status(), Some(&ResearchStatus::Completed));
    }

    #[test]
    fn test_config_from_console_config() {
        let console = ConsoleConfig {
            poll_interval: Duration::from_secs(2),
            stop_on_terminal: true,
            report_preview_chars: 200,
            ..Default::default()
        };
        let config = MonitorConfig::from(&console);
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert!(config.stop_on_terminal);
        assert_eq!(config.report_preview_chars, 200);
    }
}
