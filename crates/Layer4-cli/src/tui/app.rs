//! Terminal lifecycle and the page loops

use crate::tui::event::{EventHandler, TuiEvent};
use crate::tui::pages::{MonitorAction, MonitorPage, SearchAction, SearchPage};
use crate::tui::theme::Theme;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use region_client::{Municipality, MunicipalityApi, ResearchApi};
use region_task::{
    ChannelObserver, MonitorConfig, MonitorNotification, MonitorState, MunicipalitySearch,
    SearchConfig, SearchState, TaskMonitor,
};
use std::io::{self, Stdout};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

type ConsoleTerminal = Terminal<CrosstermBackend<Stdout>>;

fn setup_terminal() -> anyhow::Result<ConsoleTerminal> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(terminal: &mut ConsoleTerminal) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Watch one research task until the user quits
pub async fn run_monitor(
    api: Arc<dyn ResearchApi>,
    config: MonitorConfig,
    theme: Theme,
    task_id: String,
) -> anyhow::Result<()> {
    let (observer, mut notifications) = ChannelObserver::new();
    let monitor = Arc::new(TaskMonitor::new(api, config).with_observer(Arc::new(observer)));
    let mut changes = monitor.subscribe();

    info!("Watching research task {}", task_id);
    monitor.initialize(task_id);

    let mut terminal = setup_terminal()?;
    let result = monitor_loop(
        &mut terminal,
        &monitor,
        &mut changes,
        &mut notifications,
        theme,
    )
    .await;

    monitor.dispose();
    restore_terminal(&mut terminal)?;
    result
}

async fn monitor_loop(
    terminal: &mut ConsoleTerminal,
    monitor: &Arc<TaskMonitor>,
    changes: &mut watch::Receiver<MonitorState>,
    notifications: &mut mpsc::UnboundedReceiver<MonitorNotification>,
    theme: Theme,
) -> anyhow::Result<()> {
    let mut page = MonitorPage::new(theme);
    let (mut events, event_tx) = EventHandler::new();
    EventHandler::start(event_tx);

    loop {
        let view = monitor.view();
        terminal.draw(|frame| page.render(frame, frame.area(), &view))?;

        tokio::select! {
            event = events.next() => match event {
                None | Some(TuiEvent::Quit) => break,
                Some(TuiEvent::Key(key)) => match page.handle_key(key, &view) {
                    Some(MonitorAction::Quit) => break,
                    Some(MonitorAction::Stop) => {
                        let monitor = Arc::clone(monitor);
                        tokio::spawn(async move { monitor.stop().await });
                    }
                    Some(MonitorAction::Refresh) => {
                        let monitor = Arc::clone(monitor);
                        tokio::spawn(async move { monitor.refresh().await });
                    }
                    Some(MonitorAction::ToggleReport) => monitor.toggle_report(),
                    None => {}
                },
                Some(TuiEvent::Tick) => page.tick(),
                Some(TuiEvent::Resize(w, h)) => debug!("Resized to {}x{}", w, h),
            },

            Ok(()) = changes.changed() => {}

            Some(notification) = notifications.recv() => page.notify(&notification),
        }
    }

    Ok(())
}

/// Interactive municipality picker. Returns None when cancelled.
pub async fn run_search(
    api: Arc<dyn MunicipalityApi>,
    config: SearchConfig,
    theme: Theme,
    initial_query: Option<String>,
) -> anyhow::Result<Option<Municipality>> {
    let mut page = SearchPage::new(theme, config.min_chars);
    let search = MunicipalitySearch::new(api, config);
    let mut changes = search.subscribe();

    if let Some(query) = initial_query.filter(|q| !q.is_empty()) {
        search.set_query(query.clone());
        page = page.with_query(query);
    }

    let mut terminal = setup_terminal()?;
    let result = search_loop(&mut terminal, &search, &mut changes, page).await;
    restore_terminal(&mut terminal)?;
    result
}

async fn search_loop(
    terminal: &mut ConsoleTerminal,
    search: &MunicipalitySearch,
    changes: &mut watch::Receiver<SearchState>,
    mut page: SearchPage,
) -> anyhow::Result<Option<Municipality>> {
    let (mut events, event_tx) = EventHandler::new();
    EventHandler::start(event_tx);

    loop {
        let state = search.state();
        terminal.draw(|frame| page.render(frame, frame.area(), &state))?;

        tokio::select! {
            event = events.next() => match event {
                None | Some(TuiEvent::Quit) => return Ok(None),
                Some(TuiEvent::Key(key)) => match page.handle_key(key, &state) {
                    Some(SearchAction::Quit) => return Ok(None),
                    Some(SearchAction::QueryChanged(query)) => search.set_query(query),
                    Some(SearchAction::Select(index)) => {
                        if let Some(municipality) = search.select(index) {
                            info!("Selected municipality {} ({})", municipality.name, municipality.id);
                            return Ok(Some(municipality));
                        }
                    }
                    None => {}
                },
                Some(TuiEvent::Tick) => page.tick(),
                Some(TuiEvent::Resize(..)) => {}
            },

            Ok(()) = changes.changed() => {}
        }
    }
}
