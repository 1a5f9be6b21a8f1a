//! Monitor page - live view of one research task
//!
//! ```text
//! ┌ Region research: Gdańsk ───────────────────────────────────────┐
//! │  In progress   Collecting statistical data                     │
//! │ ██████████████████████ ⠙ 45% ░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░ │
//! │ Started: 3 minutes ago   Updated: a few seconds ago            │
//! │ Task ID: region_2261011_a1b2                                   │
//! └────────────────────────────────────────────────────────────────┘
//! ┌ Report preview ────────────────────────────────────────────────┐
//! ```

use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};
use region_foundation::time::describe_timestamp;
use region_task::{MonitorEvent, MonitorNotification, MonitorView, ProgressStyle, ReadyView, ReportView};

use crate::markdown::MarkdownRenderer;
use crate::tui::theme::{spinner, Theme};
use crate::tui::widgets::{StatusBar, StatusBarState, StatusItem};

const PAGE_SCROLL: u16 = 10;

/// Requests the page hands back to the app loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorAction {
    Stop,
    Refresh,
    ToggleReport,
    Quit,
}

pub struct MonitorPage {
    theme: Theme,
    markdown: MarkdownRenderer,
    status_bar: StatusBarState,
    /// Report scroll offset in lines
    scroll: u16,
    tick: usize,
}

impl MonitorPage {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            markdown: MarkdownRenderer::new(theme),
            status_bar: StatusBarState::new(),
            scroll: 0,
            tick: 0,
        }
    }

    pub fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
        self.status_bar.check_timeout();
    }

    /// Surface an observer notification in the status bar
    pub fn notify(&mut self, notification: &MonitorNotification) {
        match notification {
            MonitorNotification::Completed(record) => {
                let region = record.region_name.as_deref().unwrap_or("Research");
                self.status_bar.success(format!("{} completed", region));
            }
            MonitorNotification::Error(event @ (MonitorEvent::TaskStopped(_) | MonitorEvent::NotFound)) => {
                self.status_bar.warning(event.message());
            }
            MonitorNotification::Error(event) => {
                self.status_bar.error(event.message());
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, view: &MonitorView) -> Option<MonitorAction> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Some(MonitorAction::Quit),
            KeyCode::Char('r') => {
                self.status_bar.info("Refreshing");
                Some(MonitorAction::Refresh)
            }
            KeyCode::Char('s') => match view.ready() {
                Some(ready) if ready.can_stop() => Some(MonitorAction::Stop),
                Some(ready) if ready.stopping => {
                    self.status_bar.info("Stop already requested");
                    None
                }
                _ => {
                    self.status_bar.warning("Only active research can be stopped");
                    None
                }
            },
            KeyCode::Char('e') | KeyCode::Enter => {
                let toggles = view.ready().is_some_and(|ready| {
                    matches!(
                        ready.report,
                        ReportView::Collapsed { .. } | ReportView::Expanded { .. }
                    )
                });
                if toggles {
                    self.scroll = 0;
                    Some(MonitorAction::ToggleReport)
                } else {
                    None
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.scroll = self.scroll.saturating_sub(1);
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.scroll = self.scroll.saturating_add(1);
                None
            }
            KeyCode::PageUp => {
                self.scroll = self.scroll.saturating_sub(PAGE_SCROLL);
                None
            }
            KeyCode::PageDown => {
                self.scroll = self.scroll.saturating_add(PAGE_SCROLL);
                None
            }
            KeyCode::Home => {
                self.scroll = 0;
                None
            }
            _ => None,
        }
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, view: &MonitorView) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(5), Constraint::Length(3)])
            .split(area);

        match view {
            MonitorView::Loading => {
                let text = format!("{} Loading research task...", spinner(self.tick));
                self.render_message(frame, chunks[0], " Research ", vec![Line::from(text)]);
            }
            MonitorView::Error(message) => {
                let lines = vec![
                    Line::from(Span::styled("An error occurred", self.theme.text_bold())),
                    Line::from(Span::styled(message.clone(), self.theme.error())),
                ];
                self.render_message(frame, chunks[0], " Error ", lines);
            }
            MonitorView::NotFound { task_id } => {
                let lines = vec![
                    Line::from(Span::styled("No data", self.theme.text_bold())),
                    Line::from(Span::styled(
                        format!("No research found with ID: {}", task_id),
                        self.theme.text_muted(),
                    )),
                ];
                self.render_message(frame, chunks[0], " Not found ", lines);
            }
            MonitorView::Ready(ready) => self.render_ready(frame, chunks[0], ready),
        }

        self.update_hints(view);
        frame.render_widget(StatusBar::new(&self.status_bar, self.theme), chunks[1]);
    }

    fn render_message(&self, frame: &mut Frame, area: Rect, title: &str, lines: Vec<Line<'static>>) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border())
            .title(Span::styled(title.to_string(), self.theme.header()));
        let paragraph = Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_ready(&mut self, frame: &mut Frame, area: Rect, ready: &ReadyView) {
        let error_height = if ready.error.is_some() { 4 } else { 0 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(6),            // Header
                Constraint::Length(error_height), // Error panel
                Constraint::Min(0),               // Report
            ])
            .split(area);

        self.render_header(frame, chunks[0], ready);
        if let Some(error) = &ready.error {
            let panel = Paragraph::new(error.clone())
                .style(self.theme.error())
                .wrap(Wrap { trim: true })
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(self.theme.error())
                        .title(" Error "),
                );
            frame.render_widget(panel, chunks[1]);
        }
        self.render_report(frame, chunks[2], &ready.report);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect, ready: &ReadyView) {
        let title = if ready.region_name.is_empty() {
            " Region research ".to_string()
        } else {
            format!(" Region research: {} ", ready.region_name)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border())
            .title(Span::styled(title, self.theme.header()));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(inner);

        let mut status_line = vec![
            Span::styled(format!(" {} ", ready.badge.label), self.theme.badge(ready.badge.tone)),
            Span::raw("  "),
            Span::styled(ready.step.clone(), self.theme.text()),
        ];
        if ready.stopping {
            status_line.push(Span::styled(
                format!("  {} Stopping...", spinner(self.tick)),
                self.theme.warning(),
            ));
        }
        frame.render_widget(Paragraph::new(Line::from(status_line)), rows[0]);

        let label = match ready.progress_style {
            ProgressStyle::Animated => format!("{} {}%", spinner(self.tick), ready.progress),
            ProgressStyle::Static => format!("{}%", ready.progress),
        };
        let (filled, _) = self.theme.progress_bar(ready.progress_tone);
        let gauge = Gauge::default()
            .gauge_style(filled)
            .percent(ready.progress)
            .label(label);
        frame.render_widget(gauge, rows[1]);

        let now = Utc::now();
        let mut times = vec![
            self.time_span("Started", ready.start_time.as_deref(), now),
            Span::raw("   "),
            self.time_span("Updated", ready.updated_at.as_deref(), now),
        ];
        if ready.end_time.is_some() {
            times.push(Span::raw("   "));
            times.push(self.time_span("Ended", ready.end_time.as_deref(), now));
        }
        frame.render_widget(Paragraph::new(Line::from(times)), rows[2]);

        let id_line = Line::from(vec![
            Span::styled("Task ID: ", self.theme.text_muted()),
            Span::styled(ready.task_id.clone(), self.theme.text()),
        ]);
        frame.render_widget(Paragraph::new(id_line), rows[3]);
    }

    fn time_span(&self, label: &str, raw: Option<&str>, now: chrono::DateTime<Utc>) -> Span<'static> {
        let described = describe_timestamp(raw, now);
        let value = if described.is_empty() { "-".to_string() } else { described };
        Span::styled(format!("{}: {}", label, value), self.theme.text_muted())
    }

    fn render_report(&mut self, frame: &mut Frame, area: Rect, report: &ReportView) {
        if area.height == 0 {
            return;
        }

        let (title, lines) = match report {
            ReportView::Hidden => return,
            ReportView::Loading => (
                " Report ",
                vec![Line::from(Span::styled(
                    format!("{} Loading report...", spinner(self.tick)),
                    self.theme.text_muted(),
                ))],
            ),
            ReportView::Unavailable(message) => (
                " Report ",
                vec![Line::from(Span::styled(message.clone(), self.theme.warning()))],
            ),
            ReportView::Collapsed { preview, .. } => {
                let mut lines = self.markdown.render(preview);
                lines.push(Line::default());
                lines.push(Line::from(Span::styled(
                    "Press e to show the full report",
                    self.theme.keybind_desc(),
                )));
                (" Report preview ", lines)
            }
            ReportView::Expanded { body } => (" Full report ", self.markdown.render(body)),
        };

        let visible = area.height.saturating_sub(2);
        let max_scroll = (lines.len() as u16).saturating_sub(visible);
        self.scroll = self.scroll.min(max_scroll);

        let paragraph = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(self.theme.border_focused())
                    .title(Span::styled(title, self.theme.header())),
            )
            .wrap(Wrap { trim: false })
            .scroll((self.scroll, 0));
        frame.render_widget(paragraph, area);
    }

    fn update_hints(&mut self, view: &MonitorView) {
        let mut left = Vec::new();
        if let Some(ready) = view.ready() {
            if ready.can_stop() {
                left.push(StatusItem::new("s", "stop"));
            } else if ready.stopping {
                left.push(StatusItem::new("s", "stopping").disabled());
            }
            match ready.report {
                ReportView::Collapsed { .. } => left.push(StatusItem::new("e", "expand")),
                ReportView::Expanded { .. } => left.push(StatusItem::new("e", "collapse")),
                _ => {}
            }
            if ready.report.is_visible() {
                left.push(StatusItem::new("↑↓", "scroll"));
            }
        }
        left.push(StatusItem::new("r", "refresh"));

        let mut right = Vec::new();
        let polling = view.ready().is_some_and(|ready| ready.polling);
        if !polling && view.ready().is_some() {
            right.push(StatusItem::new("●", "paused").disabled());
        }
        right.push(StatusItem::new("q", "quit"));

        self.status_bar.set_items(left, right);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use ratatui::{backend::TestBackend, Terminal};
    use region_client::{ReportRecord, ResearchStatus, TaskStatusRecord};
    use region_task::{MonitorState, DEFAULT_STEP_LABEL};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ready_view(status: ResearchStatus, progress: i64) -> MonitorView {
        let record = TaskStatusRecord::new("region_2261011_a1b2", status, progress)
            .with_region_name("Gdańsk")
            .with_current_step("Collecting statistical data");
        let mut state = MonitorState::default();
        state.task_id = Some(record.task_id.clone());
        state.status = Some(record);
        MonitorView::derive(&state, 500)
    }

    fn draw(page: &mut MonitorPage, view: &MonitorView) -> String {
        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|frame| page.render(frame, frame.area(), view))
            .unwrap();
        let buffer = terminal.backend().buffer().clone();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_running_task_shows_progress_and_stop_hint() {
        let mut page = MonitorPage::new(Theme::dark());
        let screen = draw(&mut page, &ready_view(ResearchStatus::Running, 45));

        assert!(screen.contains("Region research: Gdańsk"));
        assert!(screen.contains("In progress"));
        assert!(screen.contains("Collecting statistical data"));
        assert!(screen.contains("45%"));
        assert!(screen.contains("s stop"));
    }

    #[test]
    fn test_not_found_screen() {
        let mut page = MonitorPage::new(Theme::dark());
        let view = MonitorView::NotFound {
            task_id: "region_missing".to_string(),
        };
        let screen = draw(&mut page, &view);
        assert!(screen.contains("No research found with ID: region_missing"));
        assert!(!screen.contains("s stop"));
    }

    #[test]
    fn test_error_screen() {
        let mut page = MonitorPage::new(Theme::dark());
        let screen = draw(&mut page, &MonitorView::Error("connection refused".to_string()));
        assert!(screen.contains("An error occurred"));
        assert!(screen.contains("connection refused"));
    }

    #[test]
    fn test_completed_task_shows_report_preview() {
        let record = TaskStatusRecord::new("region_1", ResearchStatus::Completed, 100)
            .with_region_name("Sopot");
        let mut state = MonitorState::default();
        state.task_id = Some("region_1".to_string());
        state.status = Some(record);
        state.report = Some(ReportRecord::new("# Sopot\n\nSeaside resort."));
        let mut page = MonitorPage::new(Theme::dark());
        let screen = draw(&mut page, &MonitorView::derive(&state, 500));

        assert!(screen.contains("Report preview"));
        assert!(screen.contains("Seaside resort."));
        assert!(screen.contains("e expand"));
        assert!(screen.contains("100%"));
    }

    #[test]
    fn test_default_step_label() {
        let record = TaskStatusRecord::new("region_1", ResearchStatus::Queued, 0);
        let mut state = MonitorState::default();
        state.task_id = Some("region_1".to_string());
        state.status = Some(record);
        let mut page = MonitorPage::new(Theme::dark());
        let screen = draw(&mut page, &MonitorView::derive(&state, 500));
        assert!(screen.contains(DEFAULT_STEP_LABEL));
        assert!(screen.contains("Queued"));
    }

    #[test]
    fn test_stop_key_only_when_stoppable() {
        let mut page = MonitorPage::new(Theme::dark());

        let running = ready_view(ResearchStatus::Running, 10);
        assert_eq!(
            page.handle_key(key(KeyCode::Char('s')), &running),
            Some(MonitorAction::Stop)
        );

        let completed = ready_view(ResearchStatus::Completed, 100);
        assert_eq!(page.handle_key(key(KeyCode::Char('s')), &completed), None);
        assert!(page.status_bar.notification.is_some());
    }

    #[test]
    fn test_toggle_requires_report() {
        let mut page = MonitorPage::new(Theme::dark());
        let running = ready_view(ResearchStatus::Running, 10);
        assert_eq!(page.handle_key(key(KeyCode::Char('e')), &running), None);
        assert_eq!(
            page.handle_key(key(KeyCode::Char('q')), &running),
            Some(MonitorAction::Quit)
        );
    }

    #[test]
    fn test_scroll_keys() {
        let mut page = MonitorPage::new(Theme::dark());
        let view = MonitorView::Loading;
        page.handle_key(key(KeyCode::PageDown), &view);
        page.handle_key(key(KeyCode::Up), &view);
        assert_eq!(page.scroll, PAGE_SCROLL - 1);
        page.handle_key(key(KeyCode::Home), &view);
        assert_eq!(page.scroll, 0);
    }
}
