//! Status Bar Widget - key hints and transient notifications
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ s stop │ r refresh │ ↑↓ scroll                  ● polling │ q quit │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::time::{Duration, Instant};

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::tui::theme::{icons, Theme};

const NOTIFICATION_TTL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, PartialEq)]
pub struct StatusItem {
    pub key: String,
    pub description: String,
    pub enabled: bool,
}

impl StatusItem {
    pub fn new(key: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            description: desc.into(),
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NotificationType {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Default)]
pub struct StatusBarState {
    pub left_items: Vec<StatusItem>,
    /// Right aligned
    pub right_items: Vec<StatusItem>,
    pub notification: Option<(String, NotificationType)>,
    notification_deadline: Option<Instant>,
}

impl StatusBarState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_items(&mut self, left: Vec<StatusItem>, right: Vec<StatusItem>) {
        self.left_items = left;
        self.right_items = right;
    }

    pub fn notify(&mut self, message: impl Into<String>, kind: NotificationType) {
        self.notification = Some((message.into(), kind));
        self.notification_deadline = Some(Instant::now() + NOTIFICATION_TTL);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.notify(message, NotificationType::Info);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.notify(message, NotificationType::Success);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.notify(message, NotificationType::Warning);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.notify(message, NotificationType::Error);
    }

    pub fn clear_notification(&mut self) {
        self.notification = None;
        self.notification_deadline = None;
    }

    /// Drop the notification once it has been shown long enough
    pub fn check_timeout(&mut self) {
        self.expire_at(Instant::now());
    }

    fn expire_at(&mut self, now: Instant) {
        if self.notification_deadline.is_some_and(|deadline| now >= deadline) {
            self.clear_notification();
        }
    }
}

pub struct StatusBar<'a> {
    state: &'a StatusBarState,
    theme: Theme,
}

impl<'a> StatusBar<'a> {
    pub fn new(state: &'a StatusBarState, theme: Theme) -> Self {
        Self { state, theme }
    }

    fn render_items(&self, items: &[StatusItem]) -> Vec<Span<'static>> {
        let mut spans = Vec::new();

        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" │ ", self.theme.text_muted()));
            }

            let (key_style, desc_style) = if item.enabled {
                (self.theme.keybind(), self.theme.keybind_desc())
            } else {
                (self.theme.text_muted(), self.theme.text_muted())
            };

            spans.push(Span::styled(item.key.clone(), key_style));
            spans.push(Span::raw(" "));
            spans.push(Span::styled(item.description.clone(), desc_style));
        }

        spans
    }
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border());

        let inner = block.inner(area);
        block.render(area, buf);

        if inner.width < 10 || inner.height < 1 {
            return;
        }

        if let Some((message, kind)) = &self.state.notification {
            let (icon, style) = match kind {
                NotificationType::Info => (icons::INFO, self.theme.info()),
                NotificationType::Success => (icons::CHECK, self.theme.success()),
                NotificationType::Warning => (icons::WARNING, self.theme.warning()),
                NotificationType::Error => (icons::CROSS, self.theme.error()),
            };

            Paragraph::new(Line::from(Span::styled(
                format!("{} {}", icon, message),
                style,
            )))
            .alignment(Alignment::Center)
            .render(inner, buf);
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(inner);

        let mut left = vec![Span::raw(" ")];
        left.extend(self.render_items(&self.state.left_items));
        Paragraph::new(Line::from(left))
            .alignment(Alignment::Left)
            .render(chunks[0], buf);

        let mut right = self.render_items(&self.state.right_items);
        right.push(Span::raw(" "));
        Paragraph::new(Line::from(right))
            .alignment(Alignment::Right)
            .render(chunks[1], buf);
    }
}
