//! Single-line text input

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Rect,
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::tui::theme::Theme;

/// Text input box. The cursor counts characters, so Polish diacritics
/// move and delete as one unit.
pub struct InputBox {
    content: String,

    /// Cursor position in characters
    cursor: usize,

    title: String,

    placeholder: String,
}

impl InputBox {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            cursor: 0,
            title: title.into(),
            placeholder: String::new(),
        }
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self.cursor = self.content.chars().count();
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    fn len_chars(&self) -> usize {
        self.content.chars().count()
    }

    /// Apply an editing key. Returns true when the text changed.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                let changed = !self.content.is_empty();
                self.content.clear();
                self.cursor = 0;
                changed
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                let at = self.byte_index(self.cursor);
                self.content.insert(at, c);
                self.cursor += 1;
                true
            }
            KeyCode::Backspace if self.cursor > 0 => {
                self.cursor -= 1;
                let at = self.byte_index(self.cursor);
                self.content.remove(at);
                true
            }
            KeyCode::Delete if self.cursor < self.len_chars() => {
                let at = self.byte_index(self.cursor);
                self.content.remove(at);
                true
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                false
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.len_chars());
                false
            }
            KeyCode::Home => {
                self.cursor = 0;
                false
            }
            KeyCode::End => {
                self.cursor = self.len_chars();
                false
            }
            _ => false,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let (text, style) = if self.content.is_empty() {
            (self.placeholder.as_str(), theme.text_muted())
        } else {
            (self.content.as_str(), theme.text())
        };

        let input = Paragraph::new(text.to_string()).style(style).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.border_focused())
                .title(format!(" {} ", self.title)),
        );
        frame.render_widget(input, area);

        let max_x = area.width.saturating_sub(2);
        let offset = (self.cursor as u16).min(max_x);
        frame.set_cursor_position((area.x + 1 + offset, area.y + 1));
    }
}
