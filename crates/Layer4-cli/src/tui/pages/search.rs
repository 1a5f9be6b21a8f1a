//! Search page - municipality picker

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};
use region_client::{Municipality, MunicipalityKind};
use region_task::SearchState;

use crate::tui::components::InputBox;
use crate::tui::theme::{spinner, Theme};
use crate::tui::widgets::{StatusBar, StatusBarState, StatusItem};

const HIGHLIGHT_SYMBOL: &str = "❯ ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchAction {
    QueryChanged(String),
    /// Pick the result at this index
    Select(usize),
    Quit,
}

pub struct SearchPage {
    theme: Theme,
    input: InputBox,
    list: ListState,
    status_bar: StatusBarState,
    min_chars: usize,
    tick: usize,
}

impl SearchPage {
    pub fn new(theme: Theme, min_chars: usize) -> Self {
        let mut status_bar = StatusBarState::new();
        status_bar.set_items(
            vec![
                StatusItem::new("↑↓", "choose"),
                StatusItem::new("Enter", "select"),
                StatusItem::new("Ctrl+U", "clear"),
            ],
            vec![StatusItem::new("Esc", "cancel")],
        );
        Self {
            theme,
            input: InputBox::new("Municipality").with_placeholder("Start typing a municipality name"),
            list: ListState::default(),
            status_bar,
            min_chars,
            tick: 0,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.input = self.input.with_content(query);
        self
    }

    pub fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
        self.status_bar.check_timeout();
    }

    /// Keep the highlight inside the current result list
    pub fn sync(&mut self, state: &SearchState) {
        let len = state.results.len();
        if !state.open || len == 0 {
            self.list.select(None);
        } else {
            let index = self.list.selected().unwrap_or(0).min(len - 1);
            self.list.select(Some(index));
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, state: &SearchState) -> Option<SearchAction> {
        match key.code {
            KeyCode::Esc => Some(SearchAction::Quit),
            KeyCode::Enter => match self.list.selected() {
                Some(index) if state.open && index < state.results.len() => {
                    Some(SearchAction::Select(index))
                }
                _ => {
                    self.status_bar.warning("Choose a municipality from the list");
                    None
                }
            },
            KeyCode::Up => {
                self.list.select_previous();
                self.sync(state);
                None
            }
            KeyCode::Down => {
                self.list.select_next();
                self.sync(state);
                None
            }
            _ => {
                if self.input.handle_key(key) {
                    self.list.select(None);
                    Some(SearchAction::QueryChanged(self.input.content().to_string()))
                } else {
                    None
                }
            }
        }
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, state: &SearchState) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Input
                Constraint::Min(3),    // Results
                Constraint::Length(3), // Status bar
            ])
            .split(area);

        self.input.render(frame, chunks[0], &self.theme);
        self.sync(state);
        self.render_results(frame, chunks[1], state);
        frame.render_widget(StatusBar::new(&self.status_bar, self.theme), chunks[2]);
    }

    fn render_results(&mut self, frame: &mut Frame, area: Rect, state: &SearchState) {
        let title = if state.loading {
            format!(" Results {} ", spinner(self.tick))
        } else {
            " Results ".to_string()
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border())
            .title(Span::styled(title, self.theme.header()));

        if !state.open || state.results.is_empty() {
            let hint = if !state.open {
                format!("Type at least {} characters to search", self.min_chars)
            } else {
                state.empty_label().to_string()
            };
            let text = Paragraph::new(Span::styled(hint, self.theme.text_muted())).block(block);
            frame.render_widget(text, area);
            return;
        }

        let items: Vec<ListItem> = state
            .results
            .iter()
            .map(|m| ListItem::new(self.result_line(m)))
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(self.theme.selected())
            .highlight_symbol(HIGHLIGHT_SYMBOL);
        frame.render_stateful_widget(list, area, &mut self.list);
    }

    fn result_line(&self, municipality: &Municipality) -> Line<'static> {
        let kind_color = match municipality.kind() {
            MunicipalityKind::Urban => self.theme.accent,
            MunicipalityKind::Rural => self.theme.success,
            MunicipalityKind::UrbanRural => self.theme.info,
            MunicipalityKind::Other => self.theme.muted,
        };

        let mut spans = vec![
            Span::styled(municipality.name.clone(), self.theme.text_bold()),
            Span::raw("  "),
            Span::styled(municipality.kind.clone(), self.theme.text().fg(kind_color)),
        ];

        let location: Vec<&str> = [
            municipality.voivodeship_name.as_deref(),
            municipality.county_name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();
        if !location.is_empty() {
            spans.push(Span::styled(
                format!("  {}", location.join(" · ")),
                self.theme.text_muted(),
            ));
        }
        spans.push(Span::styled(
            format!("  TERYT {}", municipality.teryt_code),
            self.theme.text_muted(),
        ));

        Line::from(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use ratatui::{backend::TestBackend, Terminal};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn municipality(id: i64, name: &str, kind: &str) -> Municipality {
        Municipality {
            id,
            teryt_code: format!("22610{}1", id),
            name: name.to_string(),
            kind: kind.to_string(),
            voivodeship_name: Some("pomorskie".to_string()),
            county_name: None,
            population: None,
        }
    }

    fn open_state(results: Vec<Municipality>) -> SearchState {
        let mut state = SearchState::default();
        state.query = "Gd".to_string();
        state.open = true;
        state.results = results;
        state
    }

    fn draw(page: &mut SearchPage, state: &SearchState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 16)).unwrap();
        terminal
            .draw(|frame| page.render(frame, frame.area(), state))
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
    fn test_typing_emits_query() {
        let mut page = SearchPage::new(Theme::dark(), 2);
        let state = SearchState::default();
        assert_eq!(
            page.handle_key(key(KeyCode::Char('G')), &state),
            Some(SearchAction::QueryChanged("G".to_string()))
        );
        assert_eq!(
            page.handle_key(key(KeyCode::Char('d')), &state),
            Some(SearchAction::QueryChanged("Gd".to_string()))
        );
        assert_eq!(page.handle_key(key(KeyCode::Left), &state), None);
    }

    #[test]
    fn test_arrow_keys_move_within_results() {
        let mut page = SearchPage::new(Theme::dark(), 2);
        let state = open_state(vec![
            municipality(1, "Gdańsk", "gmina miejska"),
            municipality(2, "Gdynia", "gmina miejska"),
        ]);
        page.sync(&state);
        assert_eq!(page.list.selected(), Some(0));

        page.handle_key(key(KeyCode::Down), &state);
        page.handle_key(key(KeyCode::Down), &state);
        assert_eq!(page.list.selected(), Some(1));

        assert_eq!(
            page.handle_key(key(KeyCode::Enter), &state),
            Some(SearchAction::Select(1))
        );
    }

    #[test]
    fn test_enter_without_results_warns() {
        let mut page = SearchPage::new(Theme::dark(), 2);
        let state = open_state(Vec::new());
        page.sync(&state);
        assert_eq!(page.handle_key(key(KeyCode::Enter), &state), None);
        assert!(page.status_bar.notification.is_some());
    }

    #[test]
    fn test_renders_results() {
        let mut page = SearchPage::new(Theme::dark(), 2).with_query("Gd");
        let state = open_state(vec![municipality(1, "Gdańsk", "gmina miejska")]);
        let screen = draw(&mut page, &state);
        assert!(screen.contains("Gdańsk"));
        assert!(screen.contains("gmina miejska"));
        assert!(screen.contains("pomorskie"));
    }

    #[test]
    fn test_renders_empty_and_idle_labels() {
        let mut page = SearchPage::new(Theme::dark(), 2);
        let idle = draw(&mut page, &SearchState::default());
        assert!(idle.contains("Type at least 2 characters"));

        let mut searching = open_state(Vec::new());
        searching.loading = true;
        assert!(draw(&mut page, &searching).contains("Searching..."));

        let empty = open_state(Vec::new());
        assert!(draw(&mut page, &empty).contains("No results"));
    }
}
