//! Markdown rendering for research reports
//!
//! Converts report markdown into ratatui lines with pulldown-cmark.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use crate::tui::theme::Theme;

const RULE: &str = "────────────────────────────────────";

pub struct MarkdownRenderer {
    theme: Theme,
}

impl MarkdownRenderer {
    pub fn new(theme: Theme) -> Self {
        Self { theme }
    }

    pub fn render(&self, markdown: &str) -> Vec<Line<'static>> {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TABLES);

        let parser = Parser::new_ext(markdown, options);
        let mut state = RenderState::new(&self.theme);

        for event in parser {
            state.process_event(event);
        }

        state.finish()
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new(Theme::default())
    }
}

struct RenderState<'a> {
    theme: &'a Theme,
    style_stack: Vec<Style>,
    current_spans: Vec<Span<'static>>,
    lines: Vec<Line<'static>>,
    code_buffer: String,
    code_lang: String,
    in_code_block: bool,
    list_depth: usize,
    /// Next number per open list; None for bullet lists
    list_counters: Vec<Option<u64>>,
    quote_depth: usize,
    /// Cells of the table row being built
    table_row: Vec<String>,
    in_table_cell: bool,
}

impl<'a> RenderState<'a> {
    fn new(theme: &'a Theme) -> Self {
        Self {
            theme,
            style_stack: vec![theme.text()],
            current_spans: Vec::new(),
            lines: Vec::new(),
            code_buffer: String::new(),
            code_lang: String::new(),
            in_code_block: false,
            list_depth: 0,
            list_counters: Vec::new(),
            quote_depth: 0,
            table_row: Vec::new(),
            in_table_cell: false,
        }
    }

    fn current_style(&self) -> Style {
        self.style_stack.last().copied().unwrap_or_default()
    }

    fn push_style(&mut self, style: Style) {
        let current = self.current_style();
        self.style_stack.push(current.patch(style));
    }

    fn pop_style(&mut self) {
        if self.style_stack.len() > 1 {
            self.style_stack.pop();
        }
    }

    fn finish_line(&mut self) {
        if self.current_spans.is_empty() {
            return;
        }
        if self.quote_depth > 0 {
            let prefix = format!("{} ", "│".repeat(self.quote_depth));
            self.current_spans
                .insert(0, Span::styled(prefix, self.theme.info()));
        }
        let line = Line::from(std::mem::take(&mut self.current_spans));
        self.lines.push(line);
    }

    /// Blank separator between blocks, never doubled
    fn blank_line(&mut self) {
        if self.lines.last().is_some_and(|l| l.spans.is_empty()) || self.lines.is_empty() {
            return;
        }
        self.lines.push(Line::default());
    }

    fn add_text(&mut self, text: &str) {
        if self.in_code_block {
            self.code_buffer.push_str(text);
        } else if self.in_table_cell {
            if let Some(cell) = self.table_row.last_mut() {
                cell.push_str(text);
            }
        } else {
            let style = self.current_style();
            self.current_spans.push(Span::styled(text.to_string(), style));
        }
    }

    fn process_event(&mut self, event: Event) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.add_text(&text),
            Event::Code(code) => self.add_inline_code(&code),
            Event::SoftBreak => self.add_text(" "),
            Event::HardBreak => self.finish_line(),
            Event::Rule => self.add_horizontal_rule(),
            _ => {}
        }
    }

    fn start_tag(&mut self, tag: Tag) {
        match tag {
            Tag::Heading { level, .. } => {
                self.finish_line();
                self.blank_line();
                let style = heading_style(level, self.theme);
                self.push_style(style);
                self.current_spans
                    .push(Span::styled(heading_marker(level), style));
            }
            Tag::Paragraph => {
                self.finish_line();
            }
            Tag::BlockQuote(_) => {
                self.finish_line();
                self.quote_depth += 1;
            }
            Tag::CodeBlock(kind) => {
                self.finish_line();
                self.in_code_block = true;
                self.code_lang = match kind {
                    CodeBlockKind::Fenced(lang) => lang.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                self.code_buffer.clear();
            }
            Tag::List(start) => {
                self.finish_line();
                self.list_depth += 1;
                self.list_counters.push(start);
            }
            Tag::Item => {
                self.finish_line();
                let indent = "  ".repeat(self.list_depth.saturating_sub(1));
                let marker = match self.list_counters.last_mut() {
                    Some(Some(num)) => {
                        let m = format!("{}. ", num);
                        *num += 1;
                        m
                    }
                    _ => match self.list_depth % 3 {
                        1 => "• ".to_string(),
                        2 => "◦ ".to_string(),
                        _ => "▪ ".to_string(),
                    },
                };
                self.current_spans.push(Span::styled(
                    format!("{}{}", indent, marker),
                    self.theme.warning(),
                ));
            }
            Tag::Emphasis => {
                self.push_style(Style::default().add_modifier(Modifier::ITALIC));
            }
            Tag::Strong => {
                self.push_style(Style::default().add_modifier(Modifier::BOLD));
            }
            Tag::Strikethrough => {
                self.push_style(Style::default().add_modifier(Modifier::CROSSED_OUT));
            }
            Tag::Link { .. } => {
                self.push_style(
                    Style::default()
                        .fg(self.theme.accent)
                        .add_modifier(Modifier::UNDERLINED),
                );
            }
            Tag::Table(_) => {
                self.finish_line();
            }
            Tag::TableHead | Tag::TableRow => {
                self.table_row.clear();
            }
            Tag::TableCell => {
                self.in_table_cell = true;
                self.table_row.push(String::new());
            }
            _ => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Heading(_) => {
                self.pop_style();
                self.finish_line();
            }
            TagEnd::Paragraph => {
                self.finish_line();
            }
            TagEnd::BlockQuote(_) => {
                self.finish_line();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                self.add_code_block();
            }
            TagEnd::List(_) => {
                self.finish_line();
                self.list_depth = self.list_depth.saturating_sub(1);
                self.list_counters.pop();
            }
            TagEnd::Item => {
                self.finish_line();
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link => {
                self.pop_style();
            }
            TagEnd::TableCell => {
                self.in_table_cell = false;
            }
            TagEnd::TableHead => {
                self.add_table_row(true);
            }
            TagEnd::TableRow => {
                self.add_table_row(false);
            }
            _ => {}
        }
    }

    fn add_table_row(&mut self, header: bool) {
        let cells = std::mem::take(&mut self.table_row);
        let text = format!("│ {} │", cells.join(" │ "));
        let style = if header {
            self.theme.text_bold()
        } else {
            self.theme.text()
        };
        self.lines.push(Line::from(Span::styled(text, style)));
    }

    fn add_inline_code(&mut self, code: &str) {
        let style = self.theme.code_block().fg(self.theme.warning);
        if self.in_table_cell {
            if let Some(cell) = self.table_row.last_mut() {
                cell.push_str(code);
            }
            return;
        }
        self.current_spans
            .push(Span::styled(format!("`{}`", code), style));
    }

    fn add_code_block(&mut self) {
        let lang = if self.code_lang.is_empty() {
            "code"
        } else {
            &self.code_lang
        };

        self.lines.push(Line::from(vec![
            Span::styled("┌─ ", self.theme.border()),
            Span::styled(lang.to_string(), self.theme.info()),
            Span::styled(" ─", self.theme.border()),
        ]));

        for (i, line) in self.code_buffer.lines().enumerate() {
            self.lines.push(Line::from(vec![
                Span::styled(format!("{:>3} │ ", i + 1), self.theme.text_muted()),
                Span::styled(line.to_string(), self.theme.code_block()),
            ]));
        }

        self.lines
            .push(Line::from(Span::styled("└─", self.theme.border())));
        self.code_buffer.clear();
    }

    fn add_horizontal_rule(&mut self) {
        self.finish_line();
        self.lines
            .push(Line::from(Span::styled(RULE, self.theme.border())));
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.finish_line();
        self.lines
    }
}

fn heading_style(level: HeadingLevel, theme: &Theme) -> Style {
    let color = match level {
        HeadingLevel::H1 => theme.accent,
        HeadingLevel::H2 => theme.info,
        HeadingLevel::H3 => theme.success,
        _ => theme.fg,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

fn heading_marker(level: HeadingLevel) -> String {
    let depth = match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    };
    format!("{} ", "#".repeat(depth))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_text(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn texts(lines: &[Line<'_>]) -> Vec<String> {
        lines.iter().map(line_text).collect()
    }

    #[test]
    fn test_simple_text() {
        let lines = MarkdownRenderer::default().render("Population grew by 4%.");
        assert_eq!(texts(&lines), vec!["Population grew by 4%."]);
    }

    #[test]
    fn test_heading_then_paragraph() {
        let lines = MarkdownRenderer::default().render("# Gdańsk\n\nPort city.");
        let texts = texts(&lines);
        assert_eq!(texts[0], "# Gdańsk");
        assert_eq!(texts.last().map(String::as_str), Some("Port city."));
    }

    #[test]
    fn test_second_heading_gets_separator() {
        let lines = MarkdownRenderer::default().render("# A\n\ntext\n\n## B");
        assert_eq!(texts(&lines), vec!["# A", "text", "", "## B"]);
    }

    #[test]
    fn test_code_block() {
        let lines = MarkdownRenderer::default().render("```sql\nSELECT 1;\nSELECT 2;\n```");
        let texts = texts(&lines);
        assert_eq!(texts.len(), 4);
        assert!(texts[0].contains("sql"));
        assert!(texts[1].ends_with("SELECT 1;"));
    }

    #[test]
    fn test_inline_code() {
        let lines = MarkdownRenderer::default().render("Source: `GUS BDL`");
        assert_eq!(lines.len(), 1);
        assert!(line_text(&lines[0]).contains("`GUS BDL`"));
    }

    #[test]
    fn test_list() {
        let lines = MarkdownRenderer::default().render("- Roads\n- Schools\n- Clinics");
        assert_eq!(texts(&lines), vec!["• Roads", "• Schools", "• Clinics"]);
    }

    #[test]
    fn test_ordered_list() {
        let lines = MarkdownRenderer::default().render("1. First\n2. Second");
        assert_eq!(texts(&lines), vec!["1. First", "2. Second"]);
    }

    #[test]
    fn test_table_rows() {
        let lines =
            MarkdownRenderer::default().render("| Year | Pop |\n|---|---|\n| 2020 | 100 |");
        assert_eq!(texts(&lines), vec!["│ Year │ Pop │", "│ 2020 │ 100 │"]);
    }

    #[test]
    fn test_emphasis() {
        let lines = MarkdownRenderer::default().render("This is **bold** and *italic*");
        assert_eq!(lines.len(), 1);
        let has_bold = lines[0]
            .spans
            .iter()
            .any(|s| s.style.add_modifier.contains(Modifier::BOLD));
        let has_italic = lines[0]
            .spans
            .iter()
            .any(|s| s.style.add_modifier.contains(Modifier::ITALIC));
        assert!(has_bold);
        assert!(has_italic);
    }
}
