//! Theme - colours and styles for the console TUI

use ratatui::style::{Color, Modifier, Style};
use region_foundation::ThemeName;
use region_task::BadgeTone;

/// Console theme
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub bg: Color,
    /// Default text
    pub fg: Color,
    /// Secondary information
    pub muted: Color,
    /// Brand colour; also the "primary" badge tone
    pub accent: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub border: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,
    pub code_bg: Color,
}

impl Theme {
    /// Dark theme (default)
    pub fn dark() -> Self {
        Self {
            bg: Color::Rgb(22, 22, 26),            // #16161a
            fg: Color::Rgb(220, 220, 224),         // #dcdce0
            muted: Color::Rgb(128, 128, 140),      // #80808c
            accent: Color::Rgb(120, 180, 255),     // #78b4ff
            success: Color::Rgb(80, 200, 120),     // #50c878
            warning: Color::Rgb(255, 200, 80),     // #ffc850
            error: Color::Rgb(255, 100, 100),      // #ff6464
            info: Color::Rgb(100, 210, 230),       // #64d2e6
            border: Color::Rgb(60, 60, 70),        // #3c3c46
            selection_bg: Color::Rgb(50, 80, 120), // #325078
            selection_fg: Color::Rgb(255, 255, 255),
            code_bg: Color::Rgb(30, 30, 36), // #1e1e24
        }
    }

    pub fn light() -> Self {
        Self {
            bg: Color::Rgb(250, 250, 252),
            fg: Color::Rgb(30, 30, 40),
            muted: Color::Rgb(120, 120, 130),
            accent: Color::Rgb(0, 100, 200),
            success: Color::Rgb(30, 150, 80),
            warning: Color::Rgb(200, 150, 0),
            error: Color::Rgb(200, 60, 60),
            info: Color::Rgb(0, 140, 170),
            border: Color::Rgb(220, 220, 225),
            selection_bg: Color::Rgb(200, 220, 250),
            selection_fg: Color::Rgb(0, 0, 0),
            code_bg: Color::Rgb(240, 240, 245),
        }
    }

    pub fn from_name(name: ThemeName) -> Self {
        match name {
            ThemeName::Dark => Self::dark(),
            ThemeName::Light => Self::light(),
        }
    }

    /// Colour for a badge tone
    pub fn tone(&self, tone: BadgeTone) -> Color {
        match tone {
            BadgeTone::Info => self.info,
            BadgeTone::Primary => self.accent,
            BadgeTone::Success => self.success,
            BadgeTone::Danger => self.error,
            BadgeTone::Warning => self.warning,
            BadgeTone::Secondary => self.muted,
        }
    }

    // === Style helpers ===

    pub fn text(&self) -> Style {
        Style::default().fg(self.fg)
    }

    pub fn text_muted(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn text_bold(&self) -> Style {
        Style::default().fg(self.fg).add_modifier(Modifier::BOLD)
    }

    pub fn header(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border(&self) -> Style {
        Style::default().fg(self.border)
    }

    pub fn border_focused(&self) -> Style {
        Style::default().fg(self.accent)
    }

    pub fn selected(&self) -> Style {
        Style::default()
            .bg(self.selection_bg)
            .fg(self.selection_fg)
    }

    /// Filled badge: tone background, theme background as text
    pub fn badge(&self, tone: BadgeTone) -> Style {
        Style::default()
            .bg(self.tone(tone))
            .fg(self.bg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn success(&self) -> Style {
        Style::default().fg(self.success)
    }

    pub fn warning(&self) -> Style {
        Style::default().fg(self.warning)
    }

    pub fn error(&self) -> Style {
        Style::default().fg(self.error)
    }

    pub fn info(&self) -> Style {
        Style::default().fg(self.info)
    }

    pub fn code_block(&self) -> Style {
        Style::default().bg(self.code_bg).fg(self.fg)
    }

    /// (filled, empty) parts of a progress bar
    pub fn progress_bar(&self, tone: BadgeTone) -> (Style, Style) {
        (
            Style::default().fg(self.tone(tone)).bg(self.border),
            Style::default().fg(self.border),
        )
    }

    pub fn keybind(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn keybind_desc(&self) -> Style {
        Style::default().fg(self.muted)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

pub mod icons {
    pub const CHECK: &str = "✓";
    pub const CROSS: &str = "✗";
    pub const SPINNER: [&str; 8] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧"];
    pub const WARNING: &str = "⚠";
    pub const INFO: &str = "ℹ";
}

/// Spinner frame for a tick counter
pub fn spinner(tick: usize) -> &'static str {
    icons::SPINNER[tick % icons::SPINNER.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tone_colors() {
        let theme = Theme::dark();
        assert_eq!(theme.tone(BadgeTone::Danger), theme.error);
        assert_eq!(theme.tone(BadgeTone::Primary), theme.accent);
        assert_eq!(theme.tone(BadgeTone::Secondary), theme.muted);
    }

    #[test]
    fn test_theme_from_name() {
        assert_eq!(Theme::from_name(ThemeName::Light), Theme::light());
        assert_ne!(Theme::dark().bg, Theme::light().bg);
    }

    #[test]
    fn test_spinner_wraps() {
        assert_eq!(spinner(0), spinner(8));
    }
}
