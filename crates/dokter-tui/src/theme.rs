//! Color theme support

use ratatui::style::{Color, Modifier, Style};

/// Colors for the chat screen
#[derive(Debug, Clone)]
pub struct Theme {
    pub background: Color,
    pub text: Color,
    /// Caption, placeholder, status line, list markers
    pub muted: Color,
    /// Title, user bubbles, focused input, spinner
    pub highlight: Color,
    /// The model's bubbles
    pub dokter: Color,
    /// Inline errors
    pub notice: Color,
    pub frame: Color,
    pub code: Color,
    pub link: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            background: Color::Reset,
            text: Color::White,
            muted: Color::DarkGray,
            highlight: Color::Cyan,
            dokter: Color::Green,
            notice: Color::Red,
            frame: Color::DarkGray,
            code: Color::Magenta,
            link: Color::Blue,
        }
    }

    pub fn light() -> Self {
        Self {
            background: Color::White,
            text: Color::Black,
            muted: Color::Gray,
            highlight: Color::Blue,
            dokter: Color::Rgb(0, 120, 60),
            notice: Color::Rgb(180, 0, 0),
            frame: Color::Gray,
            code: Color::Magenta,
            link: Color::Blue,
        }
    }

    pub fn text_style(&self) -> Style {
        Style::default().fg(self.text).bg(self.background)
    }

    pub fn muted_style(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn highlight_style(&self) -> Style {
        Style::default().fg(self.highlight)
    }

    pub fn title_style(&self) -> Style {
        self.highlight_style().add_modifier(Modifier::BOLD)
    }

    /// Markdown heading; level 1 is the loudest
    pub fn heading_style(&self, level: u8) -> Style {
        match level {
            1 => self.title_style().add_modifier(Modifier::UNDERLINED),
            2 => self.title_style(),
            _ => self.highlight_style(),
        }
    }

    pub fn user_label_style(&self) -> Style {
        self.title_style()
    }

    pub fn dokter_label_style(&self) -> Style {
        Style::default().fg(self.dokter).add_modifier(Modifier::BOLD)
    }

    pub fn notice_style(&self) -> Style {
        Style::default().fg(self.notice)
    }

    pub fn frame_style(&self, focused: bool) -> Style {
        if focused {
            self.highlight_style()
        } else {
            Style::default().fg(self.frame)
        }
    }

    pub fn code_style(&self) -> Style {
        Style::default().fg(self.code)
    }

    pub fn link_style(&self) -> Style {
        Style::default().fg(self.link).add_modifier(Modifier::UNDERLINED)
    }

    /// Block cursor in the input box
    pub fn cursor_style(&self) -> Style {
        Style::default().bg(self.highlight)
    }
}
