//! Transcript widget: one bubble per turn

use crate::theme::Theme;
use crate::widgets::markdown::render_markdown;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

/// Who a bubble belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BubbleKind {
    User,
    Dokter,
    /// Inline error or status line, not part of the conversation
    Notice,
}

/// A single chat bubble
#[derive(Debug, Clone)]
pub struct Bubble {
    pub kind: BubbleKind,
    pub label: String,
    pub text: String,
    /// Reply text still arriving
    pub streaming: bool,
}

impl Bubble {
    pub fn user(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: BubbleKind::User,
            label: label.into(),
            text: text.into(),
            streaming: false,
        }
    }

    pub fn dokter(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: BubbleKind::Dokter,
            label: label.into(),
            text: text.into(),
            streaming: false,
        }
    }

    /// A reply bubble that is still being written
    pub fn streaming(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            streaming: true,
            ..Self::dokter(label, text)
        }
    }

    pub fn notice(text: impl Into<String>) -> Self {
        Self {
            kind: BubbleKind::Notice,
            label: String::new(),
            text: text.into(),
            streaming: false,
        }
    }

    /// Lay the bubble out at `width` columns, blank separator line included
    pub fn lines(&self, theme: &Theme, width: usize) -> Vec<Line<'static>> {
        let body_width = width.saturating_sub(2).max(1);
        let mut lines = Vec::new();

        let body_style = match self.kind {
            BubbleKind::User => {
                lines.push(Line::from(Span::styled(
                    format!("▶ {}", self.label),
                    theme.user_label_style(),
                )));
                theme.text_style()
            }
            BubbleKind::Dokter => {
                let cursor = if self.streaming { " ▌" } else { "" };
                lines.push(Line::from(Span::styled(
                    format!("◀ {}{}", self.label, cursor),
                    theme.dokter_label_style(),
                )));
                theme.text_style()
            }
            BubbleKind::Notice => theme.notice_style(),
        };

        if self.kind == BubbleKind::Dokter {
            for line in render_markdown(&self.text, theme, body_width) {
                let mut spans = vec![Span::raw("  ")];
                spans.extend(line.spans);
                lines.push(Line::from(spans));
            }
        } else {
            for line in textwrap::wrap(&self.text, body_width) {
                lines.push(Line::from(Span::styled(format!("  {}", line), body_style)));
            }
        }

        lines.push(Line::from(""));
        lines
    }
}

/// Total rendered height of `bubbles` at `width` columns
pub fn content_height(bubbles: &[Bubble], theme: &Theme, width: usize) -> usize {
    bubbles.iter().map(|b| b.lines(theme, width).len()).sum()
}

/// Widget for displaying the transcript
pub struct MessageList<'a> {
    bubbles: &'a [Bubble],
    theme: &'a Theme,
    scroll: usize,
}

impl<'a> MessageList<'a> {
    pub fn new(bubbles: &'a [Bubble], theme: &'a Theme) -> Self {
        Self {
            bubbles,
            theme,
            scroll: 0,
        }
    }

    /// Set scroll offset in lines from the top
    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }
}

impl Widget for MessageList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let width = area.width as usize;
        let visible: Vec<Line> = self
            .bubbles
            .iter()
            .flat_map(|b| b.lines(self.theme, width))
            .skip(self.scroll)
            .take(area.height as usize)
            .collect();

        Paragraph::new(visible)
            .style(Style::default().bg(self.theme.background))
            .render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_headers_carry_labels() {
        let theme = Theme::dark();
        let user = Bubble::user("user", "demam tinggi").lines(&theme, 40);
        assert_eq!(text_of(&user[0]), "▶ user");
        assert_eq!(text_of(&user[1]), "  demam tinggi");

        let reply = Bubble::dokter("dokter", "Kemungkinan tifus.").lines(&theme, 40);
        assert_eq!(text_of(&reply[0]), "◀ dokter");
        assert_eq!(text_of(&reply[1]), "  Kemungkinan tifus.");
    }

    #[test]
    fn test_streaming_marker() {
        let theme = Theme::dark();
        let lines = Bubble::streaming("dokter", "Kemung").lines(&theme, 40);
        assert_eq!(text_of(&lines[0]), "◀ dokter ▌");
    }

    #[test]
    fn test_notice_has_no_header() {
        let theme = Theme::dark();
        let lines = Bubble::notice("Terjadi kesalahan: timeout").lines(&theme, 80);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].spans[0].style, theme.notice_style());
    }

    #[test]
    fn test_height_matches_render() {
        let theme = Theme::dark();
        let bubbles = vec![
            Bubble::user("user", "sakit kepala sebelah kiri sejak kemarin"),
            Bubble::dokter("dokter", "* migrain\n* tegang otot"),
        ];
        let height = content_height(&bubbles, &theme, 20);

        let area = Rect::new(0, 0, 20, height as u16);
        let mut buf = Buffer::empty(area);
        MessageList::new(&bubbles, &theme).render(area, &mut buf);

        let last_row: String = (0..20).map(|x| buf[(x, area.height - 2)].symbol().to_string()).collect();
        assert!(last_row.contains("tegang otot"));
    }

    #[test]
    fn test_scroll_skips_lines() {
        let theme = Theme::dark();
        let bubbles = vec![Bubble::user("user", "batuk")];
        let area = Rect::new(0, 0, 20, 3);
        let mut buf = Buffer::empty(area);
        MessageList::new(&bubbles, &theme).scroll(1).render(area, &mut buf);

        let first_row: String = (0..20).map(|x| buf[(x, 0)].symbol().to_string()).collect();
        assert!(first_row.starts_with("  batuk"));
    }
}
