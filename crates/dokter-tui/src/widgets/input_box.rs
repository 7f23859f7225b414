//! Symptom entry box

use crate::input::Action;
use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    widgets::{Block, Borders, Paragraph, Widget},
};
use unicode_width::UnicodeWidthChar;

/// Single-line text entry that never hands out a blank submission
#[derive(Debug, Default)]
pub struct InputBox {
    content: String,
    /// Cursor position in chars
    cursor: usize,
    /// Horizontal scroll offset in display columns
    scroll: usize,
    placeholder: String,
    focused: bool,
}

fn char_width(c: char) -> usize {
    c.width().unwrap_or(0)
}

impl InputBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
        self.scroll = 0;
    }

    /// Take the trimmed text for sending and clear the box.
    ///
    /// Returns `None` and leaves the box untouched when there is nothing but
    /// whitespace to send.
    pub fn take_submission(&mut self) -> Option<String> {
        let text = self.content.trim();
        if text.is_empty() {
            return None;
        }
        let text = text.to_string();
        self.clear();
        Some(text)
    }

    fn byte_at(&self, char_idx: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    fn cursor_column(&self) -> usize {
        self.content.chars().take(self.cursor).map(char_width).sum()
    }

    fn insert_char(&mut self, c: char) {
        let at = self.byte_at(self.cursor);
        self.content.insert(at, c);
        self.cursor += 1;
    }

    /// Remove chars in `start..end` (char indices) and park the cursor at `start`
    fn remove_range(&mut self, start: usize, end: usize) {
        let (from, to) = (self.byte_at(start), self.byte_at(end));
        self.content.drain(from..to);
        self.cursor = start;
    }

    /// Apply an editing action. Returns whether anything changed.
    pub fn handle_action(&mut self, action: &Action, width: u16) -> bool {
        let len = self.char_count();

        let changed = match action {
            Action::Char(c) => {
                self.insert_char(*c);
                true
            }
            Action::Backspace if self.cursor > 0 => {
                self.remove_range(self.cursor - 1, self.cursor);
                true
            }
            Action::Delete if self.cursor < len => {
                let cursor = self.cursor;
                self.remove_range(cursor, cursor + 1);
                true
            }
            Action::Left if self.cursor > 0 => {
                self.cursor -= 1;
                true
            }
            Action::Right if self.cursor < len => {
                self.cursor += 1;
                true
            }
            Action::Home => {
                self.cursor = 0;
                true
            }
            Action::End => {
                self.cursor = len;
                true
            }
            Action::ClearLine => {
                self.clear();
                true
            }
            Action::DeleteWord if self.cursor > 0 => {
                let chars: Vec<char> = self.content.chars().collect();
                let mut start = self.cursor;
                while start > 0 && chars[start - 1].is_whitespace() {
                    start -= 1;
                }
                while start > 0 && !chars[start - 1].is_whitespace() {
                    start -= 1;
                }
                let cursor = self.cursor;
                self.remove_range(start, cursor);
                true
            }
            Action::Paste(text) => {
                // Single line: fold line breaks into one space
                for c in text.chars() {
                    if c == '\n' || c == '\r' {
                        let prev_is_space = self.cursor > 0
                            && self.content.chars().nth(self.cursor - 1) == Some(' ');
                        if self.cursor > 0 && !prev_is_space {
                            self.insert_char(' ');
                        }
                    } else {
                        self.insert_char(c);
                    }
                }
                true
            }
            _ => false,
        };

        if changed {
            self.update_scroll(width as usize);
        }
        changed
    }

    fn update_scroll(&mut self, width: usize) {
        let visible = width.saturating_sub(2).max(1);
        let column = self.cursor_column();

        if column < self.scroll {
            self.scroll = column;
        } else if column >= self.scroll + visible {
            self.scroll = column + 1 - visible;
        }
    }

    /// The slice of content that fits in `width` columns after scrolling
    fn visible_text(&self, width: usize) -> String {
        let mut column = 0;
        let mut out = String::new();
        for c in self.content.chars() {
            let w = char_width(c);
            if column >= self.scroll {
                if column + w > self.scroll + width {
                    break;
                }
                out.push(c);
            }
            column += w;
        }
        out
    }

    pub fn render(&self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(theme.frame_style(self.focused));

        let inner = block.inner(area);
        block.render(area, buf);

        let (text, style) = if self.content.is_empty() {
            (self.placeholder.clone(), theme.muted_style())
        } else {
            (self.visible_text(inner.width as usize), theme.text_style())
        };
        Paragraph::new(text).style(style).render(inner, buf);

        if self.focused && inner.width > 0 {
            let x = self.cursor_column().saturating_sub(self.scroll);
            if x < inner.width as usize {
                if let Some(cell) = buf.cell_mut((inner.x + x as u16, inner.y)) {
                    cell.set_style(theme.cursor_style());
                }
            }
        }
    }
}
