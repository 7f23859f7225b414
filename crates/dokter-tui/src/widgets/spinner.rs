//! Busy indicator shown while the model is answering

use crate::theme::Theme;
use ratatui::{buffer::Buffer, layout::Rect, text::Span, widgets::Widget};
use std::time::{Duration, Instant};

const FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Time each frame stays on screen; the UI ticks at the same rate
pub const FRAME_INTERVAL: Duration = Duration::from_millis(80);

/// Animated spinner with a label
pub struct Spinner<'a> {
    label: &'a str,
    theme: &'a Theme,
    started: Instant,
}

impl<'a> Spinner<'a> {
    pub fn new(label: &'a str, theme: &'a Theme) -> Self {
        Self {
            label,
            theme,
            started: Instant::now(),
        }
    }

    /// Animate relative to `start` so redraws stay in phase
    pub fn with_start_time(mut self, start: Instant) -> Self {
        self.started = start;
        self
    }

    fn frame_at(elapsed: Duration) -> &'static str {
        let index = (elapsed.as_millis() / FRAME_INTERVAL.as_millis()) as usize;
        FRAMES[index % FRAMES.len()]
    }
}

impl Widget for Spinner<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 3 || area.height == 0 {
            return;
        }

        let text = format!("{} {}", Self::frame_at(self.started.elapsed()), self.label);
        let span = Span::styled(text, self.theme.highlight_style());
        buf.set_span(area.x, area.y, &span, area.width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_cycle() {
        assert_eq!(Spinner::frame_at(Duration::ZERO), "⠋");
        assert_eq!(Spinner::frame_at(FRAME_INTERVAL), "⠙");
        assert_eq!(Spinner::frame_at(FRAME_INTERVAL * FRAMES.len() as u32), "⠋");
    }

    #[test]
    fn test_renders_label() {
        let theme = Theme::dark();
        let area = Rect::new(0, 0, 30, 1);
        let mut buf = Buffer::empty(area);
        Spinner::new("Dokter sedang berpikir...", &theme).render(area, &mut buf);
        let row: String = (0..30).map(|x| buf[(x, 0)].symbol().to_string()).collect();
        assert!(row.contains("Dokter sedang berpikir..."));
    }
}
