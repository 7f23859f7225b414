//! Markdown rendering for the model's replies

use crate::theme::Theme;
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};
use unicode_width::UnicodeWidthStr;

/// Convert markdown text to styled lines no wider than `width` columns.
///
/// Words longer than a full line are left to overflow.
pub fn render_markdown(text: &str, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut styles = vec![theme.text_style()];
    // One entry per open list: next number, or None for bullets
    let mut lists: Vec<Option<u64>> = Vec::new();
    let mut hang = 0;
    let mut in_code_block = false;
    let mut code_block = String::new();

    for event in Parser::new_ext(text, Options::ENABLE_STRIKETHROUGH) {
        match event {
            Event::Start(tag) => match tag {
                Tag::Heading { level, .. } => {
                    flush(&mut lines, &mut current, width, hang);
                    styles.push(theme.heading_style(heading_rank(level)));
                }
                Tag::Paragraph => flush(&mut lines, &mut current, width, hang),
                Tag::CodeBlock(_) => {
                    flush(&mut lines, &mut current, width, hang);
                    in_code_block = true;
                    code_block.clear();
                }
                Tag::List(start) => {
                    flush(&mut lines, &mut current, width, hang);
                    lists.push(start);
                }
                Tag::Item => {
                    flush(&mut lines, &mut current, width, hang);
                    let pad = "  ".repeat(lists.len().saturating_sub(1));
                    let marker = match lists.last_mut() {
                        Some(Some(n)) => {
                            let marker = format!("{}. ", n);
                            *n += 1;
                            marker
                        }
                        _ => "• ".to_string(),
                    };
                    hang = pad.width() + marker.width();
                    current.push(Span::styled(format!("{}{}", pad, marker), theme.muted_style()));
                }
                Tag::Emphasis => push_modifier(&mut styles, Modifier::ITALIC),
                Tag::Strong => push_modifier(&mut styles, Modifier::BOLD),
                Tag::Strikethrough => push_modifier(&mut styles, Modifier::CROSSED_OUT),
                Tag::Link { .. } => styles.push(theme.link_style()),
                _ => {}
            },
            Event::End(tag_end) => match tag_end {
                TagEnd::Heading(_) => {
                    flush(&mut lines, &mut current, width, hang);
                    pop_style(&mut styles);
                    lines.push(Line::from(""));
                }
                TagEnd::Paragraph => {
                    flush(&mut lines, &mut current, width, hang);
                    if lists.is_empty() {
                        lines.push(Line::from(""));
                    }
                }
                TagEnd::CodeBlock => {
                    in_code_block = false;
                    let style = theme.code_style().add_modifier(Modifier::DIM);
                    for code_line in code_block.lines() {
                        lines.push(Line::from(Span::styled(
                            format!("  {}", truncate(code_line, width.saturating_sub(2))),
                            style,
                        )));
                    }
                    lines.push(Line::from(""));
                }
                TagEnd::List(_) => {
                    flush(&mut lines, &mut current, width, hang);
                    lists.pop();
                    hang = 0;
                    if lists.is_empty() {
                        lines.push(Line::from(""));
                    }
                }
                TagEnd::Item => flush(&mut lines, &mut current, width, hang),
                TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link => {
                    pop_style(&mut styles);
                }
                _ => {}
            },
            Event::Text(text) => {
                if in_code_block {
                    code_block.push_str(&text);
                } else {
                    current.push(Span::styled(text.into_string(), top(&styles)));
                }
            }
            Event::Code(code) => {
                current.push(Span::styled(
                    code.into_string(),
                    theme.code_style().add_modifier(Modifier::BOLD),
                ));
            }
            Event::SoftBreak => current.push(Span::styled(" ", top(&styles))),
            Event::HardBreak => flush(&mut lines, &mut current, width, hang),
            Event::Rule => {
                flush(&mut lines, &mut current, width, hang);
                lines.push(Line::from(Span::styled("─".repeat(width), theme.muted_style())));
            }
            _ => {}
        }
    }

    flush(&mut lines, &mut current, width, hang);

    while lines.last().is_some_and(|l| l.width() == 0) {
        lines.pop();
    }

    lines
}

fn heading_rank(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        _ => 3,
    }
}

fn top(styles: &[Style]) -> Style {
    styles.last().copied().unwrap_or_default()
}

fn push_modifier(styles: &mut Vec<Style>, modifier: Modifier) {
    let style = top(styles).add_modifier(modifier);
    styles.push(style);
}

fn pop_style(styles: &mut Vec<Style>) {
    // The base style always stays
    if styles.len() > 1 {
        styles.pop();
    }
}

fn flush(lines: &mut Vec<Line<'static>>, current: &mut Vec<Span<'static>>, width: usize, hang: usize) {
    if !current.is_empty() {
        lines.extend(wrap_spans(std::mem::take(current), width, hang));
    }
}

/// Greedy word wrap over styled spans; continuation lines are indented by `hang`.
fn wrap_spans(spans: Vec<Span<'static>>, width: usize, hang: usize) -> Vec<Line<'static>> {
    let width = width.max(hang + 1);
    let mut lines = Vec::new();
    let mut line: Vec<Span<'static>> = Vec::new();
    let mut used = 0;

    for span in spans {
        let style = span.style;
        for word in span.content.split_inclusive(' ') {
            let mut word = word;
            if used > hang && used + word.trim_end().width() > width {
                lines.push(Line::from(std::mem::take(&mut line)));
                if hang > 0 {
                    line.push(Span::raw(" ".repeat(hang)));
                }
                used = hang;
                word = word.trim_start();
                if word.is_empty() {
                    continue;
                }
            }
            used += word.width();
            line.push(Span::styled(word.to_string(), style));
        }
    }

    if !line.is_empty() {
        lines.push(Line::from(line));
    }
    lines
}

/// Cut `text` to at most `width` columns, marking the cut with an ellipsis
fn truncate(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.to_string().width();
        if used + w + 1 > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn test_simple_text() {
        let theme = Theme::dark();
        let lines = render_markdown("Kemungkinan demam berdarah.", &theme, 80);
        assert_eq!(plain(&lines), vec!["Kemungkinan demam berdarah."]);
    }

    #[test]
    fn test_wraps_to_width() {
        let theme = Theme::dark();
        let lines = render_markdown("segera periksa ke dokter terdekat", &theme, 15);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.width() <= 15));
    }

    #[test]
    fn test_bullet_list_hangs() {
        let theme = Theme::dark();
        let md = "* minum air putih yang banyak\n* istirahat";
        let text = plain(&render_markdown(md, &theme, 16));
        assert!(text[0].starts_with("• minum"));
        assert!(text[1].starts_with("  "));
        assert!(text.iter().any(|l| l == "• istirahat"));
    }

    #[test]
    fn test_ordered_list_numbers() {
        let theme = Theme::dark();
        let text = plain(&render_markdown("1. tifus\n2. malaria", &theme, 40));
        assert_eq!(text, vec!["1. tifus", "2. malaria"]);
    }

    #[test]
    fn test_bold_style_survives() {
        let theme = Theme::dark();
        let lines = render_markdown("gejala **demam berdarah** umum", &theme, 80);
        let bold = lines[0]
            .spans
            .iter()
            .find(|s| s.content.contains("demam"))
            .unwrap();
        assert!(bold.style.add_modifier.contains(Modifier::BOLD));
        let after = lines[0].spans.last().unwrap();
        assert!(!after.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_code_block_truncates_multibyte() {
        let theme = Theme::dark();
        let md = "```\nsuhu ≥ 38°C selama tiga hari berturut-turut\n```";
        let lines = render_markdown(md, &theme, 20);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].width() <= 20);
        assert!(plain(&lines)[0].ends_with('…'));
    }
}
