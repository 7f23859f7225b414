//! Key handling for the chat screen

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// What a key press means on the chat screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Char(char),
    /// Enter: send the symptom text
    Submit,
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
    /// Scroll the transcript by one line
    ScrollUp,
    ScrollDown,
    /// Scroll the transcript by one page
    PageUp,
    PageDown,
    /// Esc: cancel a pending reply
    Escape,
    /// Ctrl+C: cancel a pending reply, or quit when idle
    Interrupt,
    /// Ctrl+D on an empty line
    Eof,
    /// Ctrl+U
    ClearLine,
    /// Ctrl+W
    DeleteWord,
    /// Bracketed paste
    Paste(String),
    Unknown,
}

/// Convert a crossterm key event to an action
pub fn key_to_action(event: KeyEvent) -> Action {
    let KeyEvent {
        code,
        modifiers,
        kind,
        ..
    } = event;

    if kind == KeyEventKind::Release {
        return Action::Unknown;
    }

    if modifiers.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char('c') => Action::Interrupt,
            KeyCode::Char('d') => Action::Eof,
            KeyCode::Char('u') => Action::ClearLine,
            KeyCode::Char('w') => Action::DeleteWord,
            KeyCode::Char('a') => Action::Home,
            KeyCode::Char('e') => Action::End,
            _ => Action::Unknown,
        };
    }

    if modifiers.contains(KeyModifiers::ALT) {
        return Action::Unknown;
    }

    match code {
        KeyCode::Char(c) => Action::Char(c),
        KeyCode::Enter => Action::Submit,
        KeyCode::Backspace => Action::Backspace,
        KeyCode::Delete => Action::Delete,
        KeyCode::Left => Action::Left,
        KeyCode::Right => Action::Right,
        KeyCode::Up => Action::ScrollUp,
        KeyCode::Down => Action::ScrollDown,
        KeyCode::Home => Action::Home,
        KeyCode::End => Action::End,
        KeyCode::PageUp => Action::PageUp,
        KeyCode::PageDown => Action::PageDown,
        KeyCode::Esc => Action::Escape,
        _ => Action::Unknown,
    }
}

/// Convert a crossterm event to an action
pub fn event_to_action(event: Event) -> Option<Action> {
    match event {
        Event::Key(key_event) => Some(key_to_action(key_event)),
        Event::Paste(text) => Some(Action::Paste(text)),
        _ => None,
    }
}
