//! Full-screen chat UI

use std::io;
use std::time::Instant;

use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste, Event, EventStream},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use dokter_ai::Role;
use dokter_chat::{
    ChatEvent, ChatSession, Error, TranscriptEntry, Turn,
    transcript::{MODEL_LABEL, USER_LABEL},
};
use dokter_tui::{
    Theme,
    input::{Action, event_to_action},
    widgets::{Bubble, InputBox, MessageList, Spinner, message_list::content_height, spinner},
};
use futures::StreamExt;
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};
use tokio::sync::{broadcast, mpsc};

use crate::strings;

type Term = Terminal<CrosstermBackend<io::Stdout>>;

/// Requests from the UI state to the relay loop
#[derive(Debug, PartialEq, Eq)]
pub enum UiMessage {
    /// Send a prompt
    Submit(String),
    /// Cancel the pending reply
    Abort,
}

/// TUI application state
pub struct TuiState {
    bubbles: Vec<Bubble>,
    input: InputBox,
    /// Lines scrolled from the top; `usize::MAX` pins to the bottom
    scroll: usize,
    is_processing: bool,
    status: String,
    theme: Theme,
    model_id: String,
    input_tokens: u32,
    output_tokens: u32,
    ui_tx: mpsc::Sender<UiMessage>,
    spinner_start: Instant,
}

fn bubble_for(entry: &TranscriptEntry) -> Bubble {
    match entry.role {
        Role::User => Bubble::user(entry.label, &entry.text),
        Role::Model => Bubble::dokter(entry.label, &entry.text),
    }
}

impl TuiState {
    pub fn new(
        model_id: impl Into<String>,
        transcript: &[TranscriptEntry],
        theme: Theme,
        ui_tx: mpsc::Sender<UiMessage>,
    ) -> Self {
        let mut input = InputBox::new().with_placeholder(strings::PLACEHOLDER);
        input.set_focused(true);

        Self {
            bubbles: transcript.iter().map(bubble_for).collect(),
            input,
            scroll: usize::MAX,
            is_processing: false,
            status: strings::READY.to_string(),
            theme,
            model_id: model_id.into(),
            input_tokens: 0,
            output_tokens: 0,
            ui_tx,
            spinner_start: Instant::now(),
        }
    }

    fn scroll_to_bottom(&mut self) {
        // Resolved against the content height at render time
        self.scroll = usize::MAX;
    }

    fn drop_streaming_bubble(&mut self) {
        if self.bubbles.last().is_some_and(|b| b.streaming) {
            self.bubbles.pop();
        }
    }

    /// Mark the start of a relay
    fn begin_relay(&mut self) {
        self.is_processing = true;
        self.spinner_start = Instant::now();
        self.status = strings::THINKING.to_string();
    }

    /// Handle relay progress
    pub fn handle_chat_event(&mut self, event: ChatEvent) {
        match event {
            ChatEvent::RelayStart { prompt } => {
                self.bubbles.push(Bubble::user(USER_LABEL, prompt.text));
                self.bubbles.push(Bubble::streaming(MODEL_LABEL, ""));
                self.scroll_to_bottom();
            }
            ChatEvent::ReplyUpdate { text } => {
                if let Some(bubble) = self.bubbles.last_mut().filter(|b| b.streaming) {
                    bubble.text = text;
                    self.scroll_to_bottom();
                }
            }
            ChatEvent::RelayEnd { total_usage } => {
                self.input_tokens = total_usage.input;
                self.output_tokens = total_usage.output;
            }
            _ => {}
        }
    }

    /// Settle the transcript once a relay has returned
    pub fn finish_relay(&mut self, result: Result<Turn, Error>) {
        self.is_processing = false;
        self.status = strings::READY.to_string();
        self.drop_streaming_bubble();

        match result {
            Ok(reply) => self.bubbles.push(Bubble::dokter(MODEL_LABEL, reply.text)),
            Err(Error::EmptyPrompt) => {}
            Err(Error::Cancelled) => self.bubbles.push(Bubble::notice(strings::CANCELLED)),
            Err(e) => self.bubbles.push(Bubble::notice(strings::relay_error(&e))),
        }
        self.scroll_to_bottom();
    }

    /// Queue a request for the relay loop without waiting on it.
    ///
    /// The loop that drains `ui_rx` also calls this, so a full channel drops
    /// the request instead of blocking.
    fn request(&self, msg: UiMessage) {
        if let Err(e) = self.ui_tx.try_send(msg) {
            tracing::debug!("UI request dropped: {}", e);
        }
    }

    /// Handle keyboard action. Returns false to quit.
    pub fn handle_action(&mut self, action: Action, width: u16) -> bool {
        match action {
            Action::Submit => {
                if !self.is_processing {
                    if let Some(prompt) = self.input.take_submission() {
                        self.request(UiMessage::Submit(prompt));
                    }
                }
                true
            }
            Action::Interrupt | Action::Escape if self.is_processing => {
                self.request(UiMessage::Abort);
                self.status = strings::CANCELLING.to_string();
                true
            }
            Action::Interrupt => false,
            Action::Eof if self.input.is_empty() => false,
            Action::Escape => true,
            Action::ScrollUp => {
                self.scroll = self.scroll.saturating_sub(1);
                true
            }
            Action::ScrollDown => {
                self.scroll = self.scroll.saturating_add(1);
                true
            }
            Action::PageUp => {
                self.scroll = self.scroll.saturating_sub(10);
                true
            }
            Action::PageDown => {
                self.scroll = self.scroll.saturating_add(10);
                true
            }
            _ => {
                self.input.handle_action(&action, width);
                true
            }
        }
    }

    /// Render the UI
    pub fn render(&mut self, frame: &mut Frame) {
        // Layout: header (2), transcript (flex), status (1), input (3)
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(3),
                Constraint::Length(1),
                Constraint::Length(3),
            ])
            .split(frame.area());

        let header = Paragraph::new(vec![
            Line::from(Span::styled(strings::TITLE, self.theme.title_style())),
            Line::from(Span::styled(strings::CAPTION, self.theme.muted_style())),
        ]);
        frame.render_widget(header, chunks[0]);

        self.render_messages(frame, chunks[1]);
        self.render_status(frame, chunks[2]);
        self.input.render(chunks[3], frame.buffer_mut(), &self.theme);
    }

    fn render_messages(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.frame_style(false))
            .title(format!(" dokter │ {} ", self.model_id));

        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height == 0 || inner.width < 2 {
            return;
        }

        // Leave a column for the scrollbar
        let text_area = Rect {
            width: inner.width - 1,
            ..inner
        };
        let total = content_height(&self.bubbles, &self.theme, text_area.width as usize);
        let max_scroll = total.saturating_sub(text_area.height as usize);
        self.scroll = self.scroll.min(max_scroll);

        frame.render_widget(
            MessageList::new(&self.bubbles, &self.theme).scroll(self.scroll),
            text_area,
        );

        if total > text_area.height as usize {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"))
                .track_symbol(Some("│"))
                .thumb_symbol("█");
            let mut scrollbar_state = ScrollbarState::new(max_scroll)
                .position(self.scroll)
                .viewport_content_length(text_area.height as usize);
            frame.render_stateful_widget(scrollbar, inner, &mut scrollbar_state);
        }
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        if self.is_processing {
            let spinner =
                Spinner::new(&self.status, &self.theme).with_start_time(self.spinner_start);
            frame.render_widget(spinner, area);
            return;
        }

        let left = format!(
            "{} │ {} in / {} out │ {}",
            self.model_id, self.input_tokens, self.output_tokens, self.status
        );
        let available = area.width as usize;
        let (left_width, right_width) = (left.chars().count(), strings::KEY_HINTS.chars().count());

        let line = if left_width + right_width + 2 <= available {
            Line::from(vec![
                Span::styled(left, self.theme.muted_style()),
                Span::raw(" ".repeat(available - left_width - right_width)),
                Span::styled(strings::KEY_HINTS, self.theme.muted_style()),
            ])
        } else {
            Line::from(Span::styled(left, self.theme.muted_style()))
        };
        frame.render_widget(Paragraph::new(line), area);
    }
}

/// Feed one terminal event to the state. Returns false to quit.
fn handle_terminal_event(
    state: &mut TuiState,
    event: Option<io::Result<Event>>,
    width: u16,
) -> anyhow::Result<bool> {
    match event {
        Some(Ok(event)) => match event_to_action(event) {
            Some(action) => Ok(state.handle_action(action, width)),
            None => Ok(true),
        },
        Some(Err(e)) => Err(anyhow::anyhow!("Event error: {}", e)),
        None => Ok(false),
    }
}

/// Run the chat UI until the user quits
pub async fn run_tui(session: &mut ChatSession, theme: Theme) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = event_loop(&mut terminal, session, theme).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

async fn event_loop(
    terminal: &mut Term,
    session: &mut ChatSession,
    theme: Theme,
) -> anyhow::Result<()> {
    let (ui_tx, mut ui_rx) = mpsc::channel::<UiMessage>(32);
    let mut state = TuiState::new(&session.model().id, &session.transcript(), theme, ui_tx);

    let mut chat_rx = session.subscribe();
    let handle = session.handle();
    let mut event_stream = EventStream::new();
    let mut tick_interval = tokio::time::interval(spinner::FRAME_INTERVAL);

    loop {
        terminal.draw(|frame| state.render(frame))?;
        let width = terminal.size()?.width;

        let prompt = tokio::select! {
            event = event_stream.next() => {
                if !handle_terminal_event(&mut state, event, width)? {
                    return Ok(());
                }
                None
            }
            msg = ui_rx.recv() => match msg {
                Some(UiMessage::Submit(prompt)) => Some(prompt),
                Some(UiMessage::Abort) => None,
                None => return Ok(()),
            },
            _ = tick_interval.tick() => None,
        };

        let Some(prompt) = prompt else {
            continue;
        };

        state.begin_relay();
        let result = {
            let mut relay = std::pin::pin!(session.send_message(&prompt));

            // Poll the relay alongside input so the user can cancel
            loop {
                terminal.draw(|frame| state.render(frame))?;
                let width = terminal.size()?.width;

                tokio::select! {
                    biased;

                    result = &mut relay => break result,

                    event = chat_rx.recv() => match event {
                        Ok(event) => state.handle_chat_event(event),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!("UI skipped {} chat events", n);
                        }
                        Err(broadcast::error::RecvError::Closed) => {}
                    },

                    event = event_stream.next() => {
                        if !handle_terminal_event(&mut state, event, width)? {
                            // Dropping the relay future abandons the request
                            return Ok(());
                        }
                    }

                    msg = ui_rx.recv() => {
                        if let Some(UiMessage::Abort) = msg {
                            handle.abort();
                        }
                    }

                    _ = tick_interval.tick() => {}
                }
            }
        };

        // Events queued before the relay returned still belong to it
        while let Ok(event) = chat_rx.try_recv() {
            state.handle_chat_event(event);
        }
        state.finish_relay(result);
    }
}
