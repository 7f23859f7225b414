//! Streaming event types and reply assembly

use crate::types::{Message, StopReason, Usage};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

/// Events emitted while a reply streams in
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageEvent {
    /// Request accepted, reply about to stream
    Start { model: String },
    /// A chunk of reply text
    TextDelta { delta: String },
    /// Reply completed
    Done {
        message: Message,
        stop_reason: StopReason,
        usage: Usage,
    },
    /// Error occurred; no further events follow
    Error { message: String },
}

/// A stream of message events
pub type MessageEventStream = Pin<Box<dyn Stream<Item = MessageEvent> + Send>>;

/// Accumulates streamed deltas into the reply seen so far
#[derive(Debug, Default)]
pub struct MessageBuilder {
    text: String,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a streaming event and update the partial reply
    pub fn process_event(&mut self, event: &MessageEvent) {
        match event {
            MessageEvent::TextDelta { delta } => self.text.push_str(delta),
            // The final message is authoritative over the deltas
            MessageEvent::Done { message, .. } => self.text = message.text.clone(),
            _ => {}
        }
    }

    /// Text received so far
    pub fn current_text(&self) -> &str {
        &self.text
    }
}
