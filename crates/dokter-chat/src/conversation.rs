//! Conversation state: ordered turns, usage, and the last relay error.

use dokter_ai::{Message, Role, Usage};

use crate::preamble;

/// One message exchanged in the conversation
pub type Turn = Message;

/// Append-only conversation history for one session.
#[derive(Debug, Clone)]
pub struct Conversation {
    turns: Vec<Turn>,
    /// Whether a reply is currently streaming
    pub is_streaming: bool,
    /// Text of the reply streamed so far
    pub partial_reply: Option<String>,
    /// Total usage across all turns
    pub total_usage: Usage,
    /// Last relay error
    pub error: Option<String>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::seeded()
    }
}

impl Conversation {
    /// A fresh history holding only the preamble
    pub fn seeded() -> Self {
        Self {
            turns: preamble::turns(),
            is_streaming: false,
            partial_reply: None,
            total_usage: Usage::default(),
            error: None,
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub(crate) fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Turns sent to the model for the newest prompt.
    ///
    /// User turns that never received a reply stay in the history but are
    /// left out, so the model only sees completed exchanges plus the newest
    /// prompt.
    pub fn request_context(&self) -> Vec<Turn> {
        let Some((newest, earlier)) = self.turns.split_last() else {
            return Vec::new();
        };

        let mut context: Vec<Turn> = earlier
            .iter()
            .enumerate()
            .filter(|(i, turn)| match turn.role {
                Role::Model => true,
                Role::User => earlier
                    .get(i + 1)
                    .is_some_and(|next| next.role == Role::Model),
            })
            .map(|(_, turn)| turn.clone())
            .collect();
        context.push(newest.clone());
        context
    }

    /// User turns after the preamble that have no reply
    pub fn unanswered(&self) -> usize {
        let body = &self.turns[preamble::LEN.min(self.turns.len())..];
        body.iter()
            .enumerate()
            .filter(|(i, t)| {
                t.role == Role::User && body.get(i + 1).is_none_or(|n| n.role != Role::Model)
            })
            .count()
    }
}
