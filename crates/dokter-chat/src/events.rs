//! Chat event types

use dokter_ai::{Message, StopReason, Usage};
use serde::{Deserialize, Serialize};

/// Events emitted while a prompt is relayed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// The prompt was appended and the request is about to go out
    RelayStart { prompt: Message },

    /// The model accepted the request
    ReplyStart,

    /// Reply text received so far
    ReplyUpdate { text: String },

    /// Reply completed
    ReplyEnd {
        message: Message,
        stop_reason: StopReason,
        usage: Usage,
    },

    /// The request was aborted
    Cancelled,

    /// Error occurred
    Error { message: String },

    /// The session is idle again
    RelayEnd { total_usage: Usage },
}
