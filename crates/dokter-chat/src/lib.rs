//! dokter-chat: chat session runtime
//!
//! Holds one conversation in memory, seeds it with the diagnostic preamble,
//! and relays each new prompt to the model.

pub mod conversation;
pub mod error;
pub mod events;
pub mod handle;
pub mod preamble;
pub mod session;
pub mod transcript;
pub mod transport;

pub use conversation::{Conversation, Turn};
pub use error::{Error, ErrorKind, Result};
pub use events::ChatEvent;
pub use handle::SessionHandle;
pub use session::{ChatSession, SessionSettings};
pub use transcript::TranscriptEntry;
pub use transport::{ProviderTransport, Transport};
