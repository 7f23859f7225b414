//! dokter-ai: client for the Gemini generative-language API
//!
//! Wire types, streaming events and a small model registry used by the
//! chat session layer.

pub mod error;
pub mod models;
pub mod providers;
pub mod stream;
pub mod types;

pub use error::{Error, Result};
pub use stream::MessageEventStream;
pub use types::*;
