//! Error types for dokter-chat

use dokter_ai::StopReason;
use thiserror::Error;

/// Result type alias using dokter-chat Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while starting or using a chat session
#[derive(Error, Debug)]
pub enum Error {
    /// No credential was supplied
    #[error("missing Gemini API key")]
    MissingApiKey,

    /// A credential was supplied but cannot be used
    #[error("{0}")]
    InvalidApiKey(String),

    /// The model client could not be constructed
    #[error("{0}")]
    ModelInit(String),

    /// An error from the API layer
    #[error(transparent)]
    Ai(#[from] dokter_ai::Error),

    /// The remote call failed mid-stream
    #[error("{0}")]
    Relay(String),

    /// The prompt was empty
    #[error("prompt is empty")]
    EmptyPrompt,

    /// The model answered without any text
    #[error("model returned no text (finish reason: {0:?})")]
    EmptyReply(StopReason),

    /// The request was aborted by the user
    #[error("request cancelled")]
    Cancelled,
}

/// The three failure kinds a user can see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or unusable credential; startup halts
    Configuration,
    /// Client construction failed; startup halts
    ModelInit,
    /// One message failed; the session stays usable
    Relay,
}

impl Error {
    /// Sort an error into the kind shown to the user
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingApiKey | Error::InvalidApiKey(_) => ErrorKind::Configuration,
            Error::ModelInit(_) => ErrorKind::ModelInit,
            _ => ErrorKind::Relay,
        }
    }

    /// Map a provider construction failure into a startup error
    pub fn from_init(error: dokter_ai::Error) -> Self {
        match error {
            dokter_ai::Error::MissingApiKey => Error::MissingApiKey,
            dokter_ai::Error::InvalidApiKey(reason) => Error::InvalidApiKey(reason),
            other => Error::ModelInit(other.to_string()),
        }
    }
}
