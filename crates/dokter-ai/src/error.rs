//! Error types for dokter-ai

use thiserror::Error;

/// Result type alias using dokter-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the Gemini API
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error response
    #[error("API error: {message} (status: {status})")]
    Api { status: String, message: String },

    /// Rate limit exceeded
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication failed (rejected key, missing permission)
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Missing API key
    #[error("Missing API key")]
    MissingApiKey,

    /// API key present but unusable
    #[error("Invalid API key: {0}")]
    InvalidApiKey(String),

    /// Server-sent events error
    #[error("SSE error: {0}")]
    Sse(String),

    /// Unexpected response format
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create an API error from a status string and message
    pub fn api(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            status: status.into(),
            message: message.into(),
        }
    }

    /// Classify a non-success HTTP response body.
    ///
    /// Gemini wraps failures as `{"error": {"code", "message", "status"}}`;
    /// anything else is kept verbatim.
    pub fn from_response(code: u16, body: &str) -> Self {
        let (status, message) = match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => (
                envelope.error.status.unwrap_or_else(|| code.to_string()),
                envelope.error.message,
            ),
            Err(_) => (code.to_string(), body.trim().to_string()),
        };

        match code {
            429 => Error::RateLimited(message),
            401 | 403 => Error::Auth(message),
            // Gemini answers a malformed key with 400 INVALID_ARGUMENT
            400 if message.to_lowercase().contains("api key") => Error::Auth(message),
            _ => Error::Api { status, message },
        }
    }
}

#[derive(serde::Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_response_decodes_envelope() {
        let body = r#"{"error":{"code":500,"message":"Internal error encountered.","status":"INTERNAL"}}"#;
        match Error::from_response(500, body) {
            Error::Api { status, message } => {
                assert_eq!(status, "INTERNAL");
                assert_eq!(message, "Internal error encountered.");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_from_response_rate_limited() {
        let body = r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#;
        assert!(matches!(
            Error::from_response(429, body),
            Error::RateLimited(m) if m == "Resource has been exhausted"
        ));
    }

    #[test]
    fn test_from_response_bad_key() {
        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#;
        assert!(matches!(Error::from_response(400, body), Error::Auth(_)));
    }

    #[test]
    fn test_from_response_plain_body() {
        match Error::from_response(502, "  Bad Gateway\n") {
            Error::Api { status, message } => {
                assert_eq!(status, "502");
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_display_never_mentions_key_value() {
        let e = Error::InvalidApiKey("contains a newline".into());
        assert_eq!(e.to_string(), "Invalid API key: contains a newline");
    }
}
