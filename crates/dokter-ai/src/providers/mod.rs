//! LLM provider implementations

pub mod google;

use crate::{Context, Error, GenerationConfig, MessageEventStream, Model, Result};
use async_trait::async_trait;

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Stream a reply to the last message in `context`
    async fn stream(
        &self,
        model: &Model,
        context: &Context,
        config: &GenerationConfig,
    ) -> Result<MessageEventStream>;
}

/// Environment variables checked for a Gemini key, in order
pub const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Get an API key from a provided value or the environment
pub fn get_api_key(provided: Option<&str>) -> Result<String> {
    if let Some(key) = provided {
        return Ok(key.to_string());
    }

    API_KEY_ENV_VARS
        .iter()
        .find_map(|var| std::env::var(var).ok())
        .ok_or(Error::MissingApiKey)
}
