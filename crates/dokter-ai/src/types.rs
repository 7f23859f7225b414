//! Core types for Gemini conversations

use serde::{Deserialize, Serialize};

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    /// Wire name used by the generative-language API
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// A single conversation message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    #[serde(default)]
    pub timestamp: i64,
}

impl Message {
    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// Create a model message
    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, text)
    }

    fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

/// Model definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    /// Model identifier (e.g., "gemini-1.5-flash")
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Base URL for API calls
    pub base_url: String,
    /// Context window size in tokens
    pub context_window: u32,
    /// Maximum output tokens the model accepts
    pub max_tokens: u32,
}

/// Token usage information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input: u32,
    pub output: u32,
}

impl Usage {
    /// Add another turn's usage to this total
    pub fn add(&mut self, other: &Usage) {
        self.input += other.input;
        self.output += other.output;
    }
}

/// Reason why generation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural end of response
    Stop,
    /// Output token cap reached
    Length,
    /// Blocked by safety filtering
    Safety,
    /// Blocked for recitation
    Recitation,
    /// Anything else the API reports
    Other,
}

impl StopReason {
    /// Map a Gemini `finishReason` string
    pub fn from_finish_reason(reason: &str) -> Self {
        match reason {
            "STOP" => StopReason::Stop,
            "MAX_TOKENS" => StopReason::Length,
            "SAFETY" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => StopReason::Safety,
            "RECITATION" => StopReason::Recitation,
            _ => StopReason::Other,
        }
    }
}

/// Context for a generate request: the full ordered conversation
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub messages: Vec<Message>,
}

impl Context {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

/// Sampling knobs sent with every request
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationConfig {
    /// Temperature (0.0 - 2.0)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_output_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub top_k: Option<i32>,
}
