//! Chat session: bootstrap and message relay

use std::sync::Arc;

use dokter_ai::{
    Context, GenerationConfig, Model, StopReason, Usage,
    providers::google::GoogleProvider,
};
use futures::StreamExt;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
    conversation::{Conversation, Turn},
    error::{Error, Result},
    events::ChatEvent,
    handle::SessionHandle,
    transcript::{self, TranscriptEntry},
    transport::{ChatEventStream, ProviderTransport, RelayConfig, Transport},
};

/// Sampling temperature used for every request
pub const TEMPERATURE: f32 = 0.4;
/// Output token cap used for every request
pub const MAX_OUTPUT_TOKENS: u32 = 500;

/// Model and sampling settings a session is bound to
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub model: Model,
    pub generation: GenerationConfig,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::for_model(dokter_ai::models::default_model())
    }
}

impl SessionSettings {
    /// Fixed sampling settings on the given model
    pub fn for_model(model: Model) -> Self {
        Self {
            model,
            generation: GenerationConfig {
                temperature: Some(TEMPERATURE),
                max_output_tokens: Some(MAX_OUTPUT_TOKENS),
                ..Default::default()
            },
        }
    }

    fn validate(&self) -> Result<()> {
        if self.model.id.trim().is_empty() {
            return Err(Error::ModelInit("model id is empty".into()));
        }
        if let Some(t) = self.generation.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(Error::ModelInit(format!(
                    "temperature {} is outside 0.0..=2.0",
                    t
                )));
            }
        }
        if let Some(max) = self.generation.max_output_tokens {
            if max == 0 || max > self.model.max_tokens {
                return Err(Error::ModelInit(format!(
                    "max output tokens {} is outside 1..={} for {}",
                    max, self.model.max_tokens, self.model.id
                )));
            }
        }
        Ok(())
    }
}

/// One user's conversation plus the remote chat handle bound to it.
pub struct ChatSession {
    id: Uuid,
    settings: SessionSettings,
    conversation: Conversation,
    transport: Arc<dyn Transport>,
    event_tx: broadcast::Sender<ChatEvent>,
    handle: SessionHandle,
}

impl ChatSession {
    /// Seed the history and bind a Gemini client to it.
    ///
    /// Fails without constructing anything remote when the key is missing or
    /// unusable, or when the client cannot be built.
    pub fn start(api_key: Option<&str>, settings: SessionSettings) -> Result<Self> {
        let conversation = Conversation::seeded();
        let api_key = api_key.ok_or(Error::MissingApiKey)?;

        settings.validate()?;
        let provider = GoogleProvider::new(api_key).map_err(Error::from_init)?;
        let transport = Arc::new(ProviderTransport::new(Arc::new(provider)));

        let session = Self::assemble(conversation, transport, settings);
        tracing::info!(
            session = %session.id,
            model = %session.settings.model.id,
            "chat session started"
        );
        Ok(session)
    }

    /// Build a session over an arbitrary transport
    pub fn with_transport(transport: Arc<dyn Transport>, settings: SessionSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self::assemble(Conversation::seeded(), transport, settings))
    }

    fn assemble(
        conversation: Conversation,
        transport: Arc<dyn Transport>,
        settings: SessionSettings,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            id: Uuid::new_v4(),
            settings,
            conversation,
            transport,
            event_tx,
            handle: SessionHandle::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn model(&self) -> &Model {
        &self.settings.model
    }

    /// Subscribe to relay events
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.event_tx.subscribe()
    }

    /// Get the current state
    pub fn state(&self) -> &Conversation {
        &self.conversation
    }

    /// All turns, preamble first
    pub fn history(&self) -> &[Turn] {
        self.conversation.turns()
    }

    /// Display entries for every turn
    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        transcript::render(self.conversation.turns())
    }

    pub fn total_usage(&self) -> &Usage {
        &self.conversation.total_usage
    }

    /// Get a cloneable handle for aborting from UI code.
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Abort the current request
    pub fn abort(&self) {
        self.handle.abort();
    }

    fn emit(&self, event: ChatEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Relay one prompt and return the model's reply turn.
    ///
    /// The prompt is appended before the request goes out and stays in the
    /// history whatever happens next. The reply is appended only when the
    /// stream completes with text.
    pub async fn send_message(&mut self, prompt: &str) -> Result<Turn> {
        if prompt.trim().is_empty() {
            return Err(Error::EmptyPrompt);
        }

        let cancel = self.handle.begin();
        let user_turn = Turn::user(prompt);
        self.conversation.push(user_turn.clone());
        self.conversation.is_streaming = true;
        self.conversation.error = None;
        self.emit(ChatEvent::RelayStart { prompt: user_turn });

        let config = RelayConfig {
            model: self.settings.model.clone(),
            generation: self.settings.generation,
        };
        let context = Context::new(self.conversation.request_context());
        tracing::debug!(
            session = %self.id,
            model = %config.model.id,
            turns = context.messages.len(),
            skipped = self.conversation.unanswered().saturating_sub(1),
            "relaying prompt"
        );

        let result = match self.transport.send(context, &config, cancel).await {
            Ok(mut stream) => self.process_stream(&mut stream).await,
            Err(e) => Err(Error::Ai(e)),
        };

        let result = match result {
            Ok((reply, usage)) => {
                self.conversation.total_usage.add(&usage);
                self.conversation.push(reply.clone());
                Ok(reply)
            }
            Err(e) => {
                match &e {
                    Error::Cancelled => {
                        tracing::info!(session = %self.id, "relay cancelled");
                    }
                    other => {
                        tracing::warn!(session = %self.id, "relay failed: {}", other);
                        // Stream errors were already broadcast as they happened
                        if !matches!(other, Error::Relay(_)) {
                            self.emit(ChatEvent::Error {
                                message: other.to_string(),
                            });
                        }
                    }
                }
                self.conversation.error = Some(e.to_string());
                Err(e)
            }
        };

        self.conversation.is_streaming = false;
        self.conversation.partial_reply = None;
        self.handle.finish();
        self.emit(ChatEvent::RelayEnd {
            total_usage: self.conversation.total_usage.clone(),
        });

        result
    }

    /// Forward transport events to subscribers and pick out the outcome.
    async fn process_stream(&mut self, stream: &mut ChatEventStream) -> Result<(Turn, Usage)> {
        let mut outcome: Option<Result<(Turn, Usage)>> = None;

        while let Some(event) = stream.next().await {
            self.emit(event.clone());

            match event {
                ChatEvent::ReplyUpdate { text } => {
                    self.conversation.partial_reply = Some(text);
                }
                ChatEvent::ReplyEnd {
                    message,
                    stop_reason,
                    usage,
                } => {
                    outcome = Some(if message.text.trim().is_empty() {
                        Err(Error::EmptyReply(stop_reason))
                    } else {
                        if stop_reason == StopReason::Length {
                            tracing::debug!(session = %self.id, "reply hit the output token cap");
                        }
                        Ok((message, usage))
                    });
                }
                ChatEvent::Cancelled => outcome = Some(Err(Error::Cancelled)),
                ChatEvent::Error { message } => outcome = Some(Err(Error::Relay(message))),
                _ => {}
            }

            if outcome.is_some() {
                break;
            }
        }

        outcome.unwrap_or_else(|| Err(Error::Relay("stream ended without a reply".into())))
    }
}
