//! Transport abstraction between a session and the model

use std::{pin::Pin, sync::Arc};

use async_stream::stream;
use async_trait::async_trait;
use dokter_ai::{
    Context, GenerationConfig, Model, Result,
    providers::LlmProvider,
    stream::{MessageBuilder, MessageEvent},
};
use futures::StreamExt;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;

use crate::events::ChatEvent;

/// Everything a transport needs besides the turns themselves
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub model: Model,
    pub generation: GenerationConfig,
}

/// A stream of chat events
pub type ChatEventStream = Pin<Box<dyn Stream<Item = ChatEvent> + Send>>;

/// Sends one request and streams the reply back as chat events.
///
/// The stream ends with exactly one of `ReplyEnd`, `Cancelled` or `Error`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        context: Context,
        config: &RelayConfig,
        cancel: CancellationToken,
    ) -> Result<ChatEventStream>;
}

/// Direct provider transport - calls the model API, no retries
pub struct ProviderTransport {
    provider: Arc<dyn LlmProvider>,
}

impl ProviderTransport {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Transport for ProviderTransport {
    async fn send(
        &self,
        context: Context,
        config: &RelayConfig,
        cancel: CancellationToken,
    ) -> Result<ChatEventStream> {
        let mut message_stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Ok(Box::pin(futures::stream::once(async { ChatEvent::Cancelled })));
            }
            s = self.provider.stream(&config.model, &context, &config.generation) => s?,
        };

        let event_stream: ChatEventStream = Box::pin(stream! {
            let mut builder = MessageBuilder::new();

            loop {
                // Dropping the provider stream drops the HTTP request with it
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    event = message_stream.next() => Some(event),
                };

                let event = match next {
                    None => {
                        yield ChatEvent::Cancelled;
                        return;
                    }
                    Some(None) => {
                        yield ChatEvent::Error {
                            message: "stream ended without a reply".to_string(),
                        };
                        return;
                    }
                    Some(Some(event)) => event,
                };

                builder.process_event(&event);

                match event {
                    MessageEvent::Start { .. } => {
                        yield ChatEvent::ReplyStart;
                    }
                    MessageEvent::TextDelta { .. } => {
                        yield ChatEvent::ReplyUpdate {
                            text: builder.current_text().to_string(),
                        };
                    }
                    MessageEvent::Done { message, stop_reason, usage } => {
                        yield ChatEvent::ReplyEnd { message, stop_reason, usage };
                        return;
                    }
                    MessageEvent::Error { message } => {
                        yield ChatEvent::Error { message };
                        return;
                    }
                }
            }
        });

        Ok(event_stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dokter_ai::{Message, MessageEventStream, StopReason, Usage};

    /// Replays a fixed list of provider events
    struct ScriptedProvider {
        events: Vec<MessageEvent>,
        hang_after: bool,
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn stream(
            &self,
            _model: &Model,
            _context: &Context,
            _config: &GenerationConfig,
        ) -> Result<MessageEventStream> {
            let events = self.events.clone();
            let hang_after = self.hang_after;
            Ok(Box::pin(stream! {
                for event in events {
                    yield event;
                }
                if hang_after {
                    futures::future::pending::<()>().await;
                }
            }))
        }
    }

    fn relay_config() -> RelayConfig {
        RelayConfig {
            model: dokter_ai::models::default_model(),
            generation: GenerationConfig::default(),
        }
    }

    async fn collect(transport: &ProviderTransport, cancel: CancellationToken) -> Vec<ChatEvent> {
        let stream = transport
            .send(
                Context::new(vec![Message::user("demam")]),
                &relay_config(),
                cancel,
            )
            .await
            .unwrap();
        stream.collect().await
    }

    #[tokio::test]
    async fn test_translates_provider_events() {
        let transport = ProviderTransport::new(Arc::new(ScriptedProvider {
            events: vec![
                MessageEvent::Start { model: "m".into() },
                MessageEvent::TextDelta { delta: "Demam ".into() },
                MessageEvent::TextDelta { delta: "berdarah".into() },
                MessageEvent::Done {
                    message: Message::model("Demam berdarah"),
                    stop_reason: StopReason::Stop,
                    usage: Usage { input: 3, output: 2 },
                },
            ],
            hang_after: false,
        }));

        let events = collect(&transport, CancellationToken::new()).await;
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], ChatEvent::ReplyStart));
        assert!(matches!(&events[2], ChatEvent::ReplyUpdate { text } if text == "Demam berdarah"));
        assert!(matches!(&events[3], ChatEvent::ReplyEnd { message, .. } if message.text == "Demam berdarah"));
    }

    #[tokio::test]
    async fn test_truncated_stream_is_an_error() {
        let transport = ProviderTransport::new(Arc::new(ScriptedProvider {
            events: vec![MessageEvent::TextDelta { delta: "par".into() }],
            hang_after: false,
        }));

        let events = collect(&transport, CancellationToken::new()).await;
        assert!(matches!(events.last(), Some(ChatEvent::Error { .. })));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pending_stream() {
        let transport = ProviderTransport::new(Arc::new(ScriptedProvider {
            events: vec![MessageEvent::Start { model: "m".into() }],
            hang_after: true,
        }));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        let mut stream = transport
            .send(Context::new(vec![Message::user("x")]), &relay_config(), cancel)
            .await
            .unwrap();
        assert!(matches!(stream.next().await, Some(ChatEvent::ReplyStart)));

        trigger.cancel();
        assert!(matches!(stream.next().await, Some(ChatEvent::Cancelled)));
        assert!(stream.next().await.is_none());
    }
}
