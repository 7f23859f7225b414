//! Google Generative AI (Gemini) API provider

use crate::{
    error::{Error, Result},
    providers::LlmProvider,
    stream::{MessageEvent, MessageEventStream},
    types::{Context, GenerationConfig, Message, Model, StopReason, Usage},
};
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Check that a key can be sent at all, returning it as a header value.
///
/// This does not contact the API; a well-formed but revoked key only fails
/// on the first request.
pub fn validate_api_key(api_key: &str) -> Result<HeaderValue> {
    let trimmed = api_key.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidApiKey("key is empty".into()));
    }
    let mut value = HeaderValue::from_str(trimmed)
        .map_err(|_| Error::InvalidApiKey("key contains characters not allowed in a header".into()))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Google Generative AI client
pub struct GoogleProvider {
    client: reqwest::Client,
    api_key: HeaderValue,
}

impl std::fmt::Debug for GoogleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleProvider").finish_non_exhaustive()
    }
}

impl GoogleProvider {
    /// Create a new Google provider with an API key
    pub fn new(api_key: &str) -> Result<Self> {
        let api_key = validate_api_key(api_key)?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("dokter/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, api_key })
    }

    /// List available models from Google
    pub async fn list_models(&self, base_url: &str) -> Result<Vec<GoogleModelInfo>> {
        let url = format!("{}/models", base_url);

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, self.api_key.clone())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::from_response(status.as_u16(), &text));
        }

        let list: GoogleModelList = response.json().await?;

        // Only models that can hold a conversation
        Ok(list
            .models
            .into_iter()
            .filter(|m| {
                m.supported_generation_methods
                    .iter()
                    .any(|method| method == "generateContent")
            })
            .collect())
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(API_KEY_HEADER, self.api_key.clone());
        headers
    }
}

#[async_trait]
impl LlmProvider for GoogleProvider {
    async fn stream(
        &self,
        model: &Model,
        context: &Context,
        config: &GenerationConfig,
    ) -> Result<MessageEventStream> {
        let request = build_request(context, config)?;
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            model.base_url, model.id
        );

        tracing::debug!(
            model = %model.id,
            contents = request.contents.len(),
            "sending streamGenerateContent"
        );

        let request_builder = self
            .client
            .post(&url)
            .headers(self.headers())
            .json(&request);

        let event_source = EventSource::new(request_builder)
            .map_err(|e| Error::Sse(format!("Failed to create event source: {}", e)))?;

        Ok(Box::pin(create_stream(event_source, model.id.clone())))
    }
}

fn build_request(context: &Context, config: &GenerationConfig) -> Result<GeminiRequest> {
    if context.messages.last().is_none_or(|m| !m.is_user()) {
        return Err(Error::InvalidConfig(
            "request must end with a user message".into(),
        ));
    }

    let contents = context
        .messages
        .iter()
        .map(|msg| GeminiContent {
            role: msg.role.as_str(),
            parts: vec![GeminiPart {
                text: msg.text.clone(),
            }],
        })
        .collect();

    Ok(GeminiRequest {
        contents,
        generation_config: GeminiGenerationConfig {
            max_output_tokens: config.max_output_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
        },
    })
}

/// Folds SSE chunks into the reply, independent of the transport.
#[derive(Debug, Default)]
struct ChunkFolder {
    text: String,
    finish_reason: Option<String>,
    block_reason: Option<String>,
    usage: Usage,
}

impl ChunkFolder {
    /// Apply one `data:` payload. Returns the text deltas it carried.
    fn apply(&mut self, data: &str) -> Result<Vec<String>> {
        // Every response field is optional, so the error envelope goes first
        if let Ok(error_response) = serde_json::from_str::<GeminiErrorResponse>(data) {
            return Err(Error::api(
                error_response.error.status.unwrap_or_default(),
                error_response.error.message,
            ));
        }

        let response: GeminiStreamResponse = serde_json::from_str(data)
            .map_err(|e| Error::UnexpectedResponse(format!("Failed to parse chunk: {}", e)))?;

        let mut deltas = Vec::new();
        for candidate in &response.candidates {
            if let Some(ref content) = candidate.content {
                for part in &content.parts {
                    if let Some(ref text) = part.text {
                        if !text.is_empty() {
                            self.text.push_str(text);
                            deltas.push(text.clone());
                        }
                    }
                }
            }
            if let Some(ref reason) = candidate.finish_reason {
                self.finish_reason = Some(reason.clone());
            }
        }

        if let Some(feedback) = response.prompt_feedback {
            if let Some(reason) = feedback.block_reason {
                self.block_reason = Some(reason);
            }
        }

        if let Some(usage) = response.usage_metadata {
            self.usage = Usage {
                input: usage.prompt_token_count.unwrap_or(0),
                output: usage.candidates_token_count.unwrap_or(0),
            };
        }

        Ok(deltas)
    }

    fn stop_reason(&self) -> StopReason {
        if self.block_reason.is_some() {
            return StopReason::Safety;
        }
        self.finish_reason
            .as_deref()
            .map(StopReason::from_finish_reason)
            .unwrap_or(StopReason::Stop)
    }

    fn finish(self) -> MessageEvent {
        let stop_reason = self.stop_reason();
        MessageEvent::Done {
            message: Message::model(self.text),
            stop_reason,
            usage: self.usage,
        }
    }
}

async fn describe_stream_error(error: reqwest_eventsource::Error) -> Error {
    match error {
        reqwest_eventsource::Error::InvalidStatusCode(status, response) => {
            let body = response.text().await.unwrap_or_default();
            Error::from_response(status.as_u16(), &body)
        }
        reqwest_eventsource::Error::Transport(e) => Error::Http(e),
        other => Error::Sse(other.to_string()),
    }
}

fn create_stream(
    mut event_source: EventSource,
    model_id: String,
) -> impl futures::Stream<Item = MessageEvent> {
    stream! {
        let mut folder = ChunkFolder::default();

        yield MessageEvent::Start { model: model_id.clone() };

        while let Some(event) = event_source.next().await {
            match event {
                Ok(Event::Open) => {}
                Ok(Event::Message(msg)) => {
                    if msg.data.is_empty() || msg.data == "[DONE]" {
                        continue;
                    }
                    match folder.apply(&msg.data) {
                        Ok(deltas) => {
                            for delta in deltas {
                                yield MessageEvent::TextDelta { delta };
                            }
                        }
                        Err(e) => {
                            event_source.close();
                            yield MessageEvent::Error { message: e.to_string() };
                            return;
                        }
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(e) => {
                    // The event source reconnects on its own unless closed
                    event_source.close();
                    let error = describe_stream_error(e).await;
                    tracing::warn!(model = %model_id, "stream failed: {}", error);
                    yield MessageEvent::Error { message: error.to_string() };
                    return;
                }
            }
        }

        event_source.close();
        yield folder.finish();
    }
}

// Request types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<i32>,
}

// Response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiStreamResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

// Model listing types

/// Model info returned from Google API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleModelInfo {
    /// Model name (e.g., "models/gemini-1.5-pro")
    pub name: String,
    /// Display name
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    /// Supported generation methods
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
    #[serde(default)]
    pub input_token_limit: Option<u32>,
    #[serde(default)]
    pub output_token_limit: Option<u32>,
}

impl GoogleModelInfo {
    /// Get the model ID (without "models/" prefix)
    pub fn id(&self) -> &str {
        self.name.strip_prefix("models/").unwrap_or(&self.name)
    }
}

#[derive(Debug, Deserialize)]
struct GoogleModelList {
    #[serde(default)]
    models: Vec<GoogleModelInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn chat_context() -> Context {
        Context::new(vec![
            Message::user("instruksi"),
            Message::model("Baik!"),
            Message::user("demam tinggi"),
        ])
    }

    #[test]
    fn test_validate_api_key() {
        assert!(validate_api_key("AIzaSyExample").is_ok());
        assert!(matches!(validate_api_key("   "), Err(Error::InvalidApiKey(_))));
        assert!(matches!(
            validate_api_key("abc\ndef"),
            Err(Error::InvalidApiKey(_))
        ));
    }

    #[test]
    fn test_build_request_shape() {
        let config = GenerationConfig {
            temperature: Some(0.4),
            max_output_tokens: Some(500),
            ..Default::default()
        };
        let request = build_request(&chat_context(), &config).unwrap();
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["contents"].as_array().unwrap().len(), 3);
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["contents"][2]["parts"][0]["text"], "demam tinggi");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 500);
        let temperature = json["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.4).abs() < 1e-6);
        assert!(json["generationConfig"].get("topK").is_none());
    }

    #[test]
    fn test_build_request_requires_trailing_user() {
        let context = Context::new(vec![Message::user("a"), Message::model("b")]);
        assert!(build_request(&context, &GenerationConfig::default()).is_err());
        assert!(build_request(&Context::default(), &GenerationConfig::default()).is_err());
    }

    #[test]
    fn test_folder_collects_text_and_usage() {
        let mut folder = ChunkFolder::default();
        let first = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Kemungkinan "}]}}]}"#;
        let second = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"demam berdarah."}]},"finishReason":"STOP"}],"usageMetadata":{"promptTokenCount":42,"candidatesTokenCount":7}}"#;

        assert_eq!(folder.apply(first).unwrap(), vec!["Kemungkinan ".to_string()]);
        assert_eq!(folder.apply(second).unwrap().len(), 1);

        match folder.finish() {
            MessageEvent::Done {
                message,
                stop_reason,
                usage,
            } => {
                assert_eq!(message.role, Role::Model);
                assert_eq!(message.text, "Kemungkinan demam berdarah.");
                assert_eq!(stop_reason, StopReason::Stop);
                assert_eq!(usage, Usage { input: 42, output: 7 });
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_folder_max_tokens() {
        let mut folder = ChunkFolder::default();
        folder
            .apply(r#"{"candidates":[{"content":{"parts":[{"text":"..."}]},"finishReason":"MAX_TOKENS"}]}"#)
            .unwrap();
        assert_eq!(folder.stop_reason(), StopReason::Length);
    }

    #[test]
    fn test_folder_prompt_blocked() {
        let mut folder = ChunkFolder::default();
        let deltas = folder
            .apply(r#"{"promptFeedback":{"blockReason":"SAFETY"},"usageMetadata":{"promptTokenCount":12}}"#)
            .unwrap();
        assert!(deltas.is_empty());
        assert_eq!(folder.stop_reason(), StopReason::Safety);
    }

    #[test]
    fn test_folder_error_payload() {
        let mut folder = ChunkFolder::default();
        let err = folder
            .apply(r#"{"error":{"code":503,"message":"The model is overloaded.","status":"UNAVAILABLE"}}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Api { ref status, .. } if status == "UNAVAILABLE"));
    }

    #[test]
    fn test_folder_garbage() {
        let mut folder = ChunkFolder::default();
        assert!(matches!(
            folder.apply("not json"),
            Err(Error::UnexpectedResponse(_))
        ));
    }

    /// Serve canned HTTP responses in order on a local port.
    ///
    /// Returns the base URL and a count of accepted connections.
    async fn serve(responses: Vec<String>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let response = responses
                    .get(n)
                    .cloned()
                    .unwrap_or_else(|| http_response("500 Internal Server Error", "text/plain", "gone"));
                read_request(&mut socket).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (base_url, hits)
    }

    /// Consume headers and body so the client sees a clean exchange
    async fn read_request(socket: &mut TcpStream) {
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let Ok(n) = socket.read(&mut buf).await else { return };
            if n == 0 {
                return;
            }
            data.extend_from_slice(&buf[..n]);

            let text = String::from_utf8_lossy(&data);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())?
                    })
                    .unwrap_or(0);
                if data.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    fn http_response(status: &str, content_type: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\ncontent-type: {}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            content_type,
            body.len(),
            body
        )
    }

    fn sse(chunks: &[&str]) -> String {
        let body: String = chunks.iter().map(|c| format!("data: {}\n\n", c)).collect();
        http_response("200 OK", "text/event-stream", &body)
    }

    async fn stream_from(base_url: String) -> Vec<MessageEvent> {
        let provider = GoogleProvider::new("AIzaSyExample").unwrap();
        let mut model = crate::models::default_model();
        model.base_url = base_url;
        let config = GenerationConfig {
            temperature: Some(0.4),
            max_output_tokens: Some(500),
            ..Default::default()
        };
        provider
            .stream(&model, &chat_context(), &config)
            .await
            .unwrap()
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_stream_assembles_reply() {
        let (base_url, hits) = serve(vec![sse(&[
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Kemungkinan "}]}}]}"#,
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"tifus."}]},"finishReason":"STOP"}],"usageMetadata":{"promptTokenCount":30,"candidatesTokenCount":4}}"#,
        ])])
        .await;

        let events = stream_from(base_url).await;
        assert_eq!(events.len(), 4);
        assert!(matches!(&events[0], MessageEvent::Start { model } if model == "gemini-1.5-flash"));
        assert!(matches!(&events[1], MessageEvent::TextDelta { delta } if delta == "Kemungkinan "));
        match &events[3] {
            MessageEvent::Done {
                message,
                stop_reason,
                usage,
            } => {
                assert_eq!(message.text, "Kemungkinan tifus.");
                assert_eq!(*stop_reason, StopReason::Stop);
                assert_eq!(*usage, Usage { input: 30, output: 4 });
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stream_status_error_does_not_reconnect() {
        let body = r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#;
        let (base_url, hits) = serve(vec![http_response(
            "429 Too Many Requests",
            "application/json",
            body,
        )])
        .await;

        let events = stream_from(base_url).await;
        assert_eq!(events.len(), 2);
        assert!(
            matches!(&events[1], MessageEvent::Error { message } if message.contains("Rate limited: Resource has been exhausted"))
        );

        // The default retry delay is well under this
        tokio::time::sleep(Duration::from_millis(800)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stream_error_payload_ends_stream() {
        let (base_url, hits) = serve(vec![sse(&[
            r#"{"candidates":[{"content":{"parts":[{"text":"Kemung"}]}}]}"#,
            r#"{"error":{"code":503,"message":"The model is overloaded.","status":"UNAVAILABLE"}}"#,
            r#"{"candidates":[{"content":{"parts":[{"text":"kinan"}]}}]}"#,
        ])])
        .await;

        let events = stream_from(base_url).await;
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[2], MessageEvent::Error { message } if message.contains("overloaded")));
        assert!(!events.iter().any(|e| matches!(e, MessageEvent::Done { .. })));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_model_info_id() {
        let info: GoogleModelInfo = serde_json::from_str(
            r#"{"name":"models/gemini-1.5-flash","displayName":"Gemini 1.5 Flash","supportedGenerationMethods":["generateContent","countTokens"]}"#,
        )
        .unwrap();
        assert_eq!(info.id(), "gemini-1.5-flash");
    }
}
