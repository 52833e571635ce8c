//! Chat transport.
//!
//! [`ChatTransport`] is the seam between the turn runner and the network: it
//! sends a [`ChatRequest`] and hands back the response body as lines.
//! [`HttpTransport`] is the reqwest implementation used in production; tests
//! substitute scripted transports.

use crate::config::ChatConfig;
use crate::error::{ChatError, Result};
use crate::session::{ChatMessage, ChatSession};
use crate::streaming::{LineStream, byte_lines};
use async_trait::async_trait;
use reqwest::header::{ACCEPT_ENCODING, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Instant;

/// Body of a streaming chat request.
///
/// The shape is accepted by Ollama's `/api/chat` and by OpenAI-compatible
/// `/v1/chat/completions` endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    /// Request for the next assistant turn of `session`.
    pub fn for_session(config: &ChatConfig, session: &ChatSession) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            stream: true,
            messages: session.wire_messages(),
        }
    }
}

/// Opens a streamed chat response.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send `request` and return the response body split into lines.
    ///
    /// Errors before the first byte (connection, non-success status) are
    /// returned here; later failures surface as items of the stream.
    async fn open_stream(&self, request: &ChatRequest) -> Result<LineStream>;
}

/// reqwest-based transport posting to the configured chat endpoint.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    api_key: Option<SecretString>,
}

impl HttpTransport {
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.as_str());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(connect_timeout) = config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }
        let client = builder.build().map_err(|e| {
            ChatError::ConfigurationError(format!("Failed to build HTTP client: {e}"))
        })?;

        Ok(Self::with_client(client, config))
    }

    /// Use a preconfigured reqwest client.
    pub fn with_client(client: reqwest::Client, config: &ChatConfig) -> Self {
        Self {
            client,
            url: config.chat_url(),
            api_key: config
                .api_key
                .as_ref()
                .map(|key| SecretString::from(key.expose_secret().to_string())),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn open_stream(&self, request: &ChatRequest) -> Result<LineStream> {
        let started = Instant::now();
        tracing::info!(
            url = %self.url,
            model = %request.model,
            messages = request.messages.len(),
            "Chat stream request started"
        );

        // Streamed bodies must arrive uncompressed, line by line.
        let mut builder = self
            .client
            .post(&self.url)
            .header(ACCEPT_ENCODING, HeaderValue::from_static("identity"))
            .json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ChatError::HttpError(format!("Failed to send request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(
                status_code = status.as_u16(),
                duration_ms = started.elapsed().as_millis() as u64,
                "Chat stream request rejected"
            );
            return Err(ChatError::api_error(status.as_u16(), error_text));
        }

        tracing::debug!(
            status_code = status.as_u16(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Chat stream opened"
        );
        Ok(byte_lines(response.bytes_stream()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_config_and_visible_history() {
        let config = ChatConfig::builder()
            .model("phi3:mini")
            .temperature(0.2)
            .max_tokens(256)
            .build()
            .unwrap();
        let mut session = ChatSession::with_preamble("hidden rules");
        session.push_user("hello");

        let request = ChatRequest::for_session(&config, &session);
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["model"], "phi3:mini");
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["stream"], true);
        assert_eq!(
            body["messages"],
            serde_json::json!([{"role": "user", "content": "hello"}])
        );
    }

    #[test]
    fn transport_targets_chat_url() {
        let config = ChatConfig::builder()
            .base_url("http://127.0.0.1:9")
            .build()
            .unwrap();
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(transport.url(), "http://127.0.0.1:9/api/chat");
    }
}
