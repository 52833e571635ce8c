//! Chat configuration.
//!
//! `ChatConfig` describes where the chat endpoint lives and the sampling
//! parameters sent with every turn. Build it with [`ChatConfig::builder`] or
//! load it from `THINKSTREAM_*` environment variables with
//! [`ChatConfig::from_env`].

use crate::defaults;
use crate::error::{ChatError, Result};
use secrecy::SecretString;
use std::time::Duration;

/// Endpoint, sampling and HTTP settings for a chat session.
#[derive(Debug)]
pub struct ChatConfig {
    /// Server root, e.g. `http://localhost:11434`
    pub base_url: String,
    /// Path of the streaming chat endpoint
    pub chat_path: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Sent as `Authorization: Bearer <key>` when present
    pub api_key: Option<SecretString>,
    /// Total request deadline. `None` lets a stalled stream block indefinitely.
    pub timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::chat::BASE_URL.to_string(),
            chat_path: defaults::chat::CHAT_PATH.to_string(),
            model: defaults::chat::MODEL.to_string(),
            temperature: defaults::chat::TEMPERATURE,
            max_tokens: defaults::chat::MAX_TOKENS,
            api_key: None,
            timeout: None,
            connect_timeout: Some(defaults::http::CONNECT_TIMEOUT),
            user_agent: defaults::http::USER_AGENT.to_string(),
        }
    }
}

impl ChatConfig {
    /// Returns a builder for constructing `ChatConfig`
    pub fn builder() -> ChatConfigBuilder {
        ChatConfigBuilder::new()
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Unset or blank keys fall back to the defaults; malformed numbers are
    /// reported as `ConfigurationError`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut builder = Self::builder();

        if let Some(v) = get(defaults::env::BASE_URL) {
            builder = builder.base_url(v);
        }
        if let Some(v) = get(defaults::env::CHAT_PATH) {
            builder = builder.chat_path(v);
        }
        if let Some(v) = get(defaults::env::MODEL) {
            builder = builder.model(v);
        }
        if let Some(v) = get(defaults::env::TEMPERATURE) {
            builder = builder.temperature(parse_env(defaults::env::TEMPERATURE, &v)?);
        }
        if let Some(v) = get(defaults::env::MAX_TOKENS) {
            builder = builder.max_tokens(parse_env(defaults::env::MAX_TOKENS, &v)?);
        }
        if let Some(v) = get(defaults::env::API_KEY) {
            builder = builder.api_key(v);
        }
        if let Some(v) = get(defaults::env::TIMEOUT_SECS) {
            let secs: u64 = parse_env(defaults::env::TIMEOUT_SECS, &v)?;
            builder = builder.timeout(Some(Duration::from_secs(secs)));
        }

        builder.build()
    }

    /// Full URL of the chat endpoint.
    pub fn chat_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if self.chat_path.starts_with('/') {
            format!("{base}{}", self.chat_path)
        } else {
            format!("{base}/{}", self.chat_path)
        }
    }

    /// Check ranges and required fields.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(ChatError::ConfigurationError(
                "base_url must not be empty".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(ChatError::ConfigurationError(
                "model must not be empty".to_string(),
            ));
        }
        if !defaults::chat::TEMPERATURE_RANGE.contains(&self.temperature) {
            return Err(ChatError::ConfigurationError(format!(
                "temperature must be between {} and {}, got {}",
                defaults::chat::TEMPERATURE_RANGE.start(),
                defaults::chat::TEMPERATURE_RANGE.end(),
                self.temperature
            )));
        }
        if !defaults::chat::MAX_TOKENS_RANGE.contains(&self.max_tokens) {
            return Err(ChatError::ConfigurationError(format!(
                "max_tokens must be between {} and {}, got {}",
                defaults::chat::MAX_TOKENS_RANGE.start(),
                defaults::chat::MAX_TOKENS_RANGE.end(),
                self.max_tokens
            )));
        }
        Ok(())
    }
}

fn parse_env<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| ChatError::ConfigurationError(format!("invalid {key}={raw:?}: {e}")))
}

/// Builder for `ChatConfig`
#[derive(Debug, Default)]
pub struct ChatConfigBuilder {
    base_url: Option<String>,
    chat_path: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    api_key: Option<SecretString>,
    timeout: Option<Duration>,
    connect_timeout: Option<Option<Duration>>,
    user_agent: Option<String>,
}

impl ChatConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
    pub fn chat_path(mut self, chat_path: impl Into<String>) -> Self {
        self.chat_path = Some(chat_path.into());
        self
    }
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
    pub fn connect_timeout(mut self, connect_timeout: Option<Duration>) -> Self {
        self.connect_timeout = Some(connect_timeout);
        self
    }
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<ChatConfig> {
        let fallback = ChatConfig::default();
        let config = ChatConfig {
            base_url: self.base_url.unwrap_or(fallback.base_url),
            chat_path: self.chat_path.unwrap_or(fallback.chat_path),
            model: self.model.unwrap_or(fallback.model),
            temperature: self.temperature.unwrap_or(fallback.temperature),
            max_tokens: self.max_tokens.unwrap_or(fallback.max_tokens),
            api_key: self.api_key,
            timeout: self.timeout,
            connect_timeout: self.connect_timeout.unwrap_or(fallback.connect_timeout),
            user_agent: self.user_agent.unwrap_or(fallback.user_agent),
        };
        config.validate()?;
        Ok(config)
    }
}
