//! Default values shared by configuration and the CLI.

/// HTTP defaults
pub mod http {
    use std::time::Duration;

    /// Connection timeout. Reads have no default deadline.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    /// User agent sent with every request.
    pub const USER_AGENT: &str = concat!("thinkstream/", env!("CARGO_PKG_VERSION"));
}

/// Chat request defaults
pub mod chat {
    pub const BASE_URL: &str = "http://localhost:11434";
    pub const CHAT_PATH: &str = "/api/chat";
    pub const MODEL: &str = "deepseek-r1:8b";
    pub const TEMPERATURE: f32 = 0.6;
    pub const MAX_TOKENS: u32 = 4096;

    pub const TEMPERATURE_RANGE: std::ops::RangeInclusive<f32> = 0.0..=2.0;
    pub const MAX_TOKENS_RANGE: std::ops::RangeInclusive<u32> = 1..=32767;
}

/// Environment variable names read by `ChatConfig::from_env`.
pub mod env {
    pub const BASE_URL: &str = "THINKSTREAM_BASE_URL";
    pub const CHAT_PATH: &str = "THINKSTREAM_CHAT_PATH";
    pub const MODEL: &str = "THINKSTREAM_MODEL";
    pub const TEMPERATURE: &str = "THINKSTREAM_TEMPERATURE";
    pub const MAX_TOKENS: &str = "THINKSTREAM_MAX_TOKENS";
    pub const API_KEY: &str = "THINKSTREAM_API_KEY";
    pub const TIMEOUT_SECS: &str = "THINKSTREAM_TIMEOUT_SECS";
    pub const LOG_LEVEL: &str = "THINKSTREAM_LOG_LEVEL";
    pub const LOG_FORMAT: &str = "THINKSTREAM_LOG_FORMAT";
    pub const LOG_FILE: &str = "THINKSTREAM_LOG_FILE";
}

/// Instructions the CLI seeds each session with; hidden from the transcript.
pub const PROGRAMMING_PREAMBLE: &str = "You are an AI programming assistant. Follow the user's requirements carefully and to the letter. First, think step-by-step and describe your plan for what to build in pseudocode, written out in great detail. Then, output the code in a single code block. Minimize any other prose.";
