//! thinkstream
//!
//! Streaming chat client that separates a model's `<think>...</think>`
//! reasoning from its answer while the response is still arriving.
//!
//! The pipeline is a single pull loop:
//!
//! ```text
//! transport → lines → envelope → delta → ThinkParser → RenderProjector → observer
//! ```
//!
//! ```rust,ignore
//! use thinkstream::{ChatConfig, ChatRequest, ChatSession, ChatTurn, HtmlRenderer, HttpTransport, NoopObserver};
//!
//! let config = ChatConfig::from_env()?;
//! let transport = HttpTransport::new(&config)?;
//! let mut session = ChatSession::new();
//! session.push_user("Why is the sky blue?");
//!
//! let request = ChatRequest::for_session(&config, &session);
//! let outcome = ChatTurn::new(&HtmlRenderer)
//!     .run(&transport, &request, &mut session, &mut NoopObserver)
//!     .await?;
//! println!("{}", outcome.answer());
//! ```
#![deny(unsafe_code)]

pub mod cancel;
pub mod client;
pub mod config;
pub mod defaults;
pub mod error;
pub mod observer;
pub mod render;
pub mod session;
pub mod streaming;
pub mod telemetry;
pub mod turn;

pub use cancel::CancelHandle;
pub use client::{ChatRequest, ChatTransport, HttpTransport};
pub use config::{ChatConfig, ChatConfigBuilder};
pub use error::{ChatError, Result};
pub use observer::{ChannelObserver, FnObserver, NoopObserver, Throttled, TurnObserver, TurnUpdate};
pub use render::{
    BlockRenderer, BlockView, HtmlRenderer, PlainRenderer, RenderDocument, RenderProjector,
    ThinkBlock,
};
pub use session::{ChatMessage, ChatSession, Role, SessionId};
pub use streaming::{BlockId, ThinkEvent, ThinkParser};
pub use turn::{ChatTurn, TurnFailure, TurnOutcome};
