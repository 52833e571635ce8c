//! Turn runner.
//!
//! One assistant turn is a single pull loop: each line read from the
//! transport is decoded, parsed into think events, applied to the render
//! document and reported to the observer before the next line is requested.
//! The parser and projector live for exactly one turn; the final rendered
//! string is committed to the session when the stream ends.

use crate::cancel::CancelHandle;
use crate::client::{ChatRequest, ChatTransport};
use crate::error::ChatError;
use crate::observer::TurnObserver;
use crate::render::{BlockRenderer, RenderDocument, RenderProjector, ThinkBlock};
use crate::session::ChatSession;
use crate::streaming::{ThinkParser, delta_stream};
use futures_util::StreamExt;
use tokio::time::Instant;
use tracing::Instrument;

/// Result of a completed (or cancelled) turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Final rendered form, as committed to the session
    pub content: String,
    pub document: RenderDocument,
    /// Number of non-empty deltas received
    pub deltas: usize,
    pub cancelled: bool,
}

impl TurnOutcome {
    /// Answer text outside reasoning blocks.
    pub fn answer(&self) -> &str {
        self.document.tail()
    }

    pub fn blocks(&self) -> &[ThinkBlock] {
        self.document.blocks()
    }
}

/// A turn that ended with a transport error.
///
/// Output received before the failure stays rendered and committed; it is
/// returned as `partial`.
#[derive(Debug, thiserror::Error)]
#[error("chat turn failed: {error}")]
pub struct TurnFailure {
    #[source]
    pub error: ChatError,
    pub partial: Option<String>,
}

/// Drives one assistant turn.
pub struct ChatTurn<'r> {
    renderer: &'r dyn BlockRenderer,
    cancel: CancelHandle,
}

impl<'r> ChatTurn<'r> {
    /// `renderer` produces the string committed to history.
    pub fn new(renderer: &'r dyn BlockRenderer) -> Self {
        Self {
            renderer,
            cancel: CancelHandle::new(),
        }
    }

    /// Stop the turn early when `handle` is cancelled.
    pub fn with_cancel(mut self, handle: CancelHandle) -> Self {
        self.cancel = handle;
        self
    }

    /// Stream the reply to `request` and commit it to `session`.
    ///
    /// Cancellation ends the turn like a normal end of stream. A transport
    /// error is terminal for this turn only and is not retried.
    pub async fn run<T, O>(
        &self,
        transport: &T,
        request: &ChatRequest,
        session: &mut ChatSession,
        observer: &mut O,
    ) -> Result<TurnOutcome, TurnFailure>
    where
        T: ChatTransport + ?Sized,
        O: TurnObserver + ?Sized,
    {
        let span = tracing::info_span!(
            "chat_turn",
            session_id = %session.id(),
            model = %request.model
        );
        self.run_inner(transport, request, session, observer)
            .instrument(span)
            .await
    }

    async fn run_inner<T, O>(
        &self,
        transport: &T,
        request: &ChatRequest,
        session: &mut ChatSession,
        observer: &mut O,
    ) -> Result<TurnOutcome, TurnFailure>
    where
        T: ChatTransport + ?Sized,
        O: TurnObserver + ?Sized,
    {
        let mut parser = ThinkParser::new();
        let mut projector = RenderProjector::new();

        let lines = match transport.open_stream(request).await {
            Ok(lines) => lines,
            Err(error) => {
                tracing::error!(error = %error, "Failed to open chat stream");
                observer.on_error(&error, projector.document());
                return Err(TurnFailure {
                    error,
                    partial: None,
                });
            }
        };

        let mut deltas = delta_stream(lines);
        let mut received = 0usize;
        let mut cancelled = false;

        let failure = loop {
            let tick = observer.next_tick();
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    cancelled = true;
                    break None;
                }
                next = deltas.next() => next,
                _ = tokio::time::sleep_until(tick.unwrap_or_else(Instant::now)), if tick.is_some() => {
                    observer.on_tick(projector.document());
                    continue;
                }
            };

            match next {
                Some(Ok(delta)) => {
                    received += 1;
                    let events = parser.process(&delta);
                    if projector.apply_all(&events) {
                        observer.on_events(&events, projector.document());
                    }
                }
                Some(Err(error)) => break Some(error),
                None => break None,
            }
        };
        drop(deltas);

        let trailing = parser.finish();
        if projector.apply_all(&trailing) {
            observer.on_events(&trailing, projector.document());
        }
        // on_finish and on_error get the document with every block closed.
        projector.close_all();
        let content = projector.finalize(self.renderer);

        match failure {
            None => {
                tracing::info!(
                    deltas = received,
                    blocks = projector.document().blocks().len(),
                    cancelled,
                    "Chat turn finished"
                );
                observer.on_finish(projector.document());
                // A turn stopped before any output leaves no trace in history.
                if !(cancelled && projector.document().is_empty()) {
                    session.commit_assistant(content.clone());
                }
                Ok(TurnOutcome {
                    content,
                    document: projector.into_document(),
                    deltas: received,
                    cancelled,
                })
            }
            Some(error) => {
                tracing::warn!(error = %error, deltas = received, "Chat stream failed");
                observer.on_error(&error, projector.document());
                let partial = if projector.document().is_empty() {
                    None
                } else {
                    session.commit_assistant(content.clone());
                    Some(content)
                };
                Err(TurnFailure { error, partial })
            }
        }
    }
}
