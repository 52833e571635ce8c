//! Turn observers.
//!
//! The turn runner reports every non-empty event batch to a [`TurnObserver`]
//! instead of drawing anything itself. Observers decide how and how often to
//! render: directly in a callback, over a channel to another task, or
//! coalesced with [`Throttled`].

use crate::error::ChatError;
use crate::render::{BlockRenderer, RenderDocument};
use crate::streaming::ThinkEvent;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Receives progress of one chat turn.
///
/// All methods default to doing nothing.
pub trait TurnObserver: Send {
    /// A delta produced `events`; `document` already includes them.
    fn on_events(&mut self, events: &[ThinkEvent], document: &RenderDocument) {
        let _ = (events, document);
    }

    /// The stream ended normally or was cancelled.
    fn on_finish(&mut self, document: &RenderDocument) {
        let _ = document;
    }

    /// The transport failed. `document` holds whatever was received.
    fn on_error(&mut self, error: &ChatError, document: &RenderDocument) {
        let _ = (error, document);
    }

    /// When the observer next wants [`on_tick`](Self::on_tick) called, even
    /// if no new output arrives.
    fn next_tick(&self) -> Option<Instant> {
        None
    }

    /// The deadline from [`next_tick`](Self::next_tick) passed.
    fn on_tick(&mut self, document: &RenderDocument) {
        let _ = document;
    }
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl TurnObserver for NoopObserver {}

/// Observer backed by a closure over each event batch.
pub struct FnObserver<F>(pub F);

impl<F> TurnObserver for FnObserver<F>
where
    F: FnMut(&[ThinkEvent], &RenderDocument) + Send,
{
    fn on_events(&mut self, events: &[ThinkEvent], document: &RenderDocument) {
        (self.0)(events, document)
    }
}

/// Update delivered by [`ChannelObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnUpdate {
    /// New events plus the live display after applying them
    Progress {
        events: Vec<ThinkEvent>,
        display: String,
    },
    /// Final display with every block closed
    Finished { display: String },
    /// Transport failure message; `display` is the partial final render
    Failed { message: String, display: String },
}

/// Forwards rendered updates to a channel, decoupling the UI from the turn.
pub struct ChannelObserver<R> {
    tx: mpsc::UnboundedSender<TurnUpdate>,
    renderer: R,
}

impl<R: BlockRenderer> ChannelObserver<R> {
    pub fn new(renderer: R) -> (Self, mpsc::UnboundedReceiver<TurnUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, renderer }, rx)
    }

    fn send(&self, update: TurnUpdate) {
        if self.tx.send(update).is_err() {
            tracing::trace!("turn update receiver dropped");
        }
    }
}

impl<R: BlockRenderer> TurnObserver for ChannelObserver<R> {
    fn on_events(&mut self, events: &[ThinkEvent], document: &RenderDocument) {
        self.send(TurnUpdate::Progress {
            events: events.to_vec(),
            display: document.display(&self.renderer),
        });
    }

    fn on_finish(&mut self, document: &RenderDocument) {
        self.send(TurnUpdate::Finished {
            display: document.finalize(&self.renderer),
        });
    }

    fn on_error(&mut self, error: &ChatError, document: &RenderDocument) {
        self.send(TurnUpdate::Failed {
            message: error.to_string(),
            display: document.finalize(&self.renderer),
        });
    }
}

/// Coalesces event batches so the inner observer runs at most once per
/// `interval`.
///
/// The first batch is forwarded immediately. Held-back events are delivered
/// once the interval has passed, even while the stream is stalled, and always
/// before `on_finish` and `on_error`.
pub struct Throttled<O> {
    inner: O,
    interval: Duration,
    last_flush: Option<Instant>,
    pending: Vec<ThinkEvent>,
}

impl<O: TurnObserver> Throttled<O> {
    pub fn new(inner: O, interval: Duration) -> Self {
        Self {
            inner,
            interval,
            last_flush: None,
            pending: Vec::new(),
        }
    }

    pub fn into_inner(self) -> O {
        self.inner
    }

    fn flush(&mut self, document: &RenderDocument) {
        if self.pending.is_empty() {
            return;
        }
        let events = std::mem::take(&mut self.pending);
        self.inner.on_events(&events, document);
        self.last_flush = Some(Instant::now());
    }

    /// When held-back events become due, if there are any.
    fn flush_due(&self) -> Option<Instant> {
        if self.pending.is_empty() {
            return None;
        }
        Some(self.last_flush.map_or_else(Instant::now, |at| at + self.interval))
    }
}

impl<O: TurnObserver> TurnObserver for Throttled<O> {
    fn on_events(&mut self, events: &[ThinkEvent], document: &RenderDocument) {
        self.pending.extend_from_slice(events);
        let due = self
            .last_flush
            .is_none_or(|at| at.elapsed() >= self.interval);
        if due {
            self.flush(document);
        }
    }

    fn on_finish(&mut self, document: &RenderDocument) {
        self.flush(document);
        self.inner.on_finish(document);
    }

    fn on_error(&mut self, error: &ChatError, document: &RenderDocument) {
        self.flush(document);
        self.inner.on_error(error, document);
    }

    fn next_tick(&self) -> Option<Instant> {
        match (self.flush_due(), self.inner.next_tick()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn on_tick(&mut self, document: &RenderDocument) {
        if self.flush_due().is_some_and(|at| at <= Instant::now()) {
            self.flush(document);
        }
        self.inner.on_tick(document);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{PlainRenderer, RenderProjector};
    use crate::streaming::ThinkParser;

    #[derive(Default)]
    struct Recorder {
        batches: Vec<Vec<ThinkEvent>>,
        finished: bool,
        errors: Vec<String>,
    }

    impl TurnObserver for Recorder {
        fn on_events(&mut self, events: &[ThinkEvent], _document: &RenderDocument) {
            self.batches.push(events.to_vec());
        }
        fn on_finish(&mut self, _document: &RenderDocument) {
            self.finished = true;
        }
        fn on_error(&mut self, error: &ChatError, _document: &RenderDocument) {
            self.errors.push(error.to_string());
        }
    }

    fn step(
        parser: &mut ThinkParser,
        projector: &mut RenderProjector,
        observer: &mut impl TurnObserver,
        delta: &str,
    ) {
        let events = parser.process(delta);
        if projector.apply_all(&events) {
            observer.on_events(&events, projector.document());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn throttled_coalesces_until_interval_elapses() {
        let mut parser = ThinkParser::new();
        let mut projector = RenderProjector::new();
        let mut observer = Throttled::new(Recorder::default(), Duration::from_millis(100));

        step(&mut parser, &mut projector, &mut observer, "a");
        step(&mut parser, &mut projector, &mut observer, "b");
        step(&mut parser, &mut projector, &mut observer, "c");
        assert_eq!(observer.inner.batches.len(), 1);

        tokio::time::advance(Duration::from_millis(150)).await;
        step(&mut parser, &mut projector, &mut observer, "d");

        let recorder = &observer.inner;
        assert_eq!(recorder.batches.len(), 2);
        assert_eq!(
            recorder.batches[1],
            vec![
                ThinkEvent::Text("b".into()),
                ThinkEvent::Text("c".into()),
                ThinkEvent::Text("d".into()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn throttled_flushes_before_finish_and_error() {
        let mut parser = ThinkParser::new();
        let mut projector = RenderProjector::new();
        let mut observer = Throttled::new(Recorder::default(), Duration::from_secs(60));

        step(&mut parser, &mut projector, &mut observer, "first");
        step(&mut parser, &mut projector, &mut observer, "second");
        observer.on_finish(projector.document());
        assert_eq!(observer.inner.batches.len(), 2);
        assert!(observer.inner.finished);

        step(&mut parser, &mut projector, &mut observer, "third");
        observer.on_error(
            &ChatError::StreamError("reset".into()),
            projector.document(),
        );
        let recorder = observer.into_inner();
        assert_eq!(recorder.batches.len(), 3);
        assert_eq!(recorder.errors, vec!["Stream error: reset".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn throttled_tick_delivers_pending_events_without_new_input() {
        let mut parser = ThinkParser::new();
        let mut projector = RenderProjector::new();
        let mut observer = Throttled::new(Recorder::default(), Duration::from_millis(100));
        assert_eq!(observer.next_tick(), None);

        step(&mut parser, &mut projector, &mut observer, "a");
        step(&mut parser, &mut projector, &mut observer, "b");
        let deadline = observer.next_tick().unwrap();
        assert_eq!(deadline, Instant::now() + Duration::from_millis(100));

        // Not due yet: nothing moves.
        observer.on_tick(projector.document());
        assert_eq!(observer.inner.batches.len(), 1);

        tokio::time::advance(Duration::from_secs(30)).await;
        observer.on_tick(projector.document());

        assert_eq!(observer.inner.batches.len(), 2);
        assert_eq!(observer.inner.batches[1], vec![ThinkEvent::Text("b".into())]);
        assert_eq!(observer.next_tick(), None);
    }

    #[tokio::test]
    async fn channel_observer_sends_rendered_updates() {
        let (mut observer, mut rx) = ChannelObserver::new(PlainRenderer);
        let mut parser = ThinkParser::new();
        let mut projector = RenderProjector::new();

        step(&mut parser, &mut projector, &mut observer, "<think>hm");
        observer.on_finish(projector.document());

        match rx.recv().await.unwrap() {
            TurnUpdate::Progress { events, display } => {
                assert_eq!(events.len(), 2);
                assert_eq!(display, "[thinking]\nhm▌\n[/thinking]\n▌");
            }
            other => panic!("unexpected update: {other:?}"),
        }
        assert_eq!(
            rx.recv().await.unwrap(),
            TurnUpdate::Finished {
                display: "[thinking]\nhm\n[/thinking]\n".into()
            }
        );
    }

    #[test]
    fn channel_observer_tolerates_dropped_receiver() {
        let (mut observer, rx) = ChannelObserver::new(PlainRenderer);
        drop(rx);
        observer.on_finish(&RenderDocument::default());
    }

    #[test]
    fn fn_observer_sees_each_batch() {
        let mut seen = 0usize;
        {
            let mut observer = FnObserver(|events: &[ThinkEvent], _: &RenderDocument| {
                seen += events.len();
            });
            observer.on_events(&[ThinkEvent::Text("x".into())], &RenderDocument::default());
            observer.on_finish(&RenderDocument::default());
        }
        assert_eq!(seen, 1);
    }
}
