//! Test fixtures: scripted transports and recorded observers for driving chat turns

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use std::sync::Mutex;
use thinkstream::streaming::LineStream;
use thinkstream::{ChatError, ChatRequest, ChatTransport, RenderDocument, ThinkEvent, TurnObserver};

/// Read a file under `tests/fixtures/` and split it into lines, blank ones included.
pub fn load_fixture_lines(name: &str) -> Vec<String> {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    let raw = std::fs::read_to_string(&path).expect("fixture exists");
    raw.replace("\r\n", "\n")
        .split('\n')
        .map(str::to_string)
        .collect()
}

/// Raw response bytes of a fixture, for serving over HTTP.
pub fn load_fixture_bytes(name: &str) -> Vec<u8> {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    std::fs::read(&path).expect("fixture exists")
}

/// Wrap a text delta in an Ollama `/api/chat` line.
pub fn ollama_line(delta: &str) -> String {
    serde_json::json!({"message": {"role": "assistant", "content": delta}, "done": false})
        .to_string()
}

enum Step {
    Line(String),
    Fail(String),
}

/// Transport that replays a fixed script of lines.
#[derive(Default)]
pub struct ScriptedTransport {
    steps: Vec<Step>,
    hang: bool,
    rejection: Option<(u16, String)>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedTransport {
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            steps: lines.into_iter().map(|l| Step::Line(l.into())).collect(),
            ..Self::default()
        }
    }

    /// One Ollama line per delta.
    pub fn ollama(deltas: &[&str]) -> Self {
        Self::lines(deltas.iter().map(|d| ollama_line(d)))
    }

    pub fn fixture(name: &str) -> Self {
        Self::lines(load_fixture_lines(name))
    }

    /// Fail the response body after the scripted lines.
    pub fn then_fail(mut self, message: &str) -> Self {
        self.steps.push(Step::Fail(message.to_string()));
        self
    }

    /// Keep the response open forever after the scripted lines.
    pub fn then_hang(mut self) -> Self {
        self.hang = true;
        self
    }

    /// Refuse to open the stream with the given status.
    pub fn rejecting(code: u16, body: &str) -> Self {
        Self {
            rejection: Some((code, body.to_string())),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn open_stream(&self, request: &ChatRequest) -> thinkstream::Result<LineStream> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some((code, body)) = &self.rejection {
            return Err(ChatError::api_error(*code, body.clone()));
        }

        let items: Vec<Result<Bytes, ChatError>> = self
            .steps
            .iter()
            .map(|step| match step {
                Step::Line(line) => Ok(Bytes::from(line.clone())),
                Step::Fail(message) => Err(ChatError::StreamError(message.clone())),
            })
            .collect();

        let head = stream::iter(items);
        if self.hang {
            Ok(Box::pin(head.chain(stream::pending())))
        } else {
            Ok(Box::pin(head))
        }
    }
}

/// Observer that keeps everything it is told.
#[derive(Default)]
pub struct Recorder {
    pub batches: Vec<Vec<ThinkEvent>>,
    pub finished: Option<RenderDocument>,
    pub errors: Vec<String>,
}

impl Recorder {
    pub fn events(&self) -> Vec<ThinkEvent> {
        self.batches.iter().flatten().cloned().collect()
    }
}

impl TurnObserver for Recorder {
    fn on_events(&mut self, events: &[ThinkEvent], _document: &RenderDocument) {
        self.batches.push(events.to_vec());
    }

    fn on_finish(&mut self, document: &RenderDocument) {
        self.finished = Some(document.clone());
    }

    fn on_error(&mut self, error: &ChatError, _document: &RenderDocument) {
        self.errors.push(error.to_string());
    }
}

/// Compact, id-aware rendering of events for assertions.
pub fn describe(events: &[ThinkEvent]) -> Vec<String> {
    events
        .iter()
        .map(|event| match event {
            ThinkEvent::Text(text) => format!("text {text:?}"),
            ThinkEvent::ThinkOpen(id) => format!("open {id}"),
            ThinkEvent::ThinkUpdate(id, text) => format!("update {id} {text:?}"),
            ThinkEvent::ThinkClose(id) => format!("close {id}"),
        })
        .collect()
}
