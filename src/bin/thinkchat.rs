//! thinkchat: terminal chat over a streaming `/api/chat` endpoint.
//!
//! Reasoning is printed dimmed as it streams, followed by the answer.
//! `/clear` starts over, `/quit` (or end of input) exits, Ctrl-C stops the
//! current answer.

use std::io::Write;
use thinkstream::defaults::PROGRAMMING_PREAMBLE;
use thinkstream::telemetry;
use thinkstream::{
    CancelHandle, ChatConfig, ChatRequest, ChatSession, ChatTurn, FnObserver, HttpTransport,
    PlainRenderer, RenderDocument, ThinkEvent,
};
use tokio::io::{AsyncBufReadExt, BufReader};

const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Print events as they arrive instead of redrawing the whole document.
fn print_events(events: &[ThinkEvent], _document: &RenderDocument) {
    let mut out = std::io::stdout().lock();
    let result = events.iter().try_for_each(|event| match event {
        ThinkEvent::Text(text) => write!(out, "{text}"),
        ThinkEvent::ThinkOpen(_) => writeln!(out, "{DIM}[thinking]"),
        ThinkEvent::ThinkUpdate(_, delta) => write!(out, "{DIM}{delta}"),
        ThinkEvent::ThinkClose(_) => writeln!(out, "\n[/thinking]{RESET}"),
    });
    if let Err(e) = result.and_then(|()| out.flush()) {
        tracing::debug!(error = %e, "failed to write to stdout");
    }
}

fn prompt() -> std::io::Result<()> {
    let mut out = std::io::stdout().lock();
    write!(out, "{RESET}\n> ")?;
    out.flush()
}

#[tokio::main]
async fn main() -> thinkstream::Result<()> {
    let _guard = telemetry::init_from_env()?;

    let config = ChatConfig::from_env()?;
    let transport = HttpTransport::new(&config)?;
    let mut session = ChatSession::with_preamble(PROGRAMMING_PREAMBLE);
    let renderer = PlainRenderer;

    tracing::info!(
        url = transport.url(),
        model = %config.model,
        session_id = %session.id(),
        "thinkchat started"
    );
    println!("thinkchat · {} · /clear resets, /quit exits", config.model);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt()?;
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                session.clear();
                println!("(conversation cleared)");
                continue;
            }
            input => session.push_user(input),
        }

        let cancel = CancelHandle::new();
        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            })
        };

        let request = ChatRequest::for_session(&config, &session);
        let mut observer = FnObserver(print_events);
        let result = ChatTurn::new(&renderer)
            .with_cancel(cancel)
            .run(&transport, &request, &mut session, &mut observer)
            .await;
        watcher.abort();

        match result {
            Ok(outcome) if outcome.cancelled => println!("{RESET}\n(stopped)"),
            Ok(_) => println!("{RESET}"),
            Err(failure) => {
                println!("{RESET}");
                eprintln!("error: {}", failure.error);
                if failure.partial.is_some() {
                    eprintln!("(partial answer kept in the conversation)");
                }
            }
        }
    }

    Ok(())
}
