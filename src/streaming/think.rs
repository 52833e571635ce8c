//! Incremental `<think>` block parser.
//!
//! Reasoning models interleave their chain of thought with the answer,
//! delimited by `<think>` and `</think>`. Deltas arrive in arbitrary
//! fragments, so a marker may be split across chunks (`"<thi"` + `"nk>"`),
//! and one chunk may contain several transitions.
//!
//! [`ThinkParser`] keeps only the unclassified tail of the input. Every call
//! to [`ThinkParser::process`] classifies as much as it can and returns the
//! structural events in input order; nothing already emitted is scanned again.
//!
//! # Example
//!
//! ```rust,ignore
//! use thinkstream::streaming::{ThinkEvent, ThinkParser};
//!
//! let mut parser = ThinkParser::new();
//! let mut events = parser.process("Hello <th");
//! events.extend(parser.process("ink>plan</think>answer"));
//! events.extend(parser.finish());
//!
//! assert!(matches!(events[0], ThinkEvent::Text(ref t) if t == "Hello "));
//! ```

use std::fmt;

/// Literal marker that opens a reasoning block.
pub const THINK_OPEN: &str = "<think>";
/// Literal marker that closes a reasoning block.
pub const THINK_CLOSE: &str = "</think>";

/// Identifier of one reasoning block, unique for the lifetime of a parser.
///
/// Displays as `think-N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(u64);

impl BlockId {
    /// Zero-based position of the block in its stream.
    pub fn index(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "think-{}", self.0)
    }
}

/// One structural change to the rendered document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThinkEvent {
    /// Answer text outside any reasoning block
    Text(String),
    /// A reasoning block started
    ThinkOpen(BlockId),
    /// Content to append to an open reasoning block
    ThinkUpdate(BlockId, String),
    /// A reasoning block ended
    ThinkClose(BlockId),
}

impl ThinkEvent {
    /// The block this event refers to, if any.
    pub fn block_id(&self) -> Option<BlockId> {
        match self {
            Self::Text(_) => None,
            Self::ThinkOpen(id) | Self::ThinkUpdate(id, _) | Self::ThinkClose(id) => Some(*id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    Scanning,
    InThink(BlockId),
}

/// Streaming state machine that splits text into answer and reasoning events.
///
/// Nesting is not supported: while a block is open only `</think>` is
/// searched for, so a second `<think>` becomes part of the block content.
#[derive(Debug, Clone)]
pub struct ThinkParser {
    /// Input not yet classified; at most a partial marker once `process` returns
    buffer: String,
    state: ParserState,
    next_block: u64,
}

impl Default for ThinkParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ThinkParser {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            state: ParserState::Scanning,
            next_block: 0,
        }
    }

    /// Whether a reasoning block is currently open.
    pub fn is_in_think(&self) -> bool {
        matches!(self.state, ParserState::InThink(_))
    }

    /// The currently open block.
    pub fn open_block(&self) -> Option<BlockId> {
        match self.state {
            ParserState::Scanning => None,
            ParserState::InThink(id) => Some(id),
        }
    }

    /// Input held back because it may be the start of a marker.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// Feed one delta and return the events it completes, in input order.
    ///
    /// Text before a possible partial marker is emitted immediately; only a
    /// trailing fragment that could still grow into the awaited marker stays
    /// buffered. Empty payloads are never emitted.
    pub fn process(&mut self, delta: &str) -> Vec<ThinkEvent> {
        let mut events = Vec::new();
        if delta.is_empty() {
            return events;
        }
        self.buffer.push_str(delta);

        loop {
            let transitioned = match self.state {
                ParserState::Scanning => self.scan_text(&mut events),
                ParserState::InThink(id) => self.scan_think(id, &mut events),
            };
            if !transitioned {
                break;
            }
        }

        events
    }

    /// Flush whatever is still buffered at end of stream.
    ///
    /// A held-back partial marker can no longer complete, so it is emitted as
    /// ordinary text (or block content). An open block is left open; closing
    /// it is up to the renderer.
    pub fn finish(&mut self) -> Vec<ThinkEvent> {
        if self.buffer.is_empty() {
            return Vec::new();
        }
        let rest = std::mem::take(&mut self.buffer);
        match self.state {
            ParserState::Scanning => vec![ThinkEvent::Text(rest)],
            ParserState::InThink(id) => vec![ThinkEvent::ThinkUpdate(id, rest)],
        }
    }

    /// Discard buffered input and leave any open block.
    ///
    /// The id counter keeps running so ids stay unique for this parser.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = ParserState::Scanning;
    }

    /// Returns true when an opening marker was consumed.
    fn scan_text(&mut self, events: &mut Vec<ThinkEvent>) -> bool {
        match self.buffer.find(THINK_OPEN) {
            Some(start) => {
                if start > 0 {
                    events.push(ThinkEvent::Text(self.buffer[..start].to_string()));
                }
                self.buffer.drain(..start + THINK_OPEN.len());

                let id = BlockId(self.next_block);
                self.next_block += 1;
                events.push(ThinkEvent::ThinkOpen(id));
                self.state = ParserState::InThink(id);
                true
            }
            None => {
                if let Some(text) = self.take_settled(THINK_OPEN) {
                    events.push(ThinkEvent::Text(text));
                }
                false
            }
        }
    }

    /// Returns true when the closing marker was consumed.
    fn scan_think(&mut self, id: BlockId, events: &mut Vec<ThinkEvent>) -> bool {
        match self.buffer.find(THINK_CLOSE) {
            Some(end) => {
                if end > 0 {
                    events.push(ThinkEvent::ThinkUpdate(id, self.buffer[..end].to_string()));
                }
                self.buffer.drain(..end + THINK_CLOSE.len());

                events.push(ThinkEvent::ThinkClose(id));
                self.state = ParserState::Scanning;
                true
            }
            None => {
                if let Some(content) = self.take_settled(THINK_CLOSE) {
                    events.push(ThinkEvent::ThinkUpdate(id, content));
                }
                false
            }
        }
    }

    /// Remove and return the buffer minus any trailing partial `marker`.
    fn take_settled(&mut self, marker: &str) -> Option<String> {
        let keep = partial_marker_len(&self.buffer, marker);
        let settled = self.buffer.len() - keep;
        if settled == 0 {
            return None;
        }
        let rest = self.buffer.split_off(settled);
        Some(std::mem::replace(&mut self.buffer, rest))
    }
}

/// Length of the longest suffix of `text` that is a proper prefix of `marker`.
///
/// Only char boundaries are considered, so the split never lands inside a
/// multi-byte character.
fn partial_marker_len(text: &str, marker: &str) -> usize {
    let longest = marker.len().saturating_sub(1).min(text.len());
    (1..=longest)
        .rev()
        .find(|&len| {
            let start = text.len() - len;
            text.is_char_boundary(start) && marker.starts_with(&text[start..])
        })
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> BlockId {
        BlockId(n)
    }

    fn text(s: &str) -> ThinkEvent {
        ThinkEvent::Text(s.to_string())
    }

    fn update(n: u64, s: &str) -> ThinkEvent {
        ThinkEvent::ThinkUpdate(id(n), s.to_string())
    }

    fn feed(parser: &mut ThinkParser, deltas: &[&str]) -> Vec<ThinkEvent> {
        let mut events: Vec<ThinkEvent> = deltas.iter().flat_map(|d| parser.process(d)).collect();
        events.extend(parser.finish());
        events
    }

    #[test]
    fn test_partial_marker_len() {
        assert_eq!(partial_marker_len("Hello <thi", THINK_OPEN), 4);
        assert_eq!(partial_marker_len("Hello <", THINK_OPEN), 1);
        assert_eq!(partial_marker_len("Hello", THINK_OPEN), 0);
        assert_eq!(partial_marker_len("a </think", THINK_CLOSE), 7);
        assert_eq!(partial_marker_len("", THINK_OPEN), 0);
        // a complete marker is not a *proper* prefix
        assert_eq!(partial_marker_len("<think>", THINK_OPEN), 0);
    }

    #[test]
    fn test_partial_marker_len_respects_char_boundaries() {
        assert_eq!(partial_marker_len("héllo<", THINK_OPEN), 1);
        assert_eq!(partial_marker_len("日本", THINK_OPEN), 0);
    }

    #[test]
    fn test_split_markers_across_deltas() {
        let mut parser = ThinkParser::new();
        let events = feed(
            &mut parser,
            &["Hello ", "<th", "ink>reasoning", " here</thi", "nk> world"],
        );

        assert_eq!(
            events,
            vec![
                text("Hello "),
                ThinkEvent::ThinkOpen(id(0)),
                update(0, "reasoning"),
                update(0, " here"),
                ThinkEvent::ThinkClose(id(0)),
                text(" world"),
            ]
        );
    }

    #[test]
    fn test_partial_prefix_is_held_back() {
        let mut parser = ThinkParser::new();
        assert_eq!(parser.process("Hello <th"), vec![text("Hello ")]);
        assert_eq!(parser.buffered(), "<th");
        assert!(!parser.is_in_think());

        assert_eq!(parser.process("ink>"), vec![ThinkEvent::ThinkOpen(id(0))]);
        assert_eq!(parser.open_block(), Some(id(0)));
        assert_eq!(parser.buffered(), "");
    }

    #[test]
    fn test_false_partial_is_released() {
        let mut parser = ThinkParser::new();
        assert_eq!(parser.process("a <"), vec![text("a ")]);
        assert_eq!(parser.process("b"), vec![text("<b")]);
    }

    #[test]
    fn test_multiple_transitions_in_one_delta() {
        let mut parser = ThinkParser::new();
        let events = parser.process("a<think>x</think>b<think>y</think>c");

        assert_eq!(
            events,
            vec![
                text("a"),
                ThinkEvent::ThinkOpen(id(0)),
                update(0, "x"),
                ThinkEvent::ThinkClose(id(0)),
                text("b"),
                ThinkEvent::ThinkOpen(id(1)),
                update(1, "y"),
                ThinkEvent::ThinkClose(id(1)),
                text("c"),
            ]
        );
    }

    #[test]
    fn test_nested_open_is_literal_content() {
        let mut parser = ThinkParser::new();
        let events = feed(&mut parser, &["<think>A<think>B</think>C"]);

        assert_eq!(
            events,
            vec![
                ThinkEvent::ThinkOpen(id(0)),
                update(0, "A<think>B"),
                ThinkEvent::ThinkClose(id(0)),
                text("C"),
            ]
        );
    }

    #[test]
    fn test_stray_close_outside_block_is_text() {
        let mut parser = ThinkParser::new();
        let events = feed(&mut parser, &["done</think>!"]);
        assert_eq!(events, vec![text("done</think>!")]);
    }

    #[test]
    fn test_ids_are_unique_across_calls() {
        let mut parser = ThinkParser::new();
        let first = parser.process("<think>a</think>");
        let second = parser.process("<think>b</think>");

        assert_eq!(first[0], ThinkEvent::ThinkOpen(id(0)));
        assert_eq!(second[0], ThinkEvent::ThinkOpen(id(1)));
        assert_eq!(id(1).to_string(), "think-1");
    }

    #[test]
    fn test_reset_keeps_id_counter() {
        let mut parser = ThinkParser::new();
        parser.process("<think>unfinished");
        parser.reset();
        assert!(!parser.is_in_think());
        assert_eq!(parser.process("<think>"), vec![ThinkEvent::ThinkOpen(id(1))]);
    }

    #[test]
    fn test_empty_delta_emits_nothing() {
        let mut parser = ThinkParser::new();
        assert!(parser.process("").is_empty());
        parser.process("<think>");
        assert!(parser.process("").is_empty());
    }

    #[test]
    fn test_empty_block_has_no_update() {
        let mut parser = ThinkParser::new();
        let events = parser.process("<think></think>x");
        assert_eq!(
            events,
            vec![
                ThinkEvent::ThinkOpen(id(0)),
                ThinkEvent::ThinkClose(id(0)),
                text("x"),
            ]
        );
    }

    #[test]
    fn test_unterminated_block_stays_open() {
        let mut parser = ThinkParser::new();
        let events = feed(&mut parser, &["<think>partial"]);
        assert_eq!(events, vec![ThinkEvent::ThinkOpen(id(0)), update(0, "partial")]);
        assert!(parser.is_in_think());
    }

    #[test]
    fn test_finish_flushes_partial_markers() {
        let mut parser = ThinkParser::new();
        assert_eq!(parser.process("end <thi"), vec![text("end ")]);
        assert_eq!(parser.finish(), vec![text("<thi")]);
        assert!(parser.finish().is_empty());

        let mut parser = ThinkParser::new();
        parser.process("<think>x </th");
        assert_eq!(parser.finish(), vec![update(0, "</th")]);
    }

    #[test]
    fn test_multibyte_text_around_markers() {
        let mut parser = ThinkParser::new();
        let events = feed(&mut parser, &["答え<", "think>考え中…</", "think>です"]);
        assert_eq!(
            events,
            vec![
                text("答え"),
                ThinkEvent::ThinkOpen(id(0)),
                update(0, "考え中…"),
                ThinkEvent::ThinkClose(id(0)),
                text("です"),
            ]
        );
    }

    #[test]
    fn test_block_id_accessor() {
        assert_eq!(text("x").block_id(), None);
        assert_eq!(update(3, "x").block_id(), Some(id(3)));
        assert_eq!(id(3).index(), 3);
    }
}
