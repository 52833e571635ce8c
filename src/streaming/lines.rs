//! Line framing for streamed response bodies.
//!
//! Both SSE and NDJSON bodies are line oriented. Lines are kept as raw bytes
//! so that invalid UTF-8 is rejected per line by the envelope decoder instead
//! of failing the whole stream.

use crate::error::ChatError;
use bytes::{Buf, Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use std::io;
use std::pin::Pin;
use tokio_util::codec::{Decoder, FramedRead};
use tokio_util::io::StreamReader;

/// Stream of raw lines, terminators removed.
pub type LineStream = Pin<Box<dyn Stream<Item = Result<Bytes, ChatError>> + Send>>;

/// Splits bytes on `\n`, dropping a trailing `\r`.
#[derive(Debug, Clone, Default)]
pub struct LineCodec {
    /// Bytes of the current buffer already known to contain no newline
    next_index: usize,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

fn without_terminator(mut line: BytesMut) -> Bytes {
    if line.last() == Some(&b'\n') {
        line.truncate(line.len() - 1);
    }
    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }
    line.freeze()
}

impl Decoder for LineCodec {
    type Item = Bytes;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, io::Error> {
        match src[self.next_index..].iter().position(|b| *b == b'\n') {
            Some(offset) => {
                let end = self.next_index + offset + 1;
                self.next_index = 0;
                Ok(Some(without_terminator(src.split_to(end))))
            }
            None => {
                self.next_index = src.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, io::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        if src.is_empty() {
            Ok(None)
        } else {
            let len = src.len();
            Ok(Some(without_terminator(src.split_to(len))))
        }
    }
}

/// Frame a byte stream into lines.
///
/// A final line without a newline is still yielded. Errors from the source
/// stream end the line stream as `ChatError::StreamError`.
pub fn byte_lines<S, B, E>(byte_stream: S) -> LineStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: Buf + Send + 'static,
    E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let reader = StreamReader::new(byte_stream.map(|chunk| chunk.map_err(io::Error::other)));
    let lines = FramedRead::new(reader, LineCodec::new())
        .map(|line| line.map_err(|e| ChatError::StreamError(e.to_string())));
    Box::pin(lines)
}
