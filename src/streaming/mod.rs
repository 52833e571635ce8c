//! Streaming pipeline: bytes → lines → envelopes → deltas → think events.

pub mod envelope;
pub mod lines;
pub mod think;

pub use envelope::{DeltaStream, decode_line, delta_stream, extract_delta, line_delta};
pub use lines::{LineCodec, LineStream, byte_lines};
pub use think::{BlockId, THINK_CLOSE, THINK_OPEN, ThinkEvent, ThinkParser};
