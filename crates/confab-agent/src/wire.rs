//! Line-oriented wire format of a streamed run.
//!
//! Line 1 is the raw prompt. Each following line is one JSON-encoded
//! [`ModelMessage`]; its `kind` field tells a model request from a model
//! response. There is no terminator line: the stream ends when the
//! connection closes.

use bytes::{BufMut, Bytes, BytesMut};
use confab_core::{ConfabResult, ModelMessage};

/// The prompt, unmodified, followed by a newline.
pub fn encode_prompt(prompt: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(prompt.len() + 1);
    buf.put_slice(prompt.as_bytes());
    buf.put_u8(b'\n');
    buf.freeze()
}

/// One wire event: compact JSON followed by a newline.
pub fn encode_event(message: &ModelMessage) -> ConfabResult<Bytes> {
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    Ok(Bytes::from(line))
}
