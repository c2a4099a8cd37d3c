// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incremental request decoding and reply framing.

use super::request::{ProtocolError, Request};

/// The shell prompt, written verbatim to the client socket.
pub const PROMPT: &[u8] = b"\n# ";

/// Opening sentinel of a framed reply.
pub const SENTINEL_OPEN: [u8; 2] = [0x02, 0x02];

/// Closing sentinel of a framed reply.
pub const SENTINEL_CLOSE: [u8; 2] = [0x03, 0x03];

/// Upper bound on one request frame: the type field, separator, the longest
/// command line, and the newline.
pub const MAX_FRAME_BYTES: usize = 4 + yash_shell::MAX_LINE_BYTES + 1;

/// Reply framing selected at daemon startup.
///
/// `Line` is the canonical mode: daemon messages are plain text and child
/// output streams raw. `Sentinel` wraps each daemon-originated message in
/// `0x02 0x02 … 0x03 0x03`; child output still streams raw either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramingMode {
    #[default]
    Line,
    Sentinel,
}

impl FramingMode {
    /// Frame one daemon-originated message for the client.
    pub fn encode_reply(&self, payload: &[u8]) -> Vec<u8> {
        match self {
            FramingMode::Line => payload.to_vec(),
            FramingMode::Sentinel => {
                let mut out = Vec::with_capacity(payload.len() + 4);
                out.extend_from_slice(&SENTINEL_OPEN);
                out.extend_from_slice(payload);
                out.extend_from_slice(&SENTINEL_CLOSE);
                out
            }
        }
    }
}

/// Incremental line decoder for the request stream.
///
/// Feed raw socket bytes in, pull complete requests out. An oversized or
/// malformed line is reported once (for logging) and skipped; decoding then
/// resynchronizes at the next newline.
#[derive(Debug, Default)]
pub struct Decoder {
    buf: Vec<u8>,
    /// Set while discarding an overlong line up to its terminating newline.
    discarding: bool,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Next complete request, if a full line is buffered.
    ///
    /// `None` means "need more bytes"; `Some(Err(_))` is a dropped frame the
    /// caller should log and otherwise ignore.
    pub fn next_request(&mut self) -> Option<Result<Request, ProtocolError>> {
        loop {
            let newline = self.buf.iter().position(|&b| b == b'\n');

            if self.discarding {
                match newline {
                    Some(pos) => {
                        self.buf.drain(..=pos);
                        self.discarding = false;
                        continue;
                    }
                    None => {
                        self.buf.clear();
                        return None;
                    }
                }
            }

            let Some(pos) = newline else {
                if self.buf.len() > MAX_FRAME_BYTES {
                    self.discarding = true;
                    let len = self.buf.len();
                    self.buf.clear();
                    return Some(Err(ProtocolError::Oversized(len)));
                }
                return None;
            };

            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop(); // newline
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            if line.len() > MAX_FRAME_BYTES {
                return Some(Err(ProtocolError::Oversized(line.len())));
            }
            if !line.is_ascii() {
                return Some(Err(ProtocolError::NotAscii));
            }
            let line = match String::from_utf8(line) {
                Ok(s) => s,
                Err(_) => return Some(Err(ProtocolError::NotAscii)),
            };
            return Some(Request::parse(&line));
        }
    }
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
