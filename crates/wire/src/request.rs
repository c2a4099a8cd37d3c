// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request messages (client → daemon) and their line form.

use std::fmt;

use thiserror::Error;
use yash_shell::MAX_LINE_BYTES;

/// One framed request from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `CMD <line>` — a raw command line for the session's parser, or input
    /// for the foreground job when one is running.
    Cmd(String),
    /// `CTL <c|z|d>` — a control message for the session.
    Ctl(Control),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// `c` — interrupt the foreground job (SIGINT).
    Interrupt,
    /// `z` — stop the foreground job (SIGTSTP).
    Suspend,
    /// `d` — end of input: close the session.
    Eof,
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Control::Interrupt => f.write_str("c"),
            Control::Suspend => f.write_str("z"),
            Control::Eof => f.write_str("d"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Missing type field, missing separator, or an unknown type/control.
    #[error("malformed request: {0:?}")]
    Malformed(String),

    /// A frame longer than the protocol allows; dropped after logging.
    #[error("oversized frame ({0} bytes)")]
    Oversized(usize),

    /// Bytes outside the 7-bit charset the protocol permits.
    #[error("request is not 7-bit ASCII")]
    NotAscii,
}

impl Request {
    /// Parse one request line (newline already stripped).
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let malformed = || ProtocolError::Malformed(truncate_for_log(line));

        let (kind, arg) = line.split_once(' ').ok_or_else(malformed)?;
        match kind {
            "CMD" => {
                if arg.len() > MAX_LINE_BYTES {
                    return Err(ProtocolError::Oversized(arg.len()));
                }
                Ok(Request::Cmd(arg.to_string()))
            }
            "CTL" => match arg {
                "c" => Ok(Request::Ctl(Control::Interrupt)),
                "z" => Ok(Request::Ctl(Control::Suspend)),
                "d" => Ok(Request::Ctl(Control::Eof)),
                _ => Err(malformed()),
            },
            _ => Err(malformed()),
        }
    }

    /// The line form, newline included — what the client writes.
    pub fn encode(&self) -> String {
        match self {
            Request::Cmd(line) => format!("CMD {line}\n"),
            Request::Ctl(ctl) => format!("CTL {ctl}\n"),
        }
    }
}

fn truncate_for_log(line: &str) -> String {
    const KEEP: usize = 32;
    match line.char_indices().nth(KEEP) {
        None => line.to_string(),
        Some((cut, _)) => format!("{}…", &line[..cut]),
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
