// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-client session and the servant thread that drives it.
//!
//! The servant polls its socket on a 500 ms interval, decoding framed
//! requests and routing them: command lines to the parser and job machinery,
//! control messages to the foreground job's process group. Job threads
//! spawned here share the session through one mutex; they are all joined
//! before the session is released.

mod servant;

pub use servant::{serve, ServantCtx};

use std::fs::File;
use std::io::Write;
use std::net::TcpStream;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tracing::debug;

use crate::jobs::JobTable;
use yash_wire::{FramingMode, PROMPT};

/// Mutable per-session fields, all behind the session's one mutex.
#[derive(Default)]
pub struct SessionState {
    pub jobs: JobTable,
    /// Write end of the foreground-stdin pipe; client `CMD` payloads are
    /// routed here while a foreground job runs.
    pub fg_stdin: Option<File>,
    /// Number of the job currently owned by a blocking foreground wait.
    pub fg_wait: Option<usize>,
    /// Live job-thread records; joined before the session goes away.
    pub threads: Vec<JobThread>,
}

/// Bookkeeping for one spawned job thread.
pub struct JobThread {
    pub number: usize,
    /// Cooperative shutdown latch for the thread.
    pub run: Arc<AtomicBool>,
    pub handle: JoinHandle<()>,
}

/// Shared session context: the servant and its job threads both hold this.
pub struct Session {
    pub peer: std::net::SocketAddr,
    pub writer: ClientWriter,
    pub state: Mutex<SessionState>,
}

/// Serialized writes of daemon-originated messages to the client.
///
/// Child output bypasses this entirely (the socket is the child's stdout);
/// everything the daemon itself says goes through here so the optional
/// sentinel framing is applied in one place. A failed write means the
/// client is gone; the servant notices on its next poll, so it is only
/// logged here.
pub struct ClientWriter {
    stream: TcpStream,
    framing: FramingMode,
}

impl ClientWriter {
    pub fn new(stream: TcpStream, framing: FramingMode) -> Self {
        Self { stream, framing }
    }

    /// The socket handle, for duping onto child stdio.
    pub fn socket(&self) -> &TcpStream {
        &self.stream
    }

    pub fn send_bytes(&self, payload: &[u8]) {
        let framed = self.framing.encode_reply(payload);
        if let Err(e) = (&self.stream).write_all(&framed) {
            debug!("client write failed: {e}");
        }
    }

    pub fn send_line(&self, line: &str) {
        self.send_bytes(format!("{line}\n").as_bytes());
    }

    /// A `-yash: `-prefixed diagnostic line.
    pub fn error(&self, message: impl std::fmt::Display) {
        self.send_bytes(format!("-yash: {message}\n").as_bytes());
    }

    pub fn prompt(&self) {
        self.send_bytes(PROMPT);
    }
}
