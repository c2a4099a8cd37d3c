// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness for the end-to-end specs.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::process::{Child, Command};
use std::time::{Duration, Instant};

use tempfile::TempDir;

/// How long specs wait for expected daemon output.
pub const SPEC_WAIT: Duration = Duration::from_secs(10);

/// A running `yashd --foreground` with scratch state.
pub struct Daemon {
    child: Child,
    port: u16,
    dir: TempDir,
}

impl Daemon {
    /// Start a daemon on a free port and wait until it accepts.
    pub fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let port = free_port();
        let child = Command::new(yashd_bin())
            .arg("--foreground")
            .args(["--port", &port.to_string()])
            .arg("--pid-file")
            .arg(dir.path().join("yashd.pid"))
            .arg("--log-file")
            .arg(dir.path().join("yashd.log"))
            .spawn()
            .expect("spawn yashd");

        let daemon = Self { child, port, dir };
        daemon.await_listening();
        daemon
    }

    pub fn pid_file(&self) -> PathBuf {
        self.dir.path().join("yashd.pid")
    }

    pub fn scratch_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Open a shell session and consume the initial prompt.
    pub fn session(&self) -> Shell {
        let stream = TcpStream::connect(("127.0.0.1", self.port)).expect("connect to yashd");
        stream.set_read_timeout(Some(Duration::from_millis(50))).unwrap();
        let mut shell = Shell { stream };
        shell.expect("\n# ");
        shell
    }

    /// True while the daemon process has not exited.
    pub fn alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    fn await_listening(&self) {
        let deadline = Instant::now() + SPEC_WAIT;
        while Instant::now() < deadline {
            if TcpStream::connect(("127.0.0.1", self.port)).is_ok() {
                return;
            }
            std::thread::sleep(Duration::from_millis(25));
        }
        panic!("yashd did not start listening on port {}", self.port);
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// One connected shell session.
pub struct Shell {
    stream: TcpStream,
}

impl Shell {
    pub fn send(&mut self, line: &str) {
        self.stream.write_all(line.as_bytes()).expect("write to yashd");
    }

    /// Read until `needle` appears; panics with what was seen on timeout.
    pub fn expect(&mut self, needle: &str) -> String {
        let deadline = Instant::now() + SPEC_WAIT;
        let mut collected = String::new();
        let mut buf = [0u8; 1024];
        while Instant::now() < deadline {
            if collected.contains(needle) {
                return collected;
            }
            match self.stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => collected.push_str(&String::from_utf8_lossy(&buf[..n])),
                Err(_) => {}
            }
        }
        panic!("expected {needle:?} from daemon, saw {collected:?}");
    }

    /// Drain whatever arrives inside the window.
    pub fn drain_for(&mut self, window: Duration) -> String {
        let deadline = Instant::now() + window;
        let mut collected = String::new();
        let mut buf = [0u8; 1024];
        while Instant::now() < deadline {
            match self.stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => collected.push_str(&String::from_utf8_lossy(&buf[..n])),
                Err(_) => {}
            }
        }
        collected
    }

    /// True when the daemon closed this connection.
    pub fn closed(&mut self) -> bool {
        let deadline = Instant::now() + SPEC_WAIT;
        let mut buf = [0u8; 256];
        while Instant::now() < deadline {
            match self.stream.read(&mut buf) {
                Ok(0) => return true,
                Ok(_) => {}
                Err(_) => {}
            }
        }
        false
    }
}

pub fn yashd_bin() -> PathBuf {
    assert_cmd::cargo::cargo_bin("yashd")
}

/// Grab a free TCP port from the kernel.
pub fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}
