// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child-process launch: pipes, redirections, process groups, terminal
//! handover.
//!
//! Children go into their own process group (leader = the left child) so
//! client signals can target the whole job without ever touching the
//! daemon. The client socket is the child's stdout/stderr unless a path
//! redirection overrides it, which is what lets output stream to the client
//! with no relay in between.

use std::fs::{File, OpenOptions};
use std::io;
use std::net::TcpStream;
use std::os::fd::{AsFd, OwnedFd};
use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};

use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::sys::wait::waitpid;
use nix::unistd::{getpgrp, pipe, tcsetpgrp, Pid};
use thiserror::Error;
use tracing::debug;

use yash_shell::Job;

#[derive(Debug, Error)]
pub enum LaunchError {
    /// A side with no argv; the parser never produces one, but `launch` is
    /// safe against it anyway.
    #[error("missing command")]
    Empty,

    #[error("{path}: {source}")]
    Redirect {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot create pipe: {0}")]
    Pipe(#[from] Errno),

    #[error("{command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot duplicate client socket: {0}")]
    Socket(#[source] io::Error),
}

/// Descriptors the launcher wires into the children.
pub struct LaunchIo<'a> {
    /// The client socket; cloned onto child stdout/stderr.
    pub socket: &'a TcpStream,
    /// Read end of the session's foreground-stdin pipe, if this launch is a
    /// foreground job without an explicit `<` redirection.
    pub fg_stdin: Option<OwnedFd>,
}

/// Fork the job's children and return the group PID (= left child's PID).
///
/// Path redirections are opened in the parent and passed down as the
/// child's stdio, overriding the pipe/socket defaults. Both pipe ends leave
/// this function's scope by the time it returns, so EOF propagates as soon
/// as the children are done with them.
pub fn launch(job: &Job, io: LaunchIo<'_>) -> Result<i32, LaunchError> {
    let mut pipe_read: Option<OwnedFd> = None;
    let mut pipe_write: Option<OwnedFd> = None;
    if job.pipe {
        let (read_end, write_end) = pipe()?;
        pipe_read = Some(read_end);
        pipe_write = Some(write_end);
    }

    let Some(left_program) = job.left.argv.first() else {
        return Err(LaunchError::Empty);
    };
    let mut left = Command::new(left_program);
    left.args(&job.left.argv[1..]);
    left.process_group(0);
    reset_signals(&mut left);

    left.stdin(match &job.left.stdin {
        Some(path) => open_in(path)?,
        None => match io.fg_stdin {
            Some(fd) => Stdio::from(fd),
            None => Stdio::null(),
        },
    });
    // Taking the write end unconditionally keeps the parent from holding it
    // when a `>` redirection overrides the pipe.
    left.stdout(match (&job.left.stdout, pipe_write.take()) {
        (Some(path), _) => open_out(path)?,
        (None, Some(write_end)) => Stdio::from(write_end),
        (None, None) => socket_stdio(io.socket)?,
    });
    left.stderr(match &job.left.stderr {
        Some(path) => open_out(path)?,
        None => socket_stdio(io.socket)?,
    });

    let left_child = left.spawn().map_err(|source| LaunchError::Spawn {
        command: left_program.clone(),
        source,
    })?;
    let gpid = left_child.id() as i32;
    // The Command still holds the parent copies of the child's stdio; drop
    // them now so the pipe write end is closed before anyone waits.
    drop(left);

    if let Some(right_cmd) = &job.right {
        let Some(right_program) = right_cmd.argv.first() else {
            let _ = killpg(Pid::from_raw(gpid), Signal::SIGKILL);
            let _ = waitpid(Pid::from_raw(-gpid), None);
            return Err(LaunchError::Empty);
        };
        let mut right = Command::new(right_program);
        right.args(&right_cmd.argv[1..]);
        // Join the left child's group; if the left child already exited the
        // group may be gone, which surfaces as a spawn failure below.
        right.process_group(gpid);
        reset_signals(&mut right);

        right.stdin(match (&right_cmd.stdin, pipe_read.take()) {
            (Some(path), _) => open_in(path)?,
            (None, Some(read_end)) => Stdio::from(read_end),
            // Parser invariant: a right side only exists for piped jobs.
            (None, None) => Stdio::null(),
        });
        right.stdout(match &right_cmd.stdout {
            Some(path) => open_out(path)?,
            None => socket_stdio(io.socket)?,
        });
        right.stderr(match &right_cmd.stderr {
            Some(path) => open_out(path)?,
            None => socket_stdio(io.socket)?,
        });

        if let Err(source) = right.spawn() {
            // Tear down the half-started group before reporting.
            let _ = killpg(Pid::from_raw(gpid), Signal::SIGKILL);
            let _ = waitpid(Pid::from_raw(-gpid), None);
            return Err(LaunchError::Spawn {
                command: right_program.clone(),
                source,
            });
        }
    }

    Ok(gpid)
}

/// Hand the controlling terminal to the job's group.
pub fn give_terminal(gpid: i32) {
    set_terminal_group(Pid::from_raw(gpid));
}

/// Take the controlling terminal back after a foreground wait.
pub fn take_terminal() {
    set_terminal_group(getpgrp());
}

/// `tcsetpgrp` against the controlling terminal, when there is one.
///
/// A detached daemon has no controlling terminal, so the handover degrades
/// to the logical foreground bookkeeping in the session; in `--foreground`
/// runs the real terminal follows the job.
fn set_terminal_group(pgid: Pid) {
    let Ok(tty) = File::open("/dev/tty") else {
        return;
    };
    if let Err(errno) = tcsetpgrp(tty.as_fd(), pgid) {
        match errno {
            Errno::ENOTTY | Errno::ENXIO | Errno::EBADF => {}
            errno => debug!(%pgid, %errno, "tcsetpgrp failed"),
        }
    }
}

fn open_in(path: &str) -> Result<Stdio, LaunchError> {
    File::open(path)
        .map(Stdio::from)
        .map_err(|source| LaunchError::Redirect { path: path.to_string(), source })
}

fn open_out(path: &str) -> Result<Stdio, LaunchError> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .map(Stdio::from)
        .map_err(|source| LaunchError::Redirect { path: path.to_string(), source })
}

fn socket_stdio(socket: &TcpStream) -> Result<Stdio, LaunchError> {
    let clone = socket.try_clone().map_err(LaunchError::Socket)?;
    Ok(Stdio::from(OwnedFd::from(clone)))
}

/// Restore default signal dispositions in the child.
///
/// The daemon process ignores the terminal-stop family and the runtime
/// leaves SIGPIPE ignored; both would leak into children through exec.
/// SIGTTOU stays ignored so a background child writing the shared socket
/// is never stopped.
#[allow(unsafe_code)]
fn reset_signals(cmd: &mut Command) {
    // SAFETY: the closure runs between fork and exec and only calls
    // async-signal-safe libc functions.
    unsafe {
        cmd.pre_exec(|| {
            libc::signal(libc::SIGINT, libc::SIG_DFL);
            libc::signal(libc::SIGQUIT, libc::SIG_DFL);
            libc::signal(libc::SIGTSTP, libc::SIG_DFL);
            libc::signal(libc::SIGCONT, libc::SIG_DFL);
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
            libc::signal(libc::SIGTTOU, libc::SIG_IGN);
            libc::signal(libc::SIGTTIN, libc::SIG_IGN);
            Ok(())
        });
    }
}

#[cfg(test)]
#[path = "launcher_tests.rs"]
mod tests;
