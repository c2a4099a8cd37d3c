// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: detach, singleton lock, logging bring-up.

mod startup;

pub use startup::{acquire_pid_lock, detach, init_logging, PidLock};

use std::path::PathBuf;

use thiserror::Error;

use crate::args::Args;
use yash_wire::FramingMode;

/// Immutable daemon configuration, resolved from the command line.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub verbose: bool,
    pub foreground: bool,
    pub pid_file: PathBuf,
    pub log_file: PathBuf,
    pub framing: FramingMode,
}

/// Directory the daemon runs from.
pub const WORK_DIR: &str = "/tmp";

impl From<&Args> for Config {
    fn from(args: &Args) -> Self {
        Self {
            port: args.port,
            verbose: args.verbose,
            foreground: args.foreground,
            pid_file: args.pid_file.clone(),
            log_file: args.log_file.clone(),
            framing: if args.framed { FramingMode::Sentinel } else { FramingMode::Line },
        }
    }
}

/// Lifecycle errors; all of these are fatal at startup.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to detach: {0}")]
    Detach(#[from] daemonize::Error),

    #[error("another instance holds the lock on {0}")]
    LockHeld(PathBuf),

    #[error("failed to open log file {0}: {1}")]
    LogFile(PathBuf, #[source] std::io::Error),

    #[error("failed to install signal handlers: {0}")]
    Signals(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
