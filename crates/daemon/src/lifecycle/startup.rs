// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup: fork-detach, log redirection, singleton PID lock.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use daemonize::Daemonize;
use fs2::FileExt;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use super::{Config, LifecycleError, WORK_DIR};

/// The held singleton lock.
///
/// Dropping this releases the advisory lock, so the daemon keeps it alive
/// for its whole lifetime.
#[derive(Debug)]
pub struct PidLock {
    // NOTE(lifetime): held to maintain the exclusive file lock
    #[allow(dead_code)]
    file: File,
}

/// Fork-detach from the terminal.
///
/// The parent exits inside `start()`; the surviving child has chdir'd to
/// `/tmp`, set umask 0, become a session leader, and redirected its stdio
/// to the log file (stdin to `/dev/null`). Must run before any threads
/// exist, which is why logging is initialized afterwards.
pub fn detach(config: &Config) -> Result<(), LifecycleError> {
    let stdout = open_log(&config.log_file)?;
    let stderr = open_log(&config.log_file)?;

    Daemonize::new()
        .working_directory(WORK_DIR)
        .umask(0o000)
        .stdout(stdout)
        .stderr(stderr)
        .start()?;
    Ok(())
}

/// Initialize the global tracing subscriber writing to the log file.
///
/// Returns the appender guard; dropping it stops the writer thread, so
/// `main` holds it until exit. One formatted event per write call keeps the
/// log line-atomic across threads.
pub fn init_logging(config: &Config) -> Result<WorkerGuard, LifecycleError> {
    let file = open_log(&config.log_file)?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let filter = if config.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}

/// Acquire the exclusive advisory lock on the PID file and record our PID.
///
/// Open without truncating: the file may hold the PID of a running daemon
/// that we must not wipe before we own the lock. A lost lock race is the
/// expected "second instance" case and gets its own error.
pub fn acquire_pid_lock(path: &Path) -> Result<PidLock, LifecycleError> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .mode(0o644)
        .open(path)?;

    if file.try_lock_exclusive().is_err() {
        return Err(LifecycleError::LockHeld(path.to_path_buf()));
    }

    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    file.sync_all()?;

    info!(pid = std::process::id(), path = %path.display(), "acquired singleton lock");
    Ok(PidLock { file })
}

fn open_log(path: &Path) -> Result<File, LifecycleError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| LifecycleError::LogFile(path.to_path_buf(), e))
}
