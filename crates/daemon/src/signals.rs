// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide signal plumbing.
//!
//! Handlers only set flags; everything else happens on ordinary threads.
//! The shutdown flag is observed by the dispatcher and every servant at
//! their next poll boundary; the child flag wakes the per-session job
//! maintenance pass.

use std::io;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use signal_hook::consts::{SIGCHLD, SIGINT, SIGTERM, SIGTSTP, SIGTTIN, SIGTTOU};
use signal_hook::flag;

/// Flags set from signal context.
#[derive(Debug, Clone)]
pub struct SignalFlags {
    /// SIGTERM/SIGINT received; the daemon should stop.
    pub shutdown: Arc<AtomicBool>,
    /// SIGCHLD received since the flag was last cleared.
    pub child: Arc<AtomicBool>,
}

/// Install all daemon signal handling.
///
/// Terminal-stop signals get a no-op handler: the daemon must never stop on
/// SIGTSTP/SIGTTOU/SIGTTIN, only its children may (a `tcsetpgrp` from a
/// non-foreground process would otherwise suspend us in `--foreground`
/// runs). SIGPIPE needs nothing here — the runtime already keeps it from
/// killing the process, so broken sockets surface as write errors.
pub fn install() -> io::Result<SignalFlags> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let child = Arc::new(AtomicBool::new(false));

    flag::register(SIGTERM, Arc::clone(&shutdown))?;
    flag::register(SIGINT, Arc::clone(&shutdown))?;
    flag::register(SIGCHLD, Arc::clone(&child))?;

    for sig in [SIGTSTP, SIGTTOU, SIGTTIN] {
        ignore(sig)?;
    }

    Ok(SignalFlags { shutdown, child })
}

#[allow(unsafe_code)]
fn ignore(sig: i32) -> io::Result<()> {
    // SAFETY: the handler body is empty, which is trivially
    // async-signal-safe.
    unsafe { signal_hook::low_level::register(sig, || {})? };
    Ok(())
}
