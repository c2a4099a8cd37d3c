// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process exit codes.
//!
//! `main()` maps startup errors onto these instead of calling
//! `std::process::exit` from deep inside the daemon.

/// Clean shutdown.
pub const EXIT_OK: i32 = 0;
/// Bad command-line argument.
pub const EXIT_USAGE: i32 = 2;
/// Daemonization failure, including a lost singleton-lock race.
pub const EXIT_DAEMON: i32 = 3;
/// Listener socket failure.
pub const EXIT_SOCKET: i32 = 4;
/// Could not spawn a thread. Servant-spawn failures are contained to the
/// connection (logged with this code, slot released, accept loop
/// continues), so the daemon itself never exits with it.
pub const EXIT_THREAD: i32 = 5;
/// Command error; also recorded as the synthetic status of a job that
/// failed to launch.
pub const EXIT_COMMAND: i32 = 6;
