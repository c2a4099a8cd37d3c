// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `yashd` — the shell daemon binary.

use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use yash_daemon::args::Args;
use yash_daemon::exit::{EXIT_DAEMON, EXIT_OK, EXIT_SOCKET, EXIT_USAGE};
use yash_daemon::lifecycle::{acquire_pid_lock, detach, init_logging, Config, LifecycleError};
use yash_daemon::listener::{bind_listener, Dispatcher};
use yash_daemon::registry::ServantRegistry;
use yash_daemon::signals;

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // Prints help/usage itself; exits 0 for -h, 2 for bad flags.
            let _ = e.print();
            process::exit(if e.use_stderr() { EXIT_USAGE } else { EXIT_OK });
        }
    };
    let config = Config::from(&args);
    process::exit(run(&config));
}

fn run(config: &Config) -> i32 {
    // Detach before any thread exists; the logging worker comes after.
    if !config.foreground {
        if let Err(e) = detach(config) {
            eprintln!("yashd: {e}");
            return EXIT_DAEMON;
        }
    }

    let _log_guard = match init_logging(config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("yashd: {e}");
            return EXIT_DAEMON;
        }
    };

    let _pid_lock = match acquire_pid_lock(&config.pid_file) {
        Ok(lock) => lock,
        Err(LifecycleError::LockHeld(path)) => {
            error!(path = %path.display(), "another instance is already running");
            return EXIT_DAEMON;
        }
        Err(e) => {
            error!("startup failed: {e}");
            return EXIT_DAEMON;
        }
    };

    let flags = match signals::install() {
        Ok(flags) => flags,
        Err(e) => {
            error!("cannot install signal handlers: {e}");
            return EXIT_DAEMON;
        }
    };

    let listener = match bind_listener(config.port) {
        Ok(listener) => listener,
        Err(e) => {
            error!("{e}");
            return EXIT_SOCKET;
        }
    };

    info!(
        port = config.port,
        pid = process::id(),
        foreground = config.foreground,
        "daemon ready"
    );

    let registry = Arc::new(ServantRegistry::new());
    Dispatcher::new(listener, registry, flags, config.framing).run();

    info!("daemon exiting");
    EXIT_OK
}
