// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;

/// Client for the networked shell daemon.
#[derive(Debug, Parser)]
#[command(name = "yash", disable_help_subcommand = true)]
pub struct Args {
    /// Daemon host to connect to
    pub host: String,

    /// Daemon TCP port
    #[arg(short, long, default_value_t = 3826)]
    pub port: u16,
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
