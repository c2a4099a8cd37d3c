// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line interface of the daemon.

use std::path::PathBuf;

use clap::Parser;

pub const DEFAULT_PORT: u16 = 3826;
pub const MIN_PORT: u16 = 1024;

/// Networked shell daemon.
#[derive(Debug, Parser)]
#[command(name = "yashd", disable_help_subcommand = true)]
pub struct Args {
    /// TCP port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT, value_parser = parse_port)]
    pub port: u16,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,

    /// Stay attached to the terminal instead of daemonizing
    #[arg(long)]
    pub foreground: bool,

    /// PID/lock file path
    #[arg(long, value_name = "PATH", default_value = "/tmp/yashd.pid")]
    pub pid_file: PathBuf,

    /// Log file path
    #[arg(long, value_name = "PATH", default_value = "/tmp/yashd.log")]
    pub log_file: PathBuf,

    /// Wrap daemon-originated replies in sentinel frames
    #[arg(long)]
    pub framed: bool,
}

fn parse_port(raw: &str) -> Result<u16, String> {
    let port: u16 = raw.parse().map_err(|_| format!("invalid port: {raw}"))?;
    if port < MIN_PORT {
        return Err(format!("port must be between {MIN_PORT} and 65535"));
    }
    Ok(port)
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
