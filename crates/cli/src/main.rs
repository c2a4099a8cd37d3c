// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `yash` — terminal-side client for the shell daemon.
//!
//! Relays stdin lines as `CMD` requests and terminal signals as `CTL`
//! messages; everything the daemon sends back goes straight to stdout.

mod args;
mod client;

use std::process;

use clap::Parser;

use args::Args;

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            process::exit(if e.use_stderr() { 2 } else { 0 });
        }
    };

    if let Err(e) = client::run(&args.host, args.port) {
        eprintln!("yash: {e:#}");
        process::exit(1);
    }
}
