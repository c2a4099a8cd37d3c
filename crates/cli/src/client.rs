// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The relay loop: stdin and terminal signals in, server bytes out.

use std::io::{self, BufRead, Read, Write};
use std::net::TcpStream;
use std::process;
use std::thread;

use anyhow::{Context, Result};
use signal_hook::consts::{SIGINT, SIGTSTP};
use signal_hook::iterator::Signals;

use yash_wire::{Control, Request};

/// Connect and relay until `exit`, stdin EOF, or server disconnect.
pub fn run(host: &str, port: u16) -> Result<()> {
    let stream = TcpStream::connect((host, port))
        .with_context(|| format!("cannot connect to {host}:{port}"))?;

    spawn_signal_relay(&stream)?;
    spawn_output_relay(&stream)?;

    let mut writer = stream.try_clone().context("cannot clone connection")?;
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("cannot read stdin")?;
        if line.trim() == "exit" {
            break;
        }
        let request = Request::Cmd(line);
        if writer.write_all(request.encode().as_bytes()).is_err() {
            // Server went away; the output relay exits the process.
            return Ok(());
        }
    }

    // Stdin EOF (or `exit`): tell the daemon the session is over.
    let _ = writer.write_all(Request::Ctl(Control::Eof).encode().as_bytes());
    Ok(())
}

/// Ctrl-C / Ctrl-Z become control messages instead of stopping the client.
fn spawn_signal_relay(stream: &TcpStream) -> Result<()> {
    let mut writer = stream.try_clone().context("cannot clone connection")?;
    let mut signals = Signals::new([SIGINT, SIGTSTP]).context("cannot install signal handlers")?;

    thread::Builder::new()
        .name("signal-relay".into())
        .spawn(move || {
            for signal in signals.forever() {
                let control = match signal {
                    SIGINT => Control::Interrupt,
                    SIGTSTP => Control::Suspend,
                    _ => continue,
                };
                if writer.write_all(Request::Ctl(control).encode().as_bytes()).is_err() {
                    return;
                }
            }
        })
        .context("cannot spawn signal relay")?;
    Ok(())
}

/// Server bytes go straight to stdout; EOF means the daemon closed on us.
fn spawn_output_relay(stream: &TcpStream) -> Result<()> {
    let mut reader = stream.try_clone().context("cannot clone connection")?;

    thread::Builder::new()
        .name("output-relay".into())
        .spawn(move || {
            let mut stdout = io::stdout();
            let mut buf = [0u8; 4096];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if stdout.write_all(&buf[..n]).is_err() {
                            break;
                        }
                        let _ = stdout.flush();
                    }
                }
            }
            // Disconnect ends the whole client, including a blocked stdin read.
            process::exit(0);
        })
        .context("cannot spawn output relay")?;
    Ok(())
}
