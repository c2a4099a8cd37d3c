// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle specs: singleton lock, shutdown, socket failures.

use std::process::Command;
use std::time::{Duration, Instant};

use serial_test::serial;

use crate::prelude::{free_port, yashd_bin, Daemon};

#[test]
#[serial]
fn second_instance_exits_three_within_a_second() {
    let daemon = Daemon::start();

    let started = Instant::now();
    let out = Command::new(yashd_bin())
        .arg("--foreground")
        .args(["--port", &free_port().to_string()])
        .arg("--pid-file")
        .arg(daemon.pid_file())
        .arg("--log-file")
        .arg(daemon.scratch_path("second.log"))
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(3));
    assert!(started.elapsed() < Duration::from_secs(1), "lock conflict was not prompt");
}

#[test]
#[serial]
fn pid_file_holds_the_daemon_pid() {
    let mut daemon = Daemon::start();
    assert!(daemon.alive());

    let recorded = std::fs::read_to_string(daemon.pid_file()).unwrap();
    let pid: u32 = recorded.trim().parse().unwrap();
    assert!(pid > 0);
}

#[test]
#[serial]
fn occupied_port_exits_four() {
    let holder = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
    let port = holder.local_addr().unwrap().port();

    let dir = tempfile::tempdir().unwrap();
    let out = Command::new(yashd_bin())
        .arg("--foreground")
        .args(["--port", &port.to_string()])
        .arg("--pid-file")
        .arg(dir.path().join("yashd.pid"))
        .arg("--log-file")
        .arg(dir.path().join("yashd.log"))
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(4));
}
