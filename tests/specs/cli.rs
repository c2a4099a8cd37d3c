// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon CLI specs: usage, flag validation, exit codes.

use std::process::Command;

use crate::prelude::yashd_bin;

#[test]
fn help_exits_zero_with_usage() {
    let out = Command::new(yashd_bin()).arg("--help").output().unwrap();
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("Usage:"));
}

#[test]
fn unknown_flag_exits_two() {
    let out = Command::new(yashd_bin()).arg("--bogus").output().unwrap();
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Usage:"));
}

#[test]
fn privileged_port_exits_two() {
    let out = Command::new(yashd_bin()).args(["-p", "80"]).output().unwrap();
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn garbage_port_exits_two() {
    let out = Command::new(yashd_bin()).args(["--port", "shell"]).output().unwrap();
    assert_eq!(out.status.code(), Some(2));
}
