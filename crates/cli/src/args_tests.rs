// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use yare::parameterized;

use super::Args;

#[test]
fn host_is_required() {
    assert!(Args::try_parse_from(["yash"]).is_err());
}

#[test]
fn default_port() {
    let args = Args::parse_from(["yash", "localhost"]);
    assert_eq!(args.host, "localhost");
    assert_eq!(args.port, 3826);
}

#[parameterized(
    short = { &["yash", "-p", "4100", "example.org"] },
    long = { &["yash", "--port", "4100", "example.org"] },
)]
fn port_flag(argv: &[&str]) {
    let args = Args::parse_from(argv);
    assert_eq!(args.port, 4100);
    assert_eq!(args.host, "example.org");
}
