// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::parse;

#[test]
fn single_word_command() {
    let job = parse("echo").unwrap();
    assert_eq!(job.left.argv, ["echo"]);
    assert!(job.right.is_none());
    assert!(!job.pipe);
    assert!(!job.background);
}

#[test]
fn command_with_args() {
    let job = parse("ls -la /tmp").unwrap();
    assert_eq!(job.left.argv, ["ls", "-la", "/tmp"]);
}

#[test]
fn empty_line_parses_to_empty_job() {
    let job = parse("").unwrap();
    assert!(job.left.is_empty());
    assert!(job.tokens.is_empty());
}

#[test]
fn raw_line_is_preserved() {
    let job = parse("echo  hello").unwrap();
    assert_eq!(job.line, "echo  hello");
}

#[test]
fn background_marker_sets_flag() {
    let job = parse("sleep 30 &").unwrap();
    assert!(job.background);
    assert_eq!(job.left.argv, ["sleep", "30"]);
}
