// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session specs: prompts, command round-trips, control messages.

use std::time::Duration;

use serial_test::serial;

use crate::prelude::Daemon;

#[test]
#[serial]
fn echo_round_trip_ends_at_a_fresh_prompt() {
    let daemon = Daemon::start();
    let mut shell = daemon.session();

    shell.send("CMD echo hello\n");
    let out = shell.expect("\n# ");
    assert!(out.contains("hello\n"), "got: {out:?}");

    // Job table is empty afterward.
    shell.send("CMD jobs\n");
    let out = shell.expect("\n# ");
    assert!(!out.contains("Running"), "job table not empty: {out:?}");

    shell.send("CTL d\n");
}

#[test]
#[serial]
fn parser_error_is_relayed_and_nothing_runs() {
    let daemon = Daemon::start();
    let mut shell = daemon.session();

    shell.send("CMD > out\n");
    let out = shell.expect("\n# ");
    assert!(
        out.contains("-yash: command should not start with >"),
        "got: {out:?}"
    );

    shell.send("CTL d\n");
}

#[test]
#[serial]
fn interrupt_kills_cat_but_not_the_daemon() {
    let mut daemon = Daemon::start();
    let mut shell = daemon.session();

    shell.send("CMD cat\n");
    std::thread::sleep(Duration::from_millis(400));

    shell.send("CTL c\n");
    shell.expect("\n# ");

    assert!(daemon.alive(), "daemon died with the foreground job");
    shell.send("CMD echo still-here\n");
    let out = shell.expect("still-here\n");
    assert!(out.contains("still-here\n"));

    shell.send("CTL d\n");
}

#[test]
#[serial]
fn foreground_job_reads_relayed_input() {
    let daemon = Daemon::start();
    let mut shell = daemon.session();

    shell.send("CMD cat\n");
    std::thread::sleep(Duration::from_millis(400));

    shell.send("CMD marco\n");
    let out = shell.expect("marco\n");
    assert!(out.contains("marco\n"), "cat did not echo: {out:?}");

    shell.send("CTL c\n");
    shell.expect("\n# ");
    shell.send("CTL d\n");
}

#[test]
#[serial]
fn eof_closes_the_session_and_daemon_accepts_again() {
    let mut daemon = Daemon::start();
    let mut shell = daemon.session();

    shell.send("CTL d\n");
    assert!(shell.closed(), "daemon did not close the socket on CTL d");

    // A new connection still works.
    let mut again = daemon.session();
    again.send("CMD echo back\n");
    let out = again.expect("back\n");
    assert!(out.contains("back\n"));
    again.send("CTL d\n");

    assert!(daemon.alive());
}

#[test]
#[serial]
fn malformed_frames_are_dropped_silently() {
    let daemon = Daemon::start();
    let mut shell = daemon.session();

    shell.send("BOGUS nonsense\n");
    let noise = shell.drain_for(Duration::from_millis(400));
    assert!(!noise.contains("-yash"), "malformed frame produced output: {noise:?}");

    // Session is still usable.
    shell.send("CMD echo fine\n");
    let out = shell.expect("fine\n");
    assert!(out.contains("fine\n"));

    shell.send("CTL d\n");
}
