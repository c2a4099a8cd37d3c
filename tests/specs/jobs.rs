// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job-control specs: background jobs, pipelines, `jobs`/`fg`/`bg`.

use std::time::Duration;

use serial_test::serial;

use crate::prelude::Daemon;

#[test]
#[serial]
fn background_sleep_is_listed_by_jobs() {
    let daemon = Daemon::start();
    let mut shell = daemon.session();

    shell.send("CMD sleep 30 &\n");
    shell.expect("\n# ");

    shell.send("CMD jobs\n");
    let out = shell.expect("\n# ");
    assert!(
        out.contains("[1]+ Running\tsleep 30 \n"),
        "jobs output mismatch: {out:?}"
    );

    shell.send("CTL d\n");
}

#[test]
#[serial]
fn pipeline_with_redirection_lands_in_the_file() {
    let daemon = Daemon::start();
    let out_path = daemon.scratch_path("out");
    let mut shell = daemon.session();

    shell.send(&format!("CMD echo wanted | grep want > {}\n", out_path.display()));
    shell.expect("\n# ");

    let written = std::fs::read_to_string(&out_path).unwrap();
    assert_eq!(written, "wanted\n");

    // Job left the table once it completed.
    shell.send("CMD jobs\n");
    let out = shell.expect("\n# ");
    assert!(!out.contains("Running"), "job lingered: {out:?}");

    shell.send("CTL d\n");
}

#[test]
#[serial]
fn finished_background_job_reports_done() {
    let daemon = Daemon::start();
    let mut shell = daemon.session();

    shell.send("CMD sleep 1 &\n");
    shell.expect("\n# ");

    // The maintenance pass reports and clears it once the child exits.
    shell.expect("[1]+ Done\tsleep 1 \n");

    shell.send("CMD jobs\n");
    let out = shell.expect("\n# ");
    assert!(!out.contains("sleep 1"), "done job still listed: {out:?}");

    shell.send("CTL d\n");
}

#[test]
#[serial]
fn stop_then_bg_then_fg_round_trip() {
    let daemon = Daemon::start();
    let mut shell = daemon.session();

    shell.send("CMD sleep 5\n");
    std::thread::sleep(Duration::from_millis(400));

    // Stop the foreground job; the servant comes back with a prompt.
    shell.send("CTL z\n");
    shell.expect("\n# ");

    shell.send("CMD jobs\n");
    let out = shell.expect("\n# ");
    assert!(out.contains("[1]+ Stopped\tsleep 5 \n"), "got: {out:?}");

    // Continue it in the background.
    shell.send("CMD bg\n");
    let out = shell.expect("\n# ");
    assert!(out.contains("[1]+ Running\tsleep 5 \n"), "got: {out:?}");

    // Bring it back to the foreground and let it finish.
    shell.send("CMD fg\n");
    let out = shell.expect("\n# ");
    assert!(out.contains("[1]+ Running\tsleep 5 \n"), "got: {out:?}");

    shell.send("CMD jobs\n");
    let out = shell.expect("\n# ");
    assert!(!out.contains("sleep 5"), "job survived fg completion: {out:?}");

    shell.send("CTL d\n");
}

#[test]
#[serial]
fn fg_without_jobs_reports_no_current_job() {
    let daemon = Daemon::start();
    let mut shell = daemon.session();

    shell.send("CMD fg\n");
    let out = shell.expect("\n# ");
    assert!(out.contains("-yash: fg: no current job"), "got: {out:?}");

    shell.send("CMD bg\n");
    let out = shell.expect("\n# ");
    assert!(out.contains("-yash: bg: no current job"), "got: {out:?}");

    shell.send("CTL d\n");
}
