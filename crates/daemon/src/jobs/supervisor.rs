// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job supervision: foreground waits, status maintenance, and the
//! `jobs`/`fg`/`bg` builtins.
//!
//! Each job is reaped by exactly one thread at a time: a foreground job by
//! the job thread blocked in `waitpid` on its group, everything else by the
//! servant's maintenance pass. The session mutex is never held across a
//! blocking wait or a socket write.

use std::sync::atomic::{AtomicBool, Ordering};

use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use tracing::{debug, warn};

use yash_shell::JobStatus;

use crate::session::Session;

/// Outcome of a blocking foreground wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForegroundOutcome {
    /// Every child of the group was reaped.
    Done,
    /// The group was stopped; the job stays in the table.
    Stopped,
}

/// Block until the job's group is no longer in the foreground.
///
/// Loops `waitpid` on the exact group with stop/continue reporting. Exit
/// and signal terminations count down the expected children; a stop
/// returns control (and the terminal) to the caller with the job left in
/// the table. A cleared `run` latch ends the wait at the next `waitpid`
/// return; teardown signals the group precisely so that return happens.
pub fn wait_foreground(
    session: &Session,
    number: usize,
    gpid: i32,
    run: &AtomicBool,
) -> ForegroundOutcome {
    let flags = WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;
    loop {
        if !run.load(Ordering::SeqCst) {
            return ForegroundOutcome::Stopped;
        }
        match waitpid(Pid::from_raw(-gpid), Some(flags)) {
            Ok(WaitStatus::Exited(pid, code)) => {
                debug!(%pid, code, "foreground child exited");
                if count_down(session, number) == 0 {
                    return ForegroundOutcome::Done;
                }
            }
            Ok(WaitStatus::Signaled(pid, sig, _)) => {
                debug!(%pid, signal = %sig, "foreground child killed");
                if count_down(session, number) == 0 {
                    return ForegroundOutcome::Done;
                }
            }
            Ok(WaitStatus::Stopped(pid, sig)) => {
                debug!(%pid, signal = %sig, "foreground job stopped");
                set_status(session, number, JobStatus::Stopped);
                return ForegroundOutcome::Stopped;
            }
            Ok(WaitStatus::Continued(_)) => {
                set_status(session, number, JobStatus::Running);
            }
            Ok(_) => {}
            Err(Errno::EINTR) => {}
            Err(Errno::ECHILD) => {
                // Nothing left to reap; somebody else got there first.
                set_status(session, number, JobStatus::Done);
                return ForegroundOutcome::Done;
            }
            Err(errno) => {
                warn!(gpid, %errno, "foreground wait failed; marking job done");
                set_status(session, number, JobStatus::Done);
                return ForegroundOutcome::Done;
            }
        }
    }
}

/// Non-blocking status sweep over every job not owned by a foreground wait.
///
/// Exits and signal terminations count jobs down to `Done`, which emits the
/// job's status line and removes it; stops and continues update the status
/// in place. Lines are sent after the lock is released.
pub fn maintain(session: &Session) {
    let flags = WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;
    let mut lines: Vec<String> = Vec::new();

    {
        let mut state = session.state.lock();
        let fg_wait = state.fg_wait;
        let numbers: Vec<usize> = state
            .jobs
            .iter()
            .filter(|j| !j.is_done() && j.gpid != 0 && Some(j.number) != fg_wait)
            .map(|j| j.number)
            .collect();

        for number in numbers {
            // The `+` mark is decided while the job still counts as live.
            let was_current = state.jobs.current_number() == Some(number);
            let Some(job) = state.jobs.get(number) else { continue };
            let gpid = job.gpid;

            let mut done = false;
            loop {
                match waitpid(Pid::from_raw(-gpid), Some(flags)) {
                    Ok(WaitStatus::StillAlive) => break,
                    Ok(WaitStatus::Exited(..)) | Ok(WaitStatus::Signaled(..)) => {
                        if let Some(job) = state.jobs.get_mut(number) {
                            job.live = job.live.saturating_sub(1);
                            if job.live == 0 {
                                job.status = JobStatus::Done;
                                done = true;
                            }
                        }
                        if done {
                            break;
                        }
                    }
                    Ok(WaitStatus::Stopped(..)) => {
                        if let Some(job) = state.jobs.get_mut(number) {
                            job.status = JobStatus::Stopped;
                        }
                    }
                    Ok(WaitStatus::Continued(_)) => {
                        if let Some(job) = state.jobs.get_mut(number) {
                            job.status = JobStatus::Running;
                        }
                    }
                    Ok(_) => {}
                    Err(Errno::EINTR) => {}
                    Err(Errno::ECHILD) => {
                        done = true;
                        break;
                    }
                    Err(errno) => {
                        warn!(gpid, %errno, "job wait failed; marking job done");
                        done = true;
                        break;
                    }
                }
            }

            if done {
                if let Some(mut job) = state.jobs.remove(number) {
                    job.status = JobStatus::Done;
                    job.gpid = 0;
                    lines.push(job.status_line(was_current));
                }
            }
        }
    }

    for line in lines {
        session.writer.send_line(&line);
    }
}

/// The `jobs` builtin: refresh statuses, then list Running/Stopped jobs.
pub fn jobs_builtin(session: &Session) {
    maintain(session);

    let lines: Vec<String> = {
        let state = session.state.lock();
        let current = state.jobs.current_number();
        state
            .jobs
            .iter()
            .filter(|j| !j.is_done())
            .map(|j| j.status_line(current == Some(j.number)))
            .collect()
    };

    for line in lines {
        session.writer.send_line(&line);
    }
}

/// The `bg` builtin: continue the newest stopped job in the background.
pub fn bg_builtin(session: &Session) {
    let line = {
        let mut state = session.state.lock();
        let Some(number) = state.jobs.bg_candidate() else {
            drop(state);
            session.writer.error("bg: no current job");
            return;
        };
        let current = state.jobs.current_number() == Some(number);
        let Some(job) = state.jobs.get_mut(number) else { return };
        if let Err(errno) = killpg(Pid::from_raw(job.gpid), Signal::SIGCONT) {
            warn!(gpid = job.gpid, %errno, "bg: cannot continue job");
        }
        job.background = true;
        job.status = JobStatus::Running;
        job.status_line(current)
    };
    session.writer.send_line(&line);
}

/// Resolve the `fg` builtin's target and move it to the foreground.
///
/// Returns the resumed job's number and group so the caller can run the
/// blocking foreground wait on a job thread, or `None` after reporting
/// "no current job".
pub fn fg_resume(session: &Session) -> Option<(usize, i32)> {
    let (number, gpid, line) = {
        let mut state = session.state.lock();
        let Some(number) = state.jobs.fg_candidate() else {
            drop(state);
            session.writer.error("fg: no current job");
            return None;
        };
        let current = state.jobs.current_number() == Some(number);
        let job = state.jobs.get_mut(number)?;
        if let Err(errno) = killpg(Pid::from_raw(job.gpid), Signal::SIGCONT) {
            warn!(gpid = job.gpid, %errno, "fg: cannot continue job");
        }
        job.background = false;
        job.status = JobStatus::Running;
        (number, job.gpid, job.status_line(current))
    };
    session.writer.send_line(&line);
    Some((number, gpid))
}

/// Deliver a client control signal to the newest live foreground job.
pub fn signal_foreground(session: &Session, signal: Signal) {
    let target = {
        let state = session.state.lock();
        state.jobs.foreground_target().map(|j| (j.number, j.gpid))
    };
    match target {
        Some((number, gpid)) => {
            debug!(number, gpid, %signal, "forwarding signal to job group");
            if let Err(errno) = killpg(Pid::from_raw(gpid), signal) {
                warn!(gpid, %errno, "cannot signal job group");
            }
        }
        None => debug!(%signal, "no foreground job to signal"),
    }
}

fn count_down(session: &Session, number: usize) -> usize {
    let mut state = session.state.lock();
    match state.jobs.get_mut(number) {
        Some(job) => {
            job.live = job.live.saturating_sub(1);
            if job.live == 0 {
                job.status = JobStatus::Done;
                job.gpid = 0;
            }
            job.live
        }
        None => 0,
    }
}

fn set_status(session: &Session, number: usize, status: JobStatus) {
    let mut state = session.state.lock();
    if let Some(job) = state.jobs.get_mut(number) {
        job.status = status;
        if status == JobStatus::Done {
            job.live = 0;
            job.gpid = 0;
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
