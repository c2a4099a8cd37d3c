// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The servant loop and the job threads it spawns.

use std::fs::File;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::os::fd::AsFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::signal::{killpg, Signal};
use nix::sys::wait::waitpid;
use nix::unistd::{pipe, Pid};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use yash_shell::{parse, Job, JobStatus};
use yash_wire::{Control, Decoder, FramingMode, Request};

use crate::jobs::launcher::{self, LaunchIo};
use crate::jobs::supervisor::{self, ForegroundOutcome};
use crate::registry::ServantRegistry;
use crate::signals::SignalFlags;

use super::{ClientWriter, JobThread, Session, SessionState};

/// Servant poll interval; also bounds shutdown-latch observation latency.
const POLL_INTERVAL_MS: u16 = 500;

/// Everything a servant thread needs besides its socket.
pub struct ServantCtx {
    pub registry: Arc<ServantRegistry>,
    pub slot: usize,
    pub run: Arc<AtomicBool>,
    pub signals: SignalFlags,
    pub framing: FramingMode,
}

/// Body of one servant thread; returns when the client is gone or the
/// daemon shuts down. Always releases its registry slot.
pub fn serve(stream: TcpStream, peer: SocketAddr, ctx: ServantCtx) {
    let writer_stream = match stream.try_clone() {
        Ok(s) => s,
        Err(e) => {
            warn!(%peer, "cannot clone client socket: {e}");
            ctx.registry.release(ctx.slot);
            return;
        }
    };

    let session = Arc::new(Session {
        peer,
        writer: ClientWriter::new(writer_stream, ctx.framing),
        state: Mutex::new(SessionState::default()),
    });

    info!(%peer, slot = ctx.slot, "client connected");
    session.writer.prompt();

    run_loop(&stream, &session, &ctx);

    let hard_kill = ctx.signals.shutdown.load(Ordering::SeqCst);
    teardown(&session, hard_kill);
    ctx.registry.release(ctx.slot);
    info!(%peer, slot = ctx.slot, "client disconnected");
}

fn run_loop(mut stream: &TcpStream, session: &Arc<Session>, ctx: &ServantCtx) {
    let mut decoder = Decoder::new();
    let mut buf = [0u8; 4096];

    while ctx.run.load(Ordering::SeqCst) {
        // Reap whatever changed since the last pass; SIGCHLD only wakes
        // this up early, correctness never depends on the flag.
        ctx.signals.child.store(false, Ordering::SeqCst);
        supervisor::maintain(session);
        prune_job_threads(session);

        match wait_readable(stream) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(e) => {
                warn!(peer = %session.peer, "poll failed: {e}");
                break;
            }
        }

        let n = match stream.read(&mut buf) {
            Ok(0) => {
                debug!(peer = %session.peer, "client hung up");
                break;
            }
            Ok(n) => n,
            Err(e) if matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock) => {
                continue
            }
            Err(e) => {
                debug!(peer = %session.peer, "read failed: {e}");
                break;
            }
        };

        decoder.feed(&buf[..n]);
        let mut open = true;
        while let Some(decoded) = decoder.next_request() {
            match decoded {
                Ok(request) => {
                    if !handle_request(session, request) {
                        open = false;
                        break;
                    }
                }
                Err(e) => debug!(peer = %session.peer, "dropping frame: {e}"),
            }
        }
        if !open {
            break;
        }
    }
}

/// One bounded poll for readability (POLLHUP/POLLERR count: the following
/// read surfaces them).
fn wait_readable(stream: &TcpStream) -> io::Result<bool> {
    let mut fds = [PollFd::new(stream.as_fd(), PollFlags::POLLIN)];
    match poll(&mut fds, PollTimeout::from(POLL_INTERVAL_MS)) {
        Ok(0) => Ok(false),
        Ok(_) => Ok(true),
        Err(Errno::EINTR) => Ok(false),
        Err(errno) => Err(io::Error::from(errno)),
    }
}

/// Returns false when the session should close.
fn handle_request(session: &Arc<Session>, request: Request) -> bool {
    match request {
        Request::Ctl(Control::Interrupt) => {
            supervisor::signal_foreground(session, Signal::SIGINT);
            true
        }
        Request::Ctl(Control::Suspend) => {
            supervisor::signal_foreground(session, Signal::SIGTSTP);
            true
        }
        Request::Ctl(Control::Eof) => false,
        Request::Cmd(payload) => {
            handle_command(session, &payload);
            true
        }
    }
}

fn handle_command(session: &Arc<Session>, payload: &str) {
    // While a foreground job runs, command payloads are its stdin. The
    // write happens outside the lock: the pipe can back up if the job
    // stops reading, and the session mutex must not wait on it.
    let fg_pipe = {
        let state = session.state.lock();
        if state.fg_wait.is_some() {
            match state.fg_stdin.as_ref().map(File::try_clone) {
                Some(Ok(pipe)) => Some(pipe),
                Some(Err(e)) => {
                    debug!("cannot clone foreground stdin pipe: {e}");
                    return;
                }
                None => {
                    debug!("foreground job has no stdin pipe; input dropped");
                    return;
                }
            }
        } else {
            None
        }
    };
    if let Some(mut pipe) = fg_pipe {
        if let Err(e) = writeln!(pipe, "{payload}") {
            debug!("foreground stdin write failed: {e}");
            session.state.lock().fg_stdin = None;
        }
        return;
    }

    let job = match parse(payload) {
        Ok(job) => job,
        Err(e) => {
            session.writer.error(&e);
            session.writer.prompt();
            return;
        }
    };

    if job.left.is_empty() {
        session.writer.prompt();
        return;
    }

    match builtin_of(&job) {
        Some(Builtin::Jobs) => {
            supervisor::jobs_builtin(session);
            session.writer.prompt();
        }
        Some(Builtin::Bg) => {
            supervisor::bg_builtin(session);
            session.writer.prompt();
        }
        Some(Builtin::Fg) => match supervisor::fg_resume(session) {
            Some((number, gpid)) => spawn_fg_wait(session, number, gpid),
            None => session.writer.prompt(),
        },
        None => start_job(session, job),
    }
}

enum Builtin {
    Jobs,
    Fg,
    Bg,
}

/// A builtin is a bare single word: any redirection, pipe, or `&` turns it
/// back into an external command.
fn builtin_of(job: &Job) -> Option<Builtin> {
    if job.pipe || job.background {
        return None;
    }
    let cmd = &job.left;
    if cmd.stdin.is_some() || cmd.stdout.is_some() || cmd.stderr.is_some() {
        return None;
    }
    match cmd.argv.as_slice() {
        [word] => match word.as_str() {
            "jobs" => Some(Builtin::Jobs),
            "fg" => Some(Builtin::Fg),
            "bg" => Some(Builtin::Bg),
            _ => None,
        },
        _ => None,
    }
}

/// Register the job and hand it to a fresh job thread.
fn start_job(session: &Arc<Session>, job: Job) {
    let number = {
        let mut state = session.state.lock();
        match state.jobs.insert(job) {
            Some(number) => number,
            None => {
                drop(state);
                session.writer.error("too many jobs");
                session.writer.prompt();
                return;
            }
        }
    };

    let run = Arc::new(AtomicBool::new(true));
    let spawned = thread::Builder::new().name(format!("job-{number}")).spawn({
        let session = Arc::clone(session);
        let run = Arc::clone(&run);
        move || drive_job(&session, number, &run)
    });

    match spawned {
        Ok(handle) => {
            let mut state = session.state.lock();
            state.threads.push(JobThread { number, run, handle });
        }
        Err(e) => {
            warn!("cannot create job thread: {e}");
            session.state.lock().jobs.remove(number);
            session.writer.error(format_args!("cannot create job thread: {e}"));
            session.writer.prompt();
        }
    }
}

/// Job-thread body: launch the children, then either supervise the
/// foreground wait or leave the job to the maintenance pass.
fn drive_job(session: &Arc<Session>, number: usize, run: &AtomicBool) {
    let (job, fg_read) = {
        let mut state = session.state.lock();
        let Some(job) = state.jobs.get(number) else { return };
        let job = job.clone();

        let mut fg_read = None;
        if !job.background && job.left.stdin.is_none() {
            match pipe() {
                Ok((read_end, write_end)) => {
                    state.fg_stdin = Some(File::from(write_end));
                    fg_read = Some(read_end);
                }
                Err(errno) => warn!(%errno, "cannot create foreground stdin pipe"),
            }
        }
        (job, fg_read)
    };

    let io = LaunchIo { socket: session.writer.socket(), fg_stdin: fg_read };
    let gpid = match launcher::launch(&job, io) {
        Ok(gpid) => gpid,
        Err(e) => {
            warn!(number, code = crate::exit::EXIT_COMMAND, "job failed to launch: {e}");
            {
                let mut state = session.state.lock();
                state.jobs.remove(number);
                state.fg_stdin = None;
            }
            session.writer.error(&e);
            session.writer.prompt();
            return;
        }
    };

    {
        let mut state = session.state.lock();
        if let Some(job) = state.jobs.get_mut(number) {
            job.gpid = gpid;
            job.status = JobStatus::Running;
            job.live = job.expected_children();
        }
    }
    debug!(number, gpid, background = job.background, "job started");

    if job.background {
        session.writer.prompt();
        return;
    }

    session.state.lock().fg_wait = Some(number);
    foreground_wait(session, number, gpid, run);
}

/// Blocking foreground supervision with terminal handover; shared by fresh
/// launches and `fg` resumes. `fg_wait` must already name this job.
fn foreground_wait(session: &Arc<Session>, number: usize, gpid: i32, run: &AtomicBool) {
    launcher::give_terminal(gpid);
    let outcome = supervisor::wait_foreground(session, number, gpid, run);
    launcher::take_terminal();

    {
        let mut state = session.state.lock();
        state.fg_wait = None;
        state.fg_stdin = None;
        if outcome == ForegroundOutcome::Done {
            state.jobs.remove(number);
        }
    }
    session.writer.prompt();
}

/// Spawn the foreground wait for a job resumed by `fg`.
fn spawn_fg_wait(session: &Arc<Session>, number: usize, gpid: i32) {
    let run = Arc::new(AtomicBool::new(true));
    let spawned = thread::Builder::new().name(format!("job-{number}-fg")).spawn({
        let session = Arc::clone(session);
        let run = Arc::clone(&run);
        move || {
            session.state.lock().fg_wait = Some(number);
            foreground_wait(&session, number, gpid, &run);
        }
    });

    match spawned {
        Ok(handle) => {
            let mut state = session.state.lock();
            state.threads.push(JobThread { number, run, handle });
        }
        Err(e) => {
            warn!("cannot create job thread: {e}");
            session.writer.error(format_args!("cannot create job thread: {e}"));
            session.writer.prompt();
        }
    }
}

/// Join job threads that already finished so the table stays small.
fn prune_job_threads(session: &Session) {
    let finished: Vec<JobThread> = {
        let mut state = session.state.lock();
        let mut finished = Vec::new();
        let mut keep = Vec::new();
        for record in state.threads.drain(..) {
            if record.handle.is_finished() {
                finished.push(record);
            } else {
                keep.push(record);
            }
        }
        state.threads = keep;
        finished
    };
    for record in finished {
        let _ = record.handle.join();
    }
}

/// Session teardown: stop the jobs, then join every job thread.
///
/// On client EOF or hangup the groups get SIGHUP (and SIGCONT, so stopped
/// jobs can act on it); on daemon shutdown they get SIGKILL. A detached
/// reaper collects whatever the job threads were not waiting on.
fn teardown(session: &Arc<Session>, hard_kill: bool) {
    let (threads, groups) = {
        let mut state = session.state.lock();
        state.fg_stdin = None;
        let groups: Vec<i32> = state
            .jobs
            .iter()
            .filter(|j| !j.is_done() && j.gpid != 0)
            .map(|j| j.gpid)
            .collect();
        let threads: Vec<JobThread> = state.threads.drain(..).collect();
        (threads, groups)
    };

    for record in &threads {
        record.run.store(false, Ordering::SeqCst);
    }

    let signal = if hard_kill { Signal::SIGKILL } else { Signal::SIGHUP };
    for &gpid in &groups {
        let group = Pid::from_raw(gpid);
        if let Err(errno) = killpg(group, signal) {
            debug!(gpid, %errno, "cannot signal job group at teardown");
        }
        if !hard_kill {
            let _ = killpg(group, Signal::SIGCONT);
        }
    }

    if !groups.is_empty() {
        let spawned = thread::Builder::new().name("job-reaper".into()).spawn(move || {
            for gpid in groups {
                loop {
                    match waitpid(Pid::from_raw(-gpid), None) {
                        Ok(_) => {}
                        Err(Errno::EINTR) => {}
                        Err(_) => break,
                    }
                }
            }
        });
        if let Err(e) = spawned {
            warn!("cannot spawn teardown reaper: {e}");
        }
    }

    for record in threads {
        let _ = record.handle.join();
    }
}

#[cfg(test)]
#[path = "servant_tests.rs"]
mod tests;
