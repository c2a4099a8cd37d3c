// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP listener and the dispatcher loop that binds sessions to threads.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::os::fd::{AsFd, AsRawFd};
use std::sync::Arc;
use std::thread;

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::socket::{
    bind, listen, setsockopt, socket, sockopt, AddressFamily, Backlog, SockFlag, SockType,
    SockaddrIn,
};
use thiserror::Error;
use tracing::{error, info, warn};

use yash_wire::FramingMode;

use crate::registry::ServantRegistry;
use crate::session::{serve, ServantCtx};
use crate::signals::SignalFlags;

/// Pending connections the kernel queues for us.
const LISTEN_BACKLOG: i32 = 5;

/// Accept-loop poll interval; bounds shutdown observation latency.
const ACCEPT_POLL_MS: u16 = 500;

#[derive(Debug, Error)]
pub enum SocketError {
    #[error("cannot create listener socket: {0}")]
    Create(#[source] Errno),

    #[error("cannot bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: Errno,
    },

    #[error("cannot listen: {0}")]
    Listen(#[source] Errno),
}

/// Create the listening endpoint: `INADDR_ANY`, SO_REUSEADDR, backlog 5.
pub fn bind_listener(port: u16) -> Result<TcpListener, SocketError> {
    let fd = socket(AddressFamily::Inet, SockType::Stream, SockFlag::empty(), None)
        .map_err(SocketError::Create)?;
    setsockopt(&fd, sockopt::ReuseAddr, &true).map_err(SocketError::Create)?;

    let addr = SockaddrIn::new(0, 0, 0, 0, port);
    bind(fd.as_raw_fd(), &addr).map_err(|source| SocketError::Bind { port, source })?;

    let backlog = Backlog::new(LISTEN_BACKLOG).map_err(SocketError::Listen)?;
    listen(&fd, backlog).map_err(SocketError::Listen)?;

    info!(port, "listening");
    Ok(TcpListener::from(fd))
}

/// The accept loop: one servant thread per connection.
pub struct Dispatcher {
    listener: TcpListener,
    registry: Arc<ServantRegistry>,
    signals: SignalFlags,
    framing: FramingMode,
}

impl Dispatcher {
    pub fn new(
        listener: TcpListener,
        registry: Arc<ServantRegistry>,
        signals: SignalFlags,
        framing: FramingMode,
    ) -> Self {
        Self { listener, registry, signals, framing }
    }

    /// Run until the shutdown flag is raised, then stop every servant.
    ///
    /// The dispatcher never blocks on client I/O: everything after `accept`
    /// happens on the servant thread.
    pub fn run(&self) {
        use std::sync::atomic::Ordering;

        loop {
            if self.signals.shutdown.load(Ordering::SeqCst) {
                info!("shutdown requested");
                break;
            }
            match self.poll_accept() {
                Ok(None) => continue,
                Ok(Some((stream, peer))) => self.dispatch(stream, peer),
                Err(e) => {
                    error!("accept failed: {e}");
                    thread::sleep(std::time::Duration::from_millis(100));
                }
            }
        }

        self.registry.shutdown_all();
        info!("dispatcher stopped");
    }

    fn poll_accept(&self) -> io::Result<Option<(TcpStream, SocketAddr)>> {
        let mut fds = [PollFd::new(self.listener.as_fd(), PollFlags::POLLIN)];
        match poll(&mut fds, PollTimeout::from(ACCEPT_POLL_MS)) {
            Ok(0) => return Ok(None),
            Ok(_) => {}
            Err(Errno::EINTR) => return Ok(None),
            Err(errno) => return Err(io::Error::from(errno)),
        }
        match self.listener.accept() {
            Ok(conn) => Ok(Some(conn)),
            Err(e) if matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock) => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Reserve a registry slot and spawn the servant thread.
    fn dispatch(&self, stream: TcpStream, peer: SocketAddr) {
        let registry_socket = match stream.try_clone() {
            Ok(clone) => clone,
            Err(e) => {
                warn!(%peer, "cannot clone socket for registry: {e}");
                return;
            }
        };

        let Some((slot, run)) = self.registry.reserve(registry_socket) else {
            warn!(%peer, "servant table full; rejecting connection");
            return;
        };

        let ctx = ServantCtx {
            registry: Arc::clone(&self.registry),
            slot,
            run,
            signals: self.signals.clone(),
            framing: self.framing,
        };

        let spawned = thread::Builder::new()
            .name(format!("servant-{slot}"))
            .spawn(move || serve(stream, peer, ctx));

        match spawned {
            Ok(handle) => self.registry.attach(slot, handle),
            Err(e) => {
                // Thread failure is confined to this connection; the code
                // is logged, not exited with.
                warn!(
                    %peer,
                    slot,
                    code = crate::exit::EXIT_THREAD,
                    "cannot spawn servant thread: {e}"
                );
                self.registry.release(slot);
            }
        }
    }
}
