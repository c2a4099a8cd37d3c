// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide table of servant threads.
//!
//! Slots are packed by highest-watermark: a new servant always lands at the
//! current end of the table, and the table only shrinks past a contiguous
//! run of released slots at the tail. A running servant in the middle keeps
//! its index for its whole lifetime.

use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tracing::{debug, warn};

/// Most concurrently connected clients.
pub const MAX_SERVANTS: usize = 50;

/// One servant thread's registry row.
struct ServantRecord {
    /// Cooperative shutdown latch; cleared to make the servant exit at its
    /// next poll boundary.
    run: Arc<AtomicBool>,
    /// The client socket, kept for a hard shutdown of the connection.
    socket: TcpStream,
    /// Present once the thread is spawned.
    handle: Option<JoinHandle<()>>,
}

#[derive(Default)]
pub struct ServantRegistry {
    slots: Mutex<Vec<Option<ServantRecord>>>,
}

impl ServantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next slot for a new connection.
    ///
    /// Returns the slot index and the servant's run latch, or `None` when
    /// the table is at capacity.
    pub fn reserve(&self, socket: TcpStream) -> Option<(usize, Arc<AtomicBool>)> {
        let mut slots = self.slots.lock();
        if slots.len() >= MAX_SERVANTS {
            return None;
        }
        let run = Arc::new(AtomicBool::new(true));
        slots.push(Some(ServantRecord { run: Arc::clone(&run), socket, handle: None }));
        Some((slots.len() - 1, run))
    }

    /// Record the spawned thread's handle for its slot.
    pub fn attach(&self, index: usize, handle: JoinHandle<()>) {
        let mut slots = self.slots.lock();
        if let Some(Some(record)) = slots.get_mut(index) {
            record.handle = Some(handle);
        }
    }

    /// Release a slot, shrinking the watermark past any completed tail.
    ///
    /// Idempotent: a servant releases its own slot on exit, and shutdown
    /// may already have emptied it.
    pub fn release(&self, index: usize) {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get_mut(index) {
            if let Some(record) = slot.take() {
                record.run.store(false, Ordering::SeqCst);
                debug!(slot = index, "servant slot released");
            }
        }
        while matches!(slots.last(), Some(None)) {
            slots.pop();
        }
    }

    /// Slots currently occupied by running servants.
    pub fn in_use(&self) -> usize {
        self.slots.lock().iter().filter(|s| s.is_some()).count()
    }

    /// Current watermark (table length), for tests.
    pub fn watermark(&self) -> usize {
        self.slots.lock().len()
    }

    /// Stop every servant and join them, walking the table in reverse.
    ///
    /// Latches and sockets are taken under the lock; the joins happen
    /// outside it so no servant can block the registry.
    pub fn shutdown_all(&self) {
        let handles: Vec<(usize, JoinHandle<()>)> = {
            let mut slots = self.slots.lock();
            let mut taken = Vec::new();
            for (index, slot) in slots.iter_mut().enumerate().rev() {
                if let Some(record) = slot.take() {
                    record.run.store(false, Ordering::SeqCst);
                    let _ = record.socket.shutdown(Shutdown::Both);
                    if let Some(handle) = record.handle {
                        taken.push((index, handle));
                    }
                }
            }
            slots.clear();
            taken
        };

        for (index, handle) in handles {
            if handle.join().is_err() {
                warn!(slot = index, "servant thread panicked");
            }
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
