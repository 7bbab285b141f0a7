//! Response correlator: matches reply lines to pending commands.
//!
//! The module answers commands on the same ordered byte stream it uses for
//! unsolicited packet announcements, with no request ids. Correctness
//! therefore rests on one assumption: the module answers commands strictly
//! in the order they were issued. The correlator encodes that assumption as
//! a FIFO queue of one-shot waiters -- the Nth reply line resolves the Nth
//! waiter still queued, never out of order, never more than one.
//!
//! The correlator is owned by the driver handle and shared with the reader
//! task; it is the single synchronization point between concurrent command
//! callers and the reader loop.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::oneshot;
use tracing::{debug, trace};

/// One queued waiter: a registration id plus the one-shot channel the
/// suspended command call is waiting on.
struct Waiter {
    id: u64,
    tx: oneshot::Sender<String>,
}

#[derive(Default)]
struct Inner {
    queue: VecDeque<Waiter>,
    next_id: u64,
    /// The most recently received reply line, overwritten on each
    /// resolution. Kept for diagnostics; the waiter itself receives the
    /// text through its one-shot channel.
    last_response: Option<String>,
}

/// FIFO queue of pending-command waiters plus the most recent reply text.
#[derive(Default)]
pub struct Correlator {
    inner: Mutex<Inner>,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new waiter to the FIFO tail.
    ///
    /// Returns the registration id (for [`unregister`](Self::unregister))
    /// and the receiver the caller suspends on. Registration must happen no
    /// later than the command write so a fast reply cannot arrive before
    /// its waiter is queued.
    pub fn register(&self) -> (u64, oneshot::Receiver<String>) {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.queue.push_back(Waiter { id, tx });
        trace!(id, pending = inner.queue.len(), "waiter registered");
        (id, rx)
    }

    /// Remove a waiter that will never be resolved (write failure, command
    /// timeout). No-op if the waiter was already resolved.
    ///
    /// Without this, an abandoned slot would stay in the queue and the next
    /// reply line would resolve it instead of the command that actually
    /// caused the reply.
    pub fn unregister(&self, id: u64) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(pos) = inner.queue.iter().position(|w| w.id == id) {
            inner.queue.remove(pos);
            trace!(id, pending = inner.queue.len(), "waiter unregistered");
        }
    }

    /// Resolve the oldest pending waiter with a reply line.
    ///
    /// Stores `text` as the most recent response, pops the oldest waiter if
    /// any and signals it. When the queue is empty the line is discarded:
    /// the module produced output with nobody listening, which is not an
    /// error.
    pub fn resolve(&self, text: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.last_response = Some(text.to_string());
        match inner.queue.pop_front() {
            Some(waiter) => {
                trace!(id = waiter.id, line = text, "resolving waiter");
                // The receiver may have been dropped by a caller that gave
                // up between resolution and timeout cleanup; the line is
                // still consumed by this slot.
                let _ = waiter.tx.send(text.to_string());
            }
            None => {
                debug!(line = text, "reply line with no pending waiter, discarding");
            }
        }
    }

    /// Number of waiters currently queued.
    pub fn pending(&self) -> usize {
        self.inner.lock().unwrap().queue.len()
    }

    /// The most recently received reply line, if any.
    pub fn last_response(&self) -> Option<String> {
        self.inner.lock().unwrap().last_response.clone()
    }
}
