//! Mock transport for deterministic testing of the protocol engine.
//!
//! [`MockTransport`] implements the [`Transport`] trait with pre-loaded
//! command/reply pairs, plus an [`UnsolicitedInjector`] handle that can push
//! `+RCV=` lines (or any other bytes) into the receive path while the driver
//! is running -- the way a real module announces inbound radio packets at
//! arbitrary times.
//!
//! # Example
//!
//! ```
//! use rylr_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! // Pre-load: when the driver sends this command, return this reply.
//! mock.expect(b"AT+ADDRESS?\r\n", b"+ADDRESS=5\r\n");
//! // Grab an injector before handing the mock to the driver.
//! let injector = mock.injector();
//! injector.inject(b"+RCV=3,4,ping,-42,11\r\n");
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rylr_core::error::{Error, Result};
use rylr_core::transport::Transport;

/// A pre-loaded command/reply pair for the mock transport.
#[derive(Debug, Clone)]
struct Expectation {
    /// The exact bytes we expect to be sent.
    request: Vec<u8>,
    /// The bytes to queue for `receive()` when the matching request arrives.
    response: Vec<u8>,
}

/// Handle for pushing unsolicited bytes into a [`MockTransport`] after it
/// has been moved into the driver.
///
/// Injected bytes are returned by `receive()` ahead of any not-yet-read
/// reply bytes, modeling a packet announcement that lands while a command
/// exchange is in flight.
#[derive(Clone)]
pub struct UnsolicitedInjector {
    queue: Arc<Mutex<VecDeque<Vec<u8>>>>,
}

impl UnsolicitedInjector {
    /// Queue bytes for the next `receive()` call.
    pub fn inject(&self, data: &[u8]) {
        self.queue.lock().unwrap().push_back(data.to_vec());
    }
}

/// A mock [`Transport`] for testing the driver without hardware.
///
/// Expectations are consumed in order: `send()` records the sent data,
/// matches it against the next expectation, and queues the paired reply for
/// subsequent `receive()` calls. When nothing is queued, `receive()` returns
/// [`Error::Timeout`], which the reader loop treats as "no data yet".
pub struct MockTransport {
    /// Ordered queue of expected command/reply pairs.
    expectations: VecDeque<Expectation>,
    /// Bytes waiting to be returned by `receive()`.
    pending: VecDeque<u8>,
    /// Unsolicited bytes shared with [`UnsolicitedInjector`] handles.
    unsolicited: Arc<Mutex<VecDeque<Vec<u8>>>>,
    /// Whether the transport is "connected".
    connected: bool,
    /// Log of all bytes sent through this transport.
    sent_log: Vec<Vec<u8>>,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            expectations: VecDeque::new(),
            pending: VecDeque::new(),
            unsolicited: Arc::new(Mutex::new(VecDeque::new())),
            connected: true,
            sent_log: Vec::new(),
        }
    }

    /// Add an expected command/reply pair.
    ///
    /// When `send()` is called with data matching `request`, subsequent
    /// `receive()` calls will return `response`. The response may contain
    /// several lines (e.g. a `+RCV=` announcement interleaved before the
    /// actual reply).
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.expectations.push_back(Expectation {
            request: request.to_vec(),
            response: response.to_vec(),
        });
    }

    /// Return an injector handle for pushing unsolicited bytes while the
    /// transport is owned by the driver.
    pub fn injector(&self) -> UnsolicitedInjector {
        UnsolicitedInjector {
            queue: Arc::clone(&self.unsolicited),
        }
    }

    /// Return a reference to all data that has been sent through this
    /// transport. Each element is the byte slice from one `send()` call.
    pub fn sent_data(&self) -> &[Vec<u8>] {
        &self.sent_log
    }

    /// Return the number of expectations that have not yet been consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.expectations.len()
    }

    /// Set the connected state of the mock transport.
    ///
    /// When set to `false`, subsequent `send()` and `receive()` calls will
    /// return [`Error::NotConnected`].
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Move any injected unsolicited bytes to the front of the pending queue.
    fn drain_unsolicited(&mut self) {
        let mut queue = self.unsolicited.lock().unwrap();
        // Front-load in arrival order: an announcement that landed first is
        // read first, ahead of reply bytes still waiting in `pending`.
        while let Some(data) = queue.pop_back() {
            for &b in data.iter().rev() {
                self.pending.push_front(b);
            }
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        self.sent_log.push(data.to_vec());

        if let Some(expectation) = self.expectations.pop_front() {
            if data != expectation.request.as_slice() {
                return Err(Error::Protocol(format!(
                    "unexpected send data: expected {:?}, got {:?}",
                    String::from_utf8_lossy(&expectation.request),
                    String::from_utf8_lossy(data),
                )));
            }
            self.pending.extend(expectation.response.iter());
            Ok(())
        } else {
            Err(Error::Protocol(
                "no more expectations in mock transport".into(),
            ))
        }
    }

    async fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        self.drain_unsolicited();

        if self.pending.is_empty() {
            return Err(Error::Timeout);
        }

        let mut n = 0;
        while n < buf.len() {
            match self.pending.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        self.pending.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
