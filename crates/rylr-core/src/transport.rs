//! Transport trait for module communication.
//!
//! The [`Transport`] trait abstracts over the physical link to the LoRa
//! module. Implementations exist for serial ports (`rylr-transport`) and for
//! scripted mocks (`rylr-test-harness`).
//!
//! The protocol engine in the `rylr` crate operates on a `Transport` rather
//! than directly on a serial port, enabling both real hardware control and
//! deterministic unit testing with `MockTransport`.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level transport to a LoRa module.
///
/// Implementations handle buffering and error classification at the physical
/// layer. Line framing and AT command structure are handled by the protocol
/// engine that consumes this trait.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the module.
    ///
    /// Implementations should block until all bytes have been written to the
    /// underlying transport (UART TX buffer, pipe, etc.).
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes from the module into the provided buffer.
    ///
    /// Returns the number of bytes actually read. Will wait up to `timeout`
    /// for data to arrive; returns [`Error::Timeout`](crate::error::Error::Timeout)
    /// if no data is received within the deadline. A timeout here is not an
    /// error condition for the reader loop -- it simply means the module has
    /// nothing to say yet.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the transport connection.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}
