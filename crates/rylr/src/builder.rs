//! RylrBuilder -- fluent builder for constructing [`Rylr`] driver instances.
//!
//! Separates configuration from construction so that callers can choose the
//! serial port, initial radio parameters, receive-delivery mode, and
//! timeout policy before the reader task starts.
//!
//! # Example
//!
//! ```no_run
//! use rylr::RylrBuilder;
//!
//! # async fn example() -> rylr_core::Result<()> {
//! let driver = RylrBuilder::new()
//!     .serial_port("/dev/ttyUSB0")
//!     .frequency_mhz(868.1)
//!     .spreading_factor(9)
//!     .build()
//!     .await?;
//! driver.init().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use rylr_core::config::ModuleConfig;
use rylr_core::error::{Error, Result};
use rylr_core::transport::Transport;
use rylr_transport::SerialTransport;

use crate::driver::Rylr;
use crate::params;
use crate::receive::{Delivery, Mailbox, PacketHandler};

/// Fluent builder for [`Rylr`].
///
/// Defaults match a factory-fresh module: mailbox packet delivery, a one
/// second command timeout, and the radio parameters in
/// [`ModuleConfig::default`].
pub struct RylrBuilder {
    serial_port: Option<String>,
    config: ModuleConfig,
    command_timeout: Option<Duration>,
    handler: Option<Box<dyn PacketHandler>>,
}

impl RylrBuilder {
    pub fn new() -> Self {
        RylrBuilder {
            serial_port: None,
            config: ModuleConfig::default(),
            command_timeout: Some(Duration::from_secs(1)),
            handler: None,
        }
    }

    /// Set the serial port path (e.g. `/dev/ttyUSB0` or `COM3`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Override the UART baud rate used to open the port (default 115 200).
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.config.baud_rate = baud;
        self
    }

    /// Initial carrier frequency in megahertz (default 915.0).
    ///
    /// Applied to the module by [`Rylr::init`].
    pub fn frequency_mhz(mut self, mhz: f64) -> Self {
        self.config.frequency_hz = (mhz * 1_000_000.0).round() as u64;
        self
    }

    /// Initial channel bandwidth in hertz (default 250 000).
    pub fn bandwidth(mut self, bandwidth_hz: u32) -> Self {
        self.config.bandwidth_hz = bandwidth_hz;
        self
    }

    /// Initial spreading factor (default 10).
    pub fn spreading_factor(mut self, sf: u8) -> Self {
        self.config.spreading_factor = sf;
        self
    }

    /// Initial coding rate in 4/x notation (default 8).
    pub fn coding_rate(mut self, cr: u8) -> Self {
        self.config.coding_rate = cr;
        self
    }

    /// Initial preamble length in symbols (default 4).
    pub fn preamble_length(mut self, preamble: u8) -> Self {
        self.config.preamble_length = preamble;
        self
    }

    /// Set the timeout for a single command/reply exchange (default 1s).
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    /// Disable the command timeout entirely.
    ///
    /// A command whose reply never arrives then suspends forever, matching
    /// the module's original driver semantics. Use with care.
    pub fn no_command_timeout(mut self) -> Self {
        self.command_timeout = None;
        self
    }

    /// Deliver packets through a callback instead of the poll mailbox.
    ///
    /// The handler runs on the reader task for every decoded packet;
    /// [`Rylr::recv_packet`] becomes unavailable.
    pub fn on_packet(mut self, handler: impl PacketHandler) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Open the configured serial port and build the driver.
    pub async fn build(self) -> Result<Rylr> {
        let port = self.serial_port.clone().ok_or_else(|| {
            Error::InvalidParameter("serial_port is required to build".into())
        })?;
        let transport = SerialTransport::open(&port, self.config.baud_rate).await?;
        self.build_with_transport(Box::new(transport)).await
    }

    /// Build the driver with a caller-provided transport.
    ///
    /// This is the entry point for testing (pass a `MockTransport` from
    /// `rylr-test-harness`) and for advanced use cases where the caller
    /// manages the transport lifecycle directly.
    pub async fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<Rylr> {
        // Catch an unrepresentable coding rate at build time rather than on
        // the first parameter command.
        params::coding_rate_wire(self.config.coding_rate)?;

        let delivery = match self.handler {
            Some(handler) => Delivery::Callback(handler),
            None => Delivery::Mailbox(Mailbox::new()),
        };

        Ok(Rylr::new(
            transport,
            self.config,
            self.command_timeout,
            delivery,
        ))
    }
}

impl Default for RylrBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rylr_test_harness::MockTransport;

    #[tokio::test]
    async fn build_without_serial_port_fails() {
        let result = RylrBuilder::new().build().await;
        assert!(matches!(result.unwrap_err(), Error::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn build_rejects_unrepresentable_coding_rate() {
        let result = RylrBuilder::new()
            .coding_rate(2)
            .build_with_transport(Box::new(MockTransport::new()))
            .await;
        assert!(matches!(result.unwrap_err(), Error::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn builder_overrides_reach_the_config() {
        let driver = RylrBuilder::new()
            .frequency_mhz(868.1)
            .bandwidth(125_000)
            .spreading_factor(9)
            .coding_rate(5)
            .preamble_length(6)
            .build_with_transport(Box::new(MockTransport::new()))
            .await
            .unwrap();

        let config = driver.config().await;
        assert_eq!(config.frequency_hz, 868_100_000);
        assert_eq!(config.bandwidth_hz, 125_000);
        assert_eq!(config.spreading_factor, 9);
        assert_eq!(config.coding_rate, 5);
        assert_eq!(config.preamble_length, 6);
    }
}
