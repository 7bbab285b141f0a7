//! rylr-transport: Transport implementations for the rylr driver.
//!
//! Currently this is the serial port transport ([`SerialTransport`]) used to
//! reach the module's UART. Test code should use `MockTransport` from the
//! `rylr-test-harness` crate instead of real hardware.

pub mod serial;

pub use serial::SerialTransport;
