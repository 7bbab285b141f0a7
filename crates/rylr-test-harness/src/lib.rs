//! rylr-test-harness: Test utilities and mock transports for the rylr driver.
//!
//! This crate provides [`MockTransport`] for deterministic unit testing of
//! the protocol engine without real module hardware, and
//! [`UnsolicitedInjector`] for pushing `+RCV=` announcements into a running
//! driver mid-test.

pub mod mock_serial;

pub use mock_serial::{MockTransport, UnsolicitedInjector};
