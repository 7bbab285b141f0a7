//! rylr-core: Core traits, types, and error definitions for the rylr driver.
//!
//! This crate defines the transport-agnostic abstractions the driver is built
//! on. Applications depend on these types without pulling in a specific
//! transport implementation.
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level communication channel to the module
//! - [`Packet`] -- one packet received over the air
//! - [`ModuleConfig`] -- in-memory copy of the module configuration
//! - [`Error`] / [`Result`] -- error handling

pub mod config;
pub mod error;
pub mod packet;
pub mod transport;

// Re-export key types at crate root for ergonomic `use rylr_core::*`.
pub use config::ModuleConfig;
pub use error::{Error, Result};
pub use packet::Packet;
pub use transport::Transport;
