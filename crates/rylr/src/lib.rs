//! # rylr -- Async driver for REYAX RYLR-family LoRa modules
//!
//! `rylr` drives an RYLR896/RYLR998 LoRa module over its serial AT command
//! link. The modules are half-duplex command/response devices that can also
//! emit an unsolicited `+RCV=` line at any time when a radio packet arrives;
//! the heart of this crate is the protocol engine that classifies every
//! incoming line, correlates replies to pending commands FIFO over the
//! single ordered stream, and decodes packet announcements without being
//! confused by separators embedded in the payload.
//!
//! ## Quick Start
//!
//! ```no_run
//! use rylr::RylrBuilder;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let driver = RylrBuilder::new()
//!         .serial_port("/dev/ttyUSB0")
//!         .build()
//!         .await?;
//!
//!     // Push the configured frequency and radio parameters.
//!     driver.init().await?;
//!
//!     driver.send("Hello world!").await?;
//!     let packet = driver.recv_packet().await?;
//!     println!("{} (rssi {}, snr {})", packet.payload, packet.rssi, packet.snr);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! | Crate                 | Purpose                                        |
//! |-----------------------|------------------------------------------------|
//! | `rylr-core`           | [`Transport`] trait, [`Packet`], errors        |
//! | `rylr-transport`      | Serial port transport                          |
//! | `rylr-test-harness`   | `MockTransport` for hardware-free testing      |
//! | **`rylr`**            | This crate -- protocol engine and driver API   |
//!
//! A background reader task is the sole reader of the byte stream. Command
//! calls write, register a FIFO waiter, and suspend until the reader
//! resolves them; received packets are handed to either a poll mailbox
//! (default, single-slot, overwrite-on-arrival) or a callback chosen at
//! build time via [`RylrBuilder::on_packet`].

pub mod builder;
pub mod commands;
pub mod correlator;
pub mod driver;
pub mod params;
pub mod protocol;
pub mod receive;

mod reader;

pub use builder::RylrBuilder;
pub use driver::{Rylr, BROADCAST_ADDRESS};
pub use receive::PacketHandler;

// Re-export the core types applications interact with.
pub use rylr_core::{Error, ModuleConfig, Packet, Result, Transport};
