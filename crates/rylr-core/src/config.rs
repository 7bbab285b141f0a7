//! Module configuration snapshot.
//!
//! [`ModuleConfig`] holds the driver's in-memory copy of the module state.
//! It is mutated only through the driver's setter calls, which round-trip
//! the module; the copy is authoritative only until the next
//! radio-parameter change recomputes and re-sends the wire representation.

/// In-memory copy of the module configuration.
///
/// Defaults match the factory state of an RYLR896/RYLR998 module on the
/// US 915 MHz band.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleConfig {
    /// Carrier frequency in hertz.
    pub frequency_hz: u64,
    /// Requested channel bandwidth in hertz. The wire command carries a
    /// bucket index into the module's table of representable bandwidths,
    /// not this raw value.
    pub bandwidth_hz: u32,
    /// LoRa spreading factor.
    pub spreading_factor: u8,
    /// LoRa coding rate (4/x notation; the module accepts 5 through 8).
    pub coding_rate: u8,
    /// Preamble length in symbols.
    pub preamble_length: u8,
    /// Network id shared by all modules that should hear each other.
    pub network_id: u8,
    /// This module's own address.
    pub device_address: u16,
    /// AES-128 key as 32 hex characters, if encryption is enabled.
    pub aes_key: Option<String>,
    /// UART baud rate.
    pub baud_rate: u32,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        ModuleConfig {
            frequency_hz: 915_000_000,
            bandwidth_hz: 250_000,
            spreading_factor: 10,
            coding_rate: 8,
            preamble_length: 4,
            network_id: 18,
            device_address: 0,
            aes_key: None,
            baud_rate: 115_200,
        }
    }
}
