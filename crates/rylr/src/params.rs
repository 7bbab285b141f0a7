//! Radio parameter wire encoding.
//!
//! The module exposes a single atomic `AT+PARAMETER` command for all four
//! LoRa radio parameters, so changing any one of spreading factor,
//! bandwidth, coding rate, or preamble length requires recomputing and
//! re-sending all four. The functions here are the pure mapping from the
//! requested values to the four wire integers.

use rylr_core::config::ModuleConfig;
use rylr_core::error::{Error, Result};

/// The nine channel bandwidths the hardware can represent, in hertz,
/// ascending. The wire command carries an index into this table.
pub const BANDWIDTHS: [u32; 9] = [
    7_800, 10_400, 15_600, 20_800, 31_250, 41_700, 62_500, 125_000, 250_000,
];

/// The module's coding-rate floor: wire values are offsets from 4/4.
const CODING_RATE_FLOOR: u8 = 4;

/// Highest coding rate the module accepts (4/8).
const CODING_RATE_CEILING: u8 = 8;

/// Select the bandwidth bucket for a requested bandwidth in hertz.
///
/// Returns the smallest table index whose bandwidth is at least the
/// requested value. A request above the widest representable band falls
/// back to the widest band rather than failing.
pub fn bandwidth_index(requested_hz: u32) -> u8 {
    BANDWIDTHS
        .iter()
        .position(|&bw| requested_hz <= bw)
        .unwrap_or(BANDWIDTHS.len() - 1) as u8
}

/// Encode a coding rate for the wire.
///
/// The wire value is a zero-based offset from the module's coding-rate
/// floor of 4, so requested 5..=8 encodes as 1..=4. Values outside that
/// range have no wire representation.
pub fn coding_rate_wire(requested: u8) -> Result<u8> {
    if !(CODING_RATE_FLOOR + 1..=CODING_RATE_CEILING).contains(&requested) {
        return Err(Error::InvalidParameter(format!(
            "coding rate must be 5..=8, got {requested}"
        )));
    }
    Ok(requested - CODING_RATE_FLOOR)
}

/// Compute the four `AT+PARAMETER` wire integers from the configuration.
///
/// Spreading factor and preamble length pass through unchanged; bandwidth
/// goes through the bucket search and coding rate through the offset
/// encoding. Pure function of the configuration: the same state always
/// produces the same wire values.
pub fn parameter_args(config: &ModuleConfig) -> Result<(u8, u8, u8, u8)> {
    Ok((
        config.spreading_factor,
        bandwidth_index(config.bandwidth_hz),
        coding_rate_wire(config.coding_rate)?,
        config.preamble_length,
    ))
}
