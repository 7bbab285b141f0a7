//! AT command builders and reply parsers for the RYLR module family.
//!
//! This module provides functions to construct the command strings the
//! module understands (send, frequency, radio parameters, address, network
//! id, AES key, baud rate) and to parse the corresponding query replies.
//!
//! All functions are pure -- they produce or consume strings without
//! performing any I/O. The driver is responsible for framing the strings
//! onto the transport and feeding reply lines back into the parsers.
//!
//! # Reply format
//!
//! Query replies echo the command name: `AT+ADDRESS?` is answered with
//! `+ADDRESS=5`. Each parser strips the literal reply prefix and parses the
//! remainder; a reply carrying a different prefix is a protocol error.

use rylr_core::error::{Error, Result};

// ---------------------------------------------------------------
// Query commands and their reply prefixes
// ---------------------------------------------------------------

/// Query the carrier frequency (`AT+BAND?`).
pub const QUERY_BAND: &str = "AT+BAND?";
/// Query the module address (`AT+ADDRESS?`).
pub const QUERY_ADDRESS: &str = "AT+ADDRESS?";
/// Query the network id (`AT+NETWORKID?`).
pub const QUERY_NETWORK_ID: &str = "AT+NETWORKID?";
/// Query the AES key (`AT+CPIN?`).
pub const QUERY_AES_KEY: &str = "AT+CPIN?";
/// Query the UART baud rate (`AT+IPR?`).
pub const QUERY_BAUD_RATE: &str = "AT+IPR?";

const REPLY_BAND: &str = "+BAND=";
const REPLY_ADDRESS: &str = "+ADDRESS=";
const REPLY_NETWORK_ID: &str = "+NETWORKID=";
const REPLY_AES_KEY: &str = "+CPIN=";
const REPLY_BAUD_RATE: &str = "+IPR=";

// ---------------------------------------------------------------
// Command builders
// ---------------------------------------------------------------

/// Build a "transmit payload" command (`AT+SEND=<addr>,<len>,<payload>`).
///
/// The length field is the payload's byte count; it is what lets the
/// receiving side parse a payload containing commas.
pub fn cmd_send(address: u16, payload: &str) -> String {
    format!("AT+SEND={},{},{}", address, payload.len(), payload)
}

/// Build a "set carrier frequency" command (`AT+BAND=<hz>`).
pub fn cmd_set_band(freq_hz: u64) -> String {
    format!("AT+BAND={freq_hz}")
}

/// Build the atomic "set all four radio parameters" command
/// (`AT+PARAMETER=<sf>,<bw_idx>,<cr>,<preamble>`).
///
/// Arguments are the wire integers from
/// [`params::parameter_args`](crate::params::parameter_args).
pub fn cmd_set_parameter(sf: u8, bw_index: u8, cr_wire: u8, preamble: u8) -> String {
    format!("AT+PARAMETER={sf},{bw_index},{cr_wire},{preamble}")
}

/// Build a "set module address" command (`AT+ADDRESS=<n>`).
pub fn cmd_set_address(address: u16) -> String {
    format!("AT+ADDRESS={address}")
}

/// Build a "set network id" command (`AT+NETWORKID=<n>`).
pub fn cmd_set_network_id(network_id: u8) -> String {
    format!("AT+NETWORKID={network_id}")
}

/// Build a "set AES key" command (`AT+CPIN=<32-hex-chars>`).
pub fn cmd_set_aes_key(key: &str) -> String {
    format!("AT+CPIN={key}")
}

/// Build a "set UART baud rate" command (`AT+IPR=<baud>`).
///
/// Takes effect on the module immediately; the host side of the link must
/// be reopened at the new rate afterwards.
pub fn cmd_set_baud_rate(baud: u32) -> String {
    format!("AT+IPR={baud}")
}

// ---------------------------------------------------------------
// Reply parsers
// ---------------------------------------------------------------

fn strip_reply_prefix<'a>(reply: &'a str, prefix: &str) -> Result<&'a str> {
    reply.strip_prefix(prefix).ok_or_else(|| {
        Error::Protocol(format!("expected reply starting with {prefix:?}, got {reply:?}"))
    })
}

fn parse_numeric_reply<T: std::str::FromStr>(reply: &str, prefix: &str) -> Result<T> {
    let value = strip_reply_prefix(reply, prefix)?;
    value
        .parse()
        .map_err(|_| Error::Protocol(format!("bad numeric value in reply {reply:?}")))
}

/// Parse an `AT+BAND?` reply (`+BAND=<hz>`) into hertz.
pub fn parse_band_reply(reply: &str) -> Result<u64> {
    parse_numeric_reply(reply, REPLY_BAND)
}

/// Parse an `AT+ADDRESS?` reply (`+ADDRESS=<n>`).
pub fn parse_address_reply(reply: &str) -> Result<u16> {
    parse_numeric_reply(reply, REPLY_ADDRESS)
}

/// Parse an `AT+NETWORKID?` reply (`+NETWORKID=<n>`).
pub fn parse_network_id_reply(reply: &str) -> Result<u8> {
    parse_numeric_reply(reply, REPLY_NETWORK_ID)
}

/// Parse an `AT+CPIN?` reply (`+CPIN=<key>`).
pub fn parse_aes_key_reply(reply: &str) -> Result<String> {
    Ok(strip_reply_prefix(reply, REPLY_AES_KEY)?.to_string())
}

/// Parse an `AT+IPR?` reply (`+IPR=<baud>`).
pub fn parse_baud_rate_reply(reply: &str) -> Result<u32> {
    parse_numeric_reply(reply, REPLY_BAUD_RATE)
}

/// Check that a candidate AES key is 32 hex characters.
pub fn validate_aes_key(key: &str) -> Result<()> {
    if key.len() == 32 && key.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(Error::InvalidParameter(
            "AES key must be 32 hex characters".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Command builders
    // -----------------------------------------------------------------------

    #[test]
    fn send_counts_payload_bytes() {
        assert_eq!(cmd_send(0, "ping"), "AT+SEND=0,4,ping");
    }

    #[test]
    fn send_with_embedded_separator() {
        assert_eq!(cmd_send(7, "a,b"), "AT+SEND=7,3,a,b");
    }

    #[test]
    fn send_empty_payload() {
        assert_eq!(cmd_send(3, ""), "AT+SEND=3,0,");
    }

    #[test]
    fn set_band() {
        assert_eq!(cmd_set_band(915_000_000), "AT+BAND=915000000");
    }

    #[test]
    fn set_parameter() {
        assert_eq!(cmd_set_parameter(10, 8, 4, 4), "AT+PARAMETER=10,8,4,4");
    }

    #[test]
    fn set_address() {
        assert_eq!(cmd_set_address(120), "AT+ADDRESS=120");
    }

    #[test]
    fn set_network_id() {
        assert_eq!(cmd_set_network_id(6), "AT+NETWORKID=6");
    }

    #[test]
    fn set_aes_key() {
        assert_eq!(
            cmd_set_aes_key("00112233445566778899AABBCCDDEEFF"),
            "AT+CPIN=00112233445566778899AABBCCDDEEFF"
        );
    }

    #[test]
    fn set_baud_rate() {
        assert_eq!(cmd_set_baud_rate(9600), "AT+IPR=9600");
    }

    // -----------------------------------------------------------------------
    // Reply parsers
    // -----------------------------------------------------------------------

    #[test]
    fn parse_band() {
        assert_eq!(parse_band_reply("+BAND=915000000").unwrap(), 915_000_000);
    }

    #[test]
    fn parse_address() {
        assert_eq!(parse_address_reply("+ADDRESS=5").unwrap(), 5);
    }

    #[test]
    fn parse_network_id() {
        assert_eq!(parse_network_id_reply("+NETWORKID=18").unwrap(), 18);
    }

    #[test]
    fn parse_aes_key() {
        assert_eq!(
            parse_aes_key_reply("+CPIN=00112233445566778899AABBCCDDEEFF").unwrap(),
            "00112233445566778899AABBCCDDEEFF"
        );
    }

    #[test]
    fn parse_baud_rate() {
        assert_eq!(parse_baud_rate_reply("+IPR=115200").unwrap(), 115_200);
    }

    #[test]
    fn parse_rejects_wrong_prefix() {
        assert!(parse_band_reply("+ADDRESS=5").is_err());
        assert!(parse_address_reply("+OK").is_err());
    }

    #[test]
    fn parse_rejects_non_numeric_value() {
        assert!(parse_band_reply("+BAND=fast").is_err());
    }

    // -----------------------------------------------------------------------
    // AES key validation
    // -----------------------------------------------------------------------

    #[test]
    fn aes_key_valid() {
        assert!(validate_aes_key("00112233445566778899aabbccddeeff").is_ok());
    }

    #[test]
    fn aes_key_wrong_length() {
        assert!(validate_aes_key("0011").is_err());
    }

    #[test]
    fn aes_key_non_hex() {
        assert!(validate_aes_key("00112233445566778899aabbccddeegg").is_err());
    }
}
