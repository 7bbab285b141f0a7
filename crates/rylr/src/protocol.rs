//! Line framing and decode for the module's AT protocol.
//!
//! The module talks CR+LF-terminated ASCII in both directions. Outgoing
//! traffic is `AT+<NAME>[=<args>]` commands; incoming traffic is either a
//! reply line to a pending command or an unsolicited `+RCV=` line announcing
//! an inbound radio packet. This module provides the pure framing and decode
//! functions; classification routing lives in the reader task.
//!
//! The one non-trivial decode is the `+RCV=` line: the packet payload may
//! itself contain the `,` field separator, so the line cannot be split
//! naively. The module prefixes the payload with its byte length precisely
//! so the parse can take exactly that many bytes and resume field splitting
//! afterwards.

use rylr_core::error::{Error, Result};
use rylr_core::packet::Packet;

/// The CR+LF sequence that terminates every line in both directions.
pub const TERMINATOR: &[u8] = b"\r\n";

/// Prefix of an unsolicited line announcing an inbound radio packet.
pub const RECEIVE_PREFIX: &str = "+RCV=";

/// Result of attempting to extract one line from a byte buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineResult {
    /// A complete line was extracted (terminator stripped).
    Line {
        /// The line text without its CR+LF terminator.
        text: String,
        /// Number of bytes consumed from the input buffer.
        consumed: usize,
    },

    /// A complete line was present but is not valid UTF-8.
    Invalid(usize),

    /// The buffer does not yet contain a complete line. More data is needed.
    Incomplete,
}

/// Classification of one incoming line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classified<'a> {
    /// An unsolicited packet announcement; holds the text after `+RCV=`.
    Receive(&'a str),
    /// Anything else: a reply to the oldest pending command.
    Response(&'a str),
}

/// Extract one CR+LF-terminated line from a byte buffer.
///
/// Returns the first complete line found, or [`LineResult::Incomplete`] if
/// no terminator is present yet (including the case where a CR has arrived
/// but its LF has not).
pub fn decode_line(buf: &[u8]) -> LineResult {
    let term_pos = match buf.windows(TERMINATOR.len()).position(|w| w == TERMINATOR) {
        Some(pos) => pos,
        None => return LineResult::Incomplete,
    };

    let consumed = term_pos + TERMINATOR.len();
    match std::str::from_utf8(&buf[..term_pos]) {
        Ok(text) => LineResult::Line {
            text: text.to_string(),
            consumed,
        },
        Err(_) => LineResult::Invalid(consumed),
    }
}

/// Classify one incoming line as a packet announcement or a command reply.
pub fn classify(line: &str) -> Classified<'_> {
    match line.strip_prefix(RECEIVE_PREFIX) {
        Some(body) => Classified::Receive(body),
        None => Classified::Response(line),
    }
}

/// Encode an outgoing command body by appending the line terminator.
pub fn encode_command(cmd: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(cmd.len() + TERMINATOR.len());
    bytes.extend_from_slice(cmd.as_bytes());
    bytes.extend_from_slice(TERMINATOR);
    bytes
}

/// Decode the body of a `+RCV=` line into a [`Packet`].
///
/// The body is `address,length,payload,rssi,snr`. Split on `,` at most
/// twice to get `address`, `length`, and the rest, then take exactly
/// `length` bytes of the rest as the payload -- the length prefix is what
/// disambiguates separators embedded in the payload. One separator and a
/// final two-way split yield `rssi` and `snr`.
///
/// Any malformed field yields a protocol error; the caller drops the line
/// and continues.
pub fn decode_packet(body: &str) -> Result<Packet> {
    let mut fields = body.splitn(3, ',');
    let address = fields
        .next()
        .ok_or_else(|| malformed(body, "missing address"))?;
    let length = fields
        .next()
        .ok_or_else(|| malformed(body, "missing length"))?;
    let rest = fields
        .next()
        .ok_or_else(|| malformed(body, "missing payload"))?;

    let address: u16 = address
        .parse()
        .map_err(|_| malformed(body, "bad address"))?;
    let length: usize = length.parse().map_err(|_| malformed(body, "bad length"))?;

    let payload = rest
        .get(..length)
        .ok_or_else(|| malformed(body, "length exceeds available bytes"))?;
    let tail = rest[length..]
        .strip_prefix(',')
        .ok_or_else(|| malformed(body, "no separator after payload"))?;

    let (rssi, snr) = tail
        .split_once(',')
        .ok_or_else(|| malformed(body, "missing snr"))?;
    if snr.contains(',') {
        return Err(malformed(body, "trailing fields after snr"));
    }

    let rssi: i16 = rssi.parse().map_err(|_| malformed(body, "bad rssi"))?;
    let snr: i16 = snr.parse().map_err(|_| malformed(body, "bad snr"))?;

    Ok(Packet::new(payload, address, rssi, snr))
}

fn malformed(body: &str, what: &str) -> Error {
    Error::Protocol(format!("malformed +RCV line ({what}): {body:?}"))
}
