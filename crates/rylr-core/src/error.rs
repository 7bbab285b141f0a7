//! Error types for the rylr driver.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport-layer and protocol-layer
//! failures are both captured here.

/// The error type for all rylr operations.
///
/// Variants cover the failure modes seen when talking to a LoRa module over
/// a UART: physical transport failures, malformed module output, command
/// timeouts, and bad caller input.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (serial port open/IO failure).
    #[error("transport error: {0}")]
    Transport(String),

    /// A protocol-level error (malformed `+RCV=` line, unparseable reply).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Timed out waiting for the module to acknowledge a command.
    ///
    /// This typically indicates the module is unpowered, the baud rate is
    /// wrong, or the TX line is disconnected.
    #[error("timeout waiting for response")]
    Timeout,

    /// The requested operation is not available in the configured
    /// receive-delivery mode.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// An invalid parameter was passed to a module command.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// No connection to the module has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the module was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
