//! Error types for the reflector core.

use std::io;

/// Result type for reflector core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while the reflector is running.
///
/// Construction-time failures (binding the socket, opening the blocklist
/// file for the first time) are fatal; everything else is logged and the
/// event loop continues, per the error handling design.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error from the UDP socket or the blocklist file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A datagram did not parse as a well-formed frame.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
}
