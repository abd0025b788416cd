//! Error types for relaychat-client.

use std::{fmt, io};

use relaychat_proto::HandshakeError;

/// The error type returned from [`crate::Client`] methods.
#[derive(Debug)]
pub enum ClientError {
    /// Network / I/O failure.
    Io(io::Error),
    /// The room key could not be installed.
    Handshake(HandshakeError),
    /// The connection task has stopped.
    Disconnected,
    /// The connection task did not stop within the shutdown timeout and was aborted.
    ShutdownTimeout,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e)           => write!(f, "I/O error: {e}"),
            Self::Handshake(e)    => write!(f, "handshake failed: {e}"),
            Self::Disconnected    => write!(f, "disconnected"),
            Self::ShutdownTimeout => write!(f, "connection task did not stop in time"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e)        => Some(e),
            Self::Handshake(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ClientError {
    fn from(e: io::Error) -> Self { Self::Io(e) }
}

impl From<HandshakeError> for ClientError {
    fn from(e: HandshakeError) -> Self { Self::Handshake(e) }
}
