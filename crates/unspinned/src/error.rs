use std::io;

use thiserror::Error;

/// An error reported by TheSkyX itself, as opposed to a transport failure.
///
/// Replies of this shape end in ` Error = <N>.`; `error_number` is `None` when
/// the reply was cut off before a complete code was seen.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ProtocolError {
    /// Everything before ` Error = `.
    pub message: String,
    /// The `<N>` of ` Error = <N>.`; `None` when the reply was cut short or
    /// the number does not fit.
    pub error_number: Option<i64>,
}

impl ProtocolError {
    pub(crate) fn new(message: String, error_number: i64) -> Self {
        Self {
            message,
            error_number: Some(error_number),
        }
    }

    pub(crate) fn truncated(message: String) -> Self {
        Self {
            message,
            error_number: None,
        }
    }
}

/// Everything that can go wrong during one exchange.
#[derive(Error, Debug)]
pub enum Error {
    /// Reading from or writing to the connection failed.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The connection stopped accepting bytes partway through a script.
    #[error("incomplete write: sent {written} of {expected} bytes")]
    IncompleteWrite {
        /// Bytes accepted before the stream stopped.
        written: usize,
        /// Length of the script.
        expected: usize,
    },
    /// The stream ended before the reply's first byte.
    #[error("connection closed before a response was received")]
    ConnectionClosed,
    /// A JSON reply did not decode. The connection may be mid-packet.
    #[error("malformed response payload: {0}")]
    Decode(#[from] serde_json::Error),
    /// TheSkyX rejected the script.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl Error {
    /// The remote-reported error, if that is what this is.
    #[must_use]
    pub fn protocol(&self) -> Option<&ProtocolError> {
        match self {
            Error::Protocol(e) => Some(e),
            _ => None,
        }
    }
}

/// Result of an exchange.
pub type Result<T, E = Error> = core::result::Result<T, E>;
