//! Error types for the protocol engine

use civ_protocol::ParseError;
use thiserror::Error;

/// Errors returned by engine operations
///
/// The engine never retries. Every error aborts the current operation and
/// is returned as-is; frames already sent by a composite operation are not
/// rolled back.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The reply could not be decoded
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The radio answered NG, or answered a set with something other than OK
    #[error("command rejected: {operation}")]
    CommandRejected {
        /// Operation that was rejected, e.g. "set RIT enable"
        operation: &'static str,
    },

    /// The operation does not exist on this radio
    #[error("operation not supported by this radio: {0}")]
    Unsupported(&'static str),

    /// Caller-supplied value out of the operation's legal range
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// No terminator byte within the response window
    #[error("timed out after {ms}ms waiting for a reply")]
    Timeout { ms: u64 },

    /// Operation attempted before `connect()` or after `disconnect()`
    #[error("not connected")]
    NotConnected,

    /// I/O error on the transport
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port error
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),
}

/// Result alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            EngineError::CommandRejected {
                operation: "set RIT offset"
            }
            .to_string(),
            "command rejected: set RIT offset"
        );
        assert_eq!(
            EngineError::Timeout { ms: 500 }.to_string(),
            "timed out after 500ms waiting for a reply"
        );
        assert_eq!(
            EngineError::Unsupported("XIT").to_string(),
            "operation not supported by this radio: XIT"
        );
        assert_eq!(EngineError::NotConnected.to_string(), "not connected");
    }

    #[test]
    fn parse_errors_convert() {
        let err: EngineError = ParseError::InvalidBcd(0xAB).into();
        assert!(matches!(err, EngineError::Parse(ParseError::InvalidBcd(0xAB))));
        assert_eq!(err.to_string(), "parse error: invalid BCD byte 0xAB");
    }
}
