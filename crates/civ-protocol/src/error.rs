//! Error types for CI-V parsing

use thiserror::Error;

/// Errors that can occur while decoding CI-V frames and payloads
///
/// Formatting never fails; every variant here describes bytes received
/// from a radio that do not match what the protocol allows.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Preamble, terminator or minimum-length violation
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// A BCD nibble outside 0-9
    #[error("invalid BCD byte 0x{0:02X}")]
    InvalidBcd(u8),

    /// The reply carries a different command than the request
    #[error("unexpected command in reply: expected 0x{expected:02X}, got 0x{actual:02X}")]
    UnexpectedCommand { expected: u8, actual: u8 },

    /// The reply payload has the wrong size for the command
    #[error("unexpected payload length for {what}: expected {expected}, got {actual}")]
    UnexpectedLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Mode byte with no known operating mode
    #[error("invalid mode code 0x{0:02X}")]
    InvalidMode(u8),

    /// The radio reported the memory channel as blank
    #[error("memory channel {0} is empty")]
    EmptyChannel(u16),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            ParseError::InvalidBcd(0xAB).to_string(),
            "invalid BCD byte 0xAB"
        );
        assert_eq!(
            ParseError::UnexpectedCommand {
                expected: 0x03,
                actual: 0x04
            }
            .to_string(),
            "unexpected command in reply: expected 0x03, got 0x04"
        );
        assert_eq!(
            ParseError::EmptyChannel(12).to_string(),
            "memory channel 12 is empty"
        );
    }
}
