use std::fmt;

use serde::{de, ser};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A flaw found while decoding, or a failure in the serde bridge.
///
/// Decoding never panics on bad input: every malformed, truncated, or non-canonical byte
/// sequence comes back as one of these.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Data ended too early. Every strict prefix of a valid message fails with this.
    LengthTooShort {
        step: &'static str,
        actual: usize,
        expected: usize,
    },
    /// Basic tag encoding failure: invalid tag, non-canonical form, mismatched container end,
    /// invalid UTF-8, duplicate map key or set element.
    BadEncode(String),
    /// Decoding hit some parsing limit.
    ParseLimit(String),
    /// Message start or end tag is missing, malformed, or disagrees with the content.
    BadFraming(String),
    /// A transmission frame contained a reserved byte or an invalid escape sequence.
    BadEscape(String),
    /// The transmission checksum didn't match the frame contents.
    BadChecksum { expected: u8, actual: u8 },
    /// Bytes were left over after a complete message or frame.
    TrailingData(usize),
    /// Occurs when serde serialization or deserialization fails
    SerdeFail(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::LengthTooShort {
                step,
                actual,
                expected,
            } => write!(
                f,
                "Expected data length {}, but got {} on step [{}]",
                expected, actual, step
            ),
            Error::BadEncode(ref err) => write!(f, "Basic data encoding failure: {}", err),
            Error::ParseLimit(ref err) => write!(f, "Hit parsing limit: {}", err),
            Error::BadFraming(ref err) => write!(f, "Bad message framing: {}", err),
            Error::BadEscape(ref err) => write!(f, "Bad transmission escape: {}", err),
            Error::BadChecksum { expected, actual } => write!(
                f,
                "Checksum mismatch: frame carries 0x{:02X}, computed 0x{:02X}",
                actual, expected
            ),
            Error::TrailingData(len) => write!(f, "{} bytes left over after the end", len),
            Error::SerdeFail(ref msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for Error {}

impl ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::SerdeFail(msg.to_string())
    }
}

impl de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::SerdeFail(msg.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display() {
        let err = Error::LengthTooShort {
            step: "decode Integer",
            actual: 1,
            expected: 2,
        };
        assert_eq!(
            err.to_string(),
            "Expected data length 2, but got 1 on step [decode Integer]"
        );
        let err = Error::BadChecksum {
            expected: 0x0F,
            actual: 0x10,
        };
        assert_eq!(
            err.to_string(),
            "Checksum mismatch: frame carries 0x10, computed 0x0F"
        );
    }

    #[test]
    fn serde_custom() {
        let err = <Error as de::Error>::custom("no null");
        assert_eq!(err, Error::SerdeFail("no null".to_string()));
    }
}
