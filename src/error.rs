use std::fmt::Debug;

use crate::apdu::StatusWord;

/// Failure while building wire bytes. Always a caller bug: these are checked
/// before anything is sent to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingError {
    /// Derivation path has more segments than fit in the one-byte count.
    PathTooLong(usize),
    /// Frame payload exceeds [`crate::params::MAX_APDU_PAYLOAD`]; the caller
    /// must go through the chunk engine instead.
    FrameTooLarge(usize),
}

impl core::fmt::Display for EncodingError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            EncodingError::PathTooLong(n) => {
                write!(f, "derivation path has {} segments, the limit is 255", n)
            }
            EncodingError::FrameTooLarge(n) => {
                write!(
                    f,
                    "frame payload of {} bytes exceeds the {}-byte maximum",
                    n,
                    crate::params::MAX_APDU_PAYLOAD
                )
            }
        }
    }
}

impl std::error::Error for EncodingError {}

/// A response buffer does not have the shape the protocol requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseError {
    /// Response too short to carry the trailing 2-byte status word.
    MissingStatusWord(usize),
    /// A fixed-size or length-prefixed field extends past the buffer end.
    Truncated {
        field: &'static str,
        needed: usize,
        available: usize,
    },
    /// Extra bytes after the last expected field.
    TrailingBytes(usize),
}

impl core::fmt::Display for ResponseError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            ResponseError::MissingStatusWord(n) => {
                write!(f, "response of {} bytes is too short for a status word", n)
            }
            ResponseError::Truncated {
                field,
                needed,
                available,
            } => write!(
                f,
                "truncated {}: need {} bytes, {} available",
                field, needed, available
            ),
            ResponseError::TrailingBytes(n) => {
                write!(f, "{} unexpected trailing bytes", n)
            }
        }
    }
}

impl std::error::Error for ResponseError {}

/// Top-level error surface of [`crate::client::AvalancheApp`].
///
/// `E` is the transport's error type, propagated unmodified. Hard errors are
/// never retried here; after `Integrity` or a transport failure mid-operation
/// the device session must be assumed poisoned (see the client docs).
#[derive(Debug)]
pub enum AvalancheAppError<E> {
    /// Caller input rejected before any frame was sent.
    InvalidInput(String),
    /// Wire-encoding invariant violated while building a frame.
    Encoding(EncodingError),
    /// The device echoed a hash or digest that does not match the
    /// host-computed value.
    Integrity {
        expected: Vec<u8>,
        echoed: Vec<u8>,
    },
    /// Non-success status word from the device, raw value preserved.
    DeviceRejected(u16),
    /// The response could not be parsed.
    Response(ResponseError),
    /// Underlying channel error (disconnect, timeout).
    Transport(E),
}

impl<E> From<EncodingError> for AvalancheAppError<E> {
    fn from(e: EncodingError) -> Self {
        Self::Encoding(e)
    }
}

impl<E> From<ResponseError> for AvalancheAppError<E> {
    fn from(e: ResponseError) -> Self {
        Self::Response(e)
    }
}

impl<E: Debug> core::fmt::Display for AvalancheAppError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            AvalancheAppError::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            AvalancheAppError::Encoding(e) => write!(f, "encoding error: {}", e),
            AvalancheAppError::Integrity { expected, echoed } => write!(
                f,
                "device echo mismatch: expected {}, device reported {}",
                hex::encode(expected),
                hex::encode(echoed)
            ),
            AvalancheAppError::DeviceRejected(sw) => match StatusWord::try_from(*sw) {
                Ok(known) => write!(f, "device rejected the command: {} (0x{:04x})", known, sw),
                Err(()) => write!(f, "device rejected the command: status word 0x{:04x}", sw),
            },
            AvalancheAppError::Response(e) => write!(f, "malformed response: {}", e),
            AvalancheAppError::Transport(e) => write!(f, "transport failure: {:?}", e),
        }
    }
}

impl<E: Debug> std::error::Error for AvalancheAppError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AvalancheAppError::Encoding(e) => Some(e),
            AvalancheAppError::Response(e) => Some(e),
            _ => None,
        }
    }
}
