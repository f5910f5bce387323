//! BIP-32 derivation paths and their wire encoding.

use std::fmt;
use std::str::FromStr;

use crate::error::{EncodingError, ResponseError};

/// Bit 31, set inside a segment's value for hardened derivation.
pub const HARDENED: u32 = 0x8000_0000;

/// An ordered sequence of 32-bit derivation segments.
///
/// Hardened segments carry [`HARDENED`] inside the value itself; there is no
/// separate flag on the wire or in memory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Bip32Path(Vec<u32>);

impl Bip32Path {
    pub fn new(segments: Vec<u32>) -> Self {
        Self(segments)
    }

    pub fn segments(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Wire form: one count byte, then each segment as 4 big-endian bytes.
    ///
    /// The count must fit the single length byte; longer paths fail with
    /// [`EncodingError::PathTooLong`].
    pub fn encode(&self) -> Result<Vec<u8>, EncodingError> {
        if self.0.len() > u8::MAX as usize {
            return Err(EncodingError::PathTooLong(self.0.len()));
        }
        let mut out = Vec::with_capacity(1 + 4 * self.0.len());
        out.push(self.0.len() as u8);
        for segment in &self.0 {
            out.extend_from_slice(&segment.to_be_bytes());
        }
        Ok(out)
    }

    /// Exact inverse of [`encode`](Self::encode).
    ///
    /// Paths are write-only on the wire; this exists so the codec can be
    /// verified as a bijection. Rejects short buffers and trailing bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, ResponseError> {
        let Some((&count, rest)) = bytes.split_first() else {
            return Err(ResponseError::Truncated {
                field: "segment count",
                needed: 1,
                available: 0,
            });
        };
        let expected = count as usize * 4;
        if rest.len() < expected {
            return Err(ResponseError::Truncated {
                field: "path segments",
                needed: expected,
                available: rest.len(),
            });
        }
        if rest.len() > expected {
            return Err(ResponseError::TrailingBytes(rest.len() - expected));
        }
        let segments = rest
            .chunks_exact(4)
            .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Self(segments))
    }
}

impl From<Vec<u32>> for Bip32Path {
    fn from(segments: Vec<u32>) -> Self {
        Self(segments)
    }
}

/// The canonical string form, e.g. `44'/9000'/0'/0/0`.
///
/// This is the form used to key signature results, so it must stay stable.
impl fmt::Display for Bip32Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            if segment & HARDENED != 0 {
                write!(f, "{}'", segment & !HARDENED)?;
            } else {
                write!(f, "{}", segment)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePathError(String);

impl fmt::Display for ParsePathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid derivation path: {}", self.0)
    }
}

impl std::error::Error for ParsePathError {}

/// Parses `44'/9000'/0'` notation; an optional leading `m/` is accepted.
impl FromStr for Bip32Path {
    type Err = ParsePathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("m/").unwrap_or(s);
        if s.is_empty() || s == "m" {
            return Ok(Self(Vec::new()));
        }
        let mut segments = Vec::new();
        for part in s.split('/') {
            let (digits, hardened) = match part.strip_suffix('\'') {
                Some(digits) => (digits, true),
                None => (part, false),
            };
            let value: u32 = digits
                .parse()
                .map_err(|_| ParsePathError(format!("bad segment `{}`", part)))?;
            if value >= HARDENED {
                return Err(ParsePathError(format!("segment `{}` out of range", part)));
            }
            segments.push(if hardened { value | HARDENED } else { value });
        }
        Ok(Self(segments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn encode_counts_then_big_endian_segments() {
        let path: Bip32Path = "44'/9000'/0'/0/0".parse().unwrap();
        assert_eq!(
            path.encode().unwrap(),
            hex!("05 8000002c 80002328 80000000 00000000 00000000")
        );
    }

    #[test]
    fn round_trip_all_valid_lengths() {
        for count in 1..=255usize {
            let segments: Vec<u32> = (0..count)
                .map(|i| if i % 2 == 0 { i as u32 | HARDENED } else { i as u32 })
                .collect();
            let path = Bip32Path::new(segments);
            let encoded = path.encode().unwrap();
            assert_eq!(encoded.len(), 1 + 4 * count);
            assert_eq!(Bip32Path::decode(&encoded).unwrap(), path);
        }
    }

    #[test]
    fn empty_path_round_trips() {
        let path = Bip32Path::default();
        assert_eq!(path.encode().unwrap(), vec![0]);
        assert_eq!(Bip32Path::decode(&[0]).unwrap(), path);
    }

    #[test]
    fn too_many_segments_fail_to_encode() {
        let path = Bip32Path::new(vec![0; 256]);
        assert_eq!(path.encode().unwrap_err(), EncodingError::PathTooLong(256));
    }

    #[test]
    fn decode_rejects_truncated_and_trailing_input() {
        assert!(matches!(
            Bip32Path::decode(&[]),
            Err(ResponseError::Truncated { .. })
        ));
        assert!(matches!(
            Bip32Path::decode(&[2, 0, 0, 0, 1]),
            Err(ResponseError::Truncated { .. })
        ));
        assert_eq!(
            Bip32Path::decode(&[1, 0, 0, 0, 1, 0xFF]),
            Err(ResponseError::TrailingBytes(1))
        );
    }

    #[test]
    fn display_matches_parse() {
        for s in ["44'/9000'/0'/0/0", "0/0", "2147483647'", "13"] {
            let path: Bip32Path = s.parse().unwrap();
            assert_eq!(path.to_string(), s);
        }
    }

    #[test]
    fn parse_accepts_master_prefix() {
        let with: Bip32Path = "m/44'/9000'".parse().unwrap();
        let without: Bip32Path = "44'/9000'".parse().unwrap();
        assert_eq!(with, without);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("44'/x".parse::<Bip32Path>().is_err());
        assert!("2147483648".parse::<Bip32Path>().is_err());
        assert!("44''".parse::<Bip32Path>().is_err());
    }
}
