//! Parsing of raw device responses into typed fields.

use std::fmt;

use crate::error::ResponseError;
use crate::params::SW_OK;

/// Which view of a response a field parser consumes.
///
/// Operation variants have historically differed on whether the trailing
/// status word is stripped before field extraction; both conventions stay
/// implemented, and the pinned command set selects one per operation in
/// [`crate::params::ProtocolParams`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusMode {
    /// Field extraction runs over the payload with the status word removed.
    Stripped,
    /// Field extraction runs over the raw buffer, status word in place.
    Inclusive,
}

/// A raw device response: payload followed by a 2-byte status word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduResponse {
    raw: Vec<u8>,
}

impl ApduResponse {
    /// Wraps a raw response buffer; fails if it cannot carry a status word.
    pub fn from_raw(raw: Vec<u8>) -> Result<Self, ResponseError> {
        if raw.len() < 2 {
            return Err(ResponseError::MissingStatusWord(raw.len()));
        }
        Ok(Self { raw })
    }

    pub fn status_word(&self) -> u16 {
        u16::from_be_bytes([self.raw[self.raw.len() - 2], self.raw[self.raw.len() - 1]])
    }

    pub fn is_success(&self) -> bool {
        self.status_word() == SW_OK
    }

    /// The payload, status word stripped.
    pub fn data(&self) -> &[u8] {
        &self.raw[..self.raw.len() - 2]
    }

    /// The full buffer, status word included.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn into_data(mut self) -> Vec<u8> {
        self.raw.truncate(self.raw.len() - 2);
        self.raw
    }
}

/// Version and build information reported by the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppVersionInfo {
    /// `(major, minor, patch)`.
    pub version: (u8, u8, u8),
    /// Build identifier, typically a short commit hash.
    pub commit: String,
    /// Product name, e.g. `Avax`.
    pub name: String,
}

impl AppVersionInfo {
    pub fn version_string(&self) -> String {
        format!("{}.{}.{}", self.version.0, self.version.1, self.version.2)
    }
}

impl fmt::Display for AppVersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.name, self.version_string(), self.commit)
    }
}

/// Opaque identifier distinguishing a physical device/seed pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletId(Vec<u8>);

impl WalletId {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

fn split_length_prefixed<'a>(
    buf: &'a [u8],
    field: &'static str,
) -> Result<(&'a [u8], &'a [u8]), ResponseError> {
    let Some((&len, rest)) = buf.split_first() else {
        return Err(ResponseError::Truncated {
            field,
            needed: 1,
            available: 0,
        });
    };
    let len = len as usize;
    if rest.len() < len {
        return Err(ResponseError::Truncated {
            field,
            needed: len,
            available: rest.len(),
        });
    }
    Ok(rest.split_at(len))
}

/// Extracts the length-prefixed public key from a response.
///
/// `mode` selects whether the extractor sees the status-stripped payload or
/// the raw buffer.
pub fn parse_public_key(
    response: &ApduResponse,
    mode: StatusMode,
) -> Result<Vec<u8>, ResponseError> {
    let buf = match mode {
        StatusMode::Stripped => response.data(),
        StatusMode::Inclusive => response.raw(),
    };
    let (key, _) = split_length_prefixed(buf, "public key")?;
    Ok(key.to_vec())
}

/// Extracts the public key and chain code from an extended-key response.
///
/// Layout: `[L, key…, M, chain_code…]`.
pub fn parse_extended_public_key(
    response: &ApduResponse,
) -> Result<(Vec<u8>, Vec<u8>), ResponseError> {
    let (key, rest) = split_length_prefixed(response.data(), "public key")?;
    let (chain_code, _) = split_length_prefixed(rest, "chain code")?;
    Ok((key.to_vec(), chain_code.to_vec()))
}

/// The wallet identifier is everything before the status word.
///
/// Other protocol revisions instead truncate to the first 32 bytes; that
/// layout is intentionally not supported here.
pub fn parse_wallet_id(response: &ApduResponse) -> WalletId {
    WalletId(response.data().to_vec())
}

fn take_zero_terminated(buf: &[u8]) -> (&[u8], &[u8]) {
    match buf.iter().position(|&b| b == 0) {
        Some(pos) => (&buf[..pos], &buf[pos + 1..]),
        None => (buf, &[]),
    }
}

/// Parses the version/config response.
///
/// Layout: three raw version bytes, then two zero-terminated runs (build
/// identifier, product name), then the success status word. Firmware has
/// padded the tail differently across releases, so an unexpected trailer is
/// only logged; the parsed result is still returned.
pub fn parse_version(response: &ApduResponse) -> Result<AppVersionInfo, ResponseError> {
    let buf = response.raw();
    if buf.len() < 3 {
        return Err(ResponseError::Truncated {
            field: "version",
            needed: 3,
            available: buf.len(),
        });
    }
    let version = (buf[0], buf[1], buf[2]);
    let (commit, rest) = take_zero_terminated(&buf[3..]);
    let (name, rest) = take_zero_terminated(rest);
    if rest != SW_OK.to_be_bytes() {
        log::warn!(
            "version response trailer `{}` does not match the expected status word",
            hex::encode(rest)
        );
    }
    Ok(AppVersionInfo {
        version,
        commit: String::from_utf8_lossy(commit).into_owned(),
        name: String::from_utf8_lossy(name).into_owned(),
    })
}
