//! Wire-level constants for the Avalanche app's command set.
//!
//! Everything revision-dependent lives in one immutable [`ProtocolParams`]
//! table selected when the client is constructed. This crate pins the v0
//! command set; see DESIGN.md for what that pin covers.

use crate::response::StatusMode;

/// Maximum frame payload size. Larger payloads must be chunked.
pub const MAX_APDU_PAYLOAD: usize = 230;

/// Maximum length of the human-readable address prefix (hrp).
pub const MAX_HRP_LEN: usize = 24;

/// Status word reported by the app on success.
pub const SW_OK: u16 = 0x9000;

/// Wire constants for one revision of the app's command set.
///
/// Instruction codes and frame-role parameter bytes have shifted between app
/// revisions; a client instance commits to exactly one table for its whole
/// lifetime rather than switching layouts per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolParams {
    /// Class byte identifying the app's command set.
    pub cla: u8,

    pub ins_get_version: u8,
    pub ins_get_wallet_id: u8,
    pub ins_get_public_key: u8,
    pub ins_get_extended_public_key: u8,
    pub ins_sign_hash: u8,
    pub ins_sign_transaction: u8,

    /// First frame of every multi-round signing exchange.
    pub p1_preamble: u8,
    /// Hash signing: a signature request with more to follow.
    pub p1_hash_sign_next: u8,
    /// Hash signing: the final signature request of the round.
    pub p1_hash_sign_last: u8,
    /// Transaction signing: an intermediate payload chunk.
    pub p1_tx_chunk: u8,
    /// Transaction signing: the final payload chunk; its response carries the
    /// device-computed digest.
    pub p1_tx_chunk_last: u8,
    /// Transaction signing: a signature request with more to follow.
    pub p1_tx_sign_next: u8,
    /// Transaction signing: the final signature request.
    pub p1_tx_sign_last: u8,

    /// Transaction preamble without a change path.
    pub p2_no_change_path: u8,
    /// Transaction preamble carrying an appended change path.
    pub p2_with_change_path: u8,

    /// Which view of the response feeds the public-key parser.
    pub public_key_status_mode: StatusMode,
}

/// The v0 command set.
///
/// Intermediate and final frame-role values are distinct for every
/// multi-frame operation, so the device can always tell "more data follows"
/// from "this completes the round".
pub const APP_V0: ProtocolParams = ProtocolParams {
    cla: 0x80,

    ins_get_version: 0x00,
    ins_get_wallet_id: 0x01,
    ins_get_public_key: 0x02,
    ins_get_extended_public_key: 0x03,
    ins_sign_hash: 0x04,
    ins_sign_transaction: 0x05,

    p1_preamble: 0x00,
    p1_hash_sign_next: 0x01,
    p1_hash_sign_last: 0x81,
    p1_tx_chunk: 0x01,
    p1_tx_chunk_last: 0x02,
    p1_tx_sign_next: 0x03,
    p1_tx_sign_last: 0x81,

    p2_no_change_path: 0x00,
    p2_with_change_path: 0x01,

    public_key_status_mode: StatusMode::Stripped,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_roles_are_distinguishable() {
        assert_ne!(APP_V0.p1_tx_chunk, APP_V0.p1_tx_chunk_last);
        assert_ne!(APP_V0.p1_hash_sign_next, APP_V0.p1_hash_sign_last);
        assert_ne!(APP_V0.p1_tx_sign_next, APP_V0.p1_tx_sign_last);
        assert_ne!(APP_V0.p2_no_change_path, APP_V0.p2_with_change_path);
    }
}
