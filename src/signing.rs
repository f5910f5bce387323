//! Multi-round signing exchanges.
//!
//! Both signing flows share one shape: a preamble frame opens the round, the
//! device echoes the digest it will sign (for transactions, after the payload
//! has been streamed in chunks), and only once the echo matches the host's
//! own value are the per-path signature requests issued.

use sha2::{Digest, Sha256};

use crate::apdu::APDUCommand;
use crate::chunk::chunks;
use crate::error::{AvalancheAppError, ResponseError};
use crate::params::{ProtocolParams, MAX_APDU_PAYLOAD};
use crate::path::Bip32Path;
use crate::response::ApduResponse;
use crate::transport::{exchange_checked, Transport};

/// Progress of one signing exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningState {
    Init,
    PreambleSent,
    /// Transaction payload chunks are on the wire.
    PayloadStreaming,
    AwaitingEcho,
    CollectingSignatures,
    Done,
    /// Terminal; the device-side session must be assumed poisoned.
    Failed,
}

/// Signatures keyed by the canonical string form of each path suffix.
///
/// Iteration order is the request order; callers may rely on that.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureBundle {
    entries: Vec<(String, Vec<u8>)>,
}

impl SignatureBundle {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, suffix: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(key, _)| key == suffix)
            .map(|(_, sig)| sig.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries
            .iter()
            .map(|(key, sig)| (key.as_str(), sig.as_slice()))
    }

    fn push(&mut self, suffix: String, signature: Vec<u8>) {
        self.entries.push((suffix, signature));
    }
}

impl IntoIterator for SignatureBundle {
    type Item = (String, Vec<u8>);
    type IntoIter = std::vec::IntoIter<(String, Vec<u8>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Drives one signing exchange over a borrowed channel.
///
/// A session is single-use: it either runs to [`SigningState::Done`] or ends
/// in [`SigningState::Failed`]. The device keeps implicit session state
/// between the frames of an exchange, so a failed or abandoned session leaves
/// the app mid-round; the caller must reset it (deselect and reselect the
/// app) before the channel is trustworthy again.
pub struct SigningSession<'a, T: Transport> {
    transport: &'a T,
    params: &'static ProtocolParams,
    state: SigningState,
}

impl<'a, T: Transport> SigningSession<'a, T> {
    pub fn new(transport: &'a T, params: &'static ProtocolParams) -> Self {
        Self {
            transport,
            params,
            state: SigningState::Init,
        }
    }

    pub fn state(&self) -> SigningState {
        self.state
    }

    /// Hash signing: one preamble carrying the hash, echo check, then
    /// signature collection.
    ///
    /// The device must echo the 32-byte hash exactly; on mismatch the round
    /// is aborted before any signature request goes out.
    pub async fn sign_hash(
        &mut self,
        prefix: &Bip32Path,
        suffixes: &[Bip32Path],
        hash: &[u8; 32],
    ) -> Result<SignatureBundle, AvalancheAppError<T::Error>> {
        self.take_init()?;
        let params = self.params;
        let count = suffix_count(suffixes)?;

        let mut data = Vec::with_capacity(1 + hash.len() + 1 + 4 * prefix.len());
        data.push(count);
        data.extend_from_slice(hash);
        data.extend_from_slice(&prefix.encode()?);
        let preamble = self.frame(params.ins_sign_hash, params.p1_preamble, 0x00, data)?;

        self.state = SigningState::PreambleSent;
        let response = self.exchange(&preamble).await?;

        self.state = SigningState::AwaitingEcho;
        self.check_echo(hash, response.data())?;

        self.state = SigningState::CollectingSignatures;
        self.collect_signatures(
            params.ins_sign_hash,
            params.p1_hash_sign_next,
            params.p1_hash_sign_last,
            suffixes,
        )
        .await
    }

    /// Transaction signing: preamble, chunked payload, digest echo check,
    /// then signature collection.
    ///
    /// Returns the SHA-256 digest of `payload` alongside the signatures; the
    /// device's independently computed digest must match it byte for byte.
    pub async fn sign_transaction(
        &mut self,
        prefix: &Bip32Path,
        suffixes: &[Bip32Path],
        payload: &[u8],
        change_path: Option<&Bip32Path>,
    ) -> Result<([u8; 32], SignatureBundle), AvalancheAppError<T::Error>> {
        self.take_init()?;
        let params = self.params;
        let count = suffix_count(suffixes)?;

        let mut data = Vec::with_capacity(1 + 1 + 4 * prefix.len());
        data.push(count);
        data.extend_from_slice(&prefix.encode()?);
        let p2 = match change_path {
            Some(change) => {
                data.extend_from_slice(&change.encode()?);
                params.p2_with_change_path
            }
            None => params.p2_no_change_path,
        };
        let preamble = self.frame(params.ins_sign_transaction, params.p1_preamble, p2, data)?;
        self.state = SigningState::PreambleSent;
        self.exchange(&preamble).await?;

        let digest: [u8; 32] = Sha256::digest(payload).into();

        self.state = SigningState::PayloadStreaming;
        let mut echoed = Vec::new();
        for (chunk, last) in chunks(payload, MAX_APDU_PAYLOAD) {
            let p1 = if last {
                params.p1_tx_chunk_last
            } else {
                params.p1_tx_chunk
            };
            let frame = self.frame(params.ins_sign_transaction, p1, 0x00, chunk.to_vec())?;
            let response = self.exchange(&frame).await?;
            if last {
                echoed = response.into_data();
            }
        }

        self.state = SigningState::AwaitingEcho;
        self.check_echo(&digest, &echoed)?;

        self.state = SigningState::CollectingSignatures;
        let signatures = self
            .collect_signatures(
                params.ins_sign_transaction,
                params.p1_tx_sign_next,
                params.p1_tx_sign_last,
                suffixes,
            )
            .await?;
        Ok((digest, signatures))
    }

    fn take_init(&mut self) -> Result<(), AvalancheAppError<T::Error>> {
        if self.state != SigningState::Init {
            return Err(AvalancheAppError::InvalidInput(
                "signing session already consumed".into(),
            ));
        }
        Ok(())
    }

    fn frame(
        &self,
        ins: u8,
        p1: u8,
        p2: u8,
        data: Vec<u8>,
    ) -> Result<APDUCommand, AvalancheAppError<T::Error>> {
        APDUCommand::new(self.params.cla, ins, p1, p2, data).map_err(Into::into)
    }

    async fn exchange(
        &mut self,
        command: &APDUCommand,
    ) -> Result<ApduResponse, AvalancheAppError<T::Error>> {
        match exchange_checked(self.transport, command).await {
            Ok(response) => Ok(response),
            Err(e) => {
                self.state = SigningState::Failed;
                Err(e)
            }
        }
    }

    fn check_echo(
        &mut self,
        expected: &[u8; 32],
        echoed: &[u8],
    ) -> Result<(), AvalancheAppError<T::Error>> {
        if echoed.len() < expected.len() {
            self.state = SigningState::Failed;
            return Err(ResponseError::Truncated {
                field: "echoed digest",
                needed: expected.len(),
                available: echoed.len(),
            }
            .into());
        }
        if &echoed[..expected.len()] != expected {
            self.state = SigningState::Failed;
            return Err(AvalancheAppError::Integrity {
                expected: expected.to_vec(),
                echoed: echoed[..expected.len()].to_vec(),
            });
        }
        Ok(())
    }

    /// One frame per suffix, in request order; the final request carries the
    /// "last" role marker so the device can close the round.
    async fn collect_signatures(
        &mut self,
        ins: u8,
        p1_next: u8,
        p1_last: u8,
        suffixes: &[Bip32Path],
    ) -> Result<SignatureBundle, AvalancheAppError<T::Error>> {
        let mut bundle = SignatureBundle::default();
        for (i, suffix) in suffixes.iter().enumerate() {
            let last = i + 1 == suffixes.len();
            let p1 = if last { p1_last } else { p1_next };
            let frame = self.frame(ins, p1, 0x00, suffix.encode()?)?;
            let response = self.exchange(&frame).await?;
            bundle.push(suffix.to_string(), response.into_data());
        }
        self.state = SigningState::Done;
        Ok(bundle)
    }
}

fn suffix_count<E>(suffixes: &[Bip32Path]) -> Result<u8, AvalancheAppError<E>> {
    u8::try_from(suffixes.len()).map_err(|_| {
        AvalancheAppError::InvalidInput(format!(
            "{} signature paths requested, the limit is 255",
            suffixes.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundle_preserves_insertion_order() {
        let mut bundle = SignatureBundle::default();
        bundle.push("0/2".into(), vec![2]);
        bundle.push("0/0".into(), vec![0]);
        bundle.push("0/1".into(), vec![1]);

        let keys: Vec<&str> = bundle.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, ["0/2", "0/0", "0/1"]);
        assert_eq!(bundle.get("0/0"), Some(&[0u8][..]));
        assert_eq!(bundle.get("9/9"), None);
        assert_eq!(bundle.len(), 3);
    }

    #[test]
    fn bundle_into_iter_yields_owned_pairs() {
        let mut bundle = SignatureBundle::default();
        bundle.push("13".into(), vec![0xAB]);
        let pairs: Vec<(String, Vec<u8>)> = bundle.into_iter().collect();
        assert_eq!(pairs, vec![("13".to_string(), vec![0xAB])]);
    }
}
