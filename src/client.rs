//! High-level operations of the Avalanche app.

use tokio::sync::Mutex;

use crate::apdu::APDUCommand;
use crate::error::AvalancheAppError;
use crate::params::{ProtocolParams, APP_V0, MAX_HRP_LEN};
use crate::path::Bip32Path;
use crate::response::{self, AppVersionInfo, WalletId};
use crate::signing::{SignatureBundle, SigningSession};
use crate::transport::{exchange_checked, Transport};

/// Client for the Avalanche app running on a Ledger device.
///
/// The channel is half-duplex and the device keeps implicit session state
/// across the frames of a single operation, so the client serializes
/// everything: the injected transport sits behind a mutex that is held for
/// the full duration of each operation, and no two operations interleave.
///
/// There is no mid-operation cancellation. If a multi-frame operation is
/// abandoned partway (transport failure, dropped future), the device is left
/// in a partial session and the caller must reset it (deselect and reselect
/// the app) before further operations can be trusted. Nothing is retried
/// automatically; every failure surfaces unmodified, and retrying means
/// re-running the whole operation.
pub struct AvalancheApp<T: Transport> {
    transport: Mutex<T>,
    params: &'static ProtocolParams,
}

impl<T: Transport> AvalancheApp<T> {
    /// Wraps a transport, committing to the v0 command set.
    pub fn new(transport: T) -> Self {
        Self {
            transport: Mutex::new(transport),
            params: &APP_V0,
        }
    }

    /// Version and build information of the running app.
    ///
    /// Unexpected trailer bytes are logged rather than fatal, so firmware
    /// with different padding still answers version queries.
    pub async fn get_version(&self) -> Result<AppVersionInfo, AvalancheAppError<T::Error>> {
        let transport = self.transport.lock().await;
        let command = APDUCommand::new(
            self.params.cla,
            self.params.ins_get_version,
            0x00,
            0x00,
            vec![],
        )?;
        let resp = exchange_checked(&*transport, &command).await?;
        Ok(response::parse_version(&resp)?)
    }

    /// Opaque identifier of the device/seed pair.
    pub async fn get_wallet_id(&self) -> Result<WalletId, AvalancheAppError<T::Error>> {
        let transport = self.transport.lock().await;
        let command = APDUCommand::new(
            self.params.cla,
            self.params.ins_get_wallet_id,
            0x00,
            0x00,
            vec![],
        )?;
        let resp = exchange_checked(&*transport, &command).await?;
        Ok(response::parse_wallet_id(&resp))
    }

    /// Derives the public key for `path`.
    ///
    /// `hrp` is an optional human-readable address prefix shown on the
    /// device next to the derived address; at most [`MAX_HRP_LEN`] bytes.
    pub async fn get_public_key(
        &self,
        path: &Bip32Path,
        hrp: Option<&str>,
    ) -> Result<Vec<u8>, AvalancheAppError<T::Error>> {
        let hrp = hrp.unwrap_or("");
        if hrp.len() > MAX_HRP_LEN {
            return Err(AvalancheAppError::InvalidInput(format!(
                "address prefix of {} bytes exceeds the {}-byte maximum",
                hrp.len(),
                MAX_HRP_LEN
            )));
        }

        let transport = self.transport.lock().await;
        let mut data = Vec::with_capacity(1 + hrp.len() + 1 + 4 * path.len());
        data.push(hrp.len() as u8);
        data.extend_from_slice(hrp.as_bytes());
        data.extend_from_slice(&path.encode()?);
        let command = APDUCommand::new(
            self.params.cla,
            self.params.ins_get_public_key,
            0x00,
            0x00,
            data,
        )?;
        let resp = exchange_checked(&*transport, &command).await?;
        Ok(response::parse_public_key(
            &resp,
            self.params.public_key_status_mode,
        )?)
    }

    /// Derives the public key and chain code for `path`.
    pub async fn get_extended_public_key(
        &self,
        path: &Bip32Path,
    ) -> Result<(Vec<u8>, Vec<u8>), AvalancheAppError<T::Error>> {
        let transport = self.transport.lock().await;
        let command = APDUCommand::new(
            self.params.cla,
            self.params.ins_get_extended_public_key,
            0x00,
            0x00,
            path.encode()?,
        )?;
        let resp = exchange_checked(&*transport, &command).await?;
        Ok(response::parse_extended_public_key(&resp)?)
    }

    /// Signs a 32-byte hash once per path suffix.
    ///
    /// Each suffix is derived under `prefix`; the result maps each suffix's
    /// canonical string form to its signature, in request order.
    pub async fn sign_hash(
        &self,
        prefix: &Bip32Path,
        suffixes: &[Bip32Path],
        hash: &[u8],
    ) -> Result<SignatureBundle, AvalancheAppError<T::Error>> {
        let hash: [u8; 32] = hash.try_into().map_err(|_| {
            AvalancheAppError::InvalidInput(format!(
                "hash must be exactly 32 bytes, got {}",
                hash.len()
            ))
        })?;
        check_unique_suffixes(suffixes)?;

        let transport = self.transport.lock().await;
        let mut session = SigningSession::new(&*transport, self.params);
        session.sign_hash(prefix, suffixes, &hash).await
    }

    /// Signs a transaction once per path suffix.
    ///
    /// The payload is streamed to the device in chunks; the device computes
    /// its own digest and the operation fails before any signature request
    /// if that digest does not match the host's. Returns the digest and the
    /// signatures keyed by canonical suffix strings, in request order.
    pub async fn sign_transaction(
        &self,
        prefix: &Bip32Path,
        suffixes: &[Bip32Path],
        payload: &[u8],
        change_path: Option<&Bip32Path>,
    ) -> Result<([u8; 32], SignatureBundle), AvalancheAppError<T::Error>> {
        check_unique_suffixes(suffixes)?;

        let transport = self.transport.lock().await;
        let mut session = SigningSession::new(&*transport, self.params);
        session
            .sign_transaction(prefix, suffixes, payload, change_path)
            .await
    }
}

/// Signature results are keyed by canonical suffix strings, so duplicate
/// suffixes in one request can never be represented faithfully.
fn check_unique_suffixes<E>(suffixes: &[Bip32Path]) -> Result<(), AvalancheAppError<E>> {
    for (i, suffix) in suffixes.iter().enumerate() {
        if suffixes[..i].contains(suffix) {
            return Err(AvalancheAppError::InvalidInput(format!(
                "duplicate path suffix {}",
                suffix
            )));
        }
    }
    Ok(())
}
