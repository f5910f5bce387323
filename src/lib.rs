//! Host-side client for the Avalanche Ledger app.
//!
//! Encodes APDU commands (derivation paths, chunked payloads, multi-round
//! signing handshakes) and parses the app's responses. Signing happens on the
//! device; this crate only drives the protocol over an injected [`Transport`].

pub mod apdu;
pub mod chunk;
pub mod client;
pub mod error;
pub mod params;
pub mod path;
pub mod response;
pub mod signing;
pub mod transport;

pub use apdu::{APDUCommand, StatusWord};
pub use client::AvalancheApp;
pub use error::AvalancheAppError;
pub use path::Bip32Path;
pub use response::{AppVersionInfo, WalletId};
pub use signing::SignatureBundle;
pub use transport::Transport;
