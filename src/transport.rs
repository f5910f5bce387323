//! Communication layer between the host and the device.

use std::error::Error;
use std::fmt::Debug;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use async_trait::async_trait;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::Mutex,
};

#[cfg(feature = "transport")]
use hidapi::HidApi;
#[cfg(feature = "transport")]
use ledger_transport_hid::TransportNativeHID;

use crate::apdu::APDUCommand;
use crate::error::AvalancheAppError;
use crate::response::ApduResponse;

/// Generic trait to abstract the communication layer between the host and a
/// Ledger device.
#[async_trait]
pub trait Transport: Send + Sync {
    type Error: Debug + Send + Sync;

    /// Sends one frame and resolves with the raw response, trailing status
    /// word included.
    ///
    /// The channel is half-duplex: exactly one frame may be outstanding at a
    /// time, and the response must be fully received before the next send.
    async fn exchange(&self, command: &APDUCommand) -> Result<Vec<u8>, Self::Error>;
}

/// Sends one frame, folding transport errors, short responses and non-success
/// status words into the client's error surface.
pub(crate) async fn exchange_checked<T: Transport>(
    transport: &T,
    command: &APDUCommand,
) -> Result<ApduResponse, AvalancheAppError<T::Error>> {
    let raw = transport
        .exchange(command)
        .await
        .map_err(AvalancheAppError::Transport)?;
    let response = ApduResponse::from_raw(raw)?;
    if !response.is_success() {
        return Err(AvalancheAppError::DeviceRejected(response.status_word()));
    }
    Ok(response)
}

/// Transport over a USB HID connection to a physical Ledger device.
#[cfg(feature = "transport")]
pub struct TransportHID(TransportNativeHID);

#[cfg(feature = "transport")]
impl TransportHID {
    pub fn new(t: TransportNativeHID) -> Self {
        Self(t)
    }

    /// Opens the first connected Ledger device.
    pub fn open_first() -> Result<Self, Box<dyn Error + Send + Sync>> {
        let api = HidApi::new()?;
        Ok(Self(TransportNativeHID::new(&api)?))
    }
}

#[cfg(feature = "transport")]
#[async_trait]
impl Transport for TransportHID {
    type Error = Box<dyn Error + Send + Sync>;

    async fn exchange(&self, cmd: &APDUCommand) -> Result<Vec<u8>, Self::Error> {
        let answer = self.0.exchange(&ledger_apdu::APDUCommand {
            cla: cmd.cla,
            ins: cmd.ins,
            p1: cmd.p1,
            p2: cmd.p2,
            data: cmd.data().to_vec(),
        })?;
        let mut raw = answer.data().to_vec();
        raw.extend_from_slice(&answer.retcode().to_be_bytes());
        Ok(raw)
    }
}

/// Transport to communicate with the Ledger Speculos simulator.
pub struct TransportTcp {
    connection: Mutex<TcpStream>,
    total_exchanges: AtomicU64,
    total_sent: AtomicU64,
    total_received: AtomicU64,
}

impl TransportTcp {
    /// Create a new TCP transport connecting to the provided socket address.
    pub async fn new(addr: SocketAddr) -> Result<Self, Box<dyn Error>> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self {
            connection: Mutex::new(stream),
            total_exchanges: AtomicU64::new(0),
            total_sent: AtomicU64::new(0),
            total_received: AtomicU64::new(0),
        })
    }

    /// Create a new TCP transport using the default Speculos address 127.0.0.1:9999.
    pub async fn new_default() -> Result<Self, Box<dyn Error>> {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 9999);
        Self::new(addr).await
    }

    // Number of exchanges made with this instance. An exchange includes
    // both sending an APDU and receiving a response.
    pub fn total_exchanges(&self) -> u64 {
        self.total_exchanges.load(Ordering::Relaxed)
    }

    // Total bytes sent
    pub fn total_sent(&self) -> u64 {
        self.total_sent.load(Ordering::Relaxed)
    }

    // Total bytes received
    pub fn total_received(&self) -> u64 {
        self.total_received.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Transport for TransportTcp {
    type Error = Box<dyn Error + Send + Sync>;

    async fn exchange(&self, command: &APDUCommand) -> Result<Vec<u8>, Self::Error> {
        // Count every call to exchange.
        self.total_exchanges.fetch_add(1, Ordering::Relaxed);

        let mut stream = self.connection.lock().await;
        let command_bytes = command.encode();

        let mut req = vec![0u8; command_bytes.len() + 4];
        req[..4].copy_from_slice(&(command_bytes.len() as u32).to_be_bytes());
        req[4..].copy_from_slice(&command_bytes);

        stream.write_all(&req).await?;
        self.total_sent
            .fetch_add(req.len() as u64, Ordering::Relaxed);

        let mut buff = [0u8; 4];
        let len = match stream.read(&mut buff).await? {
            4 => u32::from_be_bytes(buff),
            _ => return Err("Invalid Length".into()),
        };
        self.total_received.fetch_add(4, Ordering::Relaxed); // length header

        // The advertised length covers the payload; the status word follows.
        let mut resp = vec![0u8; len as usize + 2];
        stream.read_exact(&mut resp).await?;
        self.total_received
            .fetch_add(resp.len() as u64, Ordering::Relaxed);

        Ok(resp)
    }
}

/// Wrapper to handle any boxed transport behind one concrete type.
pub struct TransportWrapper(Arc<dyn Transport<Error = Box<dyn Error + Send + Sync>> + Sync + Send>);

impl TransportWrapper {
    pub fn new(t: Arc<dyn Transport<Error = Box<dyn Error + Send + Sync>> + Sync + Send>) -> Self {
        Self(t)
    }
}

#[async_trait]
impl Transport for TransportWrapper {
    type Error = Box<dyn Error + Send + Sync>;

    async fn exchange(&self, command: &APDUCommand) -> Result<Vec<u8>, Self::Error> {
        self.0.exchange(command).await
    }
}
