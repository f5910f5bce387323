use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use ledger_avalanche_client::apdu::APDUCommand;
use ledger_avalanche_client::transport::Transport;

/// A frame recorded by [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
}

#[derive(Default)]
struct Inner {
    responses: Mutex<VecDeque<Vec<u8>>>,
    sent: Mutex<Vec<SentFrame>>,
}

/// Scripted transport: replays canned raw responses in order and records
/// every frame it is asked to send. Clones share the same script and log.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Inner>,
}

impl MockTransport {
    pub fn new(responses: Vec<Vec<u8>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                responses: Mutex::new(responses.into()),
                sent: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn sent(&self) -> Vec<SentFrame> {
        self.inner.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Error = String;

    async fn exchange(&self, command: &APDUCommand) -> Result<Vec<u8>, Self::Error> {
        self.inner.sent.lock().unwrap().push(SentFrame {
            cla: command.cla,
            ins: command.ins,
            p1: command.p1,
            p2: command.p2,
            data: command.data().to_vec(),
        });
        self.inner
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| "no scripted response left".to_string())
    }
}

/// `data` followed by the success status word, as a device would return it.
pub fn ok(data: &[u8]) -> Vec<u8> {
    let mut resp = data.to_vec();
    resp.extend_from_slice(&0x9000u16.to_be_bytes());
    resp
}

/// A bare non-success status word response.
pub fn rejected(sw: u16) -> Vec<u8> {
    sw.to_be_bytes().to_vec()
}
