//! Exercises [`TransportTcp`] against a local socket speaking the Speculos
//! framing: 4-byte big-endian length, frame bytes, then on the way back a
//! 4-byte payload length, the payload, and the 2-byte status word.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use ledger_avalanche_client::apdu::APDUCommand;
use ledger_avalanche_client::transport::{Transport, TransportTcp, TransportWrapper};

#[tokio::test]
async fn tcp_transport_speaks_the_simulator_framing() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut len_buf = [0u8; 4];
        socket.read_exact(&mut len_buf).await.unwrap();
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut frame = vec![0u8; len];
        socket.read_exact(&mut frame).await.unwrap();

        // Echo the frame payload back, then the success status word.
        let payload = frame[5..].to_vec();
        socket
            .write_all(&(payload.len() as u32).to_be_bytes())
            .await
            .unwrap();
        socket.write_all(&payload).await.unwrap();
        socket.write_all(&0x9000u16.to_be_bytes()).await.unwrap();
        frame
    });

    let transport = Arc::new(TransportTcp::new(addr).await.unwrap());
    let wrapper = TransportWrapper::new(transport.clone());
    let command = APDUCommand::new(0x80, 0x02, 0x00, 0x00, vec![0xDE, 0xAD]).unwrap();

    let raw = wrapper.exchange(&command).await.unwrap();
    assert_eq!(raw, vec![0xDE, 0xAD, 0x90, 0x00]);

    let received_frame = server.await.unwrap();
    assert_eq!(received_frame, command.encode());

    assert_eq!(transport.total_exchanges(), 1);
    assert_eq!(transport.total_sent(), 4 + 7);
    assert_eq!(transport.total_received(), 4 + 4);
}
