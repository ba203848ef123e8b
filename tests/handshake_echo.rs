//! End-to-end: a server interface accepts a connection, the bcrypt
//! handshake negotiates a session cipher, and a 1,000-byte packet sent by
//! the client comes back from the server unchanged.

use blowvault::config::{ClientConfig, ServerConfig};
use blowvault::net::{ClientInterface, Packet, ServerInterface};

#[tokio::test]
async fn handshake_then_thousand_byte_echo() {
    let server = ServerInterface::new("echo-server");
    let server_config = ServerConfig::new("echo-server", "127.0.0.1:0");
    let addr = server.start(&server_config).await.expect("server should bind an ephemeral port");

    let client = ClientInterface::new("echo-client");
    let client_config = ClientConfig::new("echo-client", addr.ip().to_string(), addr.port());
    let client_conn = client.connect(&client_config).await.expect("client should complete the handshake");

    let payload: Vec<u8> = (0..1000u32).map(|i| (i % 256) as u8).collect();
    let mut outbound = Packet::new(1);
    outbound.push_back_bytes(&payload);
    client_conn.send(outbound);

    let received = server.recv().await.expect("server should receive the client's packet");
    assert_eq!(received.packet.body(), payload.as_slice());

    let mut echoed = Packet::new(2);
    echoed.push_back_bytes(received.packet.body());
    received.remote.send(echoed);

    let reply = client.recv().await.expect("client should receive the echoed packet");
    assert_eq!(reply.packet.body(), payload.as_slice());

    server.stop();
    client.disconnect_all();
}
