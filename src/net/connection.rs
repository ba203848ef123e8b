//! A single TCP connection: a send queue drained by one task, and a read
//! loop pushing decoded packets to the owning interface.
//!
//! There's no explicit strand here the way an asio-based connection needs
//! one: splitting the socket into owned read/write halves and giving each
//! its own task already serializes each direction, which is all a strand
//! bought in the first place.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, RwLock};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::net::encryptor::{ConnectionEncryptor, NullEncryptor};
use crate::net::packet::{Packet, PacketHeader, HEADER_SIZE};

/// Which side of the handshake a connection was created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    Server,
    Client,
}

/// A packet paired with the connection it arrived on, handed to an
/// interface's incoming-message queue.
pub struct OwnedPacket {
    pub remote: Arc<Connection>,
    pub packet: Packet,
}

/// A live connection. Cheap to clone (it's an `Arc` internally); every
/// caller holds the same handle the read/write tasks hold.
pub struct Connection {
    pub name: String,
    pub owner: Owner,
    pub peer_addr: SocketAddr,
    send_tx: mpsc::UnboundedSender<Packet>,
    encryptor: RwLock<Arc<dyn ConnectionEncryptor>>,
    num_outgoing: AtomicI32,
    num_incoming: AtomicI32,
    connected: AtomicBool,
}

impl Connection {
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn num_outgoing(&self) -> i32 {
        self.num_outgoing.load(Ordering::Relaxed)
    }

    pub fn num_incoming(&self) -> i32 {
        self.num_incoming.load(Ordering::Relaxed)
    }

    /// Install the cipher negotiated by the handshake. Both read and write
    /// tasks pick it up on their next packet.
    pub fn set_encryptor(&self, encryptor: Arc<dyn ConnectionEncryptor>) {
        *self.encryptor.write().unwrap() = encryptor;
    }

    fn current_encryptor(&self) -> Arc<dyn ConnectionEncryptor> {
        self.encryptor.read().unwrap().clone()
    }

    /// Queue `packet` for sending. Silently dropped if the write task has
    /// already exited (the connection is going down).
    pub fn send(&self, mut packet: Packet) {
        self.num_outgoing.fetch_add(1, Ordering::Relaxed);
        let _ = self.send_tx.send({
            packet.finalize_length();
            packet
        });
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::Relaxed);
    }
}

/// Split `stream` and spawn its read/write tasks, returning the shared
/// handle callers use to send packets and the interface uses to track the
/// connection.
pub fn spawn(
    stream: TcpStream,
    owner: Owner,
    name: String,
    recv_tx: mpsc::UnboundedSender<OwnedPacket>,
) -> Arc<Connection> {
    let peer_addr = stream.peer_addr().unwrap_or_else(|_| ([0, 0, 0, 0], 0).into());
    let (reader, writer) = stream.into_split();
    let (send_tx, send_rx) = mpsc::unbounded_channel();

    let conn = Arc::new(Connection {
        name,
        owner,
        peer_addr,
        send_tx,
        encryptor: RwLock::new(Arc::new(NullEncryptor)),
        num_outgoing: AtomicI32::new(0),
        num_incoming: AtomicI32::new(0),
        connected: AtomicBool::new(true),
    });

    tokio::spawn(write_loop(writer, send_rx, conn.clone()));
    tokio::spawn(read_loop(reader, recv_tx, conn.clone()));

    conn
}

async fn write_loop(
    mut writer: tokio::net::tcp::OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<Packet>,
    conn: Arc<Connection>,
) {
    while let Some(packet) = rx.recv().await {
        let enc = conn.current_encryptor();
        let (header, mut body) = packet.into_parts();
        let mut head = header.to_bytes();
        enc.encrypt(&mut head[4..]);
        enc.encrypt(&mut body);

        if writer.write_all(&head).await.is_err() || writer.write_all(&body).await.is_err() {
            tracing::warn!(conn = %conn.name, "write_loop: connection error");
            conn.disconnect();
            break;
        }
        conn.num_outgoing.fetch_sub(1, Ordering::Relaxed);
    }
}

async fn read_loop(
    mut reader: tokio::net::tcp::OwnedReadHalf,
    recv_tx: mpsc::UnboundedSender<OwnedPacket>,
    conn: Arc<Connection>,
) {
    loop {
        let mut head_buf = [0u8; HEADER_SIZE];
        if reader.read_exact(&mut head_buf).await.is_err() {
            if conn.is_connected() {
                tracing::debug!(conn = %conn.name, "read_loop: peer closed the connection");
            }
            break;
        }

        let enc = conn.current_encryptor();
        enc.decrypt(&mut head_buf[4..]);
        let header = match PacketHeader::from_bytes(&head_buf) {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!(conn = %conn.name, error = %e, "read_loop: malformed header");
                break;
            }
        };

        let mut body = vec![0u8; header.length as usize];
        if !body.is_empty() && reader.read_exact(&mut body).await.is_err() {
            tracing::warn!(conn = %conn.name, "read_loop: truncated body");
            break;
        }
        enc.decrypt(&mut body);

        conn.num_incoming.fetch_add(1, Ordering::Relaxed);
        let packet = Packet::from_parts(header, body);
        if recv_tx.send(OwnedPacket { remote: conn.clone(), packet }).is_err() {
            break;
        }
    }
    conn.disconnect();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn send_and_receive_roundtrip_plaintext() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (server_tx, mut server_rx) = mpsc::unbounded_channel();
        let accept = tokio::spawn(async move {
            let (sock, _) = listener.accept().await.unwrap();
            spawn(sock, Owner::Server, "server".into(), server_tx)
        });

        let (client_tx, _client_rx) = mpsc::unbounded_channel();
        let client_sock = TcpStream::connect(addr).await.unwrap();
        let client_conn = spawn(client_sock, Owner::Client, "client".into(), client_tx);
        let _server_conn = accept.await.unwrap();

        let mut pkt = Packet::new(42);
        pkt.push_back(7u32);
        client_conn.send(pkt);

        let received = server_rx.recv().await.unwrap();
        assert_eq!(received.packet.command(), 42);
        let mut body = received.packet;
        let v: u32 = body.pop_back().unwrap();
        assert_eq!(v, 7);
    }
}
