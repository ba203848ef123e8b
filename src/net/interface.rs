//! Server and client entry points: accept/connect, run the handshake, and
//! hand the caller a stream of incoming packets.
//!
//! The original runs its own io-context thread per interface; under tokio
//! there's already a runtime driving everything, so "starting" an interface
//! just means spawning its accept loop as one more task on it.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;

use crate::config::{ClientConfig, ServerConfig};
use crate::error::Result;
use crate::net::connection::{self, Connection, OwnedPacket, Owner};
use crate::net::encryptor::{client_handshake, server_handshake, BcryptEncryptor};
use crate::util::rand::Randomizer;

/// Accepts inbound connections, runs the server side of the handshake on
/// each, and queues their packets for the caller to drain with [`Self::recv`].
pub struct ServerInterface {
    pub name: String,
    connections: StdMutex<Vec<Arc<Connection>>>,
    incoming_tx: mpsc::UnboundedSender<OwnedPacket>,
    incoming_rx: AsyncMutex<mpsc::UnboundedReceiver<OwnedPacket>>,
    accept_task: StdMutex<Option<JoinHandle<()>>>,
    stopped: Arc<AtomicBool>,
    handshake_cost: AtomicU32,
    max_connections: AtomicUsize,
}

impl ServerInterface {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            name: name.into(),
            connections: StdMutex::new(Vec::new()),
            incoming_tx,
            incoming_rx: AsyncMutex::new(incoming_rx),
            accept_task: StdMutex::new(None),
            stopped: Arc::new(AtomicBool::new(false)),
            handshake_cost: AtomicU32::new(400),
            max_connections: AtomicUsize::new(usize::MAX),
        })
    }

    /// Bind `config.bind_addr` and spawn the accept loop, returning the
    /// bound address (useful when the config requested an ephemeral port).
    pub async fn start(self: &Arc<Self>, config: &ServerConfig) -> Result<SocketAddr> {
        let listener = TcpListener::bind(&config.bind_addr).await?;
        let bound = listener.local_addr()?;
        self.handshake_cost.store(config.handshake_cost, Ordering::Relaxed);
        self.max_connections.store(config.max_connections, Ordering::Relaxed);
        let this = self.clone();
        let handle = tokio::spawn(async move { this.accept_loop(listener).await });
        *self.accept_task.lock().unwrap() = Some(handle);
        Ok(bound)
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
        if let Some(handle) = self.accept_task.lock().unwrap().take() {
            handle.abort();
        }
        self.connections.lock().unwrap().clear();
    }

    pub fn connections(&self) -> Vec<Arc<Connection>> {
        self.connections.lock().unwrap().clone()
    }

    /// Wait for the next packet from any connected client.
    pub async fn recv(&self) -> Option<OwnedPacket> {
        self.incoming_rx.lock().await.recv().await
    }

    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        while !self.stopped.load(Ordering::Relaxed) {
            match listener.accept().await {
                Ok((sock, addr)) => {
                    if self.connections.lock().unwrap().len() >= self.max_connections.load(Ordering::Relaxed) {
                        tracing::warn!(server = %self.name, peer = %addr, "accept_loop: rejecting connection, at capacity");
                        continue;
                    }
                    let this = self.clone();
                    tokio::spawn(async move { this.handshake_and_register(sock, addr).await });
                }
                Err(e) => {
                    tracing::warn!(server = %self.name, error = %e, "accept_loop: error accepting connection");
                }
            }
        }
    }

    async fn handshake_and_register(self: Arc<Self>, mut sock: TcpStream, addr: SocketAddr) {
        let mut rng = Randomizer::new();
        let cost = self.handshake_cost.load(Ordering::Relaxed);
        match server_handshake(&mut sock, &mut rng, cost).await {
            Ok(fish) => {
                let conn = connection::spawn(sock, Owner::Server, self.name.clone(), self.incoming_tx.clone());
                conn.set_encryptor(Arc::new(BcryptEncryptor::new(fish)));
                self.connections.lock().unwrap().push(conn);
            }
            Err(e) => {
                tracing::warn!(server = %self.name, peer = %addr, error = %e, "handshake_and_register: handshake failed");
            }
        }
    }
}

/// Dials outbound connections, runs the client side of the handshake, and
/// queues incoming packets the same way [`ServerInterface`] does.
pub struct ClientInterface {
    pub name: String,
    connections: StdMutex<Vec<Arc<Connection>>>,
    incoming_tx: mpsc::UnboundedSender<OwnedPacket>,
    incoming_rx: AsyncMutex<mpsc::UnboundedReceiver<OwnedPacket>>,
}

impl ClientInterface {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            name: name.into(),
            connections: StdMutex::new(Vec::new()),
            incoming_tx,
            incoming_rx: AsyncMutex::new(incoming_rx),
        })
    }

    pub async fn connect(&self, config: &ClientConfig) -> Result<Arc<Connection>> {
        let mut sock = TcpStream::connect(config.addr()).await?;
        let fish = client_handshake(&mut sock).await?;
        let conn = connection::spawn(sock, Owner::Client, self.name.clone(), self.incoming_tx.clone());
        conn.set_encryptor(Arc::new(BcryptEncryptor::new(fish)));
        self.connections.lock().unwrap().push(conn.clone());
        Ok(conn)
    }

    pub async fn recv(&self) -> Option<OwnedPacket> {
        self.incoming_rx.lock().await.recv().await
    }

    pub fn disconnect_all(&self) {
        for conn in self.connections.lock().unwrap().iter() {
            conn.disconnect();
        }
    }
}
