//! Per-connection encryption and the bcrypt challenge handshake that
//! negotiates it.

use tokio::net::TcpStream;

use crate::cipher::BlowFish;
use crate::error::{Error, Result};
use crate::net::packet::{read_packet, write_packet, Packet};
use crate::util::rand::Randomizer;

/// Hard cap on a handshake-proposed bcrypt cost; a client that rejects this
/// is refusing to do 100,000 rounds of key stretching for a stranger.
pub const MAX_HANDSHAKE_COST: u64 = 100_000;

const HANDSHAKE_COMMAND: u32 = 0;
const PASS_LEN: usize = 16;
const SALT_LEN: usize = 16;
const CHALLENGE_LEN: usize = 16;

/// Encrypts and decrypts the bytes a [`crate::net::connection::Connection`]
/// puts on the wire. `&self`-based: [`BlowFish::encrypt`]/`decrypt` don't
/// need `&mut`, so one instance is shared across a connection's read and
/// write tasks without locking.
pub trait ConnectionEncryptor: Send + Sync {
    fn encrypt(&self, data: &mut [u8]);
    fn decrypt(&self, data: &mut [u8]);
}

/// The identity encryptor a freshly accepted or dialed connection starts
/// with, before a handshake negotiates a real cipher.
pub struct NullEncryptor;

impl ConnectionEncryptor for NullEncryptor {
    fn encrypt(&self, _data: &mut [u8]) {}
    fn decrypt(&self, _data: &mut [u8]) {}
}

pub struct BcryptEncryptor {
    fish: BlowFish,
}

impl BcryptEncryptor {
    pub fn new(fish: BlowFish) -> Self {
        Self { fish }
    }
}

impl ConnectionEncryptor for BcryptEncryptor {
    fn encrypt(&self, data: &mut [u8]) {
        self.fish.encrypt(data);
    }
    fn decrypt(&self, data: &mut [u8]) {
        self.fish.decrypt(data);
    }
}

/// Run the server side of the challenge handshake: propose a random
/// password and salt at the given `cost`, then verify the peer derived the
/// same cipher by checking it can encrypt a random challenge the same way
/// we can. `cost` is normally [`crate::config::ServerConfig::handshake_cost`].
pub async fn server_handshake(stream: &mut TcpStream, rng: &mut Randomizer, cost: u32) -> Result<BlowFish> {
    let mut pass = vec![0u8; PASS_LEN];
    rng.fill_bytes(&mut pass);
    let mut salt = vec![0u8; SALT_LEN];
    rng.fill_bytes(&mut salt);
    let mut challenge = vec![0u8; CHALLENGE_LEN];
    rng.fill_bytes(&mut challenge);

    let mut params = Packet::new(HANDSHAKE_COMMAND);
    params.push_string(&pass);
    params.push_string(&salt);
    params.push_back(cost);
    params.push_string(&challenge);
    params.finalize_length();
    write_packet(stream, &params).await?;

    let fish = BlowFish::from_bcrypt(&pass, &salt, cost);
    let mut expected = challenge;
    fish.encrypt(&mut expected);

    let reply = read_packet(stream).await?;
    if reply.body() != expected.as_slice() {
        return Err(Error::HandshakeFailed("challenge response mismatch"));
    }
    Ok(fish)
}

/// Run the client side: read the server's proposed parameters, derive the
/// same cipher, and prove it by encrypting the challenge back.
pub async fn client_handshake(stream: &mut TcpStream) -> Result<BlowFish> {
    let mut params = read_packet(stream).await?;
    let challenge = params.pop_string().map_err(|_| Error::HandshakeFailed("malformed challenge"))?;
    let cost: u32 = params.pop_back().map_err(|_| Error::HandshakeFailed("malformed cost"))?;
    let salt = params.pop_string().map_err(|_| Error::HandshakeFailed("malformed salt"))?;
    let pass = params.pop_string().map_err(|_| Error::HandshakeFailed("malformed password"))?;

    if cost as u64 > MAX_HANDSHAKE_COST {
        return Err(Error::CostTooLarge(cost as u64));
    }

    let fish = BlowFish::from_bcrypt(&pass, &salt, cost);
    let mut response = challenge;
    fish.encrypt(&mut response);

    let mut reply = Packet::new(HANDSHAKE_COMMAND);
    reply.push_back_bytes(&response);
    reply.finalize_length();
    write_packet(stream, &reply).await?;

    Ok(fish)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn handshake_agrees_on_a_shared_cipher() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut rng = Randomizer::from_seed(7);
            server_handshake(&mut sock, &mut rng, 400).await
        });
        let mut client_sock = TcpStream::connect(addr).await.unwrap();
        let client_fish = client_handshake(&mut client_sock).await.unwrap();
        let server_fish = server.await.unwrap().unwrap();

        let mut buf = *b"shared secret!!!";
        let orig = buf;
        server_fish.encrypt(&mut buf);
        client_fish.decrypt(&mut buf);
        assert_eq!(buf, orig);
    }

    #[tokio::test]
    async fn handshake_rejects_cost_above_cap() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut params = Packet::new(HANDSHAKE_COMMAND);
            params.push_string(&[0u8; PASS_LEN]);
            params.push_string(&[0u8; SALT_LEN]);
            params.push_back(u32::MAX);
            params.push_string(&[0u8; CHALLENGE_LEN]);
            params.finalize_length();
            write_packet(&mut sock, &params).await.unwrap();
        });
        let mut client_sock = TcpStream::connect(addr).await.unwrap();
        let result = client_handshake(&mut client_sock).await;
        server.await.unwrap();
        assert!(matches!(result, Err(Error::CostTooLarge(_))));
    }
}
