//! The wire packet: a fixed header plus a length-prefixed body.
//!
//! The header's `length` field is always sent in the clear so a reader can
//! size the body read before any decryption happens; every other header
//! field and the whole body are encrypted once a connection has negotiated
//! a cipher.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{Error, Result};
use crate::util::vector::{ByteCursor, ByteVector};

/// Size of [`PacketHeader`] on the wire: `u32 + u32 + i64 + u64 + u64 + u64`.
pub const HEADER_SIZE: usize = 40;

/// Fixed packet header: body length, an application command, three
/// caller-defined fields, and a reserved word carried alongside every
/// message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketHeader {
    pub length: u32,
    pub command: u32,
    pub timestamp: i64,
    pub value1: u64,
    pub value2: u64,
    pub reserved: u64,
}

impl PacketHeader {
    pub fn to_bytes(self) -> [u8; HEADER_SIZE] {
        let mut v = ByteVector::with_capacity(HEADER_SIZE);
        v.push_back(self.length);
        v.push_back(self.command);
        v.push_back(self.timestamp);
        v.push_back(self.value1);
        v.push_back(self.value2);
        v.push_back(self.reserved);
        let mut out = [0u8; HEADER_SIZE];
        out.copy_from_slice(v.as_slice());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::BufferUnderrun);
        }
        let mut cur = ByteCursor::new(bytes[..HEADER_SIZE].to_vec());
        Ok(Self {
            length: cur.pop_front()?,
            command: cur.pop_front()?,
            timestamp: cur.pop_front()?,
            value1: cur.pop_front()?,
            value2: cur.pop_front()?,
            reserved: cur.pop_front()?,
        })
    }
}

/// An application message: a header plus a body built the same way
/// [`crate::util::vector::ByteVector`] is, pushed and popped from the back.
#[derive(Debug, Clone, Default)]
pub struct Packet {
    pub header: PacketHeader,
    body: ByteVector,
}

impl Packet {
    pub fn new(command: u32) -> Self {
        Self { header: PacketHeader { command, ..Default::default() }, body: ByteVector::new() }
    }

    pub fn command(&self) -> u32 {
        self.header.command
    }

    pub fn body(&self) -> &[u8] {
        self.body.as_slice()
    }

    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn push_back<T: crate::util::endian::Swap + crate::util::vector::IntoBytes>(&mut self, v: T) {
        self.body.push_back(v);
    }

    pub fn pop_back<T: crate::util::endian::Swap + crate::util::vector::FromBytes>(&mut self) -> Result<T> {
        self.body.pop_back()
    }

    pub fn push_back_bytes(&mut self, bytes: &[u8]) {
        self.body.push_back_bytes(bytes);
    }

    pub fn pop_back_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        self.body.pop_back_bytes(n)
    }

    pub fn push_string(&mut self, bytes: &[u8]) {
        self.body.push_back_string(bytes);
    }

    pub fn pop_string(&mut self) -> Result<Vec<u8>> {
        self.body.pop_back_string()
    }

    /// Stamp `header.length` with the body's current size; called right
    /// before a packet is handed to a connection's write loop.
    pub fn finalize_length(&mut self) {
        self.header.length = self.body.len() as u32;
    }

    pub(crate) fn into_parts(self) -> (PacketHeader, Vec<u8>) {
        (self.header, self.body.into_vec())
    }

    pub(crate) fn from_parts(header: PacketHeader, body: Vec<u8>) -> Self {
        Self { header, body: ByteVector::from_vec(body) }
    }
}

/// Write a packet to a raw stream, bypassing a connection's encryptor and
/// queue. Used only during the handshake, before a [`crate::net::connection::Connection`]
/// exists to own the socket.
pub(crate) async fn write_packet(stream: &mut TcpStream, packet: &Packet) -> Result<()> {
    stream.write_all(&packet.header.to_bytes()).await?;
    stream.write_all(packet.body()).await?;
    Ok(())
}

/// Read one packet from a raw stream, in the clear.
pub(crate) async fn read_packet(stream: &mut TcpStream) -> Result<Packet> {
    let mut head_buf = [0u8; HEADER_SIZE];
    stream.read_exact(&mut head_buf).await?;
    let header = PacketHeader::from_bytes(&head_buf)?;
    let mut body = vec![0u8; header.length as usize];
    if !body.is_empty() {
        stream.read_exact(&mut body).await?;
    }
    Ok(Packet::from_parts(header, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrips() {
        let h = PacketHeader { length: 12, command: 7, timestamp: -99, value1: 42, value2: u64::MAX, reserved: 0 };
        let bytes = h.to_bytes();
        assert_eq!(PacketHeader::from_bytes(&bytes).unwrap(), h);
    }

    #[test]
    fn body_push_pop_matches_byte_vector_order() {
        let mut p = Packet::new(5);
        p.push_back(1u32);
        p.push_string(b"hi");
        p.finalize_length();
        assert_eq!(p.command(), 5);
        assert_eq!(p.body_len(), 4 + (8 + 2));
        let back = p.pop_string().unwrap();
        assert_eq!(back, b"hi");
        let front: u32 = p.pop_back().unwrap();
        assert_eq!(front, 1);
        assert!(p.is_empty());
    }

    #[test]
    fn short_header_is_rejected() {
        assert!(matches!(PacketHeader::from_bytes(&[0u8; 4]), Err(Error::BufferUnderrun)));
    }
}
