//! Encrypted TCP transport: a length-framed packet, a connection owning one
//! socket's read/write tasks, and server/client interfaces that run the
//! bcrypt challenge handshake before handing a connection to the caller.
//!
//! | Module | Contents |
//! |---|---|
//! | [`packet`] | [`packet::Packet`] and its fixed [`packet::PacketHeader`] |
//! | [`encryptor`] | [`encryptor::ConnectionEncryptor`] and the handshake |
//! | [`connection`] | [`connection::Connection`], the read/write task pair |
//! | [`interface`] | [`interface::ServerInterface`] / [`interface::ClientInterface`] |

pub mod connection;
pub mod encryptor;
pub mod interface;
pub mod packet;

pub use connection::{Connection, Owner, OwnedPacket};
pub use encryptor::{BcryptEncryptor, ConnectionEncryptor, NullEncryptor};
pub use interface::{ClientInterface, ServerInterface};
pub use packet::{Packet, PacketHeader};
