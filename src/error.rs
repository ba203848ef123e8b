//! Library-wide error and result types.

use std::fmt;
use std::io;

/// Result alias used throughout blowvault.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the library can produce.
///
/// Error messages are kept intentionally terse; callers that need richer
/// context should wrap `Error` in their own type.
#[derive(Debug)]
pub enum Error {
    /// An underlying I/O operation failed.
    Io(io::Error),
    /// A framed string's trailing length disagreed with its leading length,
    /// or a block's trailing sign disagreed with its leading size.
    Corrupted(&'static str),
    /// A record file's length was not a multiple of its record size.
    RecordSizeMismatch,
    /// Two rows loaded from a record file compared equal by primary-key id.
    DuplicateKey,
    /// A lookup found no row for the given key.
    NotFound,
    /// An insert would push the record count past the configured maximum.
    IndexOverflow,
    /// A mirror file disagreed with the primary at the given byte offset.
    MirrorMismatch { offset: u64 },
    /// The bcrypt handshake failed (challenge mismatch or unexpected
    /// disconnect).
    HandshakeFailed(&'static str),
    /// A handshake proposed a bcrypt cost above the hard cap.
    CostTooLarge(u64),
    /// A buffer held fewer bytes than an operation required.
    BufferUnderrun,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Corrupted(s) => write!(f, "corrupted: {s}"),
            Error::RecordSizeMismatch => write!(f, "record file length is not a multiple of the record size"),
            Error::DuplicateKey => write!(f, "duplicate primary key on load"),
            Error::NotFound => write!(f, "key not found"),
            Error::IndexOverflow => write!(f, "record count at configured maximum"),
            Error::MirrorMismatch { offset } => write!(f, "mirror disagreement at offset {offset}"),
            Error::HandshakeFailed(s) => write!(f, "handshake failed: {s}"),
            Error::CostTooLarge(c) => write!(f, "bcrypt cost {c} exceeds hard cap"),
            Error::BufferUnderrun => write!(f, "buffer underrun"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Error::Io(e) = self {
            Some(e)
        } else {
            None
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
