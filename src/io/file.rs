//! A single record file: thin wrapper over [`std::fs::File`] with explicit
//! seek/read/write/commit/truncate operations and scalar (de)serialization
//! helpers matching the on-disk wire format.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::util::endian::{from_wire, to_wire, Swap};
use crate::util::vector::{FromBytes, IntoBytes};

/// How a file is opened: read-only, write-only (truncating), or read/write
/// in place, optionally requiring the path not already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
    ReadWrite,
    CreateExclusive,
}

/// A single backing file for a record table or a raw I/O stream.
pub struct RecordFile {
    handle: File,
}

impl RecordFile {
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> Result<Self> {
        let mut opts = OpenOptions::new();
        match mode {
            OpenMode::Read => {
                opts.read(true);
            }
            OpenMode::Write => {
                opts.write(true).create(true).truncate(true);
            }
            OpenMode::ReadWrite => {
                opts.read(true).write(true).create(true);
            }
            OpenMode::CreateExclusive => {
                opts.read(true).write(true).create_new(true);
            }
        }
        let handle = opts.open(path)?;
        Ok(Self { handle })
    }

    pub fn length(&self) -> Result<u64> {
        Ok(self.handle.metadata()?.len())
    }

    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        Ok(self.handle.seek(pos)?)
    }

    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.handle.read_exact(buf)?;
        Ok(())
    }

    pub fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.handle.write_all(buf)?;
        Ok(())
    }

    pub fn commit(&mut self) -> Result<()> {
        self.handle.sync_data()?;
        Ok(())
    }

    pub fn truncate(&mut self, len: u64) -> Result<()> {
        self.handle.set_len(len)?;
        Ok(())
    }

    /// Read a scalar in wire endian at the cursor's current position.
    pub fn read_scalar<T: Swap + FromBytes>(&mut self) -> Result<T> {
        let mut buf = vec![0u8; T::SIZE];
        self.read_exact(&mut buf)?;
        Ok(from_wire(T::from_bytes(&buf)))
    }

    /// Write a scalar in wire endian at the cursor's current position.
    pub fn write_scalar<T: Swap + IntoBytes + Copy>(&mut self, value: T) -> Result<()> {
        let wired = to_wire(value);
        self.write_all(wired.to_bytes().as_ref())
    }

    /// Read a length-prefixed, length-suffixed string; errs if the leading
    /// and trailing lengths disagree.
    pub fn read_framed_string(&mut self) -> Result<String> {
        let len: u32 = self.read_scalar()?;
        let mut bytes = vec![0u8; len as usize];
        self.read_exact(&mut bytes)?;
        let trailer: u32 = self.read_scalar()?;
        if trailer != len {
            return Err(Error::Corrupted("framed string trailer disagreed with its header"));
        }
        String::from_utf8(bytes).map_err(|_| Error::Corrupted("framed string was not valid utf-8"))
    }

    pub fn write_framed_string(&mut self, s: &str) -> Result<()> {
        let len = s.len() as u32;
        self.write_scalar(len)?;
        self.write_all(s.as_bytes())?;
        self.write_scalar(len)
    }
}
