//! A primary file mirrored across up to five redundant copies: every write
//! fans out to all copies, every read is cross-checked against them.

use std::cell::RefCell;
use std::io::SeekFrom;
use std::path::Path;

use crate::error::{Error, Result};
use crate::io::file::{OpenMode, RecordFile};

const MAX_MIRRORS: usize = 5;

thread_local! {
    static SCRATCH: RefCell<Vec<u8>> = const { RefCell::new(Vec::new()) };
}

/// A primary file plus up to [`MAX_MIRRORS`] mirrors opened with identical
/// flags. Writes are broadcast to all of them; reads are served from the
/// primary and cross-checked byte-for-byte against every mirror.
pub struct MultiFile {
    primary: RecordFile,
    mirrors: Vec<RecordFile>,
}

impl MultiFile {
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> Result<Self> {
        Ok(Self { primary: RecordFile::open(path, mode)?, mirrors: Vec::new() })
    }

    /// Open and attach another mirror under `path`, using the same flags the
    /// primary was opened with. Fails once [`MAX_MIRRORS`] mirrors are
    /// already attached.
    pub fn add_mirror(&mut self, path: impl AsRef<Path>, mode: OpenMode) -> Result<()> {
        if self.mirrors.len() >= MAX_MIRRORS {
            return Err(Error::Corrupted("multifile already has the maximum number of mirrors"));
        }
        self.mirrors.push(RecordFile::open(path, mode)?);
        Ok(())
    }

    pub fn length(&self) -> Result<u64> {
        self.primary.length()
    }

    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let p = self.primary.seek(pos)?;
        for m in self.mirrors.iter_mut() {
            m.seek(pos)?;
        }
        Ok(p)
    }

    pub fn commit(&mut self) -> Result<()> {
        self.primary.commit()?;
        for m in self.mirrors.iter_mut() {
            m.commit()?;
        }
        Ok(())
    }

    pub fn truncate(&mut self, len: u64) -> Result<()> {
        self.primary.truncate(len)?;
        for m in self.mirrors.iter_mut() {
            m.truncate(len)?;
        }
        Ok(())
    }

    /// Write `buf` to the primary and every mirror, in order. The first
    /// failure is reported, but every mirror is still attempted so a single
    /// bad disk doesn't leave the others out of sync.
    pub fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        let mut first_err = self.primary.write_all(buf).err();
        for m in self.mirrors.iter_mut() {
            if let Err(e) = m.write_all(buf) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Read `buf.len()` bytes from the primary, then re-read the same range
    /// from every mirror into a thread-local scratch buffer and compare.
    /// Any disagreement is reported as [`Error::MirrorMismatch`].
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.primary.read_exact(buf)?;
        let mut mismatch_offset = None;
        SCRATCH.with(|cell| -> Result<()> {
            let mut scratch = cell.borrow_mut();
            scratch.resize(buf.len(), 0);
            for m in self.mirrors.iter_mut() {
                m.read_exact(&mut scratch)?;
                if *scratch != *buf && mismatch_offset.is_none() {
                    let offset = m.seek(SeekFrom::Current(0))? - buf.len() as u64;
                    mismatch_offset = Some(offset);
                }
            }
            Ok(())
        })?;
        if let Some(offset) = mismatch_offset {
            return Err(Error::MirrorMismatch { offset });
        }
        Ok(())
    }
}

/// Byte-compare two files on disk, logging every differing offset;
/// returns the number of differing bytes, or `-1` if either file can't be
/// opened or their lengths differ.
pub fn compare(path1: impl AsRef<Path>, path2: impl AsRef<Path>) -> i64 {
    const CHUNK: usize = 4096;
    let (Ok(mut f1), Ok(mut f2)) =
        (RecordFile::open(path1, OpenMode::Read), RecordFile::open(path2, OpenMode::Read))
    else {
        return -1;
    };
    let (Ok(l1), Ok(l2)) = (f1.length(), f2.length()) else {
        return -1;
    };
    if l1 != l2 {
        return -1;
    }
    let mut remaining = l1;
    let mut diffs: i64 = 0;
    let mut v1 = vec![0u8; CHUNK];
    let mut v2 = vec![0u8; CHUNK];
    while remaining > 0 {
        let n = remaining.min(CHUNK as u64) as usize;
        if f1.read_exact(&mut v1[..n]).is_err() || f2.read_exact(&mut v2[..n]).is_err() {
            return -1;
        }
        for i in 0..n {
            if v1[i] != v2[i] {
                diffs += 1;
                tracing::warn!(byte = v1[i], other = v2[i], "mirror byte mismatch during compare");
            }
        }
        remaining -= n as u64;
    }
    diffs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_path(name: &str) -> std::path::PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("blowvault-multifile-test-{name}-{}", std::process::id()));
        p
    }

    #[test]
    fn write_fans_out_to_mirrors() {
        let primary = tmp_path("primary");
        let mirror = tmp_path("mirror");
        {
            let mut mf = MultiFile::open(&primary, OpenMode::ReadWrite).unwrap();
            mf.add_mirror(&mirror, OpenMode::ReadWrite).unwrap();
            mf.write_all(b"hello mirrored world").unwrap();
        }
        assert_eq!(compare(&primary, &mirror), 0);
        let _ = std::fs::remove_file(&primary);
        let _ = std::fs::remove_file(&mirror);
    }

    #[test]
    fn read_detects_mismatch() {
        let primary = tmp_path("primary2");
        let mirror = tmp_path("mirror2");
        {
            let mut mf = MultiFile::open(&primary, OpenMode::ReadWrite).unwrap();
            mf.add_mirror(&mirror, OpenMode::ReadWrite).unwrap();
            mf.write_all(b"0123456789").unwrap();
        }
        // corrupt the mirror directly
        {
            let mut m = RecordFile::open(&mirror, OpenMode::ReadWrite).unwrap();
            m.seek(SeekFrom::Start(3)).unwrap();
            m.write_all(b"X").unwrap();
        }
        {
            let mut mf = MultiFile::open(&primary, OpenMode::Read).unwrap();
            mf.add_mirror(&mirror, OpenMode::Read).unwrap();
            let mut buf = [0u8; 10];
            let err = mf.read_exact(&mut buf).unwrap_err();
            assert!(matches!(err, Error::MirrorMismatch { .. }));
        }
        let _ = std::fs::remove_file(&primary);
        let _ = std::fs::remove_file(&mirror);
    }
}
