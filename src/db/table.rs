//! A fixed-record table: a record file (optionally mirrored) plus a
//! primary-key index kept in memory and rebuilt on open.

use std::io::SeekFrom;
use std::path::Path;

use crate::config::TableConfig;
use crate::db::index::{LinearIndex, PrimaryIndex};
use crate::db::key::RowId;
use crate::db::record::Record;
use crate::error::{Error, Result};
use crate::io::file::{OpenMode, RecordFile};
use crate::io::multifile::MultiFile;

/// Storage backing a [`Table`]: a plain [`RecordFile`] or a mirrored
/// [`MultiFile`], whichever the caller opened. Both already expose this
/// exact method set.
pub trait Storage {
    fn length(&self) -> Result<u64>;
    fn seek(&mut self, pos: SeekFrom) -> Result<u64>;
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()>;
    fn write_all(&mut self, buf: &[u8]) -> Result<()>;
    fn truncate(&mut self, len: u64) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
}

impl Storage for RecordFile {
    fn length(&self) -> Result<u64> {
        RecordFile::length(self)
    }
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        RecordFile::seek(self, pos)
    }
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        RecordFile::read_exact(self, buf)
    }
    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        RecordFile::write_all(self, buf)
    }
    fn truncate(&mut self, len: u64) -> Result<()> {
        RecordFile::truncate(self, len)
    }
    fn commit(&mut self) -> Result<()> {
        RecordFile::commit(self)
    }
}

impl Storage for MultiFile {
    fn length(&self) -> Result<u64> {
        MultiFile::length(self)
    }
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        MultiFile::seek(self, pos)
    }
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        MultiFile::read_exact(self, buf)
    }
    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        MultiFile::write_all(self, buf)
    }
    fn truncate(&mut self, len: u64) -> Result<()> {
        MultiFile::truncate(self, len)
    }
    fn commit(&mut self) -> Result<()> {
        MultiFile::commit(self)
    }
}

/// A fixed-record table over storage `S`, indexed by `Idx` (defaults to the
/// monotone-linear index, the common case for append-heavy tables keyed by
/// a timestamp-derived id).
pub struct Table<E: Record, S: Storage, Idx: PrimaryIndex = LinearIndex> {
    name: String,
    storage: S,
    max_records: i64,
    num_records: i64,
    keys: Idx,
    _entry: std::marker::PhantomData<E>,
}

impl<E: Record, Idx: PrimaryIndex> Table<E, RecordFile, Idx> {
    /// Open a table backed by a single, unmirrored record file, rebuilding
    /// the index from its contents.
    pub fn load(path: impl AsRef<Path>, name: impl Into<String>, max_records: i64) -> Result<Self> {
        let storage = RecordFile::open(&path, OpenMode::ReadWrite)?;
        Self::load_with(storage, name, max_records)
    }

    /// Open a table backed by a single, unmirrored record file, as described
    /// by `config`.
    pub fn open(config: &TableConfig) -> Result<Self> {
        Self::load(&config.path, config.name.clone(), config.max_records)
    }
}

impl<E: Record, Idx: PrimaryIndex> Table<E, MultiFile, Idx> {
    /// Open a table backed by `config.path` mirrored to every path in
    /// `config.mirror_paths`, rebuilding the index from the primary.
    pub fn open_mirrored(config: &TableConfig) -> Result<Self> {
        let mut storage = MultiFile::open(&config.path, OpenMode::ReadWrite)?;
        for mirror in &config.mirror_paths {
            storage.add_mirror(mirror, OpenMode::ReadWrite)?;
        }
        Self::load_with(storage, config.name.clone(), config.max_records)
    }
}

impl<E: Record, S: Storage, Idx: PrimaryIndex> Table<E, S, Idx> {
    /// Open a table over an already-constructed storage backend (a plain
    /// file or a mirrored [`MultiFile`]), validating its length and
    /// rebuilding the index.
    pub fn load_with(mut storage: S, name: impl Into<String>, max_records: i64) -> Result<Self> {
        if max_records <= 0 {
            return Err(Error::Corrupted("table max_records must be positive"));
        }
        let len = storage.length()?;
        let record_size = E::SIZE as u64;
        if len % record_size != 0 {
            return Err(Error::RecordSizeMismatch);
        }
        let num_records = (len / record_size) as i64;
        if num_records >= max_records {
            return Err(Error::IndexOverflow);
        }

        let mut keys = Idx::default();
        keys.reserve(num_records as usize);
        storage.seek(SeekFrom::Start(0))?;
        let mut buf = vec![0u8; E::SIZE];
        for pos in 0..num_records {
            storage.read_exact(&mut buf)?;
            let entry = E::from_bytes(&buf);
            if !keys.insert(entry.key(), pos) {
                return Err(Error::DuplicateKey);
            }
        }

        Ok(Self {
            name: name.into(),
            storage,
            max_records,
            num_records,
            keys,
            _entry: std::marker::PhantomData,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> i64 {
        self.num_records
    }

    pub fn is_empty(&self) -> bool {
        self.num_records == 0
    }

    fn offset(&self, pos: i64) -> u64 {
        pos as u64 * E::SIZE as u64
    }

    fn read_at(&mut self, pos: i64) -> Result<E> {
        self.storage.seek(SeekFrom::Start(self.offset(pos)))?;
        let mut buf = vec![0u8; E::SIZE];
        self.storage.read_exact(&mut buf)?;
        Ok(E::from_bytes(&buf))
    }

    fn write_at(&mut self, pos: i64, entry: &E) -> Result<()> {
        self.storage.seek(SeekFrom::Start(self.offset(pos)))?;
        self.storage.write_all(&entry.to_bytes())
    }

    /// Find `key` in the index and read its stored row, treating a
    /// tombstoned hit as "not found" even though the index still has a
    /// slot for it.
    fn locate_committed(&mut self, key: RowId) -> Result<(i64, E)> {
        let pos = self.keys.find(key).ok_or(Error::NotFound)?;
        let stored = self.read_at(pos)?;
        if !stored.key().committed() {
            return Err(Error::NotFound);
        }
        Ok((pos, stored))
    }

    /// Append `entry`, assigning it the next row position. Rolls the index
    /// insertion back if the write fails.
    pub fn insert(&mut self, entry: &E) -> Result<i64> {
        if self.num_records >= self.max_records {
            return Err(Error::IndexOverflow);
        }
        let pos = self.num_records;
        let key = entry.key();
        if !self.keys.insert(key, pos) {
            return Err(Error::DuplicateKey);
        }
        if let Err(e) = self.write_at(pos, entry) {
            self.keys.erase(key);
            return Err(e);
        }
        self.num_records += 1;
        Ok(pos)
    }

    /// Overwrite the row for `entry.key()` with `entry`'s contents.
    pub fn update(&mut self, entry: &E) -> Result<()> {
        let key = entry.key();
        let (pos, _) = self.locate_committed(key)?;
        self.write_at(pos, entry)
    }

    /// Read the row for `key`. Logs a warning if the stored row's flags
    /// disagree with the caller's expectation for the same id (a
    /// concurrent-writer hint, not an error).
    pub fn select(&mut self, key: RowId) -> Result<E> {
        let (_, stored) = self.locate_committed(key)?;
        if stored.key() != key {
            tracing::warn!(table = %self.name, key = %key, "select: row was updated elsewhere");
        }
        Ok(stored)
    }

    /// Remove the row for `key`. Physically truncates the file when it's
    /// the last row; otherwise tombstones the stored entry in place.
    pub fn remove(&mut self, key: RowId) -> Result<()> {
        let (pos, mut stored) = self.locate_committed(key)?;
        if pos + 1 == self.num_records {
            self.storage.truncate(self.offset(pos))?;
            self.num_records -= 1;
        } else {
            stored.erase();
            self.write_at(pos, &stored)?;
        }
        self.keys.erase(key);
        Ok(())
    }

    pub fn commit(&mut self) -> Result<()> {
        self.storage.commit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::time::NanoTime;

    #[derive(Debug, Clone, Copy)]
    struct Row {
        key: RowId,
        value: u32,
    }

    impl Record for Row {
        const SIZE: usize = 12;

        fn key(&self) -> RowId {
            self.key
        }
        fn key_mut(&mut self) -> &mut RowId {
            &mut self.key
        }
        fn to_bytes(&self) -> Vec<u8> {
            let mut out = Vec::with_capacity(12);
            out.extend_from_slice(&self.key.raw().to_le_bytes());
            out.extend_from_slice(&self.value.to_le_bytes());
            out
        }
        fn from_bytes(bytes: &[u8]) -> Self {
            let key = i64::from_le_bytes(bytes[0..8].try_into().unwrap());
            let value = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
            Self { key: RowId::from_raw(key), value }
        }
    }

    fn tmp_path(name: &str) -> std::path::PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("blowvault-table-test-{name}-{}", std::process::id()));
        let _ = std::fs::remove_file(&p);
        p
    }

    fn committed_row(nanos: i64, value: u32) -> Row {
        let mut key = RowId::from_time(NanoTime(nanos));
        key.commit();
        Row { key, value }
    }

    #[test]
    fn insert_then_select_roundtrips() {
        let path = tmp_path("basic");
        let mut t: Table<Row, RecordFile, LinearIndex> = Table::load(&path, "rows", 1000).unwrap();
        let row = committed_row(10, 42);
        t.insert(&row).unwrap();
        let back = t.select(row.key).unwrap();
        assert_eq!(back.value, 42);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn remove_nonterminal_tombstones_not_truncates() {
        let path = tmp_path("remove-nonterm");
        let mut t: Table<Row, RecordFile, LinearIndex> = Table::load(&path, "rows", 1000).unwrap();
        let a = committed_row(10, 1);
        let b = committed_row(20, 2);
        t.insert(&a).unwrap();
        t.insert(&b).unwrap();
        t.remove(a.key).unwrap();
        assert_eq!(t.len(), 2, "file still holds both rows; first is tombstoned");
        assert!(matches!(t.select(a.key), Err(Error::NotFound)));
        assert!(t.select(b.key).is_ok());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn remove_terminal_truncates() {
        let path = tmp_path("remove-term");
        let mut t: Table<Row, RecordFile, LinearIndex> = Table::load(&path, "rows", 1000).unwrap();
        let a = committed_row(10, 1);
        let b = committed_row(20, 2);
        t.insert(&a).unwrap();
        t.insert(&b).unwrap();
        t.remove(b.key).unwrap();
        assert_eq!(t.len(), 1);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn duplicate_id_on_load_is_rejected() {
        let path = tmp_path("dup");
        {
            let mut t: Table<Row, RecordFile, LinearIndex> = Table::load(&path, "rows", 1000).unwrap();
            let a = committed_row(10, 1);
            t.insert(&a).unwrap();
            // Hand-craft a duplicate id directly onto disk, bypassing the index.
            let mut dup = a;
            dup.value = 99;
            let mut raw = RecordFile::open(&path, OpenMode::ReadWrite).unwrap();
            raw.seek(SeekFrom::Start(Row::SIZE as u64)).unwrap();
            raw.write_all(&dup.to_bytes()).unwrap();
        }
        let reopened: Result<Table<Row, RecordFile, LinearIndex>> = Table::load(&path, "rows", 1000);
        assert!(matches!(reopened, Err(Error::DuplicateKey)));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn open_via_table_config_roundtrips() {
        let path = tmp_path("config-open");
        let config = TableConfig::new("rows", &path, 1000);
        let mut t: Table<Row, RecordFile, LinearIndex> = Table::open(&config).unwrap();
        let row = committed_row(10, 42);
        t.insert(&row).unwrap();
        let back = t.select(row.key).unwrap();
        assert_eq!(back.value, 42);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn max_records_is_enforced() {
        let path = tmp_path("cap");
        let mut t: Table<Row, RecordFile, LinearIndex> = Table::load(&path, "rows", 1).unwrap();
        t.insert(&committed_row(10, 1)).unwrap();
        let err = t.insert(&committed_row(20, 2)).unwrap_err();
        assert!(matches!(err, Error::IndexOverflow));
        let _ = std::fs::remove_file(&path);
    }
}
