use blowvault::cipher::BlowFish;
use blowvault::config::{CipherConfig, TableConfig};
use blowvault::db::{LinearIndex, Record, RowId, Table};
use blowvault::io::RecordFile;
use blowvault::Result;

#[derive(Debug, Clone, Copy)]
struct Note {
    key: RowId,
    body: [u8; 24],
}

impl Record for Note {
    const SIZE: usize = 32;

    fn key(&self) -> RowId {
        self.key
    }
    fn key_mut(&mut self) -> &mut RowId {
        &mut self.key
    }
    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        out.extend_from_slice(&self.key.raw().to_le_bytes());
        out.extend_from_slice(&self.body);
        out
    }
    fn from_bytes(bytes: &[u8]) -> Self {
        let key = i64::from_le_bytes(bytes[0..8].try_into().unwrap());
        let mut body = [0u8; 24];
        body.copy_from_slice(&bytes[8..32]);
        Self { key: RowId::from_raw(key), body }
    }
}

fn main() -> Result<()> {
    let cipher_config = CipherConfig { password: b"hunter2".to_vec(), salt: b"notesalt".to_vec(), cost: 16 };
    let cipher = BlowFish::from_cipher_config(&cipher_config);
    let mut body = [0u8; 24];
    body[..11].copy_from_slice(b"hello world");
    cipher.encrypt(&mut body);

    let path = std::env::temp_dir().join("blowvault-demo-notes.db");
    let table_config = TableConfig::new("notes", &path, 10_000);
    let mut notes: Table<Note, RecordFile, LinearIndex> = Table::open(&table_config)?;

    let mut key = RowId::from_time(blowvault::util::time::NanoTime::now());
    key.commit();
    notes.insert(&Note { key, body })?;

    let stored = notes.select(key)?;
    let mut plaintext = stored.body;
    cipher.decrypt(&mut plaintext);
    println!("stored note: {}", String::from_utf8_lossy(&plaintext[..11]));

    std::fs::remove_file(&path)?;
    Ok(())
}
