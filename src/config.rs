//! Plain configuration structs for the table and network layers. No parsing
//! here — callers build these from whatever source fits their application
//! (env vars, a config file, CLI flags) and pass them in.

use std::path::PathBuf;

/// Where a table's backing file (and optional mirrors) live, and how big it
/// may grow.
#[derive(Debug, Clone)]
pub struct TableConfig {
    pub name: String,
    pub path: PathBuf,
    pub mirror_paths: Vec<PathBuf>,
    pub max_records: i64,
}

impl TableConfig {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, max_records: i64) -> Self {
        Self { name: name.into(), path: path.into(), mirror_paths: Vec::new(), max_records }
    }

    pub fn with_mirror(mut self, path: impl Into<PathBuf>) -> Self {
        self.mirror_paths.push(path.into());
        self
    }
}

/// Parameters for deriving a cipher directly from a known password and
/// salt, bypassing the network handshake (used for table-at-rest
/// encryption, where there's no peer to negotiate with).
#[derive(Debug, Clone)]
pub struct CipherConfig {
    pub password: Vec<u8>,
    pub salt: Vec<u8>,
    pub cost: u32,
}

/// Listener settings for [`crate::net::ServerInterface`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub name: String,
    pub bind_addr: String,
    pub handshake_cost: u32,
    pub max_connections: usize,
}

impl ServerConfig {
    pub fn new(name: impl Into<String>, bind_addr: impl Into<String>) -> Self {
        Self { name: name.into(), bind_addr: bind_addr.into(), handshake_cost: 400, max_connections: 1024 }
    }
}

/// Dial settings for [`crate::net::ClientInterface`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
}

impl ClientConfig {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self { name: name.into(), host: host.into(), port }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
