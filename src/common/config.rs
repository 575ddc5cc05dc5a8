// Configuration types and parsing

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Serialize, Deserialize};
use serde::de::DeserializeOwned;
use crate::common::error::{Error, Result};
use crate::common::types::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub buffer_size: usize,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub download_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            buffer_size: DEFAULT_BUFFER_SIZE,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT.as_millis() as u64,
            read_timeout_ms: DEFAULT_READ_TIMEOUT.as_millis() as u64,
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
        }
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Load from a JSON file; absent keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = load_json(path)?;
        check_buffer_size(config.buffer_size)?;
        Ok(config)
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Socket timeout; zero disables it.
    pub fn socket_timeout(&self) -> Option<Duration> {
        Some(self.read_timeout()).filter(|t| !t.is_zero())
    }

    pub fn with_buffer_size(mut self, size: usize) -> Result<Self> {
        check_buffer_size(size)?;
        self.buffer_size = size;
        Ok(self)
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_download_dir(mut self, dir: PathBuf) -> Self {
        self.download_dir = dir;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub shared_dir: PathBuf,
    pub buffer_size: usize,
    pub read_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{}", DEFAULT_PORT),
            shared_dir: PathBuf::from(DEFAULT_SHARED_DIR),
            buffer_size: DEFAULT_BUFFER_SIZE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT.as_millis() as u64,
        }
    }
}

impl ServerConfig {
    pub fn new(bind_addr: impl Into<String>, shared_dir: PathBuf) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            shared_dir,
            ..Default::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = load_json(path)?;
        check_buffer_size(config.buffer_size)?;
        Ok(config)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Socket timeout; zero disables it.
    pub fn socket_timeout(&self) -> Option<Duration> {
        Some(self.read_timeout()).filter(|t| !t.is_zero())
    }

    pub fn with_buffer_size(mut self, size: usize) -> Result<Self> {
        check_buffer_size(size)?;
        self.buffer_size = size;
        Ok(self)
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = timeout.as_millis() as u64;
        self
    }
}

fn check_buffer_size(size: usize) -> Result<()> {
    if size < MIN_BUFFER_SIZE || size > MAX_BUFFER_SIZE {
        return Err(Error::ConfigError(format!(
            "Buffer size must be between {} and {}",
            MIN_BUFFER_SIZE,
            MAX_BUFFER_SIZE
        )));
    }
    Ok(())
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path)
        .map_err(|e| Error::ConfigError(format!("cannot read {}: {}", path.display(), e)))?;
    serde_json::from_str(&json)
        .map_err(|e| Error::ConfigError(format!("cannot parse {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_client_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.port, 5001);
        assert_eq!(config.buffer_size, 1024);
        assert_eq!(config.download_dir, PathBuf::from("downloads"));
        assert_eq!(config.read_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_buffer_size_bounds() {
        assert!(ClientConfig::default().with_buffer_size(16).is_err());
        assert!(ClientConfig::default().with_buffer_size(MAX_BUFFER_SIZE + 1).is_err());

        let config = ClientConfig::default().with_buffer_size(4096).unwrap();
        assert_eq!(config.buffer_size, 4096);
    }

    #[test]
    fn test_load_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("client.json");
        fs::write(&path, r#"{ "host": "10.0.0.7", "read_timeout_ms": 500 }"#).unwrap();

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.host, "10.0.0.7");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.read_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_load_rejects_bad_buffer() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("server.json");
        fs::write(&path, r#"{ "buffer_size": 1 }"#).unwrap();

        assert!(matches!(ServerConfig::load(&path), Err(Error::ConfigError(_))));
    }
}
