// Server module - sequential TCP file server

mod catalog;
mod handler;

pub use catalog::{Catalog, Lookup};
pub use handler::{serve_connection, ServeOutcome};

use std::net::{SocketAddr, TcpListener, TcpStream};
use log::{error, info};
use crate::common::config::ServerConfig;
use crate::common::error::{Error, Result};

/// Accepts one connection at a time and serves it fully before the next.
///
/// Throughput is bounded to one client operation at a time; the per-connection
/// timeout keeps a stalled client from holding the loop forever.
pub struct FileServer {
    config: ServerConfig,
    listener: TcpListener,
    catalog: Catalog,
}

impl FileServer {
    pub fn bind(config: ServerConfig) -> Result<Self> {
        let catalog = Catalog::open(&config.shared_dir)?;
        let listener = TcpListener::bind(&config.bind_addr)
            .map_err(|e| Error::network(&format!("binding {}", config.bind_addr), e))?;
        info!(
            "Server listening on {} serving {}",
            listener.local_addr().map(|a| a.to_string()).unwrap_or_default(),
            catalog.root().display()
        );
        Ok(Self { config, listener, catalog })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(Error::Io)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Accept loop. Per-connection failures are logged, never fatal.
    pub fn run(&self) -> Result<()> {
        loop {
            if let Err(e) = self.serve_one() {
                error!("Server: session error: {}", e);
            }
        }
    }

    /// Accept and fully serve exactly one connection.
    pub fn serve_one(&self) -> Result<ServeOutcome> {
        let (mut stream, peer) = self
            .listener
            .accept()
            .map_err(|e| Error::network("accepting connection", e))?;
        info!("Connection established with {}", peer);

        self.prepare(&stream)?;
        let outcome = serve_connection(&mut stream, &self.catalog, self.config.buffer_size);
        info!("Server: connection with {} closed", peer);
        outcome
    }

    fn prepare(&self, stream: &TcpStream) -> Result<()> {
        let timeout = self.config.socket_timeout();
        stream
            .set_read_timeout(timeout)
            .and_then(|_| stream.set_write_timeout(timeout))
            .map_err(|e| Error::network("configuring socket", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:5001");
        assert_eq!(config.buffer_size, 1024);
    }

    #[test]
    fn test_bind_requires_shared_dir() {
        let dir = TempDir::new().unwrap();
        let config = ServerConfig::new("127.0.0.1:0", dir.path().join("missing"));
        assert!(matches!(FileServer::bind(config), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_bind_ephemeral_port() {
        let dir = TempDir::new().unwrap();
        let server = FileServer::bind(ServerConfig::new("127.0.0.1:0", dir.path().to_path_buf())).unwrap();
        assert_ne!(server.local_addr().unwrap().port(), 0);
    }
}
