// Common type definitions and constants

use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;
use serde::{Serialize, Deserialize};
use crate::common::error::{Error, Result};

pub type FileName = String;

/// Connection target, resolved once per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }

    pub fn resolve(&self) -> Result<Vec<SocketAddr>> {
        let addrs: Vec<SocketAddr> = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| Error::Connection(format!("cannot resolve {}: {}", self, e)))?
            .collect();
        if addrs.is_empty() {
            return Err(Error::Connection(format!("no addresses for {}", self)));
        }
        Ok(addrs)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

/// Observable state of the most recent download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferState {
    Idle,
    InProgress,
    Succeeded,
    Failed,
}

impl TransferState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferState::Succeeded | TransferState::Failed)
    }
}

/// Steps of one download connection. `Failed` absorbs any step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStage {
    Connected,
    ListingReceived,
    RequestSent,
    ResponseReceived,
    Streaming,
    Completed,
    NotFound,
    Invalid,
    Failed,
}

// Constants
pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_BUFFER_SIZE: usize = 1024;
pub const MIN_BUFFER_SIZE: usize = 64;
pub const MAX_BUFFER_SIZE: usize = 1024 * 1024;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_DOWNLOAD_DIR: &str = "downloads";
pub const DEFAULT_SHARED_DIR: &str = "shared_files";

// Frame size caps
pub const MAX_LISTING_SIZE: usize = 1024 * 1024;
pub const MAX_REQUEST_SIZE: usize = 4096;
pub const MAX_TOKEN_SIZE: usize = 64;

pub const PART_SUFFIX: &str = ".part";
