// tcpfetch: list and download files over a length-framed TCP protocol

pub mod client;
pub mod common;
pub mod protocol;
pub mod server;

pub use crate::client::{DownloadCoordinator, TransferStatus};
pub use crate::common::{ClientConfig, Error, ErrorKind, Result, ServerConfig, TransferState};
pub use crate::server::FileServer;
