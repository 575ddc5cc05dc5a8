// Error types and error handling

use std::io;
use std::fmt;
use serde::{Serialize, Deserialize};

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Connection(String),
    Timeout(String),
    Protocol(String),
    NotFound(String),
    InvalidRequest(String),
    AlreadyInProgress(String),
    LocalStorage(String),
    Cancelled,
    ConfigError(String),
}

/// Coarse classification of an [`Error`], stable enough for a UI to branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Connection,
    ProtocolViolation,
    NotFound,
    InvalidRequest,
    AlreadyInProgress,
    LocalStorage,
    Cancelled,
    Config,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) | Error::Connection(_) | Error::Timeout(_) => ErrorKind::Connection,
            Error::Protocol(_) => ErrorKind::ProtocolViolation,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Error::AlreadyInProgress(_) => ErrorKind::AlreadyInProgress,
            Error::LocalStorage(_) => ErrorKind::LocalStorage,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::ConfigError(_) => ErrorKind::Config,
        }
    }

    /// Wrap a socket-level failure, keeping timeouts distinguishable.
    pub fn network(context: &str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                Error::Timeout(format!("{}: {}", context, err))
            }
            io::ErrorKind::UnexpectedEof => {
                Error::Connection(format!("{}: connection closed by peer", context))
            }
            _ => Error::Connection(format!("{}: {}", context, err)),
        }
    }

    /// Wrap a local file-system failure.
    pub fn storage(context: &str, err: io::Error) -> Self {
        Error::LocalStorage(format!("{}: {}", context, err))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "Connection error: {}", e),
            Error::Connection(e) => write!(f, "Connection error: {}", e),
            Error::Timeout(e) => write!(f, "Connection error: timed out ({})", e),
            Error::Protocol(e) => write!(f, "Protocol violation: {}", e),
            Error::NotFound(e) => write!(f, "Not found: {}", e),
            Error::InvalidRequest(e) => write!(f, "Invalid request: {}", e),
            Error::AlreadyInProgress(e) => write!(f, "Already in progress: {}", e),
            Error::LocalStorage(e) => write!(f, "Local storage error: {}", e),
            Error::Cancelled => write!(f, "Download cancelled"),
            Error::ConfigError(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_maps_to_connection_kind() {
        let err = Error::network("reading listing", io::Error::new(io::ErrorKind::TimedOut, "slow"));
        assert!(matches!(err, Error::Timeout(_)));
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(err.to_string().starts_with("Connection error"));
    }

    #[test]
    fn test_eof_is_connection_error() {
        let err = Error::network("reading payload", io::Error::from(io::ErrorKind::UnexpectedEof));
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(err.to_string().contains("closed by peer"));
    }

    #[test]
    fn test_messages_distinguish_kinds() {
        let not_found = Error::NotFound("a.txt".to_string()).to_string();
        let storage = Error::LocalStorage("disk".to_string()).to_string();
        let protocol = Error::Protocol("bad token".to_string()).to_string();

        assert!(not_found.starts_with("Not found"));
        assert!(storage.starts_with("Local storage error"));
        assert!(protocol.starts_with("Protocol violation"));
    }
}
