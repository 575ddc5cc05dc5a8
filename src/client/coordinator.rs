// Download coordinator: at most one background transfer, observable by polling

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use crossbeam_channel::Receiver;
use log::{info, warn};
use crate::common::config::ClientConfig;
use crate::common::error::{Error, Result};
use crate::common::types::FileName;
use super::connection::ClientConnection;
use super::session::TransferSession;
use super::status::{StatusBoard, StatusWriter, TransferStatus};

/// Entry point for a presentation layer: `list_files`, `start_download`,
/// `current_status`.
///
/// One instance per client. Only one download runs at a time; its outcome is
/// reported through the status record, never returned to the caller.
pub struct DownloadCoordinator {
    config: ClientConfig,
    board: Arc<StatusBoard>,
    worker: Mutex<Option<Worker>>,
}

/// The thread running one download and the stop flag only it reads.
struct Worker {
    handle: JoinHandle<()>,
    cancel: Arc<AtomicBool>,
}

impl Worker {
    fn join(self) {
        if self.handle.join().is_err() {
            warn!("Download worker panicked");
        }
    }
}

impl DownloadCoordinator {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            board: Arc::new(StatusBoard::new()),
            worker: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetch the server's listing on a fresh connection. Blocks.
    pub fn list_files(&self) -> Result<Vec<FileName>> {
        let mut conn = ClientConnection::connect(&self.config)?;
        let listing = conn.recv_listing()?;
        conn.close();
        info!("Listed {} files on {}", listing.names.len(), self.config.endpoint());
        Ok(listing.names)
    }

    /// Start downloading `name` in the background and return immediately.
    ///
    /// Fails with `AlreadyInProgress` while another download is active and
    /// with `InvalidRequest` for an empty name; neither touches the status.
    pub fn start_download(&self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidRequest("No file selected".to_string()));
        }

        // Held across begin(): while the board is busy, the stored worker is
        // the one running that download.
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        let writer = self.board.begin(name)?;

        if let Some(previous) = worker.take() {
            // Already past its terminal write, since begin() succeeded.
            previous.join();
        }

        let config = self.config.clone();
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let handle = thread::Builder::new()
            .name("download-worker".to_string())
            .spawn(move || run_download(config, writer, flag))
            .map_err(|e| Error::LocalStorage(format!("cannot start download worker: {}", e)))?;

        *worker = Some(Worker { handle, cancel });
        info!("Download of '{}' started", name);
        Ok(())
    }

    /// Copy of the latest status. Never waits on the transfer.
    pub fn current_status(&self) -> TransferStatus {
        self.board.snapshot()
    }

    pub fn is_busy(&self) -> bool {
        self.board.is_busy()
    }

    /// Channel receiving every status write from now on.
    pub fn subscribe(&self) -> Receiver<TransferStatus> {
        self.board.subscribe()
    }

    /// Ask the running download to stop. Best effort: the server is not told,
    /// the client just stops reading and closes the connection.
    pub fn cancel(&self) -> bool {
        let worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        match worker.as_ref() {
            Some(current) if self.board.is_busy() => {
                current.cancel.store(true, Ordering::SeqCst);
                true
            }
            _ => false,
        }
    }

    /// Block until the current worker, if any, has exited.
    pub fn wait_idle(&self) {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            worker.join();
        }
    }
}

fn run_download(config: ClientConfig, mut writer: StatusWriter, cancel: Arc<AtomicBool>) {
    let name = writer.file_name().to_string();
    let mut session = TransferSession::new(&config, &name, cancel);

    match session.run(&mut writer) {
        Ok(path) => {
            info!("Downloaded '{}' to {}", name, path.display());
            writer.succeed(format!("File '{}' downloaded successfully.", name));
        }
        Err(e) => {
            writer.fail(e.kind(), failure_message(&name, &e));
        }
    }
}

fn failure_message(name: &str, err: &Error) -> String {
    match err {
        Error::NotFound(_) => format!("File '{}' was not found on the server.", name),
        Error::InvalidRequest(_) => format!("Server rejected request for '{}'.", name),
        Error::Protocol(detail) => format!("Invalid server response: {}", detail),
        other => format!("Download of '{}' failed. {}", name, other),
    }
}
