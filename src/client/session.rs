// One download connection, driven forward through its stages

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use log::{debug, info, warn};
use crate::common::config::ClientConfig;
use crate::common::error::{Error, Result};
use crate::common::types::SessionStage;
use crate::protocol::Response;
use super::connection::ClientConnection;
use super::receiver::FileReceiver;

/// Hooks for watching a [`TransferSession`] from the outside.
pub trait TransferObserver {
    /// Called on every stage transition.
    fn on_stage(&mut self, _stage: SessionStage) {}

    /// Called whenever the integer percentage changes.
    fn on_progress(&mut self, _bytes: u64, _total: u64, _percent: u8) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl TransferObserver for NoopObserver {}

/// Single forward path, no retries:
/// `Connected -> ListingReceived -> RequestSent -> ResponseReceived ->
/// {NotFound | Invalid | Streaming -> Completed}`, any step may go to `Failed`.
pub struct TransferSession<'a> {
    config: &'a ClientConfig,
    file_name: String,
    stage: Option<SessionStage>,
    cancel: Arc<AtomicBool>,
}

impl<'a> TransferSession<'a> {
    pub fn new(config: &'a ClientConfig, file_name: &str, cancel: Arc<AtomicBool>) -> Self {
        Self {
            config,
            file_name: file_name.to_string(),
            stage: None,
            cancel,
        }
    }

    /// Last stage reached, `None` before connecting.
    pub fn stage(&self) -> Option<SessionStage> {
        self.stage
    }

    /// Run to completion. On success the returned path holds exactly the
    /// announced payload bytes.
    pub fn run(&mut self, observer: &mut dyn TransferObserver) -> Result<PathBuf> {
        let result = self.drive(observer);
        if let Err(e) = &result {
            if !matches!(self.stage, Some(SessionStage::NotFound) | Some(SessionStage::Invalid)) {
                warn!("Session for '{}' failed: {}", self.file_name, e);
                self.advance(SessionStage::Failed, observer);
            }
        }
        result
    }

    fn advance(&mut self, stage: SessionStage, observer: &mut dyn TransferObserver) {
        debug!("Session '{}': {:?} -> {:?}", self.file_name, self.stage, stage);
        self.stage = Some(stage);
        observer.on_stage(stage);
    }

    fn drive(&mut self, observer: &mut dyn TransferObserver) -> Result<PathBuf> {
        let mut conn = ClientConnection::connect(self.config)?;
        self.advance(SessionStage::Connected, observer);

        // Every connection opens with the listing; a download has no use for it.
        let listing = conn.recv_listing()?;
        debug!("Session '{}': discarding listing of {} names", self.file_name, listing.names.len());
        self.advance(SessionStage::ListingReceived, observer);

        conn.send_request(&self.file_name)?;
        self.advance(SessionStage::RequestSent, observer);

        let response = conn.recv_response()?;
        self.advance(SessionStage::ResponseReceived, observer);

        match response {
            Response::FileNotFound => {
                self.advance(SessionStage::NotFound, observer);
                conn.close();
                Err(Error::NotFound(self.file_name.clone()))
            }
            Response::InvalidRequest => {
                self.advance(SessionStage::Invalid, observer);
                conn.close();
                Err(Error::InvalidRequest(format!(
                    "server rejected request for '{}'",
                    self.file_name
                )))
            }
            Response::FileFound => {
                let path = self.stream(&mut conn, observer)?;
                conn.close();
                self.advance(SessionStage::Completed, observer);
                Ok(path)
            }
        }
    }

    fn stream(&mut self, conn: &mut ClientConnection, observer: &mut dyn TransferObserver) -> Result<PathBuf> {
        let total = conn.recv_payload_len()?;
        info!("Receiving '{}' ({} bytes) from {}", self.file_name, total, conn.endpoint());

        // A zero-length payload never enters the loop below.
        self.check_cancelled()?;
        let mut receiver = FileReceiver::new(&self.config.download_dir, &self.file_name, total)?;
        self.advance(SessionStage::Streaming, observer);

        let mut buf = vec![0u8; self.config.buffer_size];
        let mut last_percent = 0u8;

        while !receiver.is_complete() {
            self.check_cancelled()?;

            let want = receiver.remaining().min(buf.len() as u64) as usize;
            let n = conn.read_chunk(&mut buf[..want])?;
            if n == 0 {
                return Err(Error::Connection(format!(
                    "stream ended after {} of {} bytes",
                    receiver.bytes_received(),
                    total
                )));
            }
            receiver.write_chunk(&buf[..n])?;

            let percent = receiver.progress();
            if percent != last_percent {
                last_percent = percent;
                observer.on_progress(receiver.bytes_received(), total, percent);
            }
        }

        receiver.finalize()
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.load(Ordering::SeqCst) {
            info!("Download of '{}' cancelled locally", self.file_name);
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}
