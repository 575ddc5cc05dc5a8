// Download status record and its single-writer discipline

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Serialize, Deserialize};
use crate::common::error::{Error, ErrorKind, Result};
use crate::common::types::{SessionStage, TransferState};
use crate::client::session::TransferObserver;

/// Snapshot of the most recent or ongoing download.
///
/// `updated_at` is a sequence number that strictly increases on every write,
/// so a poller can tell "nothing new" from "same state written again".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferStatus {
    pub state: TransferState,
    pub message: String,
    pub file_name: String,
    pub progress: u8,
    pub updated_at: u64,
    pub error: Option<ErrorKind>,
}

impl TransferStatus {
    fn idle() -> Self {
        Self {
            state: TransferState::Idle,
            message: String::new(),
            file_name: String::new(),
            progress: 0,
            updated_at: 0,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

struct BoardInner {
    status: TransferStatus,
    busy: bool,
    subscribers: Vec<Sender<TransferStatus>>,
}

impl BoardInner {
    fn publish(&mut self) {
        self.status.updated_at += 1;
        let snapshot = self.status.clone();
        self.subscribers.retain(|tx| tx.send(snapshot.clone()).is_ok());
    }
}

/// Owner of the one [`TransferStatus`] and the busy flag, behind one lock.
///
/// Reads hand out copies. Writes go only through the [`StatusWriter`] that
/// [`StatusBoard::begin`] returns, so there is one writer per transfer.
pub struct StatusBoard {
    inner: Mutex<BoardInner>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BoardInner {
                status: TransferStatus::idle(),
                busy: false,
                subscribers: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BoardInner> {
        // A panicking writer cannot leave the record half-written: every
        // mutation is a field assignment followed by publish().
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> TransferStatus {
        self.lock().status.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.lock().busy
    }

    /// Receive a copy of every status written from now on.
    pub fn subscribe(&self) -> Receiver<TransferStatus> {
        let (tx, rx) = unbounded();
        self.lock().subscribers.push(tx);
        rx
    }

    /// Check-and-set the busy flag and reset the status for `file_name`.
    pub fn begin(self: &Arc<Self>, file_name: &str) -> Result<StatusWriter> {
        let mut inner = self.lock();
        if inner.busy {
            return Err(Error::AlreadyInProgress(format!(
                "download of '{}' is still running",
                inner.status.file_name
            )));
        }

        inner.busy = true;
        inner.status.state = TransferState::InProgress;
        inner.status.message = format!("Starting download of {}", file_name);
        inner.status.file_name = file_name.to_string();
        inner.status.progress = 0;
        inner.status.error = None;
        inner.publish();

        Ok(StatusWriter {
            board: Arc::clone(self),
            file_name: file_name.to_string(),
            finished: false,
        })
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive write handle for one transfer's status.
///
/// Consuming it with [`succeed`](Self::succeed) or [`fail`](Self::fail)
/// writes the terminal status and clears the busy flag in the same critical
/// section. Dropping it unfinished (e.g. on panic) records a failure.
pub struct StatusWriter {
    board: Arc<StatusBoard>,
    file_name: String,
    finished: bool,
}

impl StatusWriter {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn set_message(&self, message: String) {
        let mut inner = self.board.lock();
        inner.status.message = message;
        inner.publish();
    }

    /// Raise progress; lower or equal values are ignored.
    pub fn set_progress(&self, progress: u8) {
        let progress = progress.min(100);
        let mut inner = self.board.lock();
        if progress <= inner.status.progress {
            return;
        }
        inner.status.progress = progress;
        inner.publish();
    }

    pub fn succeed(mut self, message: String) {
        self.finish(TransferState::Succeeded, message, None);
    }

    pub fn fail(mut self, kind: ErrorKind, message: String) {
        self.finish(TransferState::Failed, message, Some(kind));
    }

    fn finish(&mut self, state: TransferState, message: String, error: Option<ErrorKind>) {
        let mut inner = self.board.lock();
        inner.status.state = state;
        inner.status.message = message;
        if state == TransferState::Succeeded {
            inner.status.progress = 100;
        }
        inner.status.error = error;
        inner.busy = false;
        inner.publish();
        self.finished = true;
    }
}

impl Drop for StatusWriter {
    fn drop(&mut self) {
        if !self.finished {
            let message = format!("Download of '{}' stopped unexpectedly", self.file_name);
            self.finish(TransferState::Failed, message, Some(ErrorKind::Cancelled));
        }
    }
}

impl TransferObserver for StatusWriter {
    fn on_stage(&mut self, stage: SessionStage) {
        if stage == SessionStage::Streaming {
            self.set_message(format!("Downloading {}", self.file_name));
        }
    }

    fn on_progress(&mut self, _bytes: u64, _total: u64, percent: u8) {
        self.set_progress(percent);
    }
}
