// Client-side file receiving logic

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use crate::common::error::{Error, Result};
use crate::common::types::PART_SUFFIX;
use crate::common::utils::sanitize_file_name;

/// Destination sink for one download.
///
/// Bytes land in `<dir>/<name>.part` and are renamed onto `<dir>/<name>` only
/// once the announced length has arrived. Dropping an unfinished receiver
/// removes the part file, so a failed download leaves nothing behind.
pub struct FileReceiver {
    part_file: Option<File>,
    part_file_path: PathBuf,
    final_file_path: PathBuf,
    expected_len: u64,
    bytes_received: u64,
    finalized: bool,
}

impl FileReceiver {
    /// Create the sink under `output_dir`, creating missing directories.
    ///
    /// # Arguments
    /// * `output_dir` - Download root
    /// * `name` - Requested name; only its base component is used
    /// * `expected_len` - Byte count announced by the server
    pub fn new(output_dir: &Path, name: &str, expected_len: u64) -> Result<Self> {
        let base = sanitize_file_name(name)
            .ok_or_else(|| Error::InvalidRequest(format!("unusable file name {:?}", name)))?;

        fs::create_dir_all(output_dir)
            .map_err(|e| Error::storage(&format!("creating {}", output_dir.display()), e))?;

        let final_file_path = output_dir.join(base);
        let part_file_path = output_dir.join(format!("{}{}", base, PART_SUFFIX));

        let part_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&part_file_path)
            .map_err(|e| Error::storage(&format!("creating {}", part_file_path.display()), e))?;

        Ok(Self {
            part_file: Some(part_file),
            part_file_path,
            final_file_path,
            expected_len,
            bytes_received: 0,
            finalized: false,
        })
    }

    /// Append a chunk. Refuses bytes beyond the announced length.
    pub fn write_chunk(&mut self, data: &[u8]) -> Result<()> {
        if self.bytes_received + data.len() as u64 > self.expected_len {
            return Err(Error::Protocol(format!(
                "server sent more than the announced {} bytes",
                self.expected_len
            )));
        }

        let file = self
            .part_file
            .as_mut()
            .ok_or_else(|| Error::LocalStorage("receiver already closed".to_string()))?;
        file.write_all(data)
            .map_err(|e| Error::storage(&format!("writing {}", self.part_file_path.display()), e))?;

        self.bytes_received += data.len() as u64;
        Ok(())
    }

    pub fn remaining(&self) -> u64 {
        self.expected_len - self.bytes_received
    }

    pub fn is_complete(&self) -> bool {
        self.bytes_received == self.expected_len
    }

    /// Integer percentage of the announced length, 100 for an empty file.
    pub fn progress(&self) -> u8 {
        if self.expected_len == 0 {
            return 100;
        }
        ((self.bytes_received as u128 * 100) / self.expected_len as u128) as u8
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    /// Flush, sync and atomically rename the part file into place.
    pub fn finalize(mut self) -> Result<PathBuf> {
        if !self.is_complete() {
            return Err(Error::Connection(format!(
                "transfer incomplete: {} of {} bytes",
                self.bytes_received, self.expected_len
            )));
        }

        if let Some(mut file) = self.part_file.take() {
            file.flush()
                .and_then(|_| file.sync_all())
                .map_err(|e| Error::storage(&format!("syncing {}", self.part_file_path.display()), e))?;
        }

        fs::rename(&self.part_file_path, &self.final_file_path).map_err(|e| {
            Error::storage(&format!("moving into {}", self.final_file_path.display()), e)
        })?;
        self.finalized = true;

        log::info!(
            "Transfer finalized: {} ({} bytes)",
            self.final_file_path.display(),
            self.bytes_received
        );

        Ok(self.final_file_path.clone())
    }
}

impl Drop for FileReceiver {
    fn drop(&mut self) {
        if self.finalized {
            return;
        }
        drop(self.part_file.take());
        if let Err(e) = fs::remove_file(&self.part_file_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("Could not remove {}: {}", self.part_file_path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_receive_and_finalize() {
        let temp_dir = TempDir::new().unwrap();
        let mut receiver = FileReceiver::new(temp_dir.path(), "hello.txt", 5).unwrap();

        receiver.write_chunk(b"hel").unwrap();
        assert_eq!(receiver.progress(), 60);
        assert!(temp_dir.path().join("hello.txt.part").exists());

        receiver.write_chunk(b"lo").unwrap();
        let path = receiver.finalize().unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"hello");
        assert!(!temp_dir.path().join("hello.txt.part").exists());
    }

    #[test]
    fn test_drop_removes_part_file() {
        let temp_dir = TempDir::new().unwrap();
        {
            let mut receiver = FileReceiver::new(temp_dir.path(), "big.bin", 100).unwrap();
            receiver.write_chunk(&[1u8; 10]).unwrap();
        }

        assert!(!temp_dir.path().join("big.bin.part").exists());
        assert!(!temp_dir.path().join("big.bin").exists());
    }

    #[test]
    fn test_incomplete_finalize_fails() {
        let temp_dir = TempDir::new().unwrap();
        let mut receiver = FileReceiver::new(temp_dir.path(), "a.txt", 4).unwrap();
        receiver.write_chunk(b"ab").unwrap();

        assert!(matches!(receiver.finalize(), Err(Error::Connection(_))));
        assert!(!temp_dir.path().join("a.txt").exists());
    }

    #[test]
    fn test_overrun_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut receiver = FileReceiver::new(temp_dir.path(), "a.txt", 2).unwrap();

        assert!(matches!(receiver.write_chunk(b"abc"), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_name_cannot_escape_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("downloads");
        let mut receiver = FileReceiver::new(&root, "../../evil.sh", 1).unwrap();
        receiver.write_chunk(b"x").unwrap();

        let path = receiver.finalize().unwrap();
        assert_eq!(path, root.join("evil.sh"));
    }

    #[test]
    fn test_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let receiver = FileReceiver::new(temp_dir.path(), "empty", 0).unwrap();
        assert_eq!(receiver.progress(), 100);

        let path = receiver.finalize().unwrap();
        assert_eq!(fs::metadata(path).unwrap().len(), 0);
    }
}
