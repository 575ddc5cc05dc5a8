// Shared helpers for integration tests

#![allow(dead_code)]

use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use crossbeam_channel::Receiver;
use tempfile::TempDir;
use tcpfetch::protocol::frame::write_frame;
use tcpfetch::protocol::write_payload_header;
use tcpfetch::{ClientConfig, DownloadCoordinator, FileServer, ServerConfig, TransferStatus};

/// Start the real server on an ephemeral loopback port serving `files`.
pub fn start_server(files: &[(&str, &[u8])]) -> (TempDir, u16) {
    let shared = TempDir::new().unwrap();
    for (name, data) in files {
        fs::write(shared.path().join(name), data).unwrap();
    }

    let config = ServerConfig::new("127.0.0.1:0", shared.path().to_path_buf())
        .with_buffer_size(64)
        .unwrap();
    let server = FileServer::bind(config).unwrap();
    let port = server.local_addr().unwrap().port();
    thread::spawn(move || server.run());
    (shared, port)
}

pub fn client_config(port: u16, download_dir: &Path) -> ClientConfig {
    ClientConfig::new("127.0.0.1", port)
        .with_download_dir(download_dir.to_path_buf())
        .with_read_timeout(Duration::from_secs(5))
}

/// Poll `current_status` until a terminal state, returning every distinct
/// snapshot seen (by `updated_at`), the first one included.
pub fn poll_until_terminal(coordinator: &DownloadCoordinator) -> Vec<TransferStatus> {
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut seen = vec![coordinator.current_status()];
    loop {
        let status = coordinator.current_status();
        if status.updated_at != seen.last().unwrap().updated_at {
            seen.push(status.clone());
        }
        if status.is_terminal() {
            return seen;
        }
        assert!(Instant::now() < deadline, "no terminal status; last: {:?}", status);
        thread::sleep(Duration::from_millis(2));
    }
}

pub fn poll_until<F: Fn(&TransferStatus) -> bool>(coordinator: &DownloadCoordinator, pred: F) -> TransferStatus {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let status = coordinator.current_status();
        if pred(&status) {
            return status;
        }
        assert!(Instant::now() < deadline, "condition never met; last: {:?}", status);
        thread::sleep(Duration::from_millis(2));
    }
}

/// What a scripted peer does after the listing.
pub enum Script {
    /// Send the listing frame body, then close.
    ListingOnly(Vec<u8>),
    /// Wait for `gate`, then send an empty listing and `token` (no payload).
    Gated { gate: Receiver<()>, token: &'static [u8] },
    /// Answer FILE_FOUND, announce `announced` bytes, send `sent`, close.
    Truncated { announced: u64, sent: Vec<u8> },
    /// Answer FILE_FOUND, announce `announced`, send `first`, wait for `gate`,
    /// then keep sending filler until the client goes away.
    Trickle { announced: u64, first: Vec<u8>, gate: Receiver<()> },
    /// Accept and never say anything.
    Silent(Receiver<()>),
}

/// One-connection peer speaking the wire format by hand.
pub fn scripted_server(script: Script) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        match script {
            Script::ListingOnly(body) => {
                let _ = write_frame(&mut stream, &body, "listing");
            }
            Script::Gated { gate, token } => {
                let _ = gate.recv();
                let _ = write_frame(&mut stream, b"", "listing");
                read_request(&mut stream);
                let _ = write_frame(&mut stream, token, "response");
            }
            Script::Truncated { announced, sent } => {
                let _ = write_frame(&mut stream, b"a.txt", "listing");
                read_request(&mut stream);
                let _ = write_frame(&mut stream, b"FILE_FOUND", "response");
                let _ = write_payload_header(&mut stream, announced);
                let _ = stream.write_all(&sent);
            }
            Script::Trickle { announced, first, gate } => {
                let _ = write_frame(&mut stream, b"a.txt", "listing");
                read_request(&mut stream);
                let _ = write_frame(&mut stream, b"FILE_FOUND", "response");
                let _ = write_payload_header(&mut stream, announced);
                let _ = stream.write_all(&first);
                let _ = gate.recv();
                while stream.write_all(&[0u8; 64]).is_ok() {
                    thread::sleep(Duration::from_millis(1));
                }
            }
            Script::Silent(hold) => {
                let _ = hold.recv();
            }
        }
    });
    port
}

fn read_request<R: Read>(stream: &mut R) {
    let mut header = [0u8; 4];
    if stream.read_exact(&mut header).is_ok() {
        let mut name = vec![0u8; u32::from_be_bytes(header) as usize];
        let _ = stream.read_exact(&mut name);
    }
}
