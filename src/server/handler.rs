// Serves one accepted connection, start to finish

use std::io::{Read, Write};
use log::{debug, info};
use crate::common::error::{Error, Result};
use crate::protocol::{write_payload_header, FileRequest, Listing, Response};
use super::catalog::{Catalog, Lookup};

/// What happened on one connection, for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServeOutcome {
    ListingOnly,
    Sent { name: String, bytes: u64 },
    NotFound(String),
    Rejected,
}

/// Run the protocol for one client over any byte stream.
pub fn serve_connection<S: Read + Write>(
    stream: &mut S,
    catalog: &Catalog,
    buffer_size: usize,
) -> Result<ServeOutcome> {
    let names = catalog.names()?;
    Listing::new(names).write_to(stream)?;

    let raw = match FileRequest::read_raw(stream)? {
        Some(raw) => raw,
        None => {
            debug!("Server: client closed after listing");
            return Ok(ServeOutcome::ListingOnly);
        }
    };

    match catalog.lookup(&raw) {
        Lookup::Invalid => {
            Response::InvalidRequest.write_to(stream)?;
            info!("Server: rejected request {:?}", String::from_utf8_lossy(&raw));
            Ok(ServeOutcome::Rejected)
        }
        Lookup::Missing(name) => {
            Response::FileNotFound.write_to(stream)?;
            info!("Server: file '{}' not found", name);
            Ok(ServeOutcome::NotFound(name))
        }
        Lookup::Found { path, mut file, len } => {
            Response::FileFound.write_to(stream)?;
            write_payload_header(stream, len)?;

            let mut buf = vec![0u8; buffer_size];
            let mut sent = 0u64;
            while sent < len {
                let want = (len - sent).min(buf.len() as u64) as usize;
                let n = file
                    .read(&mut buf[..want])
                    .map_err(|e| Error::storage(&format!("reading {}", path.display()), e))?;
                if n == 0 {
                    return Err(Error::LocalStorage(format!(
                        "{} shrank while sending ({} of {} bytes)",
                        path.display(),
                        sent,
                        len
                    )));
                }
                stream
                    .write_all(&buf[..n])
                    .map_err(|e| Error::network("sending payload", e))?;
                sent += n as u64;
            }
            stream.flush().map_err(|e| Error::network("sending payload", e))?;

            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            info!("Server: file '{}' sent ({} bytes)", name, sent);
            Ok(ServeOutcome::Sent { name, bytes: sent })
        }
    }
}
