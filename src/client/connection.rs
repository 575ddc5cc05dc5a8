// Client connection: one TCP stream per listing fetch or download

use std::io::Read;
use std::net::{Shutdown, TcpStream};
use log::{debug, info, warn};
use crate::common::config::ClientConfig;
use crate::common::error::{Error, Result};
use crate::common::types::Endpoint;
use crate::protocol::{read_payload_header, FileRequest, Listing, Response};

pub struct ClientConnection {
    stream: TcpStream,
    endpoint: Endpoint,
}

impl ClientConnection {
    /// Resolve the endpoint and connect to the first address that answers.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let endpoint = config.endpoint();
        let mut last_err = None;

        for addr in endpoint.resolve()? {
            debug!("Client: connecting to {}", addr);
            match TcpStream::connect_timeout(&addr, config.connect_timeout()) {
                Ok(stream) => {
                    stream
                        .set_read_timeout(config.socket_timeout())
                        .and_then(|_| stream.set_write_timeout(config.socket_timeout()))
                        .map_err(|e| Error::network("configuring socket", e))?;
                    stream.set_nodelay(true).ok();
                    info!("Client: connected to {}", endpoint);
                    return Ok(Self { stream, endpoint });
                }
                Err(e) => {
                    warn!("Client: connect to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }

        Err(match last_err {
            Some(e) => Error::network(&format!("connecting to {}", endpoint), e),
            None => Error::Connection(format!("no reachable address for {}", endpoint)),
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn recv_listing(&mut self) -> Result<Listing> {
        let listing = Listing::read_from(&mut self.stream)?;
        debug!("Client: listing has {} entries", listing.names.len());
        Ok(listing)
    }

    pub fn send_request(&mut self, name: &str) -> Result<()> {
        FileRequest::new(name).write_to(&mut self.stream)
    }

    pub fn recv_response(&mut self) -> Result<Response> {
        Response::read_from(&mut self.stream)
    }

    pub fn recv_payload_len(&mut self) -> Result<u64> {
        read_payload_header(&mut self.stream)
    }

    /// Read up to `buf.len()` payload bytes. Zero means the peer closed.
    pub fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        loop {
            match self.stream.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::network("receiving payload", e)),
            }
        }
    }

    /// Close both directions; errors are irrelevant at this point.
    pub fn close(self) {
        let _ = self.stream.shutdown(Shutdown::Both);
        debug!("Client: connection to {} closed", self.endpoint);
    }
}
