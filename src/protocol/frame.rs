// Length-prefixed framing shared by client and server
//
// Control frame:  u32 BE length | body
// Payload:        u64 BE length | raw bytes (streamed in buffer-sized writes)

use std::io::{self, Read, Write};
use bytes::{Buf, BufMut, BytesMut};
use crate::common::error::{Error, Result};

pub const FRAME_HEADER_LEN: usize = 4;
pub const PAYLOAD_HEADER_LEN: usize = 8;

/// Encode a control frame into a single buffer so it goes out in one write.
pub fn encode_frame(body: &[u8]) -> Result<BytesMut> {
    let len = u32::try_from(body.len())
        .map_err(|_| Error::Protocol(format!("frame too large: {} bytes", body.len())))?;
    let mut buf = BytesMut::with_capacity(FRAME_HEADER_LEN + body.len());
    buf.put_u32(len);
    buf.put_slice(body);
    Ok(buf)
}

pub fn write_frame<W: Write>(writer: &mut W, body: &[u8], what: &str) -> Result<()> {
    let buf = encode_frame(body)?;
    writer
        .write_all(&buf)
        .and_then(|_| writer.flush())
        .map_err(|e| Error::network(&format!("sending {}", what), e))
}

/// Read one control frame, rejecting bodies longer than `max_len`.
pub fn read_frame<R: Read>(reader: &mut R, max_len: usize, what: &str) -> Result<Vec<u8>> {
    match read_frame_opt(reader, max_len, what)? {
        Some(body) => Ok(body),
        None => Err(Error::Connection(format!(
            "receiving {}: connection closed before frame",
            what
        ))),
    }
}

/// Like [`read_frame`], but a clean close before the first header byte yields `None`.
pub fn read_frame_opt<R: Read>(reader: &mut R, max_len: usize, what: &str) -> Result<Option<Vec<u8>>> {
    let mut header = [0u8; FRAME_HEADER_LEN];
    if !read_header(reader, &mut header, what)? {
        return Ok(None);
    }

    let mut cursor = &header[..];
    let len = cursor.get_u32() as usize;
    if len > max_len {
        return Err(Error::Protocol(format!(
            "{} frame of {} bytes exceeds limit of {}",
            what, len, max_len
        )));
    }

    let mut body = vec![0u8; len];
    reader
        .read_exact(&mut body)
        .map_err(|e| Error::network(&format!("receiving {}", what), e))?;
    Ok(Some(body))
}

pub fn write_payload_header<W: Write>(writer: &mut W, len: u64) -> Result<()> {
    let mut buf = BytesMut::with_capacity(PAYLOAD_HEADER_LEN);
    buf.put_u64(len);
    writer
        .write_all(&buf)
        .map_err(|e| Error::network("sending payload length", e))
}

pub fn read_payload_header<R: Read>(reader: &mut R) -> Result<u64> {
    let mut header = [0u8; PAYLOAD_HEADER_LEN];
    reader
        .read_exact(&mut header)
        .map_err(|e| Error::network("receiving payload length", e))?;
    let mut cursor = &header[..];
    Ok(cursor.get_u64())
}

// Fills `header` completely. Returns false on EOF before the first byte.
fn read_header<R: Read>(reader: &mut R, header: &mut [u8], what: &str) -> Result<bool> {
    let mut filled = 0;
    while filled < header.len() {
        match reader.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(Error::Connection(format!(
                    "receiving {}: connection closed inside frame header",
                    what
                )))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::network(&format!("receiving {}", what), e)),
        }
    }
    Ok(true)
}
