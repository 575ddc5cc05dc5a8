// Protocol messages: listing, file request, response token

use std::io::{Read, Write};
use crate::common::error::{Error, Result};
use crate::common::types::{MAX_LISTING_SIZE, MAX_REQUEST_SIZE, MAX_TOKEN_SIZE};
use crate::common::utils::parse_names;
use super::frame::{read_frame, read_frame_opt, write_frame};

/// Names the server offers, sent first on every connection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Listing {
    pub names: Vec<String>,
}

impl Listing {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Newline-joined body. An empty directory encodes as an empty body.
    pub fn encode(&self) -> Vec<u8> {
        self.names.join("\n").into_bytes()
    }

    pub fn decode(body: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(body)
            .map_err(|e| Error::Protocol(format!("listing is not UTF-8: {}", e)))?;
        Ok(Self::new(parse_names(text)))
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_frame(writer, &self.encode(), "listing")
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let body = read_frame(reader, MAX_LISTING_SIZE, "listing")?;
        Self::decode(&body)
    }
}

/// Client's request for one file, by raw name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRequest {
    pub name: String,
}

impl FileRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_frame(writer, self.name.as_bytes(), "file request")
    }

    /// `Ok(None)` when the client hung up after the listing.
    ///
    /// The body is returned undecoded so the server can answer
    /// `INVALID_REQUEST` to non-UTF-8 names instead of dropping the client.
    pub fn read_raw<R: Read>(reader: &mut R) -> Result<Option<Vec<u8>>> {
        read_frame_opt(reader, MAX_REQUEST_SIZE, "file request")
    }
}

/// Server's answer to a [`FileRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    FileFound,
    FileNotFound,
    InvalidRequest,
}

impl Response {
    pub fn token(&self) -> &'static str {
        match self {
            Response::FileFound => "FILE_FOUND",
            Response::FileNotFound => "FILE_NOT_FOUND",
            Response::InvalidRequest => "INVALID_REQUEST",
        }
    }

    /// Exact match only; anything else is a protocol violation.
    pub fn from_token(body: &[u8]) -> Result<Self> {
        match body {
            b"FILE_FOUND" => Ok(Response::FileFound),
            b"FILE_NOT_FOUND" => Ok(Response::FileNotFound),
            b"INVALID_REQUEST" => Ok(Response::InvalidRequest),
            other => Err(Error::Protocol(format!(
                "unexpected response token {:?}",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_frame(writer, self.token().as_bytes(), "response")
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let body = read_frame(reader, MAX_TOKEN_SIZE, "response")?;
        Self::from_token(&body)
    }
}
