/*
 * SPDX-License-Identifier: GPL-3.0-or-later
 * More licensing information can be found in the project LICENSE file
 * Author: Harshit Jain
 * Email: reach@harsh1998.dev
 */
use crate::config::Config;
use crate::error::AppError;
use log::{debug, error};
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Read, Write};
use std::path::Path;

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const TEXT_PLAIN: &str = "text/plain";
pub const TEXT_HTML: &str = "text/html; charset=utf-8";

/// Resolves the content type for a file: config overrides first, then the
/// built-in table, then `application/octet-stream`.
pub fn content_type_for(path: &Path, overrides: &HashMap<String, String>) -> String {
    let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
        return OCTET_STREAM.to_string();
    };
    if let Some(content_type) = overrides
        .get(extension)
        .or_else(|| overrides.get(&extension.to_ascii_lowercase()))
    {
        return content_type.clone();
    }
    mime_guess::from_ext(extension)
        .first_raw()
        .unwrap_or(OCTET_STREAM)
        .to_string()
}

pub fn reason_phrase(status_code: u16) -> &'static str {
    match status_code {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// Ordered response headers. Names compare case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Vec<(String, String)>,
}

impl HeaderSet {
    /// Starts from the configured default headers.
    pub fn from_config(config: &Config) -> Self {
        Self {
            entries: config
                .headers()
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        }
    }

    /// Replaces an existing header of the same name or appends a new one.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Status line plus every header, terminated by the blank line.
    pub fn head(&self, status_code: u16) -> String {
        let mut head = format!("HTTP/1.1 {} {}\r\n", status_code, reason_phrase(status_code));
        for (name, value) in self.iter() {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
        head.push_str("\r\n");
        head
    }
}

/// A fully buffered response (status pages and directory listings).
pub struct HttpResponse {
    pub status_code: u16,
    pub headers: HeaderSet,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status_code: u16, headers: HeaderSet) -> Self {
        Self {
            status_code,
            headers,
            body: Vec::new(),
        }
    }

    pub fn with_body(mut self, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        self.headers.set("content-type", content_type);
        self.body = body.into();
        self
    }

    /// Plain-text status page: `"<code> : <message>"`.
    pub fn status(status_code: u16, message: &str, headers: HeaderSet) -> Self {
        Self::new(status_code, headers)
            .with_body(TEXT_PLAIN, format!("{status_code} : {message}"))
    }

    pub fn from_error(err: &AppError, headers: HeaderSet) -> Self {
        Self::status(err.status_code(), &err.to_string(), headers)
    }

    pub fn send<W: Write>(mut self, stream: &mut W, log_prefix: &str) -> Result<u64, AppError> {
        debug!(
            "{} Sending response - Status: {}, Body Length: {}",
            log_prefix,
            self.status_code,
            self.body.len()
        );

        self.headers.set("content-length", self.body.len().to_string());
        self.headers.set("connection", "close");
        let head = self.headers.head(self.status_code);

        stream
            .write_all(head.as_bytes())
            .and_then(|_| stream.write_all(&self.body))
            .and_then(|_| stream.flush())
            .map_err(|e| {
                error!("{log_prefix} Failed to write response: {e}");
                AppError::Io(e)
            })?;

        Ok(self.body.len() as u64)
    }
}

/// Why a streamed body stopped early. `sent` counts body bytes already
/// handed to the writer.
#[derive(Debug)]
pub enum StreamError {
    Read { sent: u64, source: io::Error },
    Write { sent: u64, source: io::Error },
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Read { sent, source } => {
                write!(f, "read failed after {sent} bytes: {source}")
            }
            StreamError::Write { sent, source } => {
                write!(f, "write failed after {sent} bytes: {source}")
            }
        }
    }
}

impl std::error::Error for StreamError {}

/// How a streamed body is delimited on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFraming {
    /// HTTP/1.1 chunked transfer encoding.
    Chunked,
    /// Raw bytes; closing the connection ends the body (HTTP/1.0).
    CloseDelimited,
}

impl BodyFraming {
    /// Chunked encoding must not be sent to HTTP/1.0 (or older) clients.
    pub fn for_version(version: &str) -> Self {
        match version {
            "HTTP/1.0" | "HTTP/0.9" => BodyFraming::CloseDelimited,
            _ => BodyFraming::Chunked,
        }
    }
}

/// Copies `reader` into `writer`, one `chunk_size` read at a time. With
/// chunked framing the terminating zero chunk is only written when the
/// reader reaches EOF, so a failed read leaves the body visibly truncated.
pub fn stream_body<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    chunk_size: usize,
    framing: BodyFraming,
) -> Result<u64, StreamError> {
    let mut buffer = vec![0; chunk_size.max(1)];
    let mut sent = 0u64;

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => return Err(StreamError::Read { sent, source }),
        };

        let chunk = &buffer[..bytes_read];
        let written = match framing {
            BodyFraming::Chunked => writer
                .write_all(format!("{bytes_read:X}\r\n").as_bytes())
                .and_then(|_| writer.write_all(chunk))
                .and_then(|_| writer.write_all(b"\r\n")),
            BodyFraming::CloseDelimited => writer.write_all(chunk),
        };
        written.map_err(|source| StreamError::Write { sent, source })?;
        sent += bytes_read as u64;
    }

    let finished = match framing {
        BodyFraming::Chunked => writer.write_all(b"0\r\n\r\n").and_then(|_| writer.flush()),
        BodyFraming::CloseDelimited => writer.flush(),
    };
    finished.map_err(|source| StreamError::Write { sent, source })?;
    Ok(sent)
}
