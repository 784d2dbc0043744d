/*
 * SPDX-License-Identifier: GPL-3.0-or-later
 * More licensing information can be found in the project LICENSE file
 * Author: Harshit Jain
 * Email: reach@harsh1998.dev
 */
use crate::config::Config;
use crate::error::AppError;
use crate::fs::generate_directory_listing;
use crate::resolver::resolve;
use crate::response::{
    content_type_for, reason_phrase, stream_body, BodyFraming, HeaderSet, HttpResponse,
    StreamError, TEXT_HTML,
};
use crate::utils::within_base_url;
use log::{debug, error, info, warn};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::path::Path;
use std::time::Instant;

/// The request line of an incoming request. Header lines are read and
/// discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub target: String,
    pub version: String,
}

/// Per-request state, owned by the handling flow and dropped with it.
#[derive(Debug)]
pub struct RequestContext {
    pub id: u64,
    pub url: String,
    pub relative: String,
    pub absolute: String,
    pub headers: HeaderSet,
}

/// Longest request line or header line accepted, terminator included.
pub const MAX_LINE_LENGTH: usize = 8 * 1024;
/// Most header lines accepted after the request line.
pub const MAX_HEADERS: usize = 100;

fn header_too_large() -> AppError {
    AppError::BadRequest("Request header too large".to_string())
}

/// Reads one line, never buffering more than `MAX_LINE_LENGTH` bytes of it.
fn read_limited_line<R: BufRead>(reader: &mut R, line: &mut Vec<u8>) -> Result<usize, AppError> {
    line.clear();
    let read = reader
        .by_ref()
        .take(MAX_LINE_LENGTH as u64)
        .read_until(b'\n', line)?;
    if read == MAX_LINE_LENGTH && line.last() != Some(&b'\n') {
        return Err(header_too_large());
    }
    Ok(read)
}

/// Reads the request line and the header block. `Ok(None)` means the peer
/// closed the connection without sending anything. Oversized lines or too
/// many header lines are a `BadRequest`.
pub fn read_request<R: BufRead>(reader: &mut R) -> Result<Option<Request>, AppError> {
    let mut buffer = Vec::new();
    if read_limited_line(reader, &mut buffer)? == 0 {
        return Ok(None);
    }
    let request_line = String::from_utf8(buffer)
        .map_err(|_| AppError::BadRequest("Malformed request line".to_string()))?;

    let mut parts = request_line.split_whitespace();
    let (method, target) = match (parts.next(), parts.next()) {
        (Some(method), Some(target)) => (method.to_string(), target.to_string()),
        _ => return Err(AppError::BadRequest("Malformed request line".to_string())),
    };
    let version = parts.next().unwrap_or("HTTP/1.0").to_string();

    let mut line = Vec::new();
    let mut header_count = 0;
    loop {
        if read_limited_line(reader, &mut line)? == 0 {
            break;
        }
        if line.iter().all(|&b| b == b'\r' || b == b'\n') {
            break;
        }
        header_count += 1;
        if header_count > MAX_HEADERS {
            return Err(header_too_large());
        }
    }

    Ok(Some(Request {
        method,
        target,
        version,
    }))
}

/// Handles a single client connection: one request, one response.
pub fn handle_client(
    stream: TcpStream,
    config: &Config,
    request_id: u64,
    peer: &str,
) -> Result<(), AppError> {
    let log_prefix = format!("[ReqID: {request_id}][Peer: {peer}]");
    let started = Instant::now();
    let mut reader = BufReader::new(&stream);
    let mut writer = &stream;

    let request = match read_request(&mut reader) {
        Ok(Some(request)) => request,
        Ok(None) => {
            debug!("{log_prefix} Connection closed before a request arrived");
            return Ok(());
        }
        Err(e @ AppError::BadRequest(_)) => {
            warn!("{log_prefix} {e}");
            HttpResponse::from_error(&e, HeaderSet::from_config(config))
                .send(&mut writer, &log_prefix)?;
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    info!("{log_prefix} {} {}", request.method, request.target);

    let (status, bytes) = dispatch(&mut writer, &request, config, request_id, &log_prefix)?;
    info!(
        "{} {} {} - {} bytes in {:?}",
        log_prefix,
        status,
        reason_phrase(status),
        bytes,
        started.elapsed()
    );
    Ok(())
}

/// Routes a parsed request to the file streamer, the directory renderer or
/// a status response. Exactly one response is written to `writer`. Returns
/// the status code and body bytes sent; an `Err` means the response could
/// not be written.
pub fn dispatch<W: Write>(
    writer: &mut W,
    request: &Request,
    config: &Config,
    request_id: u64,
    log_prefix: &str,
) -> Result<(u16, u64), AppError> {
    let headers = HeaderSet::from_config(config);

    if request.method != "GET" {
        let err = AppError::MethodNotAllowed(request.method.clone());
        return send_error(writer, err, headers, log_prefix);
    }

    if !within_base_url(&request.target, config.base_url()) {
        debug!(
            "{log_prefix} '{}' is outside base URL '/{}'",
            request.target,
            config.base_url()
        );
        let err = AppError::NotFound(request.target.clone());
        return send_error(writer, err, headers, log_prefix);
    }

    let resolved = match resolve(&request.target, config) {
        Ok(resolved) => resolved,
        Err(err) => return send_error(writer, err, headers, log_prefix),
    };
    debug!(
        "{log_prefix} Resolved '{}' to '{}'",
        request.target, resolved.absolute
    );

    let ctx = RequestContext {
        id: request_id,
        url: request.target.clone(),
        relative: resolved.relative,
        absolute: resolved.absolute,
        headers,
    };

    let metadata = match fs::metadata(&ctx.absolute) {
        Ok(metadata) => metadata,
        Err(e) => {
            let err = AppError::from_stat(e, &ctx.url);
            return send_error(writer, err, ctx.headers, log_prefix);
        }
    };

    if metadata.is_file() {
        serve_file(writer, ctx, &request.version, config, log_prefix)
    } else if metadata.is_dir() {
        if config.serve_directories() {
            serve_directory(writer, ctx, config, log_prefix)
        } else {
            let err = AppError::UnsupportedItem(
                "Server not configured to serve directories".to_string(),
            );
            send_error(writer, err, ctx.headers, log_prefix)
        }
    } else {
        let err = AppError::UnsupportedItem("Not a file or directory".to_string());
        send_error(writer, err, ctx.headers, log_prefix)
    }
}

fn send_error<W: Write>(
    writer: &mut W,
    err: AppError,
    headers: HeaderSet,
    log_prefix: &str,
) -> Result<(u16, u64), AppError> {
    let status = err.status_code();
    if status >= 500 {
        error!("{log_prefix} {err}");
    } else {
        warn!("{log_prefix} {err}");
    }
    let bytes = HttpResponse::from_error(&err, headers).send(writer, log_prefix)?;
    Ok((status, bytes))
}

/// Streams a regular file. Once the head is written the status cannot
/// change, so a read failure only ends the body early. HTTP/1.0 clients get
/// the raw bytes and the closed connection marks the end.
fn serve_file<W: Write>(
    writer: &mut W,
    ctx: RequestContext,
    version: &str,
    config: &Config,
    log_prefix: &str,
) -> Result<(u16, u64), AppError> {
    info!("{} serve_file started for: '{}'", log_prefix, ctx.absolute);
    let path = Path::new(&ctx.absolute);
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            let err = AppError::from_stat(e, &ctx.url);
            return send_error(writer, err, ctx.headers, log_prefix);
        }
    };

    let mut headers = ctx.headers;
    headers.set("content-type", content_type_for(path, config.mime_types()));
    let framing = BodyFraming::for_version(version);
    if framing == BodyFraming::Chunked {
        headers.set("transfer-encoding", "chunked");
    }
    headers.set("connection", "close");
    writer
        .write_all(headers.head(200).as_bytes())
        .map_err(AppError::Io)?;

    match stream_body(&mut file, writer, config.chunk_size(), framing) {
        Ok(sent) => {
            info!("{} serve_file finished for: '{}'", log_prefix, ctx.absolute);
            Ok((200, sent))
        }
        Err(StreamError::Read { sent, source }) => {
            error!(
                "{} Read error while streaming '{}' after {} bytes: {}",
                log_prefix, ctx.absolute, sent, source
            );
            Ok((200, sent))
        }
        Err(StreamError::Write { sent, source }) => {
            debug!("{log_prefix} Client went away after {sent} bytes: {source}");
            Err(AppError::Io(source))
        }
    }
}

fn serve_directory<W: Write>(
    writer: &mut W,
    ctx: RequestContext,
    config: &Config,
    log_prefix: &str,
) -> Result<(u16, u64), AppError> {
    info!("{} serve_directory started for: '{}'", log_prefix, ctx.absolute);
    let listing =
        generate_directory_listing(Path::new(&ctx.absolute), &ctx.relative, config.base_url());
    let html = match listing {
        Ok(html) => html,
        Err(AppError::Io(e)) => {
            let err = AppError::from_stat(e, &ctx.url);
            return send_error(writer, err, ctx.headers, log_prefix);
        }
        Err(err) => return send_error(writer, err, ctx.headers, log_prefix),
    };

    let bytes = HttpResponse::new(200, ctx.headers)
        .with_body(TEXT_HTML, html)
        .send(writer, log_prefix)?;
    info!("{} serve_directory finished for: '{}'", log_prefix, ctx.absolute);
    Ok((200, bytes))
}
