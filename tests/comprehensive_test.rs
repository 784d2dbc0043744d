//! Raw-socket tests: URLs an HTTP client library would normalise, malformed
//! requests, and the exact bytes on the wire.

use static_sv::config::Config;
use static_sv::server::serve;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tempfile::{tempdir, TempDir};

/// A helper struct to manage a running test server.
struct TestServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    handle: Option<JoinHandle<()>>,
    temp_dir: TempDir,
}

impl TestServer {
    fn new() -> Self {
        let dir = tempdir().unwrap();

        let mut file = File::create(dir.path().join("test.txt")).unwrap();
        writeln!(file, "Hello from test file!").unwrap();
        File::create(dir.path().join("empty.bin")).unwrap();
        fs::write(dir.path().join("with space.txt"), "spaced").unwrap();

        let mut large = File::create(dir.path().join("large.txt")).unwrap();
        for i in 0..20_000 {
            writeln!(large, "Line {i} of a large file for testing").unwrap();
        }

        fs::create_dir(dir.path().join("subdir")).unwrap();
        fs::write(dir.path().join("subdir").join("nested.txt"), "Nested").unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let config = Config::builder()
            .root(dir.path().to_string_lossy().into_owned())
            .port(i64::from(port))
            .serve_directories(true)
            .chunk_size(1024)
            .threads(4)
            .build()
            .unwrap();

        let (shutdown_tx, shutdown_rx) = mpsc::channel();
        let (addr_tx, addr_rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            if let Err(e) = serve(listener, config, Some(shutdown_rx), Some(addr_tx)) {
                eprintln!("Server thread failed: {e}");
            }
        });

        TestServer {
            addr: addr_rx.recv().unwrap(),
            shutdown_tx,
            handle: Some(handle),
            temp_dir: dir,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.shutdown_tx.send(()).ok();
            handle.join().unwrap();
        }
    }
}

struct RawResponse {
    status_code: u16,
    headers: HashMap<String, String>,
    raw_body: Vec<u8>,
}

impl RawResponse {
    fn body(&self) -> Vec<u8> {
        let chunked = self
            .headers
            .get("transfer-encoding")
            .is_some_and(|v| v == "chunked");
        if chunked {
            dechunk(&self.raw_body)
        } else {
            self.raw_body.clone()
        }
    }

    fn text(&self) -> String {
        String::from_utf8(self.body()).unwrap()
    }
}

fn dechunk(mut raw: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    loop {
        let end = raw.windows(2).position(|w| w == b"\r\n").unwrap();
        let size = usize::from_str_radix(std::str::from_utf8(&raw[..end]).unwrap(), 16).unwrap();
        raw = &raw[end + 2..];
        if size == 0 {
            return body;
        }
        body.extend_from_slice(&raw[..size]);
        raw = &raw[size + 2..];
    }
}

/// Sends raw bytes and reads until the server closes the connection.
fn send_raw(addr: SocketAddr, request: &[u8]) -> RawResponse {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .unwrap();
    stream.write_all(request).unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).unwrap();

    let split = raw.windows(4).position(|w| w == b"\r\n\r\n").unwrap();
    let head = String::from_utf8(raw[..split].to_vec()).unwrap();
    let mut lines = head.lines();
    let status_code = lines
        .next()
        .unwrap()
        .split_whitespace()
        .nth(1)
        .unwrap()
        .parse()
        .unwrap();
    let headers = lines
        .filter_map(|line| line.split_once(": "))
        .map(|(k, v)| (k.to_lowercase(), v.to_string()))
        .collect();

    RawResponse {
        status_code,
        headers,
        raw_body: raw[split + 4..].to_vec(),
    }
}

fn get(addr: SocketAddr, target: &str) -> RawResponse {
    send_raw(
        addr,
        format!("GET {target} HTTP/1.1\r\nHost: {addr}\r\n\r\n").as_bytes(),
    )
}

#[test]
fn test_file_response_on_the_wire() {
    let server = TestServer::new();
    let response = get(server.addr, "/test.txt");

    assert_eq!(response.status_code, 200);
    assert_eq!(response.headers["content-type"], "text/plain");
    assert_eq!(response.headers["transfer-encoding"], "chunked");
    assert_eq!(response.headers["connection"], "close");
    assert_eq!(
        response.headers["cache-control"],
        "public, max-age=604800, immutable"
    );
    assert_eq!(response.text(), "Hello from test file!\n");
}

#[test]
fn test_empty_file() {
    let server = TestServer::new();
    let response = get(server.addr, "/empty.bin");

    assert_eq!(response.status_code, 200);
    assert_eq!(response.headers["content-type"], "application/octet-stream");
    assert_eq!(response.raw_body, b"0\r\n\r\n");
    assert!(response.body().is_empty());
}

#[test]
fn test_large_file_handling() {
    let server = TestServer::new();
    let response = get(server.addr, "/large.txt");

    assert_eq!(response.status_code, 200);
    let expected = fs::read(server.temp_dir.path().join("large.txt")).unwrap();
    assert_eq!(response.body(), expected);
}

#[test]
fn test_status_body_format() {
    let server = TestServer::new();
    let response = get(server.addr, "/missing");

    assert_eq!(response.status_code, 404);
    assert_eq!(response.headers["content-type"], "text/plain");
    assert_eq!(
        response.headers["content-length"],
        response.raw_body.len().to_string()
    );
    assert_eq!(
        response.text(),
        "404 : File or directory not found: /missing"
    );
}

#[test]
fn test_percent_encoded_and_doubled_slashes() {
    let server = TestServer::new();

    let response = get(server.addr, "/with%20space.txt");
    assert_eq!(response.status_code, 200);
    assert_eq!(response.text(), "spaced");

    let response = get(server.addr, "//subdir///nested.txt");
    assert_eq!(response.status_code, 200);
    assert_eq!(response.text(), "Nested");

    let response = get(server.addr, "/test.txt?download=1");
    assert_eq!(response.status_code, 200);
}

#[test]
fn test_malformed_escape_is_not_fatal() {
    let server = TestServer::new();
    let response = get(server.addr, "/bad%zzname");
    assert_eq!(response.status_code, 404);
    assert_eq!(
        response.text(),
        "404 : File or directory not found: /bad%zzname"
    );
}

#[test]
fn test_path_traversal_is_not_found() {
    let server = TestServer::new();

    for target in ["/../../etc/passwd", "/subdir/../../etc/passwd", "/%2E%2E/%2E%2E/"] {
        let response = get(server.addr, target);
        assert_eq!(response.status_code, 404, "{target}");
    }
}

#[test]
fn test_method_check_comes_first() {
    let server = TestServer::new();
    let response = send_raw(
        server.addr,
        b"PUT /does/not/exist HTTP/1.1\r\nHost: x\r\nContent-Length: 0\r\n\r\n",
    );
    assert_eq!(response.status_code, 405);
    assert_eq!(response.text(), "405 : Method PUT not allowed");
}

#[test]
fn test_malformed_requests() {
    let server = TestServer::new();
    let response = send_raw(server.addr, b"INVALID\r\n\r\n");
    assert_eq!(response.status_code, 400);
    assert_eq!(response.text(), "400 : Malformed request line");
}

#[test]
fn test_empty_connection_does_not_hurt_server() {
    let server = TestServer::new();
    drop(TcpStream::connect(server.addr).unwrap());

    let response = get(server.addr, "/test.txt");
    assert_eq!(response.status_code, 200);
}

#[test]
fn test_directory_listing_page() {
    let server = TestServer::new();

    let response = get(server.addr, "/subdir");
    assert_eq!(response.status_code, 200);
    assert_eq!(response.headers["content-type"], "text/html; charset=utf-8");
    let body = response.text();
    assert!(body.contains("nested.txt"));
    assert!(body.contains("6 B"));
    assert!(body.contains(r#"<a href="/">..</a>"#));
    assert!(body.contains(r#"<a href="/subdir/">subdir</a>"#));

    let response = get(server.addr, "/");
    let body = response.text();
    assert!(body.contains(r#"href="/with%20space.txt""#));
    assert!(body.contains(r#"href="/subdir/""#));
    assert!(!body.contains(">..</a>"));
}
