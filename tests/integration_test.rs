use static_sv::config::{Config, ConfigBuilder};
use static_sv::server::serve;
use std::fs::{self, File};
use std::io::Write;
use std::net::{SocketAddr, TcpListener};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use tempfile::{tempdir, TempDir};

struct TestServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    handle: Option<JoinHandle<()>>,
    _temp_dir: TempDir,
}

impl TestServer {
    fn new(configure: impl FnOnce(ConfigBuilder) -> ConfigBuilder) -> Self {
        let dir = tempdir().unwrap();
        let mut file = File::create(dir.path().join("test.txt")).unwrap();
        writeln!(file, "hello world").unwrap();
        fs::write(dir.path().join("style.css"), "body { color: red; }").unwrap();
        fs::create_dir(dir.path().join("site")).unwrap();
        fs::write(dir.path().join("site").join("index.html"), "<p>site</p>").unwrap();
        fs::create_dir(dir.path().join("subdir")).unwrap();
        fs::write(dir.path().join("subdir").join("nested.txt"), "nested").unwrap();

        // Port 0 lets the OS pick a free port; the config records the real one.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let builder = Config::builder()
            .root(dir.path().to_string_lossy().into_owned())
            .port(i64::from(port))
            .threads(4);
        let config = configure(builder).build().unwrap();

        let (shutdown_tx, shutdown_rx) = mpsc::channel();
        let (addr_tx, addr_rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            if let Err(e) = serve(listener, config, Some(shutdown_rx), Some(addr_tx)) {
                eprintln!("Server thread failed: {e}");
            }
        });
        let addr = addr_rx.recv().unwrap();

        TestServer {
            addr,
            shutdown_tx,
            handle: Some(handle),
            _temp_dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
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

fn client() -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder()
        .no_proxy()
        .build()
        .unwrap()
}

#[test]
fn test_server_requests() {
    let server = TestServer::new(|b| b.serve_directories(true));
    let client = client();

    // 1. Directory listing
    let res = client.get(server.url("/")).send().unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "text/html; charset=utf-8");
    let body = res.text().unwrap();
    assert!(body.contains("test.txt"));
    assert!(body.contains("subdir/"));

    // 2. File download
    let res = client.get(server.url("/test.txt")).send().unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "text/plain");
    assert_eq!(
        res.headers()["cache-control"],
        "public, max-age=604800, immutable"
    );
    assert_eq!(res.text().unwrap(), "hello world\n");

    // 3. Nested file
    let res = client.get(server.url("/subdir/nested.txt")).send().unwrap();
    assert_eq!(res.text().unwrap(), "nested");

    // 4. Missing file
    let res = client.get(server.url("/not_found.txt")).send().unwrap();
    assert_eq!(res.status(), 404);
    assert_eq!(res.headers()["content-type"], "text/plain");
    assert_eq!(
        res.text().unwrap(),
        "404 : File or directory not found: /not_found.txt"
    );
}

#[test]
fn test_method_not_allowed() {
    let server = TestServer::new(|b| b);
    let client = client();

    let res = client.post(server.url("/test.txt")).send().unwrap();
    assert_eq!(res.status(), 405);
    assert_eq!(res.text().unwrap(), "405 : Method POST not allowed");

    let res = client.delete(server.url("/missing")).send().unwrap();
    assert_eq!(res.status(), 405);
}

#[test]
fn test_directories_disabled() {
    let server = TestServer::new(|b| b);
    let res = client().get(server.url("/subdir/")).send().unwrap();
    assert_eq!(res.status(), 400);
    assert_eq!(
        res.text().unwrap(),
        "400 : Server not configured to serve directories"
    );
}

#[test]
fn test_autoindex() {
    let server = TestServer::new(|b| b.autoindex(true));
    let client = client();

    for path in ["/site", "/site/"] {
        let res = client.get(server.url(path)).send().unwrap();
        assert_eq!(res.status(), 200, "{path}");
        assert_eq!(res.headers()["content-type"], "text/html");
        assert_eq!(res.text().unwrap(), "<p>site</p>");
    }

    // no index.html and listings off
    let res = client.get(server.url("/subdir")).send().unwrap();
    assert_eq!(res.status(), 400);
}

#[test]
fn test_base_url_mount() {
    let server = TestServer::new(|b| b.base_url("/assets/").serve_directories(true));
    let client = client();

    let res = client.get(server.url("/assets/test.txt")).send().unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().unwrap(), "hello world\n");

    let res = client.get(server.url("/test.txt")).send().unwrap();
    assert_eq!(res.status(), 404);

    let res = client.get(server.url("/assetsx/test.txt")).send().unwrap();
    assert_eq!(res.status(), 404);

    let res = client.get(server.url("/assets/")).send().unwrap();
    assert_eq!(res.status(), 200);
    let body = res.text().unwrap();
    assert!(body.contains(r#"href="/assets/test.txt""#));
    assert!(body.contains(r#"href="/assets/subdir/""#));
}

#[test]
fn test_custom_headers_and_mime_overrides() {
    let server = TestServer::new(|b| {
        b.header("x-served-by", "static_sv")
            .mime_type("css", "text/x-special")
    });
    let res = client().get(server.url("/style.css")).send().unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-served-by"], "static_sv");
    assert_eq!(res.headers()["content-type"], "text/x-special");
    assert!(res.headers().contains_key("cache-control"));
}

#[test]
fn test_concurrent_requests() {
    let server = TestServer::new(|b| b);
    let url = server.url("/test.txt");

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let url = url.clone();
            thread::spawn(move || {
                let res = client().get(&url).send().unwrap();
                (res.status().as_u16(), res.text().unwrap())
            })
        })
        .collect();

    for handle in handles {
        let (status, body) = handle.join().unwrap();
        assert_eq!(status, 200);
        assert_eq!(body, "hello world\n");
    }
}
