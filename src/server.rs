/*
 * SPDX-License-Identifier: GPL-3.0-or-later
 * More licensing information can be found in the project LICENSE file
 * Author: Harshit Jain
 * Email: reach@harsh1998.dev
 */
use crate::config::Config;
use crate::error::AppError;
use crate::http::handle_client;
use log::{debug, error, info, warn};
use std::fs;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;
use threadpool::ThreadPool;

/// Source of request ids: unique and strictly increasing, starting at 1.
#[derive(Debug, Default)]
pub struct RequestCounter {
    last: AtomicU64,
}

impl RequestCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Binds the configured address and serves until `shutdown_rx` fires.
pub fn run_server(
    config: Config,
    shutdown_rx: Option<mpsc::Receiver<()>>,
    addr_tx: Option<mpsc::Sender<SocketAddr>>,
) -> Result<(), AppError> {
    let listener = TcpListener::bind((config.host(), config.port()))?;
    serve(listener, config, shutdown_rx, addr_tx)
}

/// Serves requests from an already bound listener.
pub fn serve(
    listener: TcpListener,
    config: Config,
    shutdown_rx: Option<mpsc::Receiver<()>>,
    addr_tx: Option<mpsc::Sender<SocketAddr>>,
) -> Result<(), AppError> {
    ensure_root(&config)?;
    let local_addr = listener.local_addr()?;
    listener.set_nonblocking(true)?;

    if let Some(tx) = addr_tx {
        if tx.send(local_addr).is_err() {
            warn!("Nobody is waiting for the server address");
        }
    }

    info!(
        "Serving '{}' on http://{}/{} (autoindex: {}, serve directories: {})",
        config.root(),
        local_addr,
        config.base_url(),
        config.autoindex(),
        config.serve_directories()
    );

    let pool = ThreadPool::new(config.threads());
    let config = Arc::new(config);
    let counter = RequestCounter::new();

    'server_loop: loop {
        if let Some(ref rx) = shutdown_rx {
            if rx.try_recv().is_ok() {
                info!("Shutdown signal received. Shutting down gracefully.");
                break 'server_loop;
            }
        }

        match listener.accept() {
            Ok((stream, peer)) => {
                // Accepted sockets inherit non-blocking mode on some platforms.
                if let Err(e) = stream.set_nonblocking(false) {
                    error!("Cannot switch connection from {peer} to blocking mode: {e}");
                    continue;
                }
                let config = Arc::clone(&config);
                let request_id = counter.next();
                let peer = peer.to_string();

                pool.execute(move || {
                    debug!("[ReqID: {request_id}][Peer: {peer}] Handling client connection");
                    if let Err(e) = handle_client(stream, &config, request_id, &peer) {
                        warn!("[ReqID: {request_id}][Peer: {peer}] Request aborted: {e}");
                    }
                });
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(20));
                continue;
            }
            Err(e) => {
                error!("Error accepting connection: {e}");
            }
        }
    }

    pool.join();
    info!("Server shutting down gracefully.");
    Ok(())
}

fn ensure_root(config: &Config) -> Result<(), AppError> {
    match fs::metadata(config.root()) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        _ => Err(AppError::DirectoryNotFound(config.root().to_string())),
    }
}
