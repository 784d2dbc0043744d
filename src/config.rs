/*
 * SPDX-License-Identifier: GPL-3.0-or-later
 * More licensing information can be found in the project LICENSE file
 * Author: Harshit Jain
 * Email: reach@harsh1998.dev
 */
//! Validated server configuration.
//!
//! `Config` is immutable once built. The only way to obtain one is
//! `ConfigBuilder::build`, which runs every value-level check (port range,
//! mutually exclusive directory modes, header sanity) and normalizes the
//! root, log file and base URL.

use crate::error::AppError;
use crate::utils::{normalize_base_url, normalize_path, path_to_slash_string};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_THREADS: usize = 8;
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    root: String,
    host: String,
    port: u16,
    base_url: String,
    autoindex: bool,
    serve_directories: bool,
    headers: BTreeMap<String, String>,
    mime_types: HashMap<String, String>,
    log_file: Option<PathBuf>,
    verbose: bool,
    quiet: bool,
    threads: usize,
    chunk_size: usize,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Absolute root directory, forward slashes, no trailing slash.
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Mount point without leading or trailing slash; empty means `/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn autoindex(&self) -> bool {
        self.autoindex
    }

    pub fn serve_directories(&self) -> bool {
        self.serve_directories
    }

    /// Headers written on every response.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Extension (without the dot) to content-type overrides.
    pub fn mime_types(&self) -> &HashMap<String, String> {
        &self.mime_types
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn quiet(&self) -> bool {
        self.quiet
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

/// Shape of the optional JSON configuration file. Every key is optional;
/// unknown keys and mistyped values are rejected by serde.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub root: Option<String>,
    pub host: Option<String>,
    pub port: Option<i64>,
    pub base_url: Option<String>,
    pub autoindex: Option<bool>,
    pub serve_directories: Option<bool>,
    pub headers: Option<BTreeMap<String, String>>,
    pub mime_types: Option<HashMap<String, String>>,
    pub log_file: Option<String>,
    pub verbose: Option<bool>,
    pub quiet: Option<bool>,
    pub threads: Option<usize>,
    pub chunk_size: Option<usize>,
}

impl FileConfig {
    pub fn parse(json: &str) -> Result<Self, AppError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let json = fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("cannot read config file {}: {e}", path.display()))
        })?;
        serde_json::from_str(&json)
            .map_err(|e| AppError::Config(format!("{}: {e}", path.display())))
    }
}

/// Collects raw option values on top of the documented defaults.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    root: String,
    host: String,
    port: i64,
    base_url: String,
    autoindex: bool,
    serve_directories: bool,
    headers: BTreeMap<String, String>,
    mime_types: HashMap<String, String>,
    log_file: Option<String>,
    verbose: bool,
    quiet: bool,
    threads: usize,
    chunk_size: usize,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(
            "cache-control".to_string(),
            "public, max-age=604800, immutable".to_string(),
        );
        Self {
            root: ".".to_string(),
            host: "127.0.0.1".to_string(),
            port: i64::from(DEFAULT_PORT),
            base_url: String::new(),
            autoindex: false,
            serve_directories: false,
            headers,
            mime_types: HashMap::new(),
            log_file: None,
            verbose: false,
            quiet: false,
            threads: DEFAULT_THREADS,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ConfigBuilder {
    pub fn root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: i64) -> Self {
        self.port = port;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn autoindex(mut self, enabled: bool) -> Self {
        self.autoindex = enabled;
        self
    }

    pub fn serve_directories(mut self, enabled: bool) -> Self {
        self.serve_directories = enabled;
        self
    }

    /// Replaces the whole default header map.
    pub fn headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Adds or overrides a single default header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn mime_type(mut self, extension: impl Into<String>, content_type: impl Into<String>) -> Self {
        self.mime_types.insert(extension.into(), content_type.into());
        self
    }

    pub fn log_file(mut self, path: impl Into<String>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn verbose(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self
    }

    pub fn quiet(mut self, enabled: bool) -> Self {
        self.quiet = enabled;
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Merges every key present in the file onto the current values.
    pub fn merge_file(mut self, file: FileConfig) -> Self {
        if let Some(root) = file.root {
            self.root = root;
        }
        if let Some(host) = file.host {
            self.host = host;
        }
        if let Some(port) = file.port {
            self.port = port;
        }
        if let Some(base_url) = file.base_url {
            self.base_url = base_url;
        }
        if let Some(autoindex) = file.autoindex {
            self.autoindex = autoindex;
        }
        if let Some(serve_directories) = file.serve_directories {
            self.serve_directories = serve_directories;
        }
        if let Some(headers) = file.headers {
            self.headers = headers;
        }
        if let Some(mime_types) = file.mime_types {
            self.mime_types.extend(mime_types);
        }
        if let Some(log_file) = file.log_file {
            self.log_file = Some(log_file);
        }
        if let Some(verbose) = file.verbose {
            self.verbose = verbose;
        }
        if let Some(quiet) = file.quiet {
            self.quiet = quiet;
        }
        if let Some(threads) = file.threads {
            self.threads = threads;
        }
        if let Some(chunk_size) = file.chunk_size {
            self.chunk_size = chunk_size;
        }
        self
    }

    pub fn build(self) -> Result<Config, AppError> {
        if self.root.trim().is_empty() {
            return Err(AppError::Config("root must not be empty".to_string()));
        }
        let root = absolute_slash_path(&self.root)?;

        let log_file = match self.log_file {
            Some(path) if path.trim().is_empty() => {
                return Err(AppError::Config("log file path must not be empty".to_string()))
            }
            Some(path) => Some(PathBuf::from(absolute_slash_path(&path)?)),
            None => None,
        };

        if !(1..=65535).contains(&self.port) {
            return Err(AppError::Config(format!(
                "port must be between 1 and 65535, got {}",
                self.port
            )));
        }
        let port = self.port as u16;

        if self.autoindex && self.serve_directories {
            return Err(AppError::Config(
                "autoindex and serve-directories cannot both be enabled".to_string(),
            ));
        }

        if self.host.trim().is_empty() {
            return Err(AppError::Config("listen host must not be empty".to_string()));
        }

        for (name, value) in &self.headers {
            validate_header(name, value)?;
        }

        let mut mime_types = HashMap::with_capacity(self.mime_types.len());
        for (extension, content_type) in self.mime_types {
            let extension = extension.trim_start_matches('.').to_ascii_lowercase();
            if extension.is_empty() {
                return Err(AppError::Config("MIME override with empty extension".to_string()));
            }
            if content_type.is_empty() || has_line_break(&content_type) {
                return Err(AppError::Config(format!(
                    "invalid content type for extension '{extension}'"
                )));
            }
            mime_types.insert(extension, content_type);
        }

        if self.threads == 0 {
            return Err(AppError::Config("threads must be at least 1".to_string()));
        }
        if self.chunk_size == 0 {
            return Err(AppError::Config("chunk size must be at least 1".to_string()));
        }

        Ok(Config {
            root,
            host: self.host,
            port,
            base_url: normalize_base_url(&self.base_url),
            autoindex: self.autoindex,
            serve_directories: self.serve_directories,
            headers: self.headers,
            mime_types,
            log_file,
            verbose: self.verbose,
            quiet: self.quiet,
            threads: self.threads,
            chunk_size: self.chunk_size,
        })
    }
}

fn absolute_slash_path(raw: &str) -> Result<String, AppError> {
    let path = Path::new(raw);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| AppError::Config(format!("cannot resolve '{raw}': {e}")))?
            .join(path)
    };
    Ok(path_to_slash_string(&normalize_path(&absolute)))
}

fn has_line_break(value: &str) -> bool {
    value.contains(['\r', '\n'])
}

const FRAMING_HEADERS: [&str; 2] = ["content-length", "transfer-encoding"];

fn validate_header(name: &str, value: &str) -> Result<(), AppError> {
    let bad_name = name.is_empty()
        || name
            .chars()
            .any(|c| c.is_whitespace() || c == ':' || c.is_control());
    if bad_name {
        return Err(AppError::Config(format!("invalid header name '{name}'")));
    }
    // Body framing headers are owned by the response writer.
    if FRAMING_HEADERS
        .iter()
        .any(|framing| name.eq_ignore_ascii_case(framing))
    {
        return Err(AppError::Config(format!(
            "header '{name}' is set by the server and cannot be configured"
        )));
    }
    if has_line_break(value) {
        return Err(AppError::Config(format!("invalid value for header '{name}'")));
    }
    Ok(())
}
