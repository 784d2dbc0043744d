/*
 * SPDX-License-Identifier: GPL-3.0-or-later
 * More licensing information can be found in the project LICENSE file
 * Author: Harshit Jain
 * Email: reach@harsh1998.dev
 */
use crate::config::{Config, FileConfig};
use crate::error::AppError;
use clap::Parser;
use std::path::PathBuf;

// Defines the command-line interface using clap. 🎉
// Every option is optional here so that a flag left out does not clobber the
// value coming from the config file.
#[derive(Parser, Debug, Default)]
#[command(
    author = "Harshit Jain",
    version,
    about = "A small static file server with optional directory listings.",
    long_about = "Serves files below a root directory over HTTP.\n Only GET is accepted; other methods get 405.\n With --autoindex a directory containing index.html serves that file.\n With --serve-directories a directory without index gets an HTML listing.\n The two modes are mutually exclusive.\n Options can also come from a JSON file passed with --config; flags win over the file.\n"
)]
pub struct Cli {
    /// Root directory to serve. 📂
    #[arg(short, long)]
    pub directory: Option<String>,

    /// Host address to listen on (e.g., "127.0.0.1" or "0.0.0.0"). 👂
    #[arg(short, long)]
    pub listen: Option<String>,

    /// Port number to listen on (1-65535). 🚪
    #[arg(short, long)]
    pub port: Option<u16>,

    /// URL prefix everything is served under, e.g. "static".
    #[arg(short, long)]
    pub base_url: Option<String>,

    /// Serve index.html when a directory containing one is requested.
    #[arg(short, long, default_value_t = false)]
    pub autoindex: bool,

    /// Render an HTML listing for directories.
    #[arg(short, long, default_value_t = false)]
    pub serve_directories: bool,

    /// Extra response header, "name: value". Repeatable.
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Content-type override, "ext=type". Repeatable.
    #[arg(short, long = "mime", value_parser = parse_mime)]
    pub mime_types: Vec<(String, String)>,

    /// Mirror log lines into this file (appended).
    #[arg(long)]
    pub log_file: Option<String>,

    /// Enable verbose logging (log level: debug). 🐛
    #[arg(short, long, default_value_t = false, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors.
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    /// Number of threads in the thread pool. 🧵
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Chunk size for streaming files (in bytes). 📦
    #[arg(short, long)]
    pub chunk_size: Option<usize>,

    /// JSON configuration file; command-line flags override its values.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected \"name: value\", got '{raw}'"))?;
    Ok((name.trim().to_string(), value.trim().to_string()))
}

fn parse_mime(raw: &str) -> Result<(String, String), String> {
    let (extension, content_type) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected \"ext=type\", got '{raw}'"))?;
    Ok((extension.trim().to_string(), content_type.trim().to_string()))
}

impl Cli {
    /// Defaults, then the config file, then the flags given on the command
    /// line, validated into a `Config`.
    pub fn into_config(self) -> Result<Config, AppError> {
        let mut builder = Config::builder();

        if let Some(path) = &self.config {
            builder = builder.merge_file(FileConfig::load(path)?);
        }
        if let Some(directory) = self.directory {
            builder = builder.root(directory);
        }
        if let Some(listen) = self.listen {
            builder = builder.host(listen);
        }
        if let Some(port) = self.port {
            builder = builder.port(i64::from(port));
        }
        if let Some(base_url) = self.base_url {
            builder = builder.base_url(base_url);
        }
        if self.autoindex {
            builder = builder.autoindex(true);
        }
        if self.serve_directories {
            builder = builder.serve_directories(true);
        }
        for (name, value) in self.headers {
            builder = builder.header(name, value);
        }
        for (extension, content_type) in self.mime_types {
            builder = builder.mime_type(extension, content_type);
        }
        if let Some(log_file) = self.log_file {
            builder = builder.log_file(log_file);
        }
        if self.verbose {
            builder = builder.verbose(true).quiet(false);
        }
        if self.quiet {
            builder = builder.quiet(true).verbose(false);
        }
        if let Some(threads) = self.threads {
            builder = builder.threads(threads);
        }
        if let Some(chunk_size) = self.chunk_size {
            builder = builder.chunk_size(chunk_size);
        }

        builder.build()
    }
}
