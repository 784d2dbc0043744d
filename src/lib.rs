/*
 * SPDX-License-Identifier: GPL-3.0-or-later
 * More licensing information can be found in the project LICENSE file
 * Author: Harshit Jain
 * Email: reach@harsh1998.dev
 */
/// # Static Server
///
/// A small static-file HTTP server: maps GET requests onto files below a
/// root directory, streams them with a content type, and can render HTML
/// directory listings.
///
/// The `run` function validates the configuration, installs the logger and
/// starts the server.
pub mod cli;
pub mod config;
pub mod error;
pub mod fs;
pub mod http;
pub mod logging;
pub mod resolver;
pub mod response;
pub mod server;
pub mod templates;
pub mod utils;


use crate::cli::Cli;
use clap::Parser;
use log::error;

/// Parses the command line, builds the configuration, sets up logging and
/// runs the server. Configuration errors stop the process before anything
/// is bound.
pub fn run() {
    let cli = Cli::parse();

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    if let Err(e) = logging::init_logging(&config) {
        eprintln!("{e}");
        std::process::exit(2);
    }

    if let Err(e) = server::run_server(config, None, None) {
        error!("Server error: {e}");
        std::process::exit(1);
    }
}
