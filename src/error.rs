/*
 * SPDX-License-Identifier: GPL-3.0-or-later
 * More licensing information can be found in the project LICENSE file
 * Author: Harshit Jain
 * Email: reach@harsh1998.dev
 */
use std::fmt;
use std::io::ErrorKind;

#[derive(Debug)]
pub enum AppError {
    Io(std::io::Error),
    Config(String),
    DirectoryNotFound(String),
    NotFound(String),
    UnsupportedItem(String),
    MethodNotAllowed(String),
    BadRequest(String),
    Template(String),
}

impl AppError {
    /// Maps a failed `stat`/`open` onto the per-request taxonomy: a missing
    /// path is a 404, anything else stays an I/O error (500).
    pub fn from_stat(err: std::io::Error, url: &str) -> Self {
        if err.kind() == ErrorKind::NotFound {
            AppError::NotFound(url.to_string())
        } else {
            AppError::Io(err)
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            AppError::NotFound(_) | AppError::DirectoryNotFound(_) => 404,
            AppError::UnsupportedItem(_) | AppError::BadRequest(_) => 400,
            AppError::MethodNotAllowed(_) => 405,
            AppError::Io(_) | AppError::Config(_) | AppError::Template(_) => 500,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Io(err) => write!(f, "{err}"),
            AppError::Config(msg) => write!(f, "Invalid configuration: {msg}"),
            AppError::DirectoryNotFound(path) => write!(f, "Directory not found: {path}"),
            AppError::NotFound(url) => write!(f, "File or directory not found: {url}"),
            AppError::UnsupportedItem(msg) => write!(f, "{msg}"),
            AppError::MethodNotAllowed(method) => write!(f, "Method {method} not allowed"),
            AppError::BadRequest(msg) => write!(f, "{msg}"),
            AppError::Template(msg) => write!(f, "Template error: {msg}"),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Io(err) => Some(err),
            _ => None,
        }
    }
}
