/*
 * SPDX-License-Identifier: GPL-3.0-or-later
 * More licensing information can be found in the project LICENSE file
 * Author: Harshit Jain
 * Email: reach@harsh1998.dev
 */
use crate::error::AppError;
use crate::templates::TemplateEngine;
use chrono::{DateTime, Local};
use log::debug;
use std::fs::{self, Metadata};
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// One child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirEntryInfo {
    File {
        name: String,
        size: u64,
        created: Option<SystemTime>,
    },
    /// `children` is `None` when the subdirectory could not be read.
    Directory {
        name: String,
        children: Option<usize>,
        created: Option<SystemTime>,
    },
    /// Sockets, devices, fifos, broken symlinks.
    Other { name: String },
}

impl DirEntryInfo {
    pub fn name(&self) -> &str {
        match self {
            DirEntryInfo::File { name, .. }
            | DirEntryInfo::Directory { name, .. }
            | DirEntryInfo::Other { name } => name,
        }
    }

    /// Classifies a directory child. Symlinks are followed; anything whose
    /// metadata is unreadable ends up as `Other`.
    pub fn classify(path: &Path, name: String) -> Self {
        match fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => DirEntryInfo::File {
                name,
                size: metadata.len(),
                created: created_time(&metadata),
            },
            Ok(metadata) if metadata.is_dir() => DirEntryInfo::Directory {
                name,
                children: count_children(path),
                created: created_time(&metadata),
            },
            _ => DirEntryInfo::Other { name },
        }
    }
}

fn created_time(metadata: &Metadata) -> Option<SystemTime> {
    metadata.created().or_else(|_| metadata.modified()).ok()
}

fn count_children(path: &Path) -> Option<usize> {
    match fs::read_dir(path) {
        Ok(entries) => Some(entries.count()),
        Err(e) => {
            debug!("Cannot list '{}': {e}", path.display());
            None
        }
    }
}

/// Reads the immediate children of `path`: directories first, then files,
/// then everything else. Each group is sorted by name.
pub fn read_listing(path: &Path) -> io::Result<Vec<DirEntryInfo>> {
    let mut directories = Vec::new();
    let mut files = Vec::new();
    let mut others = Vec::new();

    for entry in fs::read_dir(path)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry in '{}': {e}", path.display());
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        match DirEntryInfo::classify(&entry.path(), name) {
            info @ DirEntryInfo::Directory { .. } => directories.push(info),
            info @ DirEntryInfo::File { .. } => files.push(info),
            info @ DirEntryInfo::Other { .. } => others.push(info),
        }
    }

    for group in [&mut directories, &mut files, &mut others] {
        group.sort_by(|a, b| a.name().cmp(b.name()));
    }

    directories.extend(files);
    directories.extend(others);
    Ok(directories)
}

/// Lists `path` and renders the HTML page for it.
pub fn generate_directory_listing(
    path: &Path,
    relative: &str,
    base_url: &str,
) -> Result<String, AppError> {
    debug!("Generating directory listing for: '{}'", path.display());
    let entries = read_listing(path)?;
    TemplateEngine::new().render_directory_listing(relative, base_url, &entries)
}

/// Format file size with binary units: `512 B`, `2.00 K`, `1.00 M`, `1.00 G`.
pub fn format_file_size(size: u64) -> String {
    const UNITS: &[&str] = &["K", "M", "G"];
    const THRESHOLD: f64 = 1024.0;

    if size < 1024 {
        return format!("{size} B");
    }

    let mut size_f = size as f64 / THRESHOLD;
    let mut unit_index = 0;
    while size_f >= THRESHOLD && unit_index < UNITS.len() - 1 {
        size_f /= THRESHOLD;
        unit_index += 1;
    }
    format!("{:.2} {}", size_f, UNITS[unit_index])
}

/// Local-time rendering of an entry timestamp, `-` when unknown.
pub fn format_timestamp(time: Option<SystemTime>) -> String {
    match time {
        Some(time) => DateTime::<Local>::from(time)
            .format("%d-%m-%Y %H:%M:%S")
            .to_string(),
        None => "-".to_string(),
    }
}
