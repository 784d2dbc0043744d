/*
 * SPDX-License-Identifier: GPL-3.0-or-later
 * More licensing information can be found in the project LICENSE file
 * Author: Harshit Jain
 * Email: reach@harsh1998.dev
 */
//! Turns a request target into a path relative to the served root and the
//! matching absolute filesystem path.

use crate::config::Config;
use crate::error::AppError;
use crate::utils::{collapse_slashes, decode_url, strip_query};
use log::debug;
use std::path::Path;

pub const INDEX_FILE: &str = "index.html";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Path below the root: decoded, base URL removed, no leading or
    /// trailing slash. Empty for the root itself.
    pub relative: String,
    /// Root joined with `relative` by a single slash.
    pub absolute: String,
    /// Set when autoindex replaced a directory with its `index.html`.
    pub index_substituted: bool,
}

/// Strips the mount point from an already decoded, slash-collapsed path.
/// The base URL only matches on a segment boundary.
fn strip_base_url<'a>(path: &'a str, base_url: &str) -> &'a str {
    let path = path.trim_start_matches('/');
    if base_url.is_empty() {
        return path;
    }
    match path.strip_prefix(base_url) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => path,
    }
}

/// Joins the root and a relative path. A root of `/` would produce a
/// leading `//`, which is collapsed back to one slash.
pub fn join_root(root: &str, relative: &str) -> String {
    if relative.is_empty() {
        return root.to_string();
    }
    let joined = format!("{root}/{relative}");
    match joined.strip_prefix("//") {
        Some(rest) => format!("/{rest}"),
        None => joined,
    }
}

/// Resolves the request `target` against `config` without touching the
/// filesystem, except for the autoindex probe. Targets with a `..` segment
/// are refused as not found.
pub fn resolve(target: &str, config: &Config) -> Result<ResolvedPath, AppError> {
    let decoded = decode_url(strip_query(target));
    let collapsed = collapse_slashes(&decoded);
    let relative = strip_base_url(&collapsed, config.base_url())
        .trim_matches('/')
        .to_string();

    if relative.split('/').any(|segment| segment == "..") {
        return Err(AppError::NotFound(target.to_string()));
    }

    let absolute = join_root(config.root(), &relative);

    // `is_file` swallows permission errors, so an unreadable directory just
    // means no substitution.
    if config.autoindex() && Path::new(&absolute).join(INDEX_FILE).is_file() {
        debug!("Substituting {INDEX_FILE} for '{absolute}'");
        let relative = if relative.is_empty() {
            INDEX_FILE.to_string()
        } else {
            format!("{relative}/{INDEX_FILE}")
        };
        let absolute = join_root(config.root(), &relative);
        return Ok(ResolvedPath {
            relative,
            absolute,
            index_substituted: true,
        });
    }

    Ok(ResolvedPath {
        relative,
        absolute,
        index_substituted: false,
    })
}
