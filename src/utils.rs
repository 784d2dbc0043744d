/*
 * SPDX-License-Identifier: GPL-3.0-or-later
 * More licensing information can be found in the project LICENSE file
 * Author: Harshit Jain
 * Email: reach@harsh1998.dev
 */
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::path::{Component, Path, PathBuf};

// Characters that must not appear raw inside a single URL path segment. 🌐
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-decodes a request URL. Malformed escapes (`%` not followed by two
/// hex digits) or invalid UTF-8 make the whole decode fail, in which case the
/// raw URL is returned untouched.
pub fn decode_url(url: &str) -> String {
    if has_malformed_escape(url) {
        return url.to_string();
    }
    percent_decode_str(url)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| url.to_string())
}

fn has_malformed_escape(url: &str) -> bool {
    let bytes = url.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return true;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    false
}

/// Drops the query string and fragment from a request target.
pub fn strip_query(target: &str) -> &str {
    target
        .split(['?', '#'])
        .next()
        .unwrap_or(target)
}

// Replaces every run of two or more slashes with a single one.
pub fn collapse_slashes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut previous_slash = false;
    for c in input.chars() {
        if c == '/' {
            if !previous_slash {
                out.push(c);
            }
            previous_slash = true;
        } else {
            out.push(c);
            previous_slash = false;
        }
    }
    out
}

/// Collapses repeated slashes and strips the leading and trailing slash.
pub fn normalize_base_url(base_url: &str) -> String {
    collapse_slashes(base_url).trim_matches('/').to_string()
}

/// True when `target` lies under the mount point `/<base_url>`. The prefix
/// only matches on a segment boundary, so `/static` mounts `/static/x` but
/// not `/staticfoo`.
pub fn within_base_url(target: &str, base_url: &str) -> bool {
    if base_url.is_empty() {
        return target.starts_with('/');
    }
    let path = strip_query(target);
    match path.strip_prefix('/').and_then(|rest| rest.strip_prefix(base_url)) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Builds an absolute href from the base URL and relative path segments,
/// percent-encoding each segment.
pub fn href_for<'a, I>(base_url: &str, segments: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut encoded = Vec::new();
    for segment in base_url.split('/') {
        if !segment.is_empty() {
            encoded.push(utf8_percent_encode(segment, SEGMENT).to_string());
        }
    }
    for segment in segments {
        if !segment.is_empty() {
            encoded.push(utf8_percent_encode(segment, SEGMENT).to_string());
        }
    }
    format!("/{}", encoded.join("/"))
}

/// Lexically normalizes a path (no filesystem access): `.` is dropped and
/// `..` pops the previous component.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                normalized.push(component.as_os_str())
            }
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
        }
    }
    normalized
}

/// Renders a path with forward slashes and without a trailing slash (the
/// filesystem root keeps its single slash).
pub fn path_to_slash_string(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    let trimmed = raw.trim_end_matches('/');
    if trimmed.is_empty() || trimmed.ends_with(':') {
        format!("{trimmed}/")
    } else {
        trimmed.to_string()
    }
}
