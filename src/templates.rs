/*
 * SPDX-License-Identifier: GPL-3.0-or-later
 * More licensing information can be found in the project LICENSE file
 * Author: Harshit Jain
 * Email: reach@harsh1998.dev
 */
//! Template loading and rendering for the directory listing page.

use crate::error::AppError;
use crate::fs::{format_file_size, format_timestamp, DirEntryInfo};
use crate::utils::href_for;
use html_escape::{encode_double_quoted_attribute, encode_text};
use rust_embed::RustEmbed;
use std::collections::HashMap;

#[derive(RustEmbed)]
#[folder = "templates/"]
struct Templates;

const DIRECTORY_INDEX: &str = "directory/index.html";
const DIRECTORY_STYLES: &str = "directory/styles.css";

/// Renders templates compiled into the binary.
pub struct TemplateEngine {
    templates: HashMap<String, String>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    /// Create an engine holding every embedded template.
    pub fn new() -> Self {
        let templates = Templates::iter()
            .filter_map(|name| {
                let file = Templates::get(&name)?;
                let content = String::from_utf8_lossy(&file.data).into_owned();
                Some((name.into_owned(), content))
            })
            .collect();
        Self { templates }
    }

    pub fn get(&self, name: &str) -> Result<&str, AppError> {
        self.templates
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| AppError::Template(format!("Template '{name}' not found")))
    }

    /// Render a template, substituting `{{NAME}}` placeholders in a single
    /// pass so substituted values are never re-scanned.
    pub fn render(
        &self,
        template_name: &str,
        variables: &HashMap<&str, String>,
    ) -> Result<String, AppError> {
        let template = self.get(template_name)?;
        let mut rendered = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            rendered.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find("}}") {
                Some(end) => {
                    let key = &after[..end];
                    match variables.get(key) {
                        Some(value) => rendered.push_str(value),
                        None => rendered.push_str(&rest[start..start + end + 4]),
                    }
                    rest = &after[end + 2..];
                }
                None => {
                    rendered.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        rendered.push_str(rest);
        Ok(rendered)
    }

    /// Generate the directory listing page for `relative` (path below the
    /// root) with the given entries, rendered in the order supplied.
    pub fn render_directory_listing(
        &self,
        relative: &str,
        base_url: &str,
        entries: &[DirEntryInfo],
    ) -> Result<String, AppError> {
        let segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();

        let display_path = format!("/{}", segments.join("/"));
        let mut variables = HashMap::new();
        variables.insert("TITLE", encode_text(&display_path).into_owned());
        variables.insert("STYLES", self.get(DIRECTORY_STYLES)?.to_string());
        variables.insert("BREADCRUMBS", breadcrumbs(base_url, &segments));
        variables.insert("ENTRY_COUNT", entries.len().to_string());

        let mut rows = String::new();
        if !segments.is_empty() {
            let parent = dir_href(base_url, &segments[..segments.len() - 1]);
            rows.push_str(&format!(
                r#"<tr class="parent"><td><a href="{}">..</a></td><td class="size">-</td><td class="date">-</td></tr>"#,
                encode_double_quoted_attribute(&parent)
            ));
            rows.push('\n');
        }
        for entry in entries {
            rows.push_str(&entry_row(base_url, &segments, entry));
            rows.push('\n');
        }
        variables.insert("ENTRIES", rows);

        self.render(DIRECTORY_INDEX, &variables)
    }
}

fn dir_href(base_url: &str, segments: &[&str]) -> String {
    let mut href = href_for(base_url, segments.iter().copied());
    if !href.ends_with('/') {
        href.push('/');
    }
    href
}

fn breadcrumbs(base_url: &str, segments: &[&str]) -> String {
    let mut html = format!(
        r#"<a href="{}">root</a>"#,
        encode_double_quoted_attribute(&dir_href(base_url, &[]))
    );
    for depth in 1..=segments.len() {
        html.push_str(r#"<span class="separator">/</span>"#);
        html.push_str(&format!(
            r#"<a href="{}">{}</a>"#,
            encode_double_quoted_attribute(&dir_href(base_url, &segments[..depth])),
            encode_text(segments[depth - 1])
        ));
    }
    html
}

fn entry_row(base_url: &str, segments: &[&str], entry: &DirEntryInfo) -> String {
    let name = entry.name();
    let link = |trailing: &str| {
        let href = href_for(base_url, segments.iter().copied().chain(std::iter::once(name)));
        format!(
            r#"<a href="{}{}">{}{}</a>"#,
            encode_double_quoted_attribute(&href),
            trailing,
            encode_text(name),
            trailing
        )
    };

    match entry {
        DirEntryInfo::Directory {
            children: Some(count),
            created,
            ..
        } => format!(
            r#"<tr class="directory"><td>{}</td><td class="size">{} items</td><td class="date">{}</td></tr>"#,
            link("/"),
            count,
            format_timestamp(*created)
        ),
        DirEntryInfo::Directory {
            children: None,
            created,
            ..
        } => format!(
            r#"<tr class="directory unavailable"><td><span>{}/</span></td><td class="size">unavailable</td><td class="date">{}</td></tr>"#,
            encode_text(name),
            format_timestamp(*created)
        ),
        DirEntryInfo::File { size, created, .. } => format!(
            r#"<tr class="file"><td>{}</td><td class="size">{}</td><td class="date">{}</td></tr>"#,
            link(""),
            format_file_size(*size),
            format_timestamp(*created)
        ),
        DirEntryInfo::Other { .. } => format!(
            r#"<tr class="other"><td><span>{}</span></td><td class="size">-</td><td class="date">-</td></tr>"#,
            encode_text(name)
        ),
    }
}
