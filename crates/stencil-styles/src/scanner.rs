//! Discovery of stylesheets referenced by theme templates.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Templates reference compiled stylesheets with the Handlebars helper
//! `{{stylesheet '/assets/css/theme.css'}}`. The scanner walks a theme's
//! `templates/` directory, collects those references and maps each to the
//! SCSS entry that produces it:
//!
//! - `/css/` and `/scss/` directories and `.css` and `.scss` extensions are
//!   tried interchangeably
//! - references resolving to an existing compiled `.css` file are dropped
//! - files directly under the stylesheet root (`/assets/scss/theme.scss`)
//!   are reported by stem (`theme`); deeper files by their path below the root
//!   (`sub/theme.scss`)
//!
//! References inside HTML or Handlebars comments are ignored.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::ScanError;
use crate::runtime::StylesRuntime;

static STYLESHEET_HELPER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\{\{\s*stylesheet\s*([/a-zA-Z'"\.-]+)\s*"#).unwrap());

static HTML_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

static HANDLEBARS_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{\{!--.*?--\}\}|\{\{![^}]*\}\}").unwrap());

const TEMPLATES_DIR: &str = "templates";
const SKIPPED_DIRS: &[&str] = &["vendor", "node_modules"];

/// Root-level locations have at most this many `/`-separated parts
/// (`/assets/scss/theme.scss`).
const ROOT_LOCATION_PARTS: usize = 4;

/// Stylesheet identifiers referenced by the templates of `theme_root`, in
/// first-seen order without duplicates.
///
/// Templates are listed and read through `runtime`, as are the existence
/// checks that map references to stylesheet files.
pub fn scan_stylesheets(
    theme_root: &Path,
    runtime: &dyn StylesRuntime,
) -> Result<Vec<String>, ScanError> {
    let templates = theme_root.join(TEMPLATES_DIR);
    if !runtime.is_dir(&templates).unwrap_or(false) {
        return Err(ScanError::MissingTemplates(templates));
    }

    let mut files = Vec::new();
    collect_templates(runtime, &templates, &mut files)?;

    let mut identifiers: Vec<String> = Vec::new();
    for file in files {
        let content = runtime
            .file_read_string(&file)
            .map_err(|source| ScanError::Read {
                path: file.clone(),
                source,
            })?;

        for reference in stylesheet_references(&content) {
            let Some(identifier) = resolve_location(theme_root, &reference, runtime) else {
                continue;
            };
            if !identifiers.contains(&identifier) {
                debug!(template = %file.display(), identifier, "Found stylesheet reference");
                identifiers.push(identifier);
            }
        }
    }

    Ok(identifiers)
}

/// Depth-first listing of template files, siblings sorted by name.
fn collect_templates(
    runtime: &dyn StylesRuntime,
    dir: &Path,
    files: &mut Vec<PathBuf>,
) -> Result<(), ScanError> {
    let list_error = |source| ScanError::List {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = runtime.dir_list(dir).map_err(list_error)?;
    entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    for entry in entries {
        if runtime.is_dir(&entry).map_err(list_error)? {
            if !is_skipped_dir(&entry) {
                collect_templates(runtime, &entry, files)?;
            }
        } else {
            files.push(entry);
        }
    }
    Ok(())
}

fn is_skipped_dir(dir: &Path) -> bool {
    dir.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

/// Paths named by `{{stylesheet ...}}` helpers outside comments.
pub fn stylesheet_references(template: &str) -> Vec<String> {
    let without_html = HTML_COMMENT.replace_all(template, "");
    let text = HANDLEBARS_COMMENT.replace_all(&without_html, "");

    STYLESHEET_HELPER
        .captures_iter(&text)
        .filter_map(|caps| caps.get(1))
        .map(|m| strip_quotes(m.as_str()).to_string())
        .collect()
}

fn strip_quotes(raw: &str) -> &str {
    let raw = raw.strip_prefix(['\'', '"']).unwrap_or(raw);
    raw.strip_suffix(['\'', '"']).unwrap_or(raw)
}

/// Map a template reference to a stylesheet identifier.
///
/// Returns `None` for compiled CSS and for references that match no file.
pub fn resolve_location(
    theme_root: &Path,
    reference: &str,
    runtime: &dyn StylesRuntime,
) -> Option<String> {
    let to_scss = reference.replacen("/css/", "/scss/", 1);
    let to_css = reference.replacen("/scss/", "/css/", 1);
    let candidates = [
        reference.to_string(),
        to_scss.clone(),
        to_css.clone(),
        to_scss.replacen(".css", ".scss", 1),
        to_css.replacen(".scss", ".css", 1),
    ];

    for location in &candidates {
        let full_path = theme_root.join(location.trim_start_matches('/'));
        if !runtime.path_exists(&full_path, None).unwrap_or(false) {
            continue;
        }
        if location.ends_with(".css") {
            return None;
        }
        if location.split('/').count() <= ROOT_LOCATION_PARTS {
            return full_path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(str::to_string);
        }
        return Some(without_root_folders(location));
    }

    warn!(reference, "Couldn't validate scss compilation for this file path");
    None
}

/// Drop the two stylesheet root folders (`assets/scss`) from a location.
fn without_root_folders(location: &str) -> String {
    location
        .trim_start_matches('/')
        .splitn(3, '/')
        .nth(2)
        .unwrap_or_default()
        .to_string()
}
