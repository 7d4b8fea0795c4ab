//! Dependency closure assembly.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Walks the `@import` graph of one or more entry stylesheets on disk and
//! collects every reachable file into a [`FileSet`]. This is the only part of
//! the crate that reads stylesheets from storage; compilation later resolves
//! imports against the collected set.
//!
//! Traversal is depth-first in import-statement order, so the same tree always
//! yields the same set in the same order.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::AssembleError;
use crate::imports::scan_imports;
use crate::path::{self, Candidate, LogicalPath, Lookup, ROOT_MARKER};
use crate::runtime::StylesRuntime;
use crate::types::FileSet;

/// What [`assemble`] returns besides the file set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssembleMode {
    /// Every reachable file keyed by logical path
    #[default]
    Map,
    /// The map plus one concatenated source: entries first, then partials
    Bundle,
}

/// Result of a closure walk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assembly {
    /// Logical paths of the entry stylesheets, de-duplicated, in request order.
    pub entries: Vec<LogicalPath>,
    pub files: FileSet,
    /// Present in [`AssembleMode::Bundle`] only.
    pub bundle: Option<String>,
}

/// Collect the transitive import closure of `entries` under `root`.
///
/// Entries are logical paths relative to `root` and follow the same
/// resolution rules as imports (`theme` finds `theme.scss`). Any missing or
/// unreadable file fails the whole call.
///
/// # Example
///
/// ```rust,ignore
/// use stencil_styles::{assemble, AssembleMode, NativeRuntime};
///
/// let assembly = assemble(&["theme"], root, AssembleMode::Map, &NativeRuntime::new())?;
/// for (path, source) in &assembly.files {
///     println!("{path}: {} bytes", source.len());
/// }
/// ```
pub fn assemble<S: AsRef<str>>(
    entries: &[S],
    root: &Path,
    mode: AssembleMode,
    runtime: &dyn StylesRuntime,
) -> Result<Assembly, AssembleError> {
    let mut walker = Walker {
        root,
        runtime,
        files: FileSet::new(),
    };
    let mut entry_keys: Vec<LogicalPath> = Vec::new();

    for entry in entries {
        let entry = entry.as_ref();
        let candidate = match path::resolve(entry, ROOT_MARKER).lookup(|p| walker.exists(p)) {
            Lookup::Found(candidate) => candidate,
            Lookup::Excluded(path) => {
                debug!(entry, path = %path, "Skipping compiled entry stylesheet");
                continue;
            }
            Lookup::NotFound(attempted) => {
                return Err(AssembleError::EntryNotFound {
                    entry: entry.to_string(),
                    attempted,
                });
            }
        };
        if !entry_keys.contains(&candidate.key) {
            entry_keys.push(candidate.key.clone());
        }
        walker.visit(candidate)?;
    }

    let files = walker.files;
    let bundle = match mode {
        AssembleMode::Map => None,
        AssembleMode::Bundle => Some(bundle(&entry_keys, &files)),
    };

    debug!(
        entries = entry_keys.len(),
        files = files.len(),
        root = %root.display(),
        "Assembled stylesheet closure"
    );

    Ok(Assembly {
        entries: entry_keys,
        files,
        bundle,
    })
}

/// Concatenate entry sources followed by every other file, newline separated.
fn bundle(entries: &[LogicalPath], files: &FileSet) -> String {
    let entry_sources = entries.iter().filter_map(|key| files.get(key));
    let partials = files
        .iter()
        .filter(|(key, _)| !entries.contains(key))
        .map(|(_, source)| source);

    entry_sources
        .chain(partials)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n")
}

struct Walker<'a> {
    root: &'a Path,
    runtime: &'a dyn StylesRuntime,
    files: FileSet,
}

impl Walker<'_> {
    fn disk_path(&self, logical: &str) -> PathBuf {
        self.root.join(logical.trim_start_matches('/'))
    }

    fn exists(&self, logical: &str) -> bool {
        // Stat failures count as present so the read reports the underlying error.
        self.runtime
            .is_file(&self.disk_path(logical))
            .unwrap_or(true)
    }

    fn visit(&mut self, candidate: Candidate) -> Result<(), AssembleError> {
        if self.files.contains_key(&candidate.key) {
            return Ok(());
        }

        let disk_path = self.disk_path(&candidate.path);
        let source = self
            .runtime
            .file_read_string(&disk_path)
            .map_err(|source| AssembleError::Read {
                path: disk_path.clone(),
                source,
            })?;

        let statements = scan_imports(&source);
        debug!(path = %candidate.key, imports = statements.len(), "Read stylesheet");
        // Inserted before recursing: an import cycle finds the key and stops.
        self.files.insert(candidate.key.clone(), source);

        for statement in &statements {
            for specifier in statement.specifiers() {
                let lookup = path::resolve(specifier, &candidate.key).lookup(|p| self.exists(p));
                match lookup {
                    Lookup::Found(next) => self.visit(next)?,
                    Lookup::Excluded(path) => {
                        debug!(importer = %candidate.key, path = %path, "Skipping compiled CSS import");
                    }
                    Lookup::NotFound(attempted) => {
                        return Err(AssembleError::ImportNotFound {
                            specifier: specifier.to_string(),
                            importer: candidate.key.clone(),
                            attempted,
                        });
                    }
                }
            }
        }

        Ok(())
    }
}
