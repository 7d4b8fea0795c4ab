//! Import resolution against an in-memory file set.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Backends never open files. Every `@import` they encounter is answered by
//! an [`Importer`], which for a compilation session is a [`VirtualImporter`]
//! over the session's [`FileSet`].

use std::cell::RefCell;

use tracing::trace;

use crate::error::ImportError;
use crate::path::{self, Candidate, LogicalPath, Lookup};
use crate::types::{AliasCache, FileSet};

/// A successfully resolved import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImport {
    /// Logical path of the file that was found
    pub path: LogicalPath,
    pub contents: String,
}

/// Import hook handed to compiler backends.
pub trait Importer {
    /// Resolve `specifier` as written in the file at `importing_path`.
    ///
    /// `importing_path` is [`path::ROOT_MARKER`] for the top-level source.
    fn resolve_import(
        &self,
        specifier: &str,
        importing_path: &str,
    ) -> Result<ResolvedImport, ImportError>;

    /// Contents of an exact logical path, without any resolution rules.
    fn load(&self, path: &str) -> Option<String>;

    /// Whether an exact logical path is available.
    fn exists(&self, path: &str) -> bool {
        self.load(path).is_some()
    }
}

/// [`Importer`] bound to one session's file set and alias cache.
///
/// Lookup first tries the importing file's own directory. When that misses,
/// files previously reached through a specifier related to `importing_path`
/// are tried as alternative base directories, in the order they were first
/// resolved. This recovers imports written relative to a file that the
/// engine reports under a different path than the one it was stored under.
pub struct VirtualImporter<'a> {
    files: &'a FileSet,
    aliases: RefCell<&'a mut AliasCache>,
}

impl<'a> VirtualImporter<'a> {
    pub fn new(files: &'a FileSet, aliases: &'a mut AliasCache) -> Self {
        Self {
            files,
            aliases: RefCell::new(aliases),
        }
    }

    fn accept(&self, specifier: &str, candidate: Candidate) -> Result<ResolvedImport, ImportError> {
        let contents = self
            .files
            .get(&candidate.path)
            .cloned()
            .ok_or_else(|| ImportError::NotFound {
                path: candidate.path.clone(),
            })?;
        self.aliases.borrow_mut().register(&candidate.path, specifier);
        Ok(ResolvedImport {
            path: candidate.path,
            contents,
        })
    }

    fn resolve_via_aliases(&self, specifier: &str, importing_path: &str) -> Option<Candidate> {
        let aliases = self.aliases.borrow();
        let found = aliases.related_paths(importing_path).find_map(|related| {
            let resolution = path::resolve_from_dir(specifier, path::parent_dir(related));
            match resolution.lookup(|p| self.exists(p)) {
                Lookup::Found(candidate) => Some(candidate),
                _ => None,
            }
        });
        found
    }
}

impl Importer for VirtualImporter<'_> {
    fn resolve_import(
        &self,
        specifier: &str,
        importing_path: &str,
    ) -> Result<ResolvedImport, ImportError> {
        let resolution = path::resolve(specifier, importing_path);
        match resolution.lookup(|p| self.exists(p)) {
            Lookup::Found(candidate) => return self.accept(specifier, candidate),
            Lookup::Excluded(path) => return Err(ImportError::Excluded { path }),
            Lookup::NotFound(_) => {}
        }

        match self.resolve_via_aliases(specifier, importing_path) {
            Some(candidate) => {
                trace!(specifier, importing_path, path = %candidate.path, "Resolved import through alias");
                self.accept(specifier, candidate)
            }
            None => Err(ImportError::NotFound {
                path: resolution.canonical,
            }),
        }
    }

    fn load(&self, path: &str) -> Option<String> {
        self.files.get(path).cloned()
    }

    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::ROOT_MARKER;

    fn file_set(entries: &[(&str, &str)]) -> FileSet {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_resolves_relative_to_importer() {
        let files = file_set(&[
            ("/mock/path1.scss", "color:#fff"),
            ("/mock/path2.scss", "color:#000"),
        ]);
        let mut aliases = AliasCache::new();
        let importer = VirtualImporter::new(&files, &mut aliases);

        let resolved = importer.resolve_import("/path2", "/mock/path1.scss").unwrap();
        assert_eq!(
            resolved,
            ResolvedImport {
                path: "/mock/path2.scss".to_string(),
                contents: "color:#000".to_string(),
            }
        );
    }

    #[test]
    fn test_root_marker_applies_no_prefix() {
        let files = file_set(&[("file1.scss", "a {}")]);
        let mut aliases = AliasCache::new();
        let importer = VirtualImporter::new(&files, &mut aliases);

        let resolved = importer.resolve_import("file1", ROOT_MARKER).unwrap();
        assert_eq!(resolved.path, "file1.scss");
    }

    #[test]
    fn test_missing_import_reports_attempted_path() {
        let files = file_set(&[("/mock/path1.scss", "")]);
        let mut aliases = AliasCache::new();
        let importer = VirtualImporter::new(&files, &mut aliases);

        let err = importer.resolve_import("/nope", "/mock/path1.scss").unwrap_err();
        assert_eq!(err.to_string(), "/mock/nope.scss doesn't exist!");
    }

    #[test]
    fn test_alias_fallback() {
        let files = file_set(&[
            ("/foo/file.scss", "a {}"),
            ("/foo/bar/file.scss", "b {}"),
        ]);
        let mut aliases = AliasCache::new();
        aliases.register("/foo/file.scss", "/a/prev.scss");
        let importer = VirtualImporter::new(&files, &mut aliases);

        let resolved = importer
            .resolve_import("/bar/file.scss", "/a/prev.scss")
            .unwrap();
        assert_eq!(resolved.path, "/foo/bar/file.scss");
        assert_eq!(resolved.contents, "b {}");
        drop(importer);

        assert_eq!(
            aliases.aliases("/foo/bar/file.scss").unwrap(),
            &["/bar/file.scss".to_string()]
        );
    }

    #[test]
    fn test_alias_tie_break_is_insertion_order() {
        let files = file_set(&[
            ("/one/x.scss", "one"),
            ("/two/x.scss", "two"),
            ("/one/seed.scss", ""),
            ("/two/seed.scss", ""),
        ]);
        let mut aliases = AliasCache::new();
        aliases.register("/two/seed.scss", "/a/prev.scss");
        aliases.register("/one/seed.scss", "/a/prev.scss");
        let importer = VirtualImporter::new(&files, &mut aliases);

        let resolved = importer.resolve_import("x", "/a/prev.scss").unwrap();
        assert_eq!(resolved.contents, "two");
    }

    #[test]
    fn test_alias_fallback_needs_exact_importer_match() {
        let files = file_set(&[("x/c.scss", ".c {}")]);
        let mut aliases = AliasCache::new();
        aliases.register("x/b.scss", "b");
        let importer = VirtualImporter::new(&files, &mut aliases);

        let err = importer.resolve_import("c", "lib/sub.scss").unwrap_err();
        assert_eq!(err.to_string(), "lib/c.scss doesn't exist!");
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let files = file_set(&[("tools/tools.scss", ".t {}"), ("theme.scss", "")]);
        let mut aliases = AliasCache::new();
        let importer = VirtualImporter::new(&files, &mut aliases);

        let first = importer.resolve_import("tools/tools", "theme.scss").unwrap();
        let second = importer.resolve_import("tools/tools", "theme.scss").unwrap();
        assert_eq!(first, second);
        drop(importer);

        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases.aliases("tools/tools.scss").unwrap().len(), 1);
    }

    #[test]
    fn test_existing_css_is_excluded() {
        let files = file_set(&[("reset.css", "html {}")]);
        let mut aliases = AliasCache::new();
        let importer = VirtualImporter::new(&files, &mut aliases);

        assert_eq!(
            importer.resolve_import("reset.css", ROOT_MARKER),
            Err(ImportError::Excluded {
                path: "reset.css".to_string()
            })
        );
    }

    #[test]
    fn test_load_is_exact() {
        let files = file_set(&[("_vars.scss", "$a: 1;")]);
        let mut aliases = AliasCache::new();
        let importer = VirtualImporter::new(&files, &mut aliases);

        assert_eq!(importer.load("_vars.scss").as_deref(), Some("$a: 1;"));
        assert!(importer.load("vars.scss").is_none());
    }
}
