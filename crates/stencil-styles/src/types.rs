//! Core data types shared by assembly and compilation.
//!
//! Copyright (c) 2025 Posit, PBC

use indexmap::IndexMap;

use crate::path::LogicalPath;

/// Stylesheet sources keyed by logical path.
///
/// Lookup ignores order. Iteration follows insertion order, which the
/// assembler makes depth-first so that bundles concatenate deterministically.
pub type FileSet = IndexMap<LogicalPath, String>;

/// Specifiers observed to resolve to each logical path during one compilation.
///
/// Used only as a fallback signal when a relative import cannot be resolved
/// from the importing file's own location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasCache {
    entries: IndexMap<LogicalPath, Vec<String>>,
}

impl AliasCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `specifier` resolved to `resolved`.
    ///
    /// Aliases are kept distinct and in first-seen order.
    pub fn register(&mut self, resolved: &str, specifier: &str) {
        let aliases = self.entries.entry(resolved.to_string()).or_default();
        if !aliases.iter().any(|a| a == specifier) {
            aliases.push(specifier.to_string());
        }
    }

    /// Aliases recorded for `resolved`.
    pub fn aliases(&self, resolved: &str) -> Option<&[String]> {
        self.entries.get(resolved).map(Vec::as_slice)
    }

    /// Resolved paths that `importing_path` is a recorded alias of, in
    /// insertion order.
    pub fn related_paths<'a>(&'a self, importing_path: &'a str) -> impl Iterator<Item = &'a str> {
        self.entries
            .iter()
            .filter(move |(_, aliases)| aliases.iter().any(|alias| alias == importing_path))
            .map(|(path, _)| path.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
