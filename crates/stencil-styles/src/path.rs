//! Import specifier resolution following Sass path conventions.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Logical paths are `/`-separated strings relative to the stylesheet root.
//! Joining concatenates the importing file's directory with the specifier, so a
//! leading `/` on a specifier does not make it absolute: `/path2` imported from
//! `/mock/path1.scss` resolves to `/mock/path2.scss`.

/// Key identifying a stylesheet relative to the stylesheet root.
pub type LogicalPath = String;

/// Importing path used for the top-level source of a compilation.
pub const ROOT_MARKER: &str = "stdin";

/// Canonical stylesheet extension appended to extension-less specifiers.
pub const SCSS_EXTENSION: &str = ".scss";

/// Compiled sibling extension. Imports of existing `.css` files are terminal.
pub const CSS_EXTENSION: &str = ".css";

const STYLESHEET_EXTENSIONS: &[&str] = &[SCSS_EXTENSION, CSS_EXTENSION, ".sass"];

/// A path to try for an import, and the key it is stored under once found.
///
/// The two differ only for `_`-prefixed partials: `tools/_onemore.scss` on
/// disk is recorded as `tools/onemore.scss`, the path an importer asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: LogicalPath,
    pub key: LogicalPath,
}

/// Candidate paths for one import, in priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The joined specifier with the canonical extension applied.
    ///
    /// Reported as the attempted path when nothing matches.
    pub canonical: LogicalPath,
    pub candidates: Vec<Candidate>,
}

/// Outcome of probing a resolution against some store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(Candidate),
    /// An existing compiled `.css` file; not part of the stylesheet graph
    Excluded(LogicalPath),
    NotFound(LogicalPath),
}

impl Resolution {
    /// Return the first candidate for which `exists` holds.
    pub fn lookup(&self, exists: impl Fn(&str) -> bool) -> Lookup {
        for candidate in &self.candidates {
            if exists(&candidate.path) {
                if candidate.path.ends_with(CSS_EXTENSION) {
                    return Lookup::Excluded(candidate.path.clone());
                }
                return Lookup::Found(candidate.clone());
            }
        }
        Lookup::NotFound(self.canonical.clone())
    }
}

/// Resolve `specifier` as imported from `importing_path`.
///
/// The root marker applies no directory prefix.
pub fn resolve(specifier: &str, importing_path: &str) -> Resolution {
    if importing_path == ROOT_MARKER {
        resolve_joined(normalize(specifier))
    } else {
        resolve_from_dir(specifier, parent_dir(importing_path))
    }
}

/// Resolve `specifier` relative to the directory `dir`.
pub fn resolve_from_dir(specifier: &str, dir: &str) -> Resolution {
    resolve_joined(join(dir, specifier))
}

fn resolve_joined(joined: String) -> Resolution {
    let mut candidates = Vec::new();
    let mut push = |path: String, key: String| {
        if !candidates.iter().any(|c: &Candidate| c.path == path) {
            candidates.push(Candidate { path, key });
        }
    };

    push(joined.clone(), joined.clone());

    let canonical = if has_stylesheet_extension(&joined) {
        joined.clone()
    } else {
        format!("{}{}", joined, SCSS_EXTENSION)
    };

    if canonical.ends_with(CSS_EXTENSION) {
        let source = format!(
            "{}{}",
            &canonical[..canonical.len() - CSS_EXTENSION.len()],
            SCSS_EXTENSION
        );
        push(source.clone(), source.clone());
        push(partial(&source), source);
    } else {
        push(canonical.clone(), canonical.clone());
        push(partial(&canonical), canonical.clone());
    }

    Resolution {
        canonical,
        candidates,
    }
}

/// Whether the path already carries a recognized stylesheet extension.
pub fn has_stylesheet_extension(path: &str) -> bool {
    STYLESHEET_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Directory portion of a logical path (`""` when there is none).
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Concatenate `base` and `specifier` and normalize the result.
pub fn join(base: &str, specifier: &str) -> String {
    if base.is_empty() {
        normalize(specifier)
    } else {
        normalize(&format!("{}/{}", base, specifier))
    }
}

/// Collapse `.`, `..` and repeated separators. Backslashes are treated as
/// separators so that Windows-style keys compare equal.
pub fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if absolute {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// The `_`-prefixed partial form of a path.
fn partial(path: &str) -> String {
    let (dir, file) = match path.rfind('/') {
        Some(idx) => (&path[..=idx], &path[idx + 1..]),
        None => ("", path),
    };
    if file.starts_with('_') {
        path.to_string()
    } else {
        format!("{}_{}", dir, file)
    }
}
