/*
 * runtime.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * File access abstraction used by dependency closure discovery and template
 * scanning.
 *
 * Compilation itself never touches the filesystem. The assembler and the
 * template scanner read through this trait so that callers can substitute an
 * in-memory tree (tests, sandboxed hosts).
 */

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that can occur during runtime operations
#[derive(Debug)]
pub enum RuntimeError {
    /// Standard I/O error
    Io(io::Error),

    /// Permission denied (with detailed reason)
    PermissionDenied(String),
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeError::Io(e) => write!(f, "I/O error: {}", e),
            RuntimeError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
        }
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RuntimeError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for RuntimeError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::PermissionDenied {
            RuntimeError::PermissionDenied(e.to_string())
        } else {
            RuntimeError::Io(e)
        }
    }
}

/// Type of filesystem path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Regular file
    File,
    /// Directory
    Directory,
}

/// Low-level file operations needed to discover a stylesheet closure.
pub trait StylesRuntime: Send + Sync {
    /// Read entire file contents as bytes.
    fn file_read(&self, path: &Path) -> RuntimeResult<Vec<u8>>;

    /// Read file as string with UTF-8 encoding.
    ///
    /// Default implementation reads bytes and converts to string.
    fn file_read_string(&self, path: &Path) -> RuntimeResult<String> {
        let bytes = self.file_read(path)?;
        String::from_utf8(bytes).map_err(|e| {
            RuntimeError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid UTF-8 in file: {}", e),
            ))
        })
    }

    /// Check if path exists, optionally filtering by type.
    fn path_exists(&self, path: &Path, kind: Option<PathKind>) -> RuntimeResult<bool>;

    /// Check if path exists and is a file.
    fn is_file(&self, path: &Path) -> RuntimeResult<bool> {
        self.path_exists(path, Some(PathKind::File))
    }

    /// Check if path exists and is a directory.
    fn is_dir(&self, path: &Path) -> RuntimeResult<bool> {
        self.path_exists(path, Some(PathKind::Directory))
    }

    /// List directory entries (excluding . and ..), in no particular order.
    fn dir_list(&self, path: &Path) -> RuntimeResult<Vec<PathBuf>>;
}

/// Runtime with full filesystem access using `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeRuntime;

impl NativeRuntime {
    pub fn new() -> Self {
        Self
    }
}

impl StylesRuntime for NativeRuntime {
    fn file_read(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        Ok(std::fs::read(path)?)
    }

    fn path_exists(&self, path: &Path, kind: Option<PathKind>) -> RuntimeResult<bool> {
        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        Ok(match kind {
            None => true,
            Some(PathKind::File) => metadata.is_file(),
            Some(PathKind::Directory) => metadata.is_dir(),
        })
    }

    fn dir_list(&self, path: &Path) -> RuntimeResult<Vec<PathBuf>> {
        std::fs::read_dir(path)?
            .map(|entry| -> RuntimeResult<PathBuf> { Ok(entry?.path()) })
            .collect()
    }
}

/// Runtime serving a fixed in-memory tree.
///
/// Directories are implied by the files beneath them.
#[derive(Debug, Default, Clone)]
pub struct MemoryRuntime {
    files: HashMap<PathBuf, Vec<u8>>,
}

impl MemoryRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, returning the runtime for chaining.
    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), contents.into());
    }
}

impl StylesRuntime for MemoryRuntime {
    fn file_read(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        self.files.get(path).cloned().ok_or_else(|| {
            RuntimeError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("File not found: {}", path.display()),
            ))
        })
    }

    fn path_exists(&self, path: &Path, kind: Option<PathKind>) -> RuntimeResult<bool> {
        let is_file = self.files.contains_key(path);
        let is_dir = || self.files.keys().any(|p| p != path && p.starts_with(path));
        Ok(match kind {
            None => is_file || is_dir(),
            Some(PathKind::File) => is_file,
            Some(PathKind::Directory) => !is_file && is_dir(),
        })
    }

    fn dir_list(&self, path: &Path) -> RuntimeResult<Vec<PathBuf>> {
        if !self.is_dir(path)? {
            return Err(RuntimeError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Directory not found: {}", path.display()),
            )));
        }
        let mut entries: Vec<PathBuf> = Vec::new();
        for file in self.files.keys() {
            let Ok(rest) = file.strip_prefix(path) else {
                continue;
            };
            if let Some(first) = rest.components().next() {
                let entry = path.join(first);
                if !entries.contains(&entry) {
                    entries.push(entry);
                }
            }
        }
        Ok(entries)
    }
}
