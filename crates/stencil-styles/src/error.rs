//! Error types for stylesheet assembly and compilation.
//!
//! Copyright (c) 2025 Posit, PBC

use std::path::PathBuf;

use thiserror::Error;

use crate::runtime::RuntimeError;

/// Top-level error returned by compilation entry points.
///
/// Only session reuse and the final backend failure propagate out of a
/// compile call. Assembly and configuration errors come from the steps that
/// build a compile request.
#[derive(Debug, Error)]
pub enum StylesError {
    /// A `CompilationSession` was asked to compile more than once
    #[error(
        "This compilation session was already used. Please, create a new session per compilation"
    )]
    SessionReused,

    /// Both backends (or the only configured backend) failed
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Dependency closure discovery failed
    #[error(transparent)]
    Assemble(#[from] AssembleError),

    /// Template scanning failed
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Configuration or theme settings could not be loaded
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Import resolution failure raised by the virtual importer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ImportError {
    /// No candidate path exists in the file set
    #[error("{path} doesn't exist!")]
    NotFound { path: String },

    /// The specifier names compiled CSS output, which is never imported as source
    #[error("{path} is compiled output and cannot be imported as a stylesheet")]
    Excluded { path: String },

    /// Import nesting exceeded the supported depth (usually an import cycle)
    #[error("Import depth limit of {limit} exceeded while importing {path}")]
    TooDeep { path: String, limit: usize },
}

/// Failure reported by a compiler backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The engine rejected the stylesheet source
    #[error("{backend}: {message}")]
    Compile {
        backend: &'static str,
        message: String,
    },

    /// An import could not be resolved against the file set
    #[error("{backend}: {source}")]
    Import {
        backend: &'static str,
        #[source]
        source: ImportError,
    },

    /// The engine produced output that is not valid UTF-8
    #[error("{backend}: compiled output is not valid UTF-8")]
    InvalidOutput { backend: &'static str },
}

impl BackendError {
    /// Name of the backend that raised the error.
    pub fn backend(&self) -> &'static str {
        match self {
            BackendError::Compile { backend, .. }
            | BackendError::Import { backend, .. }
            | BackendError::InvalidOutput { backend } => backend,
        }
    }

    /// Short error kind used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::Compile { .. } => "compile",
            BackendError::Import { .. } => "import",
            BackendError::InvalidOutput { .. } => "output",
        }
    }
}

/// Errors raised while walking the `@import` graph on disk.
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("Entry stylesheet not found: {entry} (looked for {attempted})")]
    EntryNotFound { entry: String, attempted: String },

    #[error("Import \"{specifier}\" in {importer} not found (looked for {attempted})")]
    ImportNotFound {
        specifier: String,
        importer: String,
        attempted: String,
    },

    #[error("Failed to read stylesheet {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: RuntimeError,
    },
}

/// CSS post-processing failure. Never fatal to a compilation.
#[derive(Debug, Error)]
pub enum PostProcessError {
    #[error("Invalid browser targets: {0}")]
    Targets(String),

    #[error("Failed to parse CSS: {0}")]
    Parse(String),

    #[error("Failed to transform CSS: {0}")]
    Transform(String),

    #[error("Failed to print CSS: {0}")]
    Print(String),
}

/// Errors raised while scanning theme templates for stylesheet references.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Templates directory not found: {}", .0.display())]
    MissingTemplates(PathBuf),

    #[error("Failed to list template directory {}: {source}", .path.display())]
    List {
        path: PathBuf,
        #[source]
        source: RuntimeError,
    },

    #[error("Failed to read template {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: RuntimeError,
    },
}
