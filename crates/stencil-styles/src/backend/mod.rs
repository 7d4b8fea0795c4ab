//! Compiler backend abstraction.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! A backend turns SCSS source into CSS. It receives the source text, the
//! theme function registry and an import hook; it must not read the
//! filesystem. Two implementations ship with the crate:
//!
//! - [`GrassBackend`]: pure-Rust compiler targeting dart-sass semantics
//! - [`RsassBackend`]: independent pure-Rust compiler, used as fallback
//!
//! Neither engine accepts an import callback, so both run the source through
//! [`prepare_source`] first, which expands every `@import` through the
//! [`Importer`]. Module rules (`@use`, `@forward`) are left to the engine and
//! served from the same importer. Theme functions are registered with each
//! engine natively and run during evaluation.

mod expand;
mod grass_backend;
mod rsass_backend;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::functions::FunctionRegistry;
use crate::importer::Importer;

pub use expand::{IMPORT_DEPTH_LIMIT, expand_imports};
pub use grass_backend::GrassBackend;
pub use rsass_backend::RsassBackend;

/// CSS output formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    #[default]
    Expanded,
    Compressed,
}

/// Inputs of one render call.
///
/// The arbiter hands the same request to the fallback backend when the
/// primary fails.
#[derive(Clone, Copy)]
pub struct RenderRequest<'a> {
    pub source: &'a str,
    pub functions: &'a FunctionRegistry,
    pub importer: &'a dyn Importer,
    /// Intended output file, used for source map references
    pub output: Option<&'a Path>,
    pub source_map: bool,
    pub style: OutputStyle,
}

impl std::fmt::Debug for RenderRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderRequest")
            .field("source_len", &self.source.len())
            .field("functions", &self.functions.len())
            .field("output", &self.output)
            .field("source_map", &self.source_map)
            .field("style", &self.style)
            .finish()
    }
}

/// A stylesheet compiler.
pub trait SassBackend: Send + Sync {
    /// Short name used in errors and log fields.
    fn name(&self) -> &'static str;

    fn render(&self, request: &RenderRequest<'_>) -> Result<String, BackendError>;
}

/// Expand the imports of the request source.
///
/// Import failures are attributed to `backend`.
pub fn prepare_source(
    request: &RenderRequest<'_>,
    backend: &'static str,
) -> Result<String, BackendError> {
    expand_imports(request.source, request.importer)
        .map_err(|source| BackendError::Import { backend, source })
}
