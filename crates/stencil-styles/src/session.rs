//! One-shot compilation sessions.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! A [`CompilationSession`] owns the per-request state of one compilation:
//! the file set, the alias cache and the backend arbiter. It accepts exactly
//! one [`compile`](CompilationSession::compile) call; create a new session for
//! every request.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::arbiter::EngineArbiter;
use crate::backend::{OutputStyle, RenderRequest};
use crate::error::StylesError;
use crate::functions::theme_functions;
use crate::importer::VirtualImporter;
use crate::settings::ThemeSettings;
use crate::types::{AliasCache, FileSet};

/// Inputs of a compile call. Every field is optional.
///
/// Deserializes from JSON with camelCase keys:
///
/// ```json
/// { "data": "@import \"theme\";", "files": { "theme.scss": "..." },
///   "themeSettings": { "color-primary": "#333" }, "sourceMap": false }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Top-level SCSS source
    pub data: String,
    pub files: FileSet,
    pub theme_settings: ThemeSettings,
    pub source_map: bool,
    /// Intended output path, forwarded to the backend
    pub dest: Option<PathBuf>,
}

impl CompileOptions {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn with_files(mut self, files: FileSet) -> Self {
        self.files = files;
        self
    }

    pub fn with_theme_settings(mut self, settings: ThemeSettings) -> Self {
        self.theme_settings = settings;
        self
    }
}

/// Single-use compilation state.
#[derive(Debug)]
pub struct CompilationSession {
    files: FileSet,
    aliases: AliasCache,
    used: bool,
    arbiter: EngineArbiter,
    style: OutputStyle,
}

impl CompilationSession {
    pub fn new(arbiter: EngineArbiter) -> Self {
        Self {
            files: FileSet::new(),
            aliases: AliasCache::new(),
            used: false,
            arbiter,
            style: OutputStyle::default(),
        }
    }

    pub fn with_default_backends() -> Self {
        Self::new(EngineArbiter::with_default_backends())
    }

    pub fn with_style(mut self, style: OutputStyle) -> Self {
        self.style = style;
        self
    }

    /// Compile `options.data` against `options.files`.
    ///
    /// Fails with [`StylesError::SessionReused`] on any call after the first.
    /// The file set and alias cache are emptied afterwards whether or not
    /// compilation succeeded.
    pub fn compile(&mut self, options: CompileOptions) -> Result<String, StylesError> {
        if self.used {
            return Err(StylesError::SessionReused);
        }
        self.used = true;

        let CompileOptions {
            data,
            files,
            theme_settings,
            source_map,
            dest,
        } = options;

        self.files = files;
        self.aliases.clear();
        debug!(files = self.files.len(), source_map, "Compiling stylesheet");

        let functions = theme_functions(Arc::new(theme_settings));
        let outcome = {
            let importer = VirtualImporter::new(&self.files, &mut self.aliases);
            let request = RenderRequest {
                source: &data,
                functions: &functions,
                importer: &importer,
                output: dest.as_deref(),
                source_map,
                style: self.style,
            };
            self.arbiter.run(&request)
        };

        self.files.clear();
        self.aliases.clear();

        Ok(outcome.into_result()?)
    }

    pub fn is_used(&self) -> bool {
        self.used
    }

    pub fn files(&self) -> &FileSet {
        &self.files
    }

    pub fn aliases(&self) -> &AliasCache {
        &self.aliases
    }

    pub fn arbiter(&self) -> &EngineArbiter {
        &self.arbiter
    }
}

impl Default for CompilationSession {
    fn default() -> Self {
        Self::with_default_backends()
    }
}
