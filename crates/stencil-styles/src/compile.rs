//! High-level compilation pipeline.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! These functions tie the pieces together the way a theme server uses them:
//! a fresh [`CompilationSession`] per stylesheet, CSS post-processing after
//! compilation, and for whole themes a scan of the templates to find which
//! entries need compiling.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::assemble::{AssembleMode, assemble};
use crate::config::StylesConfig;
use crate::error::{AssembleError, StylesError};
use crate::prefix::post_process_or_original;
use crate::runtime::StylesRuntime;
use crate::scanner::scan_stylesheets;
use crate::session::{CompilationSession, CompileOptions};
use crate::settings::ThemeSettings;

/// Compile one request in a new session, then post-process the CSS.
///
/// # Example
///
/// ```rust,ignore
/// use stencil_styles::{compile_css, CompileOptions, StylesConfig};
///
/// let css = compile_css(CompileOptions::new("h1 { color: red; }"), &StylesConfig::default())?;
/// ```
pub fn compile_css(options: CompileOptions, config: &StylesConfig) -> Result<String, StylesError> {
    let mut session = CompilationSession::new(config.arbiter()).with_style(config.style);
    let css = session.compile(options)?;

    Ok(match config.post_processor() {
        Some(processor) => post_process_or_original(processor.as_ref(), css),
        None => css,
    })
}

/// Assemble the closure of `entry` under `stylesheet_root` into session
/// options.
///
/// `dest` is the intended output file and is forwarded to the backends.
pub fn entry_options(
    stylesheet_root: &Path,
    entry: &str,
    settings: &ThemeSettings,
    config: &StylesConfig,
    runtime: &dyn StylesRuntime,
    dest: Option<&Path>,
) -> Result<CompileOptions, StylesError> {
    let assembly = assemble(&[entry], stylesheet_root, AssembleMode::Map, runtime)?;
    let Some(key) = assembly.entries.first() else {
        return Err(AssembleError::EntryNotFound {
            entry: entry.to_string(),
            attempted: entry.to_string(),
        }
        .into());
    };

    Ok(CompileOptions {
        data: format!("@import \"{}\";", key),
        files: assembly.files,
        theme_settings: settings.clone(),
        source_map: config.source_map,
        dest: dest.map(Path::to_path_buf),
    })
}

/// Assemble the closure of `entry` under `stylesheet_root` and compile it.
pub fn compile_entry(
    stylesheet_root: &Path,
    entry: &str,
    settings: &ThemeSettings,
    config: &StylesConfig,
    runtime: &dyn StylesRuntime,
    dest: Option<&Path>,
) -> Result<String, StylesError> {
    let options = entry_options(stylesheet_root, entry, settings, config, runtime, dest)?;
    compile_css(options, config)
}

/// A compiled theme stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledStylesheet {
    /// Identifier as reported by the template scanner (`theme`, `sub/page.scss`)
    pub identifier: String,
    /// Output file under the requested output directory, if any
    pub dest: Option<PathBuf>,
    pub css: String,
}

/// Output file for a scanned stylesheet identifier.
///
/// `theme` becomes `theme.css`; `sub/page.scss` becomes `sub/page.css`.
pub fn output_path(out_dir: &Path, identifier: &str) -> PathBuf {
    out_dir.join(identifier).with_extension("css")
}

/// Compile every stylesheet referenced by the templates of `theme_root`.
///
/// Templates, stylesheets and existence checks all go through `runtime`.
/// With `out_dir`, each stylesheet's [`output_path`] is passed to the
/// backends as its destination. Stops at the first stylesheet that fails.
pub fn compile_theme(
    theme_root: &Path,
    settings: &ThemeSettings,
    config: &StylesConfig,
    runtime: &dyn StylesRuntime,
    out_dir: Option<&Path>,
) -> Result<Vec<CompiledStylesheet>, StylesError> {
    let identifiers = scan_stylesheets(theme_root, runtime)?;
    let stylesheet_root = config.stylesheet_dir(theme_root);
    info!(
        theme = %theme_root.display(),
        stylesheets = identifiers.len(),
        "Compiling theme stylesheets"
    );

    identifiers
        .into_iter()
        .map(|identifier| {
            let dest = out_dir.map(|dir| output_path(dir, &identifier));
            let css = compile_entry(
                &stylesheet_root,
                &identifier,
                settings,
                config,
                runtime,
                dest.as_deref(),
            )?;
            Ok(CompiledStylesheet {
                identifier,
                dest,
                css,
            })
        })
        .collect()
}
