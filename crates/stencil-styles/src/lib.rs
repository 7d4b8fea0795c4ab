//! In-memory SCSS theme compilation.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! This crate provides:
//! - Dependency closure assembly: collect every stylesheet an entry imports
//! - A virtual importer that resolves imports against that in-memory set
//! - Theme-setting-aware custom functions (`stencilNumber`, `stencilColor`, ...)
//! - Compiler backends (grass, rsass) behind a primary/fallback arbiter
//! - Single-use compilation sessions
//! - Template scanning and CSS post-processing for whole-theme builds

pub mod arbiter;
pub mod assemble;
pub mod backend;
pub mod compile;
pub mod config;
pub mod error;
pub mod functions;
pub mod importer;
pub mod imports;
pub mod path;
pub mod prefix;
pub mod runtime;
pub mod scanner;
pub mod session;
pub mod settings;
pub mod types;

pub use arbiter::{ArbiterOutcome, ArbiterState, EngineArbiter};
pub use assemble::{AssembleMode, Assembly, assemble};
pub use backend::{GrassBackend, OutputStyle, RenderRequest, RsassBackend, SassBackend};
pub use compile::{
    CompiledStylesheet, compile_css, compile_entry, compile_theme, entry_options, output_path,
};
pub use config::{BackendKind, StylesConfig};
pub use error::{
    AssembleError, BackendError, ImportError, PostProcessError, ScanError, StylesError,
};
pub use functions::{FontPart, FunctionRegistry, SassValue, ThemeFunction, theme_functions};
pub use importer::{Importer, ResolvedImport, VirtualImporter};
pub use path::{LogicalPath, ROOT_MARKER};
pub use prefix::{PostProcessor, Prefixer, post_process_or_original};
pub use runtime::{MemoryRuntime, NativeRuntime, RuntimeError, StylesRuntime};
pub use scanner::scan_stylesheets;
pub use session::{CompilationSession, CompileOptions};
pub use settings::ThemeSettings;
pub use types::{AliasCache, FileSet};
