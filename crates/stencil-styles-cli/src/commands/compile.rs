//! Compile command - compile one entry stylesheet

use std::path::PathBuf;

use anyhow::{Context, Result};
use stencil_styles::{NativeRuntime, compile_entry};
use tracing::info;

use super::{load_config, load_settings};

/// Arguments for the compile command.
pub struct CompileArgs {
    pub root: PathBuf,
    pub entry: String,
    pub settings: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

/// Execute the compile command.
pub fn execute(args: CompileArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let settings = load_settings(args.settings.as_deref())?;

    let css = compile_entry(
        &args.root,
        &args.entry,
        &settings,
        &config,
        &NativeRuntime::new(),
        args.output.as_deref(),
    )
    .with_context(|| format!("compiling {}", args.entry))?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, &css)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(output = %path.display(), bytes = css.len(), "Wrote stylesheet");
        }
        None => print!("{}", css),
    }
    Ok(())
}
