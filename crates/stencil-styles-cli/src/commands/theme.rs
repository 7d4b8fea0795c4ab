//! Theme command - compile every stylesheet a theme references

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use stencil_styles::{NativeRuntime, compile_theme};
use tracing::info;

use super::{load_config, load_settings};

/// Arguments for the theme command.
pub struct ThemeArgs {
    pub theme: PathBuf,
    pub settings: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
}

/// Execute the theme command.
///
/// Without `--out-dir` each stylesheet is printed to stdout under a
/// `/* <identifier> */` banner.
pub fn execute(args: ThemeArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let settings = load_settings(args.settings.as_deref())?;

    let compiled = compile_theme(
        &args.theme,
        &settings,
        &config,
        &NativeRuntime::new(),
        args.out_dir.as_deref(),
    )
    .with_context(|| format!("compiling theme {}", args.theme.display()))?;

    for stylesheet in &compiled {
        match &stylesheet.dest {
            Some(path) => write_stylesheet(path, &stylesheet.css)?,
            None => println!("/* {} */\n{}", stylesheet.identifier, stylesheet.css),
        }
    }
    Ok(())
}

fn write_stylesheet(path: &Path, css: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(path, css).with_context(|| format!("writing {}", path.display()))?;
    info!(output = %path.display(), bytes = css.len(), "Wrote stylesheet");
    Ok(())
}
