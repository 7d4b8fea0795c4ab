//! Command implementations for the stencil-styles CLI
//!
//! Each command module handles the CLI interface and delegates to
//! the stencil-styles library for the actual work.

use std::path::Path;

use anyhow::{Context, Result};
use stencil_styles::{StylesConfig, ThemeSettings};

pub mod assemble;
pub mod compile;
pub mod scan;
pub mod theme;

/// Load the configuration file, or the defaults when none is given.
pub(crate) fn load_config(path: Option<&Path>) -> Result<StylesConfig> {
    match path {
        Some(path) => StylesConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(StylesConfig::default()),
    }
}

/// Load theme settings, or empty settings when none are given.
pub(crate) fn load_settings(path: Option<&Path>) -> Result<ThemeSettings> {
    match path {
        Some(path) => ThemeSettings::from_file(path)
            .with_context(|| format!("loading theme settings from {}", path.display())),
        None => Ok(ThemeSettings::empty()),
    }
}
