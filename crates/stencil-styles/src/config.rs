//! Compiler configuration.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Configuration is usually read from a `stencil-styles.toml` file:
//!
//! ```toml
//! style = "compressed"
//! primary = "grass"
//! fallback = "rsass"
//! stylesheet-root = "assets/scss"
//! autoprefix = true
//! browsers = ["> 0.5%", "last 2 versions"]
//! ```
//!
//! Every key is optional.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::arbiter::EngineArbiter;
use crate::backend::{GrassBackend, OutputStyle, RsassBackend, SassBackend};
use crate::error::StylesError;
use crate::prefix::{DEFAULT_BROWSERS, PostProcessor, Prefixer};

/// Available compiler backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Grass,
    Rsass,
}

impl BackendKind {
    pub fn create(self) -> Box<dyn SassBackend> {
        match self {
            BackendKind::Grass => Box::new(GrassBackend::new()),
            BackendKind::Rsass => Box::new(RsassBackend::new()),
        }
    }
}

/// Settings shared by every compilation of a theme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct StylesConfig {
    pub style: OutputStyle,
    pub source_map: bool,
    pub primary: BackendKind,
    /// `None` disables the fallback attempt
    pub fallback: Option<BackendKind>,
    /// Stylesheet directory relative to the theme root
    pub stylesheet_root: PathBuf,
    /// Browserslist queries for the prefixer
    pub browsers: Vec<String>,
    pub autoprefix: bool,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            style: OutputStyle::Expanded,
            source_map: false,
            primary: BackendKind::Grass,
            fallback: Some(BackendKind::Rsass),
            stylesheet_root: PathBuf::from("assets/scss"),
            browsers: DEFAULT_BROWSERS.iter().map(|q| q.to_string()).collect(),
            autoprefix: true,
        }
    }
}

impl StylesConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, StylesError> {
        toml::from_str(text).map_err(|e| StylesError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, StylesError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            StylesError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    /// Build a fresh arbiter with the configured backend order.
    pub fn arbiter(&self) -> EngineArbiter {
        EngineArbiter::new(self.primary.create(), self.fallback.map(BackendKind::create))
    }

    /// The post-processor to run on compiled CSS, if prefixing is enabled.
    pub fn post_processor(&self) -> Option<Box<dyn PostProcessor>> {
        if !self.autoprefix {
            return None;
        }
        let prefixer =
            Prefixer::new(&self.browsers).with_minify(self.style == OutputStyle::Compressed);
        Some(Box::new(prefixer))
    }

    /// Absolute stylesheet directory for a theme.
    pub fn stylesheet_dir(&self, theme_root: &Path) -> PathBuf {
        theme_root.join(&self.stylesheet_root)
    }
}
