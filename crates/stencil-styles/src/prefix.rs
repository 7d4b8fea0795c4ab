//! CSS post-processing.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! After compilation the CSS can be run through a [`PostProcessor`]. The
//! provided [`Prefixer`] uses lightningcss to add the vendor prefixes that
//! the configured browser targets need. Post-processing is best effort:
//! [`post_process_or_original`] returns the input unchanged on any failure.

use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use tracing::{debug, warn};

use crate::error::PostProcessError;

/// Browserslist queries used when none are configured.
pub const DEFAULT_BROWSERS: &[&str] = &["> 0.5%", "last 2 versions", "Firefox ESR", "not dead"];

/// A CSS-to-CSS transformation.
pub trait PostProcessor: Send + Sync {
    fn name(&self) -> &'static str;

    fn process(&self, css: &str) -> Result<String, PostProcessError>;
}

/// Run `processor`, falling back to the unmodified CSS if it fails.
pub fn post_process_or_original(processor: &dyn PostProcessor, css: String) -> String {
    match processor.process(&css) {
        Ok(processed) => processed,
        Err(e) => {
            debug!(processor = processor.name(), error = %e, "Post-processing failed; keeping original CSS");
            css
        }
    }
}

/// Vendor prefixing for a set of browser targets.
#[derive(Debug, Clone, Default)]
pub struct Prefixer {
    targets: Targets,
    minify: bool,
}

impl Prefixer {
    /// Prefixer for browserslist `queries`.
    ///
    /// Invalid queries are logged and leave the prefixer without targets, in
    /// which case CSS passes through reformatted but unprefixed.
    pub fn new<S: AsRef<str>>(queries: &[S]) -> Self {
        match Self::try_new(queries) {
            Ok(prefixer) => prefixer,
            Err(e) => {
                warn!(error = %e, "Ignoring browser targets");
                Self::default()
            }
        }
    }

    pub fn try_new<S: AsRef<str>>(queries: &[S]) -> Result<Self, PostProcessError> {
        let browsers = Browsers::from_browserslist(queries.iter().map(|q| q.as_ref()))
            .map_err(|e| PostProcessError::Targets(e.to_string()))?;
        Ok(Self {
            targets: browsers.map(Targets::from).unwrap_or_default(),
            minify: false,
        })
    }

    /// Emit minified output.
    pub fn with_minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }
}

impl PostProcessor for Prefixer {
    fn name(&self) -> &'static str {
        "lightningcss"
    }

    fn process(&self, css: &str) -> Result<String, PostProcessError> {
        let mut stylesheet = StyleSheet::parse(css, ParserOptions::default())
            .map_err(|e| PostProcessError::Parse(e.to_string()))?;

        stylesheet
            .minify(MinifyOptions {
                targets: self.targets.clone(),
                ..Default::default()
            })
            .map_err(|e| PostProcessError::Transform(e.to_string()))?;

        let result = stylesheet
            .to_css(PrinterOptions {
                minify: self.minify,
                targets: self.targets.clone(),
                ..Default::default()
            })
            .map_err(|e| PostProcessError::Print(e.to_string()))?;

        Ok(result.code)
    }
}
