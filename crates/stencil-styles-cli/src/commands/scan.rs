//! Scan command - list stylesheets referenced by theme templates

use std::path::Path;

use anyhow::Result;
use stencil_styles::{NativeRuntime, scan_stylesheets};

/// Execute the scan command.
pub fn execute(theme: &Path) -> Result<()> {
    for identifier in scan_stylesheets(theme, &NativeRuntime::new())? {
        println!("{}", identifier);
    }
    Ok(())
}
