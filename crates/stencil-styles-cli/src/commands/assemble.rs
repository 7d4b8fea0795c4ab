//! Assemble command - print the import closure of entry stylesheets

use std::path::PathBuf;

use anyhow::Result;
use stencil_styles::{AssembleMode, NativeRuntime, assemble};
use tracing::info;

/// Arguments for the assemble command.
pub struct AssembleArgs {
    pub root: PathBuf,
    pub entries: Vec<String>,
    pub bundle: bool,
    pub json: bool,
}

/// Execute the assemble command.
pub fn execute(args: AssembleArgs) -> Result<()> {
    let mode = if args.bundle {
        AssembleMode::Bundle
    } else {
        AssembleMode::Map
    };
    let assembly = assemble(&args.entries, &args.root, mode, &NativeRuntime::new())?;
    info!(files = assembly.files.len(), "Assembled stylesheets");

    if let Some(bundle) = assembly.bundle {
        println!("{}", bundle);
    } else if args.json {
        println!("{}", serde_json::to_string_pretty(&assembly.files)?);
    } else {
        for path in assembly.files.keys() {
            println!("{}", path);
        }
    }
    Ok(())
}
