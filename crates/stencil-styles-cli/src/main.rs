//! stencil-styles CLI - Main entry point

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "stencil-styles")]
#[command(version)]
#[command(about = "Compile SCSS themes from an in-memory import graph", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect the import closure of one or more entry stylesheets
    Assemble {
        /// Stylesheet root directory
        root: PathBuf,

        /// Entry stylesheets, relative to the root
        #[arg(required = true)]
        entries: Vec<String>,

        /// Print the concatenated bundle instead of the file list
        #[arg(long)]
        bundle: bool,

        /// Print the file set as JSON
        #[arg(long, conflicts_with = "bundle")]
        json: bool,
    },

    /// Compile an entry stylesheet to CSS
    Compile {
        /// Stylesheet root directory
        root: PathBuf,

        /// Entry stylesheet, relative to the root
        entry: String,

        /// Theme settings JSON file
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Configuration TOML file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write CSS to FILE instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List stylesheets referenced by a theme's templates
    Scan {
        /// Theme root directory (containing templates/)
        theme: PathBuf,
    },

    /// Compile every stylesheet referenced by a theme
    Theme {
        /// Theme root directory
        theme: PathBuf,

        /// Theme settings JSON file
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Configuration TOML file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory to write compiled CSS into
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize logging; stdout is reserved for command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stencil_styles=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Assemble {
            root,
            entries,
            bundle,
            json,
        } => commands::assemble::execute(commands::assemble::AssembleArgs {
            root,
            entries,
            bundle,
            json,
        }),
        Commands::Compile {
            root,
            entry,
            settings,
            config,
            output,
        } => commands::compile::execute(commands::compile::CompileArgs {
            root,
            entry,
            settings,
            config,
            output,
        }),
        Commands::Scan { theme } => commands::scan::execute(&theme),
        Commands::Theme {
            theme,
            settings,
            config,
            out_dir,
        } => commands::theme::execute(commands::theme::ThemeArgs {
            theme,
            settings,
            config,
            out_dir,
        }),
    }
}
