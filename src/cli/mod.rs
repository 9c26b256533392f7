//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod import;
mod process;
mod validate;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Muyu - process grid sprite sheets and manage custom skins
#[derive(Parser)]
#[command(name = "muyu")]
#[command(about = "Muyu - validate and process grid sprite sheets, manage custom skins")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check that a sheet divides evenly into a frame grid
    Validate {
        /// Sheet image to check
        image: PathBuf,

        /// Number of frame columns
        #[arg(short, long)]
        columns: u32,

        /// Number of mood rows
        #[arg(short, long)]
        rows: u32,
    },

    /// Run the processing pipeline on a sheet and write the result
    Process {
        /// Sheet image to process
        image: PathBuf,

        /// Skin config JSON; individual flags below override its fields
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of frame columns (required without --config)
        #[arg(short, long)]
        columns: Option<u32>,

        /// Number of mood rows (required without --config)
        #[arg(short, long)]
        rows: Option<u32>,

        /// Output PNG path. Default: {input}_processed.png
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Chroma-key algorithm: classic, yuv, hsl, aggressive
        #[arg(long)]
        algorithm: Option<String>,

        /// Classification radius, 0.0-1.0
        #[arg(long)]
        similarity: Option<f32>,

        /// Falloff band width, 0.0-1.0
        #[arg(long)]
        smoothness: Option<f32>,

        /// Spill suppression strength, 0.0-1.0
        #[arg(long)]
        spill: Option<f32>,

        /// Explicit key color as #RRGGBB (default: auto-detect)
        #[arg(long)]
        key_color: Option<String>,

        /// Skip background removal entirely
        #[arg(long)]
        no_chroma_key: bool,

        /// Clean seam lines along cell boundaries
        #[arg(long)]
        remove_grid_lines: bool,

        /// Directory for the persisted processed-sheet cache
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },

    /// Import a sheet into the skin library
    Import {
        /// Sheet image to import
        image: PathBuf,

        /// Skin config JSON describing the sheet
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of frame columns (required without --config)
        #[arg(short, long)]
        columns: Option<u32>,

        /// Number of mood rows (required without --config)
        #[arg(short, long)]
        rows: Option<u32>,

        /// Display name for the skin (default: the file name)
        #[arg(long)]
        name: Option<String>,

        /// Skin library directory
        #[arg(long)]
        library: PathBuf,
    },

    /// Manage the skin library
    Skins {
        #[command(subcommand)]
        action: SkinsAction,
    },
}

#[derive(Subcommand)]
pub enum SkinsAction {
    /// List stored skins, newest first
    List {
        /// Skin library directory
        #[arg(long)]
        library: PathBuf,
    },
    /// Delete a skin by id
    Delete {
        /// Settings id of the skin (custom:skin_...)
        id: String,

        /// Skin library directory
        #[arg(long)]
        library: PathBuf,
    },
}

/// CLI entry point
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { image, columns, rows } => validate::run_validate(&image, columns, rows),
        Commands::Process {
            image,
            config,
            columns,
            rows,
            output,
            algorithm,
            similarity,
            smoothness,
            spill,
            key_color,
            no_chroma_key,
            remove_grid_lines,
            cache_dir,
        } => process::run_process(&process::ProcessArgs {
            image,
            config,
            columns,
            rows,
            output,
            algorithm,
            similarity,
            smoothness,
            spill,
            key_color,
            no_chroma_key,
            remove_grid_lines,
            cache_dir,
        }),
        Commands::Import { image, config, columns, rows, name, library } => {
            import::run_import(&image, config.as_deref(), columns, rows, name, &library)
        }
        Commands::Skins { action } => match action {
            SkinsAction::List { library } => import::run_skins_list(&library),
            SkinsAction::Delete { id, library } => import::run_skins_delete(&id, &library),
        },
    }
}
