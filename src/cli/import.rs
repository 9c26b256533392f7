//! Import and skin-library command implementations

use std::path::Path;
use std::process::ExitCode;

use crate::cache::{CachedProcessor, ProcessedAssetCache};
use crate::downscale::BudgetOptions;
use crate::skins::SkinLibrary;

use super::process::load_or_build_config;
use super::{EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// Execute the import command
pub fn run_import(
    image: &Path,
    config_path: Option<&Path>,
    columns: Option<u32>,
    rows: Option<u32>,
    name: Option<String>,
    library_dir: &Path,
) -> ExitCode {
    let config = match load_or_build_config(config_path, columns, rows) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("Error: {}", message);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    let png_bytes = match std::fs::read(image) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error: failed to read '{}': {}", image.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    // Derive the display name from the file name if not provided
    let name = name
        .or_else(|| image.file_name().map(|n| n.to_string_lossy().to_string()));

    let library = SkinLibrary::new(library_dir);
    let entry = match library.import_bytes(&png_bytes, &config, name) {
        Ok(entry) => entry,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    println!("Imported: {} ({})", entry.name, entry.id);

    // Warm the persisted cache so future sessions skip processing. The skin
    // works without it via render-time keying, so a failure only warns.
    let cache = ProcessedAssetCache::with_persist_dir(library.cache_dir());
    let mut processor = CachedProcessor::new(cache, BudgetOptions::default());
    match processor.process(&png_bytes, &config) {
        Ok(sheet) => println!(
            "  Processed: {} frames of {}x{}px",
            sheet.frame_count(),
            sheet.frame_width,
            sheet.frame_height
        ),
        Err(e) => eprintln!("Warning: processing failed, skin will key at render time: {}", e),
    }

    ExitCode::from(EXIT_SUCCESS)
}

/// Execute the skins list command
pub fn run_skins_list(library_dir: &Path) -> ExitCode {
    let library = SkinLibrary::new(library_dir);
    let entries = match library.list() {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if entries.is_empty() {
        println!("No skins in {}", library_dir.display());
        return ExitCode::from(EXIT_SUCCESS);
    }

    for entry in entries {
        println!(
            "{}  {}  ({}x{} grid)",
            entry.id, entry.name, entry.config.columns, entry.config.rows
        );
    }
    ExitCode::from(EXIT_SUCCESS)
}

/// Execute the skins delete command
pub fn run_skins_delete(id: &str, library_dir: &Path) -> ExitCode {
    let library = SkinLibrary::new(library_dir);
    match library.delete(id) {
        Ok(()) => {
            println!("Deleted: {}", id);
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
