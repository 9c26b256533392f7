//! Process command implementation

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::cache::{CachedProcessor, ProcessedAssetCache};
use crate::downscale::BudgetOptions;
use crate::models::{ChromaKeyAlgorithm, SpriteSheetConfig};

use super::{EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// Arguments for the process command
pub struct ProcessArgs {
    pub image: PathBuf,
    pub config: Option<PathBuf>,
    pub columns: Option<u32>,
    pub rows: Option<u32>,
    pub output: Option<PathBuf>,
    pub algorithm: Option<String>,
    pub similarity: Option<f32>,
    pub smoothness: Option<f32>,
    pub spill: Option<f32>,
    pub key_color: Option<String>,
    pub no_chroma_key: bool,
    pub remove_grid_lines: bool,
    pub cache_dir: Option<PathBuf>,
}

/// Execute the process command
pub fn run_process(args: &ProcessArgs) -> ExitCode {
    let mut config =
        match load_or_build_config(args.config.as_deref(), args.columns, args.rows) {
            Ok(config) => config,
            Err(message) => {
                eprintln!("Error: {}", message);
                return ExitCode::from(EXIT_INVALID_ARGS);
            }
        };

    // Apply flag overrides on top of the config file
    if let Some(name) = &args.algorithm {
        config.chroma_key_algorithm = match parse_algorithm(name) {
            Ok(algorithm) => algorithm,
            Err(message) => {
                eprintln!("Error: {}", message);
                return ExitCode::from(EXIT_INVALID_ARGS);
            }
        };
    }
    for (flag, value) in
        [("similarity", args.similarity), ("smoothness", args.smoothness), ("spill", args.spill)]
    {
        if let Some(value) = value {
            if !(0.0..=1.0).contains(&value) {
                eprintln!("Error: --{} must be between 0.0 and 1.0", flag);
                return ExitCode::from(EXIT_INVALID_ARGS);
            }
        }
    }
    if let Some(similarity) = args.similarity {
        config.chroma_key_options.similarity = similarity;
    }
    if let Some(smoothness) = args.smoothness {
        config.chroma_key_options.smoothness = smoothness;
    }
    if let Some(spill) = args.spill {
        config.chroma_key_options.spill = spill;
    }
    if let Some(hex) = &args.key_color {
        config.chroma_key_options.key_color = match parse_key_color(hex) {
            Ok(color) => Some(color),
            Err(message) => {
                eprintln!("Error: {}", message);
                return ExitCode::from(EXIT_INVALID_ARGS);
            }
        };
    }
    if args.no_chroma_key {
        config.chroma_key_enabled = false;
    }
    if args.remove_grid_lines {
        config.remove_grid_lines = true;
    }

    let source_bytes = match std::fs::read(&args.image) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error: failed to read '{}': {}", args.image.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let cache = match &args.cache_dir {
        Some(dir) => ProcessedAssetCache::with_persist_dir(dir),
        None => ProcessedAssetCache::new(),
    };
    let mut processor = CachedProcessor::new(cache, BudgetOptions::default());

    let sheet = match processor.process(&source_bytes, &config) {
        Ok(sheet) => sheet,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let output_path = args.output.clone().unwrap_or_else(|| {
        let stem = args.image.file_stem().unwrap_or_default().to_string_lossy();
        args.image
            .parent()
            .unwrap_or(Path::new("."))
            .join(format!("{}_processed.png", stem))
    });

    if let Err(e) = sheet.image.save(&output_path) {
        eprintln!("Error: failed to write '{}': {}", output_path.display(), e);
        return ExitCode::from(EXIT_ERROR);
    }

    let cached = if processor.passes_run() == 0 { " (from cache)" } else { "" };
    println!(
        "Processed: {} ({} frames of {}x{}px){}",
        output_path.display(),
        sheet.frame_count(),
        sheet.frame_width,
        sheet.frame_height,
        cached
    );

    ExitCode::from(EXIT_SUCCESS)
}

/// Load a config file, or build a minimal one from --columns/--rows.
pub(crate) fn load_or_build_config(
    config_path: Option<&Path>,
    columns: Option<u32>,
    rows: Option<u32>,
) -> Result<SpriteSheetConfig, String> {
    if let Some(path) = config_path {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read '{}': {}", path.display(), e))?;
        return serde_json::from_str(&text)
            .map_err(|e| format!("failed to parse '{}': {}", path.display(), e));
    }
    match (columns, rows) {
        (Some(columns), Some(rows)) if columns > 0 && rows > 0 => {
            Ok(SpriteSheetConfig::simple(columns, rows))
        }
        (Some(_), Some(_)) => Err("--columns and --rows must be at least 1".to_string()),
        _ => Err("either --config or both --columns and --rows are required".to_string()),
    }
}

fn parse_algorithm(name: &str) -> Result<ChromaKeyAlgorithm, String> {
    match name {
        "classic" => Ok(ChromaKeyAlgorithm::Classic),
        "yuv" => Ok(ChromaKeyAlgorithm::Yuv),
        "hsl" => Ok(ChromaKeyAlgorithm::Hsl),
        "aggressive" => Ok(ChromaKeyAlgorithm::Aggressive),
        other => Err(format!(
            "unknown algorithm '{}', expected classic, yuv, hsl, or aggressive",
            other
        )),
    }
}

/// Parse a `#RRGGBB` key color.
pub(crate) fn parse_key_color(s: &str) -> Result<[u8; 3], String> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("invalid key color '{}', expected #RRGGBB", s));
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16).map_err(|e| e.to_string())
    };
    Ok([channel(0..2)?, channel(2..4)?, channel(4..6)?])
}
