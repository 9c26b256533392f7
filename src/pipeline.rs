//! Sheet processing pipeline - decode, validate, key, clean, budget.
//!
//! The pipeline turns a raw sprite sheet plus its config into a
//! render-ready [`ProcessedSpriteSheet`]. Stages run in a fixed order:
//! geometry gate, chroma key, seam cleanup, pixel budget. Failures surface
//! once and are never retried internally; a new attempt takes a new
//! explicit call.

use std::sync::mpsc;
use std::thread;

use image::RgbaImage;
use thiserror::Error;
use tracing::debug;

use crate::downscale::{self, BudgetOptions};
use crate::geometry::{self, GeometryError};
use crate::keying;
use crate::models::SpriteSheetConfig;
use crate::seams;

/// Error type for processing failures.
///
/// Geometry errors reach the author before any pixel work starts; decode and
/// pixel-pass failures leave the skin usable through the render-time keying
/// fallback.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Source bytes are not a decodable image
    #[error("failed to decode sprite sheet image: {0}")]
    Decode(#[from] image::ImageError),
    /// Source dimensions do not divide the declared grid
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// A chroma-keyed, seam-cleaned, budget-capped sheet plus derived geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedSpriteSheet {
    pub image: RgbaImage,
    pub frame_width: u32,
    pub frame_height: u32,
    pub columns: u32,
    pub rows: u32,
}

impl ProcessedSpriteSheet {
    /// Number of addressable frames - always `columns * rows`.
    pub fn frame_count(&self) -> u32 {
        self.columns * self.rows
    }

    /// Total pixels in the processed sheet.
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.image.width()) * u64::from(self.image.height())
    }
}

/// Decode raw bytes and run the full pipeline.
pub fn process_sheet(
    source_bytes: &[u8],
    config: &SpriteSheetConfig,
    budget: &BudgetOptions,
) -> Result<ProcessedSpriteSheet, ProcessError> {
    let image = image::load_from_memory(source_bytes)?.to_rgba8();
    process_image(image, config, budget)
}

/// Run the pipeline on an already-decoded image.
pub fn process_image(
    mut image: RgbaImage,
    config: &SpriteSheetConfig,
    budget: &BudgetOptions,
) -> Result<ProcessedSpriteSheet, ProcessError> {
    let (width, height) = image.dimensions();
    geometry::validate_grid(width, height, config.columns, config.rows)?;

    if config.chroma_key_enabled {
        debug!(algorithm = %config.chroma_key_algorithm, "applying chroma key");
        keying::apply_chroma_key(&mut image, config.chroma_key_algorithm, &config.chroma_key_options);
    }
    if config.remove_grid_lines {
        debug!("removing grid seam lines");
        seams::remove_grid_lines(&mut image, config.columns, config.rows);
    }

    let image = downscale::enforce_budget(image, config.columns, config.rows, budget);
    let (width, height) = image.dimensions();
    debug!(width, height, "sheet processed");

    Ok(ProcessedSpriteSheet {
        frame_width: width / config.columns,
        frame_height: height / config.rows,
        columns: config.columns,
        rows: config.rows,
        image,
    })
}

/// Run the pipeline on a background thread.
///
/// Returns a receiver immediately, before any pixel work starts, so an
/// interactive caller can put up a busy indicator and keep painting while
/// the pass runs. Processing is not cancellable mid-pass; dropping the
/// receiver just discards the result.
pub fn spawn_process(
    source_bytes: Vec<u8>,
    config: SpriteSheetConfig,
    budget: BudgetOptions,
) -> mpsc::Receiver<Result<ProcessedSpriteSheet, ProcessError>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let result = process_sheet(&source_bytes, &config, &budget);
        let _ = tx.send(result);
    });
    rx
}
