//! Frame renderer - turns a playback state into the frame to draw.
//!
//! Works from a processed sheet when one is available; otherwise falls back
//! to the raw sheet and re-applies chroma keying per frame at draw time,
//! which is functionally identical to preprocessing, just costlier. Failures
//! are reported to the caller (who may fall back to a different skin), never
//! panicked on.

use std::sync::Arc;

use image::imageops;
use image::RgbaImage;
use thiserror::Error;

use crate::geometry::{self, FrameSize, GeometryError};
use crate::keying;
use crate::models::{ChromaKeyOptions, PlaybackState, SpriteSheetConfig};
use crate::pipeline::ProcessedSpriteSheet;

/// Error type for renderer failures.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Raw sheet bytes are not a decodable image
    #[error("failed to decode sprite sheet image: {0}")]
    Decode(#[from] image::ImageError),
    /// Sheet does not divide the declared grid
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    /// Playback state points outside the sheet
    #[error("row {row} is outside the sheet's {rows} rows")]
    RowOutOfRange { row: u32, rows: u32 },
}

enum RenderSource {
    Processed(Arc<ProcessedSpriteSheet>),
    Raw {
        image: RgbaImage,
        config: SpriteSheetConfig,
        /// Key options with the auto-detected color pinned, so per-frame
        /// keying matches what a whole-sheet pass would have done.
        resolved_options: ChromaKeyOptions,
        frame: FrameSize,
    },
}

/// Draws the frame a `(PlaybackState, elapsed time)` pair selects.
pub struct FrameRenderer {
    source: RenderSource,
    speed_multiplier: f64,
}

impl FrameRenderer {
    /// Renderer over a processed, cached sheet.
    pub fn new(sheet: Arc<ProcessedSpriteSheet>) -> Self {
        Self { source: RenderSource::Processed(sheet), speed_multiplier: 1.0 }
    }

    /// Render-time fallback over raw sheet bytes.
    ///
    /// The key color is resolved once, against the full sheet, so each
    /// frame's draw-time keying is consistent with a preprocessed pass.
    pub fn from_raw(source_bytes: &[u8], config: &SpriteSheetConfig) -> Result<Self, RenderError> {
        let image = image::load_from_memory(source_bytes)?.to_rgba8();
        let (width, height) = image.dimensions();
        let frame = geometry::validate_grid(width, height, config.columns, config.rows)?;

        let mut resolved_options = config.chroma_key_options.clamped();
        if config.chroma_key_enabled {
            resolved_options.key_color =
                Some(keying::resolve_key_color(&image, &resolved_options));
        }
        Ok(Self {
            source: RenderSource::Raw { image, config: config.clone(), resolved_options, frame },
            speed_multiplier: 1.0,
        })
    }

    /// Scale playback speed; values above 1.0 animate faster.
    pub fn with_speed_multiplier(mut self, speed_multiplier: f64) -> Self {
        self.speed_multiplier = speed_multiplier;
        self
    }

    pub fn columns(&self) -> u32 {
        match &self.source {
            RenderSource::Processed(sheet) => sheet.columns,
            RenderSource::Raw { config, .. } => config.columns,
        }
    }

    pub fn rows(&self) -> u32 {
        match &self.source {
            RenderSource::Processed(sheet) => sheet.rows,
            RenderSource::Raw { config, .. } => config.rows,
        }
    }

    /// Column the animation sits on after `elapsed_ms` in the given state.
    ///
    /// A non-animating state pins the first column.
    pub fn frame_column(&self, state: &PlaybackState, elapsed_ms: u64) -> u32 {
        if !state.animate || state.frame_interval_ms == 0 || self.speed_multiplier <= 0.0 {
            return 0;
        }
        let steps = (elapsed_ms as f64 * self.speed_multiplier
            / state.frame_interval_ms as f64) as u64;
        (steps % u64::from(self.columns())) as u32
    }

    /// Extract the frame to draw for this tick.
    pub fn frame(
        &self,
        state: &PlaybackState,
        elapsed_ms: u64,
    ) -> Result<RgbaImage, RenderError> {
        let rows = self.rows();
        if state.row_index >= rows {
            return Err(RenderError::RowOutOfRange { row: state.row_index, rows });
        }
        let column = self.frame_column(state, elapsed_ms);

        match &self.source {
            RenderSource::Processed(sheet) => {
                let x = column * sheet.frame_width;
                let y = state.row_index * sheet.frame_height;
                Ok(imageops::crop_imm(&sheet.image, x, y, sheet.frame_width, sheet.frame_height)
                    .to_image())
            }
            RenderSource::Raw { image, config, resolved_options, frame } => {
                let x = column * frame.width;
                let y = state.row_index * frame.height;
                let mut cell =
                    imageops::crop_imm(image, x, y, frame.width, frame.height).to_image();
                if config.chroma_key_enabled {
                    keying::apply_chroma_key(
                        &mut cell,
                        config.chroma_key_algorithm,
                        resolved_options,
                    );
                }
                Ok(cell)
            }
        }
    }
}
