//! Pixel-budget guard - caps processed sheet size, preserving aspect ratio.
//!
//! Oversized sheets are not an error: they are scaled down uniformly so the
//! per-frame width lands on a target, with frame height recomputed from the
//! original aspect ratio. Sheets inside the budget pass through untouched,
//! and nothing is ever upscaled.

use image::imageops::{self, FilterType};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Default ceiling on total processed pixels.
pub const DEFAULT_MAX_PROCESSED_PIXELS: u64 = 16_000_000;

/// Default frame width targeted when a sheet must shrink.
pub const DEFAULT_TARGET_FRAME_WIDTH: u32 = 512;

/// Tuning for the budget guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BudgetOptions {
    pub target_frame_width_px: u32,
    pub max_processed_pixels: u64,
}

impl Default for BudgetOptions {
    fn default() -> Self {
        Self {
            target_frame_width_px: DEFAULT_TARGET_FRAME_WIDTH,
            max_processed_pixels: DEFAULT_MAX_PROCESSED_PIXELS,
        }
    }
}

/// Output sheet dimensions the guard would produce, without touching pixels.
///
/// Deterministic: same input and budget always yields the same dimensions.
/// The result keeps exact grid divisibility (dimensions are multiples of the
/// grid counts) and the frame aspect ratio within ±1 px of rounding.
pub fn planned_dimensions(
    width: u32,
    height: u32,
    columns: u32,
    rows: u32,
    options: &BudgetOptions,
) -> (u32, u32) {
    let total = u64::from(width) * u64::from(height);
    if total <= options.max_processed_pixels || columns == 0 || rows == 0 {
        return (width, height);
    }

    let frame_width = width / columns;
    let frame_height = height / rows;

    // First shrink to the target frame width (never widen)
    let mut new_fw = options.target_frame_width_px.min(frame_width).max(1);
    let mut new_fh =
        ((f64::from(frame_height) * f64::from(new_fw) / f64::from(frame_width)).round() as u32)
            .max(1);

    // Target width alone may not fit extreme geometries; clamp to the budget
    let cells = u64::from(columns) * u64::from(rows);
    let scaled_total = u64::from(new_fw) * u64::from(new_fh) * cells;
    if scaled_total > options.max_processed_pixels {
        let s = (options.max_processed_pixels as f64 / scaled_total as f64).sqrt();
        new_fw = ((f64::from(new_fw) * s).floor() as u32).max(1);
        new_fh = ((f64::from(new_fh) * s).floor() as u32).max(1);
    }

    (new_fw * columns, new_fh * rows)
}

/// Enforce the pixel budget on a processed sheet.
///
/// Returns the sheet unchanged when it already fits; otherwise resizes the
/// whole sheet uniformly (bilinear) to the planned dimensions.
pub fn enforce_budget(
    image: RgbaImage,
    columns: u32,
    rows: u32,
    options: &BudgetOptions,
) -> RgbaImage {
    let (width, height) = image.dimensions();
    let (new_width, new_height) = planned_dimensions(width, height, columns, rows, options);
    if (new_width, new_height) == (width, height) {
        return image;
    }
    imageops::resize(&image, new_width, new_height, FilterType::Triangle)
}
