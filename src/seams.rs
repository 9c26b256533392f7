//! Grid seam-line removal - cleans authoring-tool grid lines off cell borders.
//!
//! Runs as a distinct post-pass, independent of the chroma-key outcome:
//! pixel lines hugging interior cell boundaries that are near-uniform in
//! color (the signature of a drawn grid line) are replaced by interpolating
//! the interior neighbor pixels on either side.

use image::{Rgba, RgbaImage};

/// Fraction of a line's pixels that must sit close to the line's mean color
/// for it to classify as a seam.
const UNIFORMITY_RATIO: f32 = 0.85;

/// Per-channel closeness tolerance against the line mean.
const CHANNEL_TOLERANCE: i32 = 24;

/// Remove near-uniform seam lines along interior cell boundaries, in place.
///
/// Only the one-pixel lines touching each boundary (both sides) are
/// considered; artwork that happens to cross a boundary is left alone
/// because it fails the uniformity test. Assumes the sheet divides evenly
/// into the grid; callers run [`crate::geometry::validate_grid`] first.
pub fn remove_grid_lines(image: &mut RgbaImage, columns: u32, rows: u32) {
    let (width, height) = image.dimensions();
    if columns == 0 || rows == 0 || width % columns != 0 || height % rows != 0 {
        return;
    }

    let frame_width = width / columns;
    for c in 1..columns {
        let boundary = c * frame_width;
        let seam: Vec<u32> = [boundary - 1, boundary]
            .into_iter()
            .filter(|&x| x < width && vertical_line_is_uniform(image, x))
            .collect();
        if !seam.is_empty() {
            blend_vertical_seam(image, &seam);
        }
    }

    let frame_height = height / rows;
    for r in 1..rows {
        let boundary = r * frame_height;
        let seam: Vec<u32> = [boundary - 1, boundary]
            .into_iter()
            .filter(|&y| y < height && horizontal_line_is_uniform(image, y))
            .collect();
        if !seam.is_empty() {
            blend_horizontal_seam(image, &seam);
        }
    }
}

fn vertical_line_is_uniform(image: &RgbaImage, x: u32) -> bool {
    line_is_uniform((0..image.height()).map(|y| *image.get_pixel(x, y)))
}

fn horizontal_line_is_uniform(image: &RgbaImage, y: u32) -> bool {
    line_is_uniform((0..image.width()).map(|x| *image.get_pixel(x, y)))
}

fn line_is_uniform(pixels: impl Iterator<Item = Rgba<u8>> + Clone) -> bool {
    let mut count = 0u32;
    let mut sums = [0u64; 4];
    for px in pixels.clone() {
        count += 1;
        for (sum, channel) in sums.iter_mut().zip(px.0) {
            *sum += u64::from(channel);
        }
    }
    if count == 0 {
        return false;
    }
    let mean = sums.map(|sum| (sum / u64::from(count)) as i32);
    let close = pixels
        .filter(|px| {
            px.0.iter()
                .zip(mean)
                .all(|(&channel, mean)| (i32::from(channel) - mean).abs() <= CHANNEL_TOLERANCE)
        })
        .count();
    close as f32 >= UNIFORMITY_RATIO * count as f32
}

fn blend_vertical_seam(image: &mut RgbaImage, seam: &[u32]) {
    let width = image.width();
    let left = seam.iter().min().copied().unwrap_or(0).checked_sub(1);
    let right = seam.iter().max().map(|&x| x + 1).filter(|&x| x < width);
    for y in 0..image.height() {
        let left_px = left.map(|x| *image.get_pixel(x, y));
        let right_px = right.map(|x| *image.get_pixel(x, y));
        for (i, &x) in seam.iter().enumerate() {
            let t = (i + 1) as f32 / (seam.len() + 1) as f32;
            if let Some(px) = interpolate(left_px, right_px, t) {
                image.put_pixel(x, y, px);
            }
        }
    }
}

fn blend_horizontal_seam(image: &mut RgbaImage, seam: &[u32]) {
    let height = image.height();
    let top = seam.iter().min().copied().unwrap_or(0).checked_sub(1);
    let bottom = seam.iter().max().map(|&y| y + 1).filter(|&y| y < height);
    for x in 0..image.width() {
        let top_px = top.map(|y| *image.get_pixel(x, y));
        let bottom_px = bottom.map(|y| *image.get_pixel(x, y));
        for (i, &y) in seam.iter().enumerate() {
            let t = (i + 1) as f32 / (seam.len() + 1) as f32;
            if let Some(px) = interpolate(top_px, bottom_px, t) {
                image.put_pixel(x, y, px);
            }
        }
    }
}

/// Lerp between the interior neighbors; a missing side copies the other.
fn interpolate(a: Option<Rgba<u8>>, b: Option<Rgba<u8>>, t: f32) -> Option<Rgba<u8>> {
    match (a, b) {
        (Some(a), Some(b)) => {
            let mut out = [0u8; 4];
            for i in 0..4 {
                out[i] = (f32::from(a.0[i]) * (1.0 - t) + f32::from(b.0[i]) * t).round() as u8;
            }
            Some(Rgba(out))
        }
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([200, 30, 30, 255]);
    const GRID_GRAY: Rgba<u8> = Rgba([128, 128, 128, 255]);

    fn sheet_with_vertical_seam() -> RgbaImage {
        // Two 8x8 cells; the grid line straddles the boundary at x = 7..9
        let mut img = RgbaImage::from_pixel(16, 8, RED);
        for y in 0..8 {
            img.put_pixel(7, y, GRID_GRAY);
            img.put_pixel(8, y, GRID_GRAY);
        }
        img
    }

    #[test]
    fn test_vertical_seam_blended_into_neighbors() {
        let mut img = sheet_with_vertical_seam();
        remove_grid_lines(&mut img, 2, 1);
        for y in 0..8 {
            assert_eq!(*img.get_pixel(7, y), RED, "seam at (7, {})", y);
            assert_eq!(*img.get_pixel(8, y), RED, "seam at (8, {})", y);
        }
        // Interior pixels untouched
        assert_eq!(*img.get_pixel(3, 3), RED);
        assert_eq!(*img.get_pixel(12, 5), RED);
    }

    #[test]
    fn test_horizontal_seam_blended_into_neighbors() {
        let mut img = RgbaImage::from_pixel(8, 16, RED);
        for x in 0..8 {
            img.put_pixel(x, 8, GRID_GRAY);
        }
        remove_grid_lines(&mut img, 1, 2);
        for x in 0..8 {
            assert_eq!(*img.get_pixel(x, 8), RED, "seam at ({}, 8)", x);
        }
    }

    #[test]
    fn test_noisy_boundary_left_alone() {
        // Artwork crossing the boundary: alternating strong colors fail the
        // uniformity test and must survive
        let mut img = RgbaImage::from_pixel(16, 8, RED);
        for y in 0..8 {
            let px = if y % 2 == 0 { Rgba([255, 0, 0, 255]) } else { Rgba([0, 0, 255, 255]) };
            img.put_pixel(8, y, px);
        }
        let before: Vec<_> = (0..8).map(|y| *img.get_pixel(8, y)).collect();
        remove_grid_lines(&mut img, 2, 1);
        let after: Vec<_> = (0..8).map(|y| *img.get_pixel(8, y)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_single_cell_is_noop() {
        let mut img = sheet_with_vertical_seam();
        let reference = img.clone();
        remove_grid_lines(&mut img, 1, 1);
        assert_eq!(img, reference);
    }

    #[test]
    fn test_transparent_seam_line_also_cleaned() {
        // Seam pixels can be fully transparent leftovers; alpha interpolates too
        let mut img = RgbaImage::from_pixel(16, 8, RED);
        for y in 0..8 {
            img.put_pixel(8, y, Rgba([0, 0, 0, 0]));
        }
        remove_grid_lines(&mut img, 2, 1);
        for y in 0..8 {
            assert_eq!(img.get_pixel(8, y).0[3], 255);
        }
    }

    #[test]
    fn test_mismatched_grid_is_noop() {
        // Callers validate first; an uneven grid must not touch pixels
        let mut img = sheet_with_vertical_seam();
        let reference = img.clone();
        remove_grid_lines(&mut img, 3, 1);
        assert_eq!(img, reference);
    }
}
