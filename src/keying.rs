//! Chroma-key pixel pass - background removal and spill suppression.
//!
//! The pass classifies every pixel by its colorspace distance to a key color
//! (explicit, or auto-detected from the sheet border), turns classified
//! pixels transparent with a smooth falloff band at the boundary, and then
//! decontaminates retained pixels near the cutout from key-color bleed.
//!
//! Distances are normalized to `[0, 1]` per colorspace so the same
//! `similarity`/`smoothness` values behave consistently across algorithm
//! variants, and growing `similarity` monotonically grows the removed area.

use image::RgbaImage;
use rayon::prelude::*;

use crate::models::{ChromaKeyAlgorithm, ChromaKeyOptions};

/// How far past the falloff band spill suppression keeps reaching, in
/// normalized distance units.
const SPILL_REACH: f32 = 0.25;

/// Extra edge weight given to the four corner pixels during key detection.
const CORNER_WEIGHT: u32 = 4;

/// The key color the pass will use: the explicit one when present, otherwise
/// the auto-detected dominant border color.
pub fn resolve_key_color(image: &RgbaImage, options: &ChromaKeyOptions) -> [u8; 3] {
    options.key_color.unwrap_or_else(|| detect_key_color(image))
}

/// Detect the dominant edge/corner color of a sheet.
///
/// Samples every border pixel (corners weighted heavier), buckets them at
/// 4 bits per channel, and averages the most frequent bucket. Fully
/// transparent border pixels are ignored.
pub fn detect_key_color(image: &RgbaImage) -> [u8; 3] {
    let (width, height) = image.dimensions();
    // bucket -> (count, r sum, g sum, b sum)
    let mut buckets: std::collections::HashMap<u16, (u32, u64, u64, u64)> =
        std::collections::HashMap::new();

    let mut sample = |x: u32, y: u32, weight: u32| {
        let px = image.get_pixel(x, y).0;
        if px[3] == 0 {
            return;
        }
        let bucket =
            (u16::from(px[0] >> 4) << 8) | (u16::from(px[1] >> 4) << 4) | u16::from(px[2] >> 4);
        let entry = buckets.entry(bucket).or_insert((0, 0, 0, 0));
        entry.0 += weight;
        entry.1 += u64::from(px[0]) * u64::from(weight);
        entry.2 += u64::from(px[1]) * u64::from(weight);
        entry.3 += u64::from(px[2]) * u64::from(weight);
    };

    for x in 0..width {
        sample(x, 0, 1);
        if height > 1 {
            sample(x, height - 1, 1);
        }
    }
    for y in 1..height.saturating_sub(1) {
        sample(0, y, 1);
        if width > 1 {
            sample(width - 1, y, 1);
        }
    }
    for (x, y) in [(0, 0), (width - 1, 0), (0, height - 1), (width - 1, height - 1)] {
        sample(x, y, CORNER_WEIGHT);
    }

    match buckets.into_values().max_by_key(|(count, ..)| *count) {
        Some((count, r, g, b)) if count > 0 => {
            let n = u64::from(count);
            [(r / n) as u8, (g / n) as u8, (b / n) as u8]
        }
        _ => [0, 0, 0],
    }
}

/// Apply the chroma-key pass in place.
///
/// Output has identical pixel dimensions; background pixels end fully
/// transparent, boundary pixels get partial alpha across the `smoothness`
/// band, and retained pixels near the cutout are spill-corrected. Rows are
/// processed in parallel; the pass is deterministic regardless of worker
/// count.
pub fn apply_chroma_key(
    image: &mut RgbaImage,
    algorithm: ChromaKeyAlgorithm,
    options: &ChromaKeyOptions,
) {
    let options = options.clamped();
    let key = resolve_key_color(image, &options);
    let (radius, band) = radius_and_band(algorithm, &options);
    let spill = options.spill;
    let dominant = dominant_channel(key);

    let width = image.width() as usize;
    let stride = width * 4;
    let samples: &mut [u8] = image;

    samples.par_chunks_mut(stride).for_each(|row| {
        for px in row.chunks_exact_mut(4) {
            if px[3] == 0 {
                continue;
            }
            let rgb = [px[0], px[1], px[2]];
            let distance = color_distance(algorithm, rgb, key);
            let keep = coverage(distance, radius, band);
            if keep < 1.0 {
                px[3] = (f32::from(px[3]) * keep).round() as u8;
            }
            if px[3] > 0 && spill > 0.0 {
                suppress_spill(px, dominant, distance, radius, band, spill);
            }
        }
    });
}

/// Normalized `[0, 1]` distance between a pixel and the key color in the
/// algorithm's colorspace.
pub(crate) fn color_distance(
    algorithm: ChromaKeyAlgorithm,
    rgb: [u8; 3],
    key: [u8; 3],
) -> f32 {
    match algorithm {
        ChromaKeyAlgorithm::Classic | ChromaKeyAlgorithm::Aggressive => rgb_distance(rgb, key),
        ChromaKeyAlgorithm::Yuv => {
            let (pu, pv) = chroma_uv(rgb);
            let (ku, kv) = chroma_uv(key);
            // Max chroma radius is 127.5 per axis
            (((pu - ku).powi(2) + (pv - kv).powi(2)).sqrt() / (127.5 * std::f32::consts::SQRT_2))
                .min(1.0)
        }
        ChromaKeyAlgorithm::Hsl => {
            let (ph, ps, pl) = rgb_to_hsl(rgb);
            let (kh, ks, kl) = rgb_to_hsl(key);
            let dh = hue_distance(ph, kh);
            let ds = ps - ks;
            let dl = pl - kl;
            // Hue dominates; weights sum to 1 so the result stays in [0, 1]
            (dh * dh * 0.55 + ds * ds * 0.35 + dl * dl * 0.10).sqrt()
        }
    }
}

fn rgb_distance(a: [u8; 3], b: [u8; 3]) -> f32 {
    let dr = f32::from(a[0]) - f32::from(b[0]);
    let dg = f32::from(a[1]) - f32::from(b[1]);
    let db = f32::from(a[2]) - f32::from(b[2]);
    (dr * dr + dg * dg + db * db).sqrt() / (255.0 * 3f32.sqrt())
}

/// Classification radius and falloff band width for an algorithm.
///
/// `aggressive` widens the radius and extends the band so the same
/// parameters remove visibly more than `classic`.
fn radius_and_band(algorithm: ChromaKeyAlgorithm, options: &ChromaKeyOptions) -> (f32, f32) {
    match algorithm {
        ChromaKeyAlgorithm::Aggressive => (options.similarity * 1.4, options.smoothness + 0.1),
        _ => (options.similarity, options.smoothness),
    }
}

/// Retained-coverage factor for a pixel at the given distance: 0 inside the
/// radius, a linear ramp across the band, 1 outside.
fn coverage(distance: f32, radius: f32, band: f32) -> f32 {
    if distance <= radius {
        0.0
    } else if band <= f32::EPSILON || distance >= radius + band {
        1.0
    } else {
        (distance - radius) / band
    }
}

/// Index of the key color's strongest channel; that channel is the one that
/// bleeds onto retained pixels.
fn dominant_channel(key: [u8; 3]) -> usize {
    let mut dominant = 0;
    for i in 1..3 {
        if key[i] > key[dominant] {
            dominant = i;
        }
    }
    dominant
}

/// Pull the key-dominant channel of a retained pixel down toward its other
/// channels, weighted by `spill` and by proximity to the cutout boundary.
fn suppress_spill(
    px: &mut [u8],
    dominant: usize,
    distance: f32,
    radius: f32,
    band: f32,
    spill: f32,
) {
    let reach = band + SPILL_REACH;
    let past_radius = (distance - radius).max(0.0);
    if past_radius >= reach {
        return;
    }
    let proximity = 1.0 - past_radius / reach;
    let (a, b) = match dominant {
        0 => (1, 2),
        1 => (0, 2),
        _ => (0, 1),
    };
    let excess = f32::from(px[dominant]) - f32::from(px[a].max(px[b]));
    if excess > 0.0 {
        px[dominant] = (f32::from(px[dominant]) - excess * spill * proximity).round() as u8;
    }
}

fn chroma_uv(rgb: [u8; 3]) -> (f32, f32) {
    let r = f32::from(rgb[0]);
    let g = f32::from(rgb[1]);
    let b = f32::from(rgb[2]);
    // BT.601 chroma plane, centered on zero
    let u = -0.169 * r - 0.331 * g + 0.5 * b;
    let v = 0.5 * r - 0.419 * g - 0.081 * b;
    (u, v)
}

fn rgb_to_hsl(rgb: [u8; 3]) -> (f32, f32, f32) {
    let r = f32::from(rgb[0]) / 255.0;
    let g = f32::from(rgb[1]) / 255.0;
    let b = f32::from(rgb[2]) / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    if (max - min).abs() < f32::EPSILON {
        return (0.0, 0.0, l);
    }
    let delta = max - min;
    let s = if l > 0.5 { delta / (2.0 - max - min) } else { delta / (max + min) };
    let h = if (max - r).abs() < f32::EPSILON {
        ((g - b) / delta).rem_euclid(6.0)
    } else if (max - g).abs() < f32::EPSILON {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    } / 6.0;
    (h, s, l)
}

/// Circular hue distance scaled so opposite hues are 1.0 apart.
fn hue_distance(a: f32, b: f32) -> f32 {
    let d = (a - b).abs();
    d.min(1.0 - d) * 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const GREEN: [u8; 3] = [0, 255, 0];

    fn green_bg_with_red_square(size: u32) -> RgbaImage {
        let mut img = RgbaImage::from_pixel(size, size, Rgba([0, 255, 0, 255]));
        for y in size / 4..size * 3 / 4 {
            for x in size / 4..size * 3 / 4 {
                img.put_pixel(x, y, Rgba([255, 0, 0, 255]));
            }
        }
        img
    }

    #[test]
    fn test_distance_zero_for_identical_colors() {
        for alg in [
            ChromaKeyAlgorithm::Classic,
            ChromaKeyAlgorithm::Yuv,
            ChromaKeyAlgorithm::Hsl,
            ChromaKeyAlgorithm::Aggressive,
        ] {
            assert!(color_distance(alg, GREEN, GREEN) < 1e-6, "{}", alg);
        }
    }

    #[test]
    fn test_distance_normalized_to_unit_range() {
        let far = color_distance(ChromaKeyAlgorithm::Classic, [0, 0, 0], [255, 255, 255]);
        assert!((far - 1.0).abs() < 1e-5);
        for alg in [ChromaKeyAlgorithm::Yuv, ChromaKeyAlgorithm::Hsl] {
            let d = color_distance(alg, [255, 0, 255], GREEN);
            assert!(d > 0.0 && d <= 1.0, "{}: {}", alg, d);
        }
    }

    #[test]
    fn test_yuv_is_luma_insensitive() {
        // Dark green and bright green share chroma; classic sees them far apart
        let dark_green = [0, 96, 0];
        let yuv = color_distance(ChromaKeyAlgorithm::Yuv, dark_green, GREEN);
        let classic = color_distance(ChromaKeyAlgorithm::Classic, dark_green, GREEN);
        assert!(yuv < classic);
    }

    #[test]
    fn test_detect_key_color_finds_border_green() {
        let img = green_bg_with_red_square(16);
        let key = detect_key_color(&img);
        assert_eq!(key, GREEN);
    }

    #[test]
    fn test_detect_ignores_transparent_border() {
        let mut img = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 255, 255]));
        for x in 0..8 {
            img.put_pixel(x, 0, Rgba([255, 0, 0, 0]));
        }
        assert_eq!(detect_key_color(&img), [0, 0, 255]);
    }

    #[test]
    fn test_apply_removes_background_keeps_subject() {
        let mut img = green_bg_with_red_square(16);
        let options = ChromaKeyOptions { similarity: 0.3, smoothness: 0.05, ..Default::default() };
        apply_chroma_key(&mut img, ChromaKeyAlgorithm::Classic, &options);

        // Background corner is now transparent
        assert_eq!(img.get_pixel(0, 0).0[3], 0);
        // Subject center is untouched
        assert_eq!(img.get_pixel(8, 8).0, [255, 0, 0, 255]);
        // Dimensions unchanged
        assert_eq!(img.dimensions(), (16, 16));
    }

    #[test]
    fn test_explicit_key_color_overrides_detection() {
        // Border is green, but we key on red: the square goes, the bg stays
        let mut img = green_bg_with_red_square(16);
        let options = ChromaKeyOptions {
            similarity: 0.3,
            key_color: Some([255, 0, 0]),
            ..Default::default()
        };
        apply_chroma_key(&mut img, ChromaKeyAlgorithm::Classic, &options);
        assert_eq!(img.get_pixel(8, 8).0[3], 0);
        assert_eq!(img.get_pixel(0, 0).0[3], 255);
    }

    #[test]
    fn test_smoothness_band_yields_partial_alpha() {
        // A color just outside the radius but inside the band
        let key = GREEN;
        let radius = 0.2;
        let probe = [90, 255, 90];
        let d = color_distance(ChromaKeyAlgorithm::Classic, probe, key);
        assert!(d > radius && d < radius + 0.3, "probe distance {}", d);

        let mut img = RgbaImage::from_pixel(4, 4, Rgba([probe[0], probe[1], probe[2], 255]));
        let options = ChromaKeyOptions {
            similarity: radius,
            smoothness: 0.3,
            spill: 0.0,
            key_color: Some(key),
        };
        apply_chroma_key(&mut img, ChromaKeyAlgorithm::Classic, &options);
        let alpha = img.get_pixel(1, 1).0[3];
        assert!(alpha > 0 && alpha < 255, "alpha {}", alpha);
    }

    #[test]
    fn test_similarity_monotonically_grows_removed_area() {
        let count_removed = |similarity: f32| {
            let mut img = RgbaImage::new(16, 1);
            for x in 0..16 {
                // Gradient from pure green toward red
                let t = (x * 16) as u8;
                img.put_pixel(x, 0, Rgba([t, 255 - t, 0, 255]));
            }
            let options = ChromaKeyOptions {
                similarity,
                smoothness: 0.0,
                spill: 0.0,
                key_color: Some(GREEN),
            };
            apply_chroma_key(&mut img, ChromaKeyAlgorithm::Classic, &options);
            img.pixels().filter(|p| p.0[3] == 0).count()
        };

        let mut previous = 0;
        for similarity in [0.1, 0.3, 0.5, 0.7, 0.9] {
            let removed = count_removed(similarity);
            assert!(removed >= previous, "similarity {} removed {}", similarity, removed);
            previous = removed;
        }
        assert!(previous > 0);
    }

    #[test]
    fn test_aggressive_removes_at_least_as_much_as_classic() {
        let removed_with = |alg: ChromaKeyAlgorithm| {
            let mut img = green_bg_with_red_square(16);
            let options = ChromaKeyOptions {
                similarity: 0.25,
                smoothness: 0.05,
                spill: 0.0,
                key_color: Some(GREEN),
            };
            apply_chroma_key(&mut img, alg, &options);
            img.pixels().filter(|p| p.0[3] < 255).count()
        };
        assert!(removed_with(ChromaKeyAlgorithm::Aggressive) >= removed_with(ChromaKeyAlgorithm::Classic));
    }

    #[test]
    fn test_spill_desaturates_key_bleed() {
        // A retained pixel contaminated by green bleed
        let probe = [120, 200, 120];
        let mut img = RgbaImage::from_pixel(2, 2, Rgba([probe[0], probe[1], probe[2], 255]));
        let options = ChromaKeyOptions {
            similarity: 0.3,
            smoothness: 0.08,
            spill: 1.0,
            key_color: Some(GREEN),
        };
        apply_chroma_key(&mut img, ChromaKeyAlgorithm::Classic, &options);
        let px = img.get_pixel(0, 0).0;
        assert!(px[3] > 0, "pixel should be retained");
        assert!(px[1] < 200, "green channel should be pulled down, got {}", px[1]);
        assert_eq!(px[0], 120);
        assert_eq!(px[2], 120);
    }

    #[test]
    fn test_zero_spill_leaves_colors_untouched() {
        let probe = [120, 200, 120];
        let mut img = RgbaImage::from_pixel(2, 2, Rgba([probe[0], probe[1], probe[2], 255]));
        let options = ChromaKeyOptions {
            similarity: 0.3,
            smoothness: 0.08,
            spill: 0.0,
            key_color: Some(GREEN),
        };
        apply_chroma_key(&mut img, ChromaKeyAlgorithm::Classic, &options);
        let px = img.get_pixel(0, 0).0;
        assert_eq!([px[0], px[1], px[2]], probe);
    }
}
