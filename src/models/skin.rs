//! Skin-related types.
//!
//! A skin is a grid sprite sheet plus the authoring metadata needed to turn
//! it into a render-ready asset: grid geometry, chroma-key parameters, and
//! the behavior table driving idle/hit animation choices.

use serde::{Deserialize, Serialize};

/// Colorspace variant used for chroma-key similarity comparison.
///
/// All variants accept the same `similarity`/`smoothness`/`spill` parameters
/// and are calibrated so identical values scale similarly in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChromaKeyAlgorithm {
    /// Euclidean distance in RGB.
    #[default]
    Classic,
    /// Euclidean distance in the BT.601 U/V chroma plane (luma-insensitive).
    Yuv,
    /// Weighted hue/saturation/lightness distance.
    Hsl,
    /// RGB distance with a widened radius and extended falloff.
    Aggressive,
}

impl std::fmt::Display for ChromaKeyAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChromaKeyAlgorithm::Classic => write!(f, "classic"),
            ChromaKeyAlgorithm::Yuv => write!(f, "yuv"),
            ChromaKeyAlgorithm::Hsl => write!(f, "hsl"),
            ChromaKeyAlgorithm::Aggressive => write!(f, "aggressive"),
        }
    }
}

/// Parameters for the chroma-key pass. All three scalars live in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChromaKeyOptions {
    /// Classification radius around the key color. Pixels inside the radius
    /// become fully transparent.
    pub similarity: f32,
    /// Width of the falloff band at the classification boundary, producing
    /// partial alpha instead of a hard edge.
    pub smoothness: f32,
    /// Strength of key-color decontamination on retained pixels near the
    /// cutout boundary.
    pub spill: f32,
    /// Explicit key color. When absent, the dominant edge/corner color of
    /// the sheet is detected automatically.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_color: Option<[u8; 3]>,
}

impl Default for ChromaKeyOptions {
    fn default() -> Self {
        Self { similarity: 0.4, smoothness: 0.08, spill: 0.1, key_color: None }
    }
}

impl ChromaKeyOptions {
    /// Return a copy with all scalar parameters clamped to `[0, 1]`.
    pub fn clamped(&self) -> Self {
        Self {
            similarity: self.similarity.clamp(0.0, 1.0),
            smoothness: self.smoothness.clamp(0.0, 1.0),
            spill: self.spill.clamp(0.0, 1.0),
            key_color: self.key_color,
        }
    }
}

/// Timed mood variations for "pet" skins.
///
/// Interpreted declaratively by the playback scheduler: hit moods rotate per
/// recorded event, idle variants surface periodically, and long silence walks
/// through sleep and snore phases. Moods are row indices into the sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PetConfig {
    /// Rows cycled through on successive hits. Empty = use the tier table row.
    pub hit_moods: Vec<u32>,
    /// Rows shown briefly during long idle stretches.
    pub idle_variants: Vec<u32>,
    /// Period between idle variants, in ms.
    pub idle_variant_every_ms: u64,
    /// How long each idle variant stays on screen, in ms.
    pub idle_variant_duration_ms: u64,
    /// Silence before the sleep mood, in ms.
    pub sleep_after_ms: u64,
    /// Silence before the snore mood, in ms. Should exceed `sleep_after_ms`.
    pub snore_after_ms: u64,
    /// Row for the sleep phase. Falls back to the skin's idle mood.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_mood: Option<u32>,
    /// Row for the snore phase. Falls back to the sleep row.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snore_mood: Option<u32>,
}

impl Default for PetConfig {
    fn default() -> Self {
        Self {
            hit_moods: Vec::new(),
            idle_variants: Vec::new(),
            idle_variant_every_ms: 9_000,
            idle_variant_duration_ms: 1_800,
            sleep_after_ms: 45_000,
            snore_after_ms: 90_000,
            sleep_mood: None,
            snore_mood: None,
        }
    }
}

/// Skin behavior: a plain reactive sheet, or a pet with timed mood changes.
///
/// Serialized adjacently so the wire format matches the authoring schema:
/// `{"behavior": "simple"}` or `{"behavior": "pet", "pet": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "behavior", content = "pet", rename_all = "lowercase")]
pub enum Behavior {
    Simple,
    Pet(PetConfig),
}

impl Default for Behavior {
    fn default() -> Self {
        Behavior::Simple
    }
}

impl Behavior {
    /// The pet extension, if this behavior carries one.
    pub fn pet(&self) -> Option<&PetConfig> {
        match self {
            Behavior::Simple => None,
            Behavior::Pet(pet) => Some(pet),
        }
    }
}

/// Author-supplied configuration for one sprite sheet, immutable per skin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpriteSheetConfig {
    /// Number of frame columns in the grid.
    pub columns: u32,
    /// Number of mood rows in the grid.
    pub rows: u32,
    /// Whether the chroma-key pass runs at all.
    #[serde(default = "default_true")]
    pub chroma_key_enabled: bool,
    #[serde(default)]
    pub chroma_key_algorithm: ChromaKeyAlgorithm,
    #[serde(default)]
    pub chroma_key_options: ChromaKeyOptions,
    /// Remove near-uniform seam lines along interior cell boundaries.
    #[serde(default)]
    pub remove_grid_lines: bool,
    /// Render-time scaling hint: bilinear when true, nearest otherwise.
    /// Does not affect processed pixels.
    #[serde(default = "default_true")]
    pub image_smoothing_enabled: bool,
    /// Animate the idle row with a slow breathing loop.
    #[serde(default)]
    pub idle_breathe: bool,
    #[serde(flatten)]
    pub behavior: Behavior,
    /// Resting row shown when no events are arriving.
    #[serde(default)]
    pub idle_mood: u32,
    /// Base hit row, used by the slowest activity tier.
    #[serde(default = "default_hit_mood")]
    pub hit_mood: u32,
}

fn default_true() -> bool {
    true
}

fn default_hit_mood() -> u32 {
    1
}

impl SpriteSheetConfig {
    /// A minimal `Simple` config for the given grid, everything else default.
    pub fn simple(columns: u32, rows: u32) -> Self {
        Self {
            columns,
            rows,
            chroma_key_enabled: true,
            chroma_key_algorithm: ChromaKeyAlgorithm::default(),
            chroma_key_options: ChromaKeyOptions::default(),
            remove_grid_lines: false,
            image_smoothing_enabled: true,
            idle_breathe: false,
            behavior: Behavior::Simple,
            idle_mood: 0,
            hit_mood: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ChromaKeyAlgorithm::Yuv).unwrap(), "\"yuv\"");
        assert_eq!(serde_json::to_string(&ChromaKeyAlgorithm::Aggressive).unwrap(), "\"aggressive\"");
    }

    #[test]
    fn test_algorithm_display_matches_wire_names() {
        for alg in [
            ChromaKeyAlgorithm::Classic,
            ChromaKeyAlgorithm::Yuv,
            ChromaKeyAlgorithm::Hsl,
            ChromaKeyAlgorithm::Aggressive,
        ] {
            let wire = serde_json::to_string(&alg).unwrap();
            assert_eq!(wire, format!("\"{}\"", alg));
        }
    }

    #[test]
    fn test_options_clamped() {
        let options = ChromaKeyOptions {
            similarity: 1.8,
            smoothness: -0.5,
            spill: 0.3,
            key_color: Some([0, 255, 0]),
        };
        let clamped = options.clamped();
        assert_eq!(clamped.similarity, 1.0);
        assert_eq!(clamped.smoothness, 0.0);
        assert_eq!(clamped.spill, 0.3);
        assert_eq!(clamped.key_color, Some([0, 255, 0]));
    }

    #[test]
    fn test_config_defaults_from_minimal_json() {
        // Only geometry and behavior are required; everything else defaults
        let config: SpriteSheetConfig =
            serde_json::from_str(r#"{"columns": 6, "rows": 7, "behavior": "simple"}"#).unwrap();
        assert!(config.chroma_key_enabled);
        assert_eq!(config.chroma_key_algorithm, ChromaKeyAlgorithm::Classic);
        assert!(!config.remove_grid_lines);
        assert_eq!(config.idle_mood, 0);
        assert_eq!(config.hit_mood, 1);
        assert_eq!(config.behavior, Behavior::Simple);
    }

    #[test]
    fn test_pet_behavior_from_json() {
        let config: SpriteSheetConfig = serde_json::from_str(
            r#"{
                "columns": 8,
                "rows": 7,
                "behavior": "pet",
                "pet": {"hitMoods": [3, 4, 5], "sleepAfterMs": 30000}
            }"#,
        )
        .unwrap();
        let pet = config.behavior.pet().expect("pet extension");
        assert_eq!(pet.hit_moods, vec![3, 4, 5]);
        assert_eq!(pet.sleep_after_ms, 30_000);
        // Unspecified pet fields keep their defaults
        assert_eq!(pet.snore_after_ms, 90_000);
    }
}
