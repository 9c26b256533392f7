//! Data models for Muyu skins and playback (sprite-sheet configs, scheduler tables)

mod playback;
mod skin;

// Re-export all public types
pub use playback::{PlaybackState, SchedulerConfig, Tier, TierStyle};
pub use skin::{Behavior, ChromaKeyAlgorithm, ChromaKeyOptions, PetConfig, SpriteSheetConfig};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_roundtrip() {
        let config = SpriteSheetConfig::simple(8, 7);
        let json = serde_json::to_string(&config).unwrap();
        let parsed: SpriteSheetConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_pet_config_roundtrip() {
        let mut config = SpriteSheetConfig::simple(8, 7);
        config.behavior = Behavior::Pet(PetConfig {
            hit_moods: vec![3, 4],
            idle_variants: vec![6],
            ..Default::default()
        });
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"behavior\":\"pet\""));
        let parsed: SpriteSheetConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let config = SpriteSheetConfig::simple(4, 2);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("chromaKeyEnabled"));
        assert!(json.contains("removeGridLines"));
        assert!(!json.contains("chroma_key_enabled"));
    }
}
