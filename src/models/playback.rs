//! Playback-related types: activity tiers and the per-tick playback state.

use serde::{Deserialize, Serialize};

use super::skin::SpriteSheetConfig;

/// Discretized bucket of recent event frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    VeryFast,
    Fast,
    Medium,
    Slow,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::VeryFast => write!(f, "very_fast"),
            Tier::Fast => write!(f, "fast"),
            Tier::Medium => write!(f, "medium"),
            Tier::Slow => write!(f, "slow"),
        }
    }
}

/// What the renderer should display: which row, how fast, and whether the
/// column advances at all.
///
/// Produced once per scheduler tick. Immutable value object: a tick either
/// reuses the previous instance or replaces it wholesale, so consumers can
/// use pointer equality as a "did anything change" signal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlaybackState {
    /// Row of the sprite sheet to display.
    pub row_index: u32,
    /// Delay between frame columns, in ms.
    pub frame_interval_ms: u64,
    /// When false the first column is pinned.
    pub animate: bool,
}

/// A fixed `(row, frame interval)` pair one scheduler outcome maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierStyle {
    pub row_index: u32,
    pub frame_interval_ms: u64,
}

impl TierStyle {
    pub const fn new(row_index: u32, frame_interval_ms: u64) -> Self {
        Self { row_index, frame_interval_ms }
    }
}

/// Per-skin scheduler tuning: window sizes, tier thresholds, and the
/// tier/drag/hover/idle style table.
///
/// The defaults are the reference values; skins may override any of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerConfig {
    /// Sliding event window length, in ms.
    pub event_window_ms: u64,
    /// Maximum retained event samples; oldest evicted first.
    pub max_samples: usize,
    /// Silence tolerated before an active tier decays, in ms.
    pub active_hold_ms: u64,
    /// Suggested host tick period, in ms. Decay needs ticks even with no input.
    pub tick_interval_ms: u64,
    /// Effective intervals below this are `VeryFast` (exclusive bound).
    pub very_fast_below_ms: u64,
    /// Effective intervals below this are `Fast` (exclusive bound).
    pub fast_below_ms: u64,
    /// Effective intervals below this are `Medium` (exclusive bound); the
    /// rest are `Slow`.
    pub medium_below_ms: u64,
    pub very_fast: TierStyle,
    pub fast: TierStyle,
    pub medium: TierStyle,
    pub slow: TierStyle,
    /// Style forced while a drag gesture is in progress.
    pub drag: TierStyle,
    /// Style shown when idle but hovered.
    pub hover: TierStyle,
    pub hover_animate: bool,
    /// Style shown at rest.
    pub idle: TierStyle,
    pub idle_animate: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            event_window_ms: 2_200,
            max_samples: 12,
            active_hold_ms: 1_600,
            tick_interval_ms: 220,
            very_fast_below_ms: 240,
            fast_below_ms: 440,
            medium_below_ms: 780,
            very_fast: TierStyle::new(5, 80),
            fast: TierStyle::new(4, 95),
            medium: TierStyle::new(2, 120),
            slow: TierStyle::new(1, 140),
            drag: TierStyle::new(3, 110),
            hover: TierStyle::new(0, 160),
            hover_animate: true,
            idle: TierStyle::new(0, 140),
            idle_animate: false,
        }
    }
}

impl SchedulerConfig {
    /// Derive a scheduler config from a skin: the idle row follows
    /// `idle_mood` (animated when `idle_breathe` is set), the hover row
    /// defaults to the idle row, and the slow tier lands on the skin's base
    /// `hit_mood`.
    pub fn for_skin(skin: &SpriteSheetConfig) -> Self {
        let mut config = Self::default();
        config.idle.row_index = skin.idle_mood;
        config.idle_animate = skin.idle_breathe;
        config.hover.row_index = skin.idle_mood;
        config.slow.row_index = skin.hit_mood;
        config
    }

    /// Bucket an effective inter-event interval into a tier. `None` (not
    /// enough samples to measure a gap) degrades to `Slow`.
    pub fn tier_for(&self, effective_interval_ms: Option<u64>) -> Tier {
        match effective_interval_ms {
            Some(ms) if ms < self.very_fast_below_ms => Tier::VeryFast,
            Some(ms) if ms < self.fast_below_ms => Tier::Fast,
            Some(ms) if ms < self.medium_below_ms => Tier::Medium,
            _ => Tier::Slow,
        }
    }

    /// The style table entry for a tier.
    pub fn style_for(&self, tier: Tier) -> TierStyle {
        match tier {
            Tier::VeryFast => self.very_fast,
            Tier::Fast => self.fast,
            Tier::Medium => self.medium,
            Tier::Slow => self.slow,
        }
    }
}
