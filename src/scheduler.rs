//! Adaptive playback scheduler - event stream in, stable playback state out.
//!
//! The scheduler runs on a fixed-period host timer, independent of event
//! arrival, because decay has to happen even when input stops. Every tick
//! re-evaluates a strict priority chain from scratch over the retained
//! event window and the flags passed in:
//!
//! `Disabled > Dragging > ActiveTier > HoverIdle > Idle`
//!
//! All inputs arrive as explicit tick parameters, never captured global
//! state, so one scheduler instance is pure per tick and unit-testable in
//! isolation. Hysteresis: when a tick computes a state field-for-field equal
//! to the previous one, the previous `Arc` is handed back unchanged and
//! consumers can skip their re-render on pointer equality.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::models::{
    Behavior, PlaybackState, SchedulerConfig, SpriteSheetConfig, Tier, TierStyle,
};

/// How many of the most recent inter-event gaps feed the effective interval.
const TIERING_GAP_SAMPLES: usize = 5;

/// Bias factor pulling the effective interval toward the single most recent
/// gap, so a sudden burst reacts immediately instead of being smoothed away.
const LAST_GAP_BIAS: f64 = 1.1;

/// Everything one tick needs, supplied by the host each time.
#[derive(Debug, Clone, Copy)]
pub struct TickInput {
    /// Current wall-clock time, in ms.
    pub now_ms: u64,
    pub enabled: bool,
    pub is_dragging: bool,
    pub is_hovered: bool,
    /// Event signal: a timestamp or a monotonically increasing counter.
    /// Each distinct value is recorded at most once.
    pub signal: Option<u64>,
}

impl TickInput {
    /// A quiet tick at the given time: enabled, no flags, no event.
    pub fn at(now_ms: u64) -> Self {
        Self { now_ms, enabled: true, is_dragging: false, is_hovered: false, signal: None }
    }

    pub fn with_signal(mut self, signal: u64) -> Self {
        self.signal = Some(signal);
        self
    }
}

/// Which arm of the priority chain won the tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Disabled,
    Dragging,
    Active(Tier),
    HoverIdle,
    Idle,
}

/// The scheduler. One instance per animated character; the event window and
/// hysteresis reference belong exclusively to it.
pub struct PlaybackScheduler {
    config: SchedulerConfig,
    behavior: Behavior,
    /// Sliding window of event timestamps, oldest first.
    window: VecDeque<u64>,
    /// Last signal value seen, for dedup.
    last_signal: Option<u64>,
    /// Time of the last recorded event. Outlives window eviction so hold
    /// and pet idle phases keep working past the window length.
    last_event_ms: Option<u64>,
    /// Time of the first tick, anchoring idle phases before any event.
    first_tick_ms: Option<u64>,
    hits_total: u64,
    state: SchedulerState,
    current: Arc<PlaybackState>,
}

impl PlaybackScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_behavior(config, Behavior::Simple)
    }

    pub fn with_behavior(config: SchedulerConfig, behavior: Behavior) -> Self {
        let current = Arc::new(PlaybackState {
            row_index: config.idle.row_index,
            frame_interval_ms: config.idle.frame_interval_ms,
            animate: config.idle_animate,
        });
        Self {
            config,
            behavior,
            window: VecDeque::new(),
            last_signal: None,
            last_event_ms: None,
            first_tick_ms: None,
            hits_total: 0,
            state: SchedulerState::Idle,
            current,
        }
    }

    /// Scheduler tuned for a skin: tier table from
    /// [`SchedulerConfig::for_skin`], behavior taken from the config.
    pub fn for_skin(skin: &SpriteSheetConfig) -> Self {
        Self::with_behavior(SchedulerConfig::for_skin(skin), skin.behavior.clone())
    }

    /// Advance one tick. Returns the playback state to display; an unchanged
    /// outcome returns the previous instance (compare with `Arc::ptr_eq`).
    pub fn tick(&mut self, input: &TickInput) -> Arc<PlaybackState> {
        let now = input.now_ms;
        self.first_tick_ms.get_or_insert(now);
        self.record_signal(input.signal, now);
        self.evict(now);

        let (state, playback) = self.evaluate(input);
        self.state = state;
        if playback != *self.current {
            self.current = Arc::new(playback);
        }
        Arc::clone(&self.current)
    }

    /// Winning priority arm of the most recent tick.
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Most recent playback state without advancing.
    pub fn current(&self) -> Arc<PlaybackState> {
        Arc::clone(&self.current)
    }

    /// Time since the last recorded event (or since the first tick when no
    /// event has ever arrived).
    pub fn idle_for_ms(&self, now_ms: u64) -> u64 {
        match self.last_event_ms.or(self.first_tick_ms) {
            Some(anchor) => now_ms.saturating_sub(anchor),
            None => 0,
        }
    }

    fn record_signal(&mut self, signal: Option<u64>, now: u64) {
        let Some(signal) = signal else { return };
        if self.last_signal == Some(signal) {
            return;
        }
        self.last_signal = Some(signal);
        self.window.push_back(now);
        self.last_event_ms = Some(now);
        self.hits_total += 1;
    }

    fn evict(&mut self, now: u64) {
        let horizon = now.saturating_sub(self.config.event_window_ms);
        while self.window.front().is_some_and(|&t| t < horizon) {
            self.window.pop_front();
        }
        while self.window.len() > self.config.max_samples {
            self.window.pop_front();
        }
    }

    /// Mean of the last up-to-5 inter-event gaps, pulled downward by the
    /// most recent gap. `None` until two events sit in the window.
    fn effective_interval_ms(&self) -> Option<u64> {
        if self.window.len() < 2 {
            return None;
        }
        let gaps: Vec<u64> = self
            .window
            .iter()
            .zip(self.window.iter().skip(1))
            .map(|(a, b)| b.saturating_sub(*a))
            .collect();
        let recent = &gaps[gaps.len().saturating_sub(TIERING_GAP_SAMPLES)..];
        let mean = recent.iter().sum::<u64>() as f64 / recent.len() as f64;
        let last = *gaps.last()? as f64;
        Some(mean.min(last * LAST_GAP_BIAS).round() as u64)
    }

    fn evaluate(&self, input: &TickInput) -> (SchedulerState, PlaybackState) {
        let config = &self.config;

        if !input.enabled {
            return (
                SchedulerState::Disabled,
                PlaybackState {
                    row_index: config.idle.row_index,
                    frame_interval_ms: config.idle.frame_interval_ms,
                    animate: false,
                },
            );
        }

        if input.is_dragging {
            return (SchedulerState::Dragging, animated(config.drag));
        }

        if let Some(last) = self.last_event_ms {
            if input.now_ms.saturating_sub(last) <= config.active_hold_ms {
                let tier = config.tier_for(self.effective_interval_ms());
                let style = config.style_for(tier);
                let playback = PlaybackState {
                    row_index: self.hit_row(style),
                    frame_interval_ms: style.frame_interval_ms,
                    animate: true,
                };
                return (SchedulerState::Active(tier), playback);
            }
        }

        if input.is_hovered {
            let playback = PlaybackState {
                row_index: config.hover.row_index,
                frame_interval_ms: config.hover.frame_interval_ms,
                animate: config.hover_animate,
            };
            return (SchedulerState::HoverIdle, playback);
        }

        (SchedulerState::Idle, self.idle_presentation(input.now_ms))
    }

    /// Row for the active tier: pet skins rotate through their hit moods by
    /// event count, everything else uses the tier table row.
    fn hit_row(&self, style: TierStyle) -> u32 {
        if let Behavior::Pet(pet) = &self.behavior {
            if !pet.hit_moods.is_empty() && self.hits_total > 0 {
                let index = ((self.hits_total - 1) as usize) % pet.hit_moods.len();
                return pet.hit_moods[index];
            }
        }
        style.row_index
    }

    /// Resting presentation, with the pet idle-phase table layered on top:
    /// snore beats sleep beats periodic variants beats plain idle.
    fn idle_presentation(&self, now_ms: u64) -> PlaybackState {
        let config = &self.config;
        let plain = PlaybackState {
            row_index: config.idle.row_index,
            frame_interval_ms: config.idle.frame_interval_ms,
            animate: config.idle_animate,
        };
        let Behavior::Pet(pet) = &self.behavior else {
            return plain;
        };
        let idle_for = self.idle_for_ms(now_ms);

        let sleep_row = pet.sleep_mood.unwrap_or(config.idle.row_index);
        if pet.snore_after_ms > 0 && idle_for >= pet.snore_after_ms {
            return PlaybackState {
                row_index: pet.snore_mood.unwrap_or(sleep_row),
                frame_interval_ms: config.idle.frame_interval_ms,
                animate: true,
            };
        }
        if pet.sleep_after_ms > 0 && idle_for >= pet.sleep_after_ms {
            return PlaybackState {
                row_index: sleep_row,
                frame_interval_ms: config.idle.frame_interval_ms,
                animate: true,
            };
        }

        if !pet.idle_variants.is_empty() && pet.idle_variant_every_ms > 0 {
            let cycle = idle_for / pet.idle_variant_every_ms;
            let offset = idle_for % pet.idle_variant_every_ms;
            if cycle >= 1 && offset < pet.idle_variant_duration_ms {
                let index = ((cycle - 1) as usize) % pet.idle_variants.len();
                return PlaybackState {
                    row_index: pet.idle_variants[index],
                    frame_interval_ms: config.idle.frame_interval_ms,
                    animate: true,
                };
            }
        }

        plain
    }
}

fn animated(style: TierStyle) -> PlaybackState {
    PlaybackState {
        row_index: style.row_index,
        frame_interval_ms: style.frame_interval_ms,
        animate: true,
    }
}
