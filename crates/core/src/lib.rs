//! Playback engine for rhythm game beatmaps.
//!
//! The crate turns a parsed [`Chart`] into time-driven drawables and hit
//! sounds. It owns no pixels and decodes no audio: drawing goes through a
//! [`RenderBackend`] and the authoritative clock comes from an
//! [`AudioBackend`]. [`Player`] ties the pieces together and is pumped once
//! per display frame by the host.

pub mod animation;
pub mod audio;
pub mod beatmap;
pub mod cache;
pub mod clock;
pub mod config;
pub mod curve;
pub mod easing;
pub mod error;
pub mod events;
pub mod hitsound;
pub mod math;
pub mod mods;
pub mod player;
pub mod render;
pub mod slider;
pub mod timing;

pub use audio::{AudioBackend, SampleSink, SyntheticAudio, TrackInfo};
pub use beatmap::{
    Chart, ComboInfo, Difficulty, EdgeSet, Effects, GameMode, HitObject, HitObjectKind,
    HitSampleInfo, HitSound, Metadata, PreparedChart, SampleSet, SliderData, TimingPoint,
};
pub use cache::{CacheKey, DrawableCache, DrawableSet};
pub use clock::{ClockSample, PlaybackClock};
pub use config::{ClockConfig, CurveConfig, HitsoundConfig, PlayerConfig};
pub use curve::{PathKind, SliderPath};
pub use error::{ErrorCode, PlayerError, Result};
pub use events::{ErrorEvent, ListenerId, Listeners, PlayerEvents};
pub use hitsound::{HitsoundScheduler, ScheduledSample, SoundKind, SoundPriority};
pub use math::Pos2;
pub use mods::{DifficultyValues, Mods};
pub use player::{FrameOutcome, FrameRequest, Player, PlayerState};
pub use render::{
    CountingBackend, FrameRenderer, FrameStats, RenderBackend, Rgba, Sprite, Viewport,
};
pub use slider::{SliderEvent, SliderEventKind, SliderGeometry};
pub use timing::{TimingResolver, TimingState};
