//! Chart data model and load-time validation.
//!
//! The engine never parses chart files; a collaborator builds a [`Chart`] and
//! hands it over. [`Chart::prepare`] is the single place where ordering and
//! validity are enforced.

use bitflags::bitflags;
use tracing::debug;

use crate::{curve::PathKind, PlayerError, Pos2, Result};

/// Sample bank. `None` defers to the enclosing timing point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SampleSet {
    #[default]
    None,
    Normal,
    Soft,
    Drum,
}

impl SampleSet {
    /// Bank prefix used in sample file names.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::None | Self::Normal => "normal",
            Self::Soft => "soft",
            Self::Drum => "drum",
        }
    }

    pub fn is_none(self) -> bool {
        self == Self::None
    }
}

bitflags! {
    /// Hit sound layers of an object or slider edge.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct HitSound: u8 {
        const NORMAL = 1 << 0;
        const WHISTLE = 1 << 1;
        const FINISH = 1 << 2;
        const CLAP = 1 << 3;
    }
}

bitflags! {
    /// Timing point effect flags.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct Effects: u8 {
        const KIAI = 1 << 0;
        const OMIT_FIRST_BAR_LINE = 1 << 3;
    }
}

/// Per-object sample override. Zero and `None` values inherit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HitSampleInfo {
    pub normal_set: SampleSet,
    pub addition_set: SampleSet,
    pub index: u32,
    pub volume: u32,
    /// Custom sample file that replaces the layered hit sounds.
    pub filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimingPoint {
    pub time: f64,
    /// Milliseconds per beat when uninherited; negative velocity encoding
    /// otherwise.
    pub beat_length: f64,
    pub meter: u32,
    pub sample_set: SampleSet,
    pub sample_index: u32,
    pub volume: u32,
    pub uninherited: bool,
    pub effects: Effects,
}

impl TimingPoint {
    pub fn uninherited(time: f64, beat_length: f64) -> Self {
        Self {
            time,
            beat_length,
            meter: 4,
            sample_set: SampleSet::Normal,
            sample_index: 1,
            volume: 100,
            uninherited: true,
            effects: Effects::empty(),
        }
    }

    /// Inherited point with a velocity multiplier encoded as `-100 / sv`.
    pub fn inherited(time: f64, sv_multiplier: f64) -> Self {
        Self {
            beat_length: -100.0 / sv_multiplier,
            uninherited: false,
            ..Self::uninherited(time, 0.0)
        }
    }

    pub fn is_kiai(&self) -> bool {
        self.effects.contains(Effects::KIAI)
    }
}

/// Sample banks of a single slider edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeSet {
    pub normal_set: SampleSet,
    pub addition_set: SampleSet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SliderData {
    pub path_kind: PathKind,
    /// Absolute playfield positions; the first one is the slider head.
    pub control_points: Vec<Pos2>,
    /// Number of reversals; the slider has `repeat_count + 1` spans.
    pub repeat_count: u32,
    pub pixel_length: f64,
    /// One entry per edge (head, each repeat, tail) when present.
    pub edge_sounds: Vec<HitSound>,
    pub edge_sets: Vec<EdgeSet>,
}

impl SliderData {
    pub fn span_count(&self) -> u32 {
        self.repeat_count.saturating_add(1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HitObjectKind {
    Circle,
    Slider(SliderData),
    Spinner { end_time: f64 },
    Hold { end_time: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct HitObject {
    pub start_time: f64,
    pub pos: Pos2,
    pub new_combo: bool,
    /// Extra combo colours to skip when `new_combo` is set.
    pub combo_offset: u32,
    pub hit_sound: HitSound,
    pub samples: HitSampleInfo,
    pub kind: HitObjectKind,
}

impl HitObject {
    pub fn circle(start_time: f64, pos: Pos2) -> Self {
        Self {
            start_time,
            pos,
            new_combo: false,
            combo_offset: 0,
            hit_sound: HitSound::NORMAL,
            samples: HitSampleInfo::default(),
            kind: HitObjectKind::Circle,
        }
    }

    pub fn slider(start_time: f64, data: SliderData) -> Self {
        let pos = data.control_points.first().copied().unwrap_or_default();

        Self {
            kind: HitObjectKind::Slider(data),
            ..Self::circle(start_time, pos)
        }
    }

    pub fn spinner(start_time: f64, end_time: f64) -> Self {
        Self {
            new_combo: true,
            kind: HitObjectKind::Spinner { end_time },
            ..Self::circle(start_time, Pos2::center())
        }
    }

    pub fn hold(start_time: f64, end_time: f64, pos: Pos2) -> Self {
        Self {
            kind: HitObjectKind::Hold { end_time },
            ..Self::circle(start_time, pos)
        }
    }

    pub fn with_new_combo(mut self) -> Self {
        self.new_combo = true;
        self
    }

    /// End time for objects that carry one explicitly. Slider ends depend on
    /// timing and are computed by [`crate::SliderGeometry`].
    pub fn explicit_end_time(&self) -> Option<f64> {
        match self.kind {
            HitObjectKind::Circle | HitObjectKind::Slider(_) => None,
            HitObjectKind::Spinner { end_time } | HitObjectKind::Hold { end_time } => {
                Some(end_time)
            }
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            HitObjectKind::Circle => "circle",
            HitObjectKind::Slider(_) => "slider",
            HitObjectKind::Spinner { .. } => "spinner",
            HitObjectKind::Hold { .. } => "hold",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Difficulty {
    pub circle_size: f32,
    pub approach_rate: f32,
    pub overall_difficulty: f32,
    pub hp_drain_rate: f32,
    pub slider_multiplier: f64,
    pub slider_tick_rate: f64,
}

impl Default for Difficulty {
    fn default() -> Self {
        Self {
            circle_size: 5.0,
            approach_rate: 5.0,
            overall_difficulty: 5.0,
            hp_drain_rate: 5.0,
            slider_multiplier: 1.4,
            slider_tick_rate: 1.0,
        }
    }
}

impl Difficulty {
    fn is_finite(&self) -> bool {
        self.circle_size.is_finite()
            && self.approach_rate.is_finite()
            && self.overall_difficulty.is_finite()
            && self.hp_drain_rate.is_finite()
            && self.slider_multiplier.is_finite()
            && self.slider_tick_rate.is_finite()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GameMode {
    #[default]
    Osu,
    Taiko,
    Catch,
    Mania,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub title: String,
    pub artist: String,
    pub creator: String,
    pub version: String,
}

/// A chart as handed over by the parser, in no particular order.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub format_version: i32,
    pub mode: GameMode,
    pub difficulty: Difficulty,
    pub timing_points: Vec<TimingPoint>,
    pub hit_objects: Vec<HitObject>,
    /// Default sample bank when timing points leave it unset.
    pub sample_set: SampleSet,
    pub audio_file: Option<String>,
    pub metadata: Metadata,
}

impl Default for Chart {
    fn default() -> Self {
        Self {
            format_version: 14,
            mode: GameMode::Osu,
            difficulty: Difficulty::default(),
            timing_points: Vec::new(),
            hit_objects: Vec::new(),
            sample_set: SampleSet::Normal,
            audio_file: None,
            metadata: Metadata::default(),
        }
    }
}

/// Combo colour and number of one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComboInfo {
    pub colour_index: u32,
    /// Position inside the combo, starting at 1. Spinners carry none.
    pub number: Option<u32>,
}

impl Chart {
    /// Validates the chart and puts it into playback order.
    pub fn prepare(self) -> Result<PreparedChart> {
        if self.mode != GameMode::Osu {
            return Err(PlayerError::unsupported(format!("game mode {:?}", self.mode)));
        }

        if !self.difficulty.is_finite() {
            return Err(PlayerError::invalid_chart("non-finite difficulty value"));
        }

        for (idx, point) in self.timing_points.iter().enumerate() {
            if !point.time.is_finite() || point.beat_length.is_nan() {
                return Err(PlayerError::invalid_chart(format!(
                    "timing point {idx} has a non-finite value"
                )));
            }
        }

        for (idx, object) in self.hit_objects.iter().enumerate() {
            validate_object(idx, object)?;
        }

        let Chart {
            format_version,
            difficulty,
            mut timing_points,
            mut hit_objects,
            sample_set,
            audio_file,
            metadata,
            ..
        } = self;

        // Stable sorts keep file order between equal keys.
        timing_points.sort_by(|a, b| {
            a.time
                .total_cmp(&b.time)
                .then_with(|| b.uninherited.cmp(&a.uninherited))
        });
        hit_objects.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

        let combos = assign_combos(&hit_objects);

        debug!(
            objects = hit_objects.len(),
            timing_points = timing_points.len(),
            "prepared chart"
        );

        Ok(PreparedChart {
            format_version,
            difficulty,
            timing_points,
            hit_objects,
            combos,
            sample_set,
            audio_file,
            metadata,
        })
    }
}

fn validate_object(idx: usize, object: &HitObject) -> Result<()> {
    if !object.start_time.is_finite() || !object.pos.is_finite() {
        return Err(PlayerError::invalid_chart(format!(
            "object {idx} has a non-finite time or position"
        )));
    }

    match &object.kind {
        HitObjectKind::Circle => Ok(()),
        HitObjectKind::Slider(slider) => {
            if slider.control_points.is_empty() {
                return Err(PlayerError::invalid_chart(format!(
                    "slider {idx} has no control points"
                )));
            }

            if slider.pixel_length.is_nan() {
                return Err(PlayerError::invalid_chart(format!(
                    "slider {idx} has no usable length"
                )));
            }

            Ok(())
        }
        HitObjectKind::Spinner { end_time } | HitObjectKind::Hold { end_time } => {
            if !end_time.is_finite() || *end_time < object.start_time {
                return Err(PlayerError::invalid_chart(format!(
                    "{} {idx} ends before it starts",
                    object.kind_name()
                )));
            }

            Ok(())
        }
    }
}

fn assign_combos(objects: &[HitObject]) -> Vec<ComboInfo> {
    let mut combos = Vec::with_capacity(objects.len());
    let mut colour_index = 0u32;
    let mut number = 0u32;
    let mut force_new = true;
    let mut first = true;

    for object in objects {
        if matches!(object.kind, HitObjectKind::Spinner { .. }) {
            combos.push(ComboInfo {
                colour_index,
                number: None,
            });
            force_new = true;
            continue;
        }

        if object.new_combo || force_new {
            let skip = if object.new_combo { object.combo_offset } else { 0 };

            colour_index = if first {
                skip
            } else {
                colour_index.wrapping_add(1 + skip)
            };
            number = 1;
        } else {
            number += 1;
        }

        combos.push(ComboInfo {
            colour_index,
            number: Some(number),
        });
        force_new = false;
        first = false;
    }

    combos
}

/// A validated chart with timing points and objects in playback order.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedChart {
    format_version: i32,
    difficulty: Difficulty,
    timing_points: Vec<TimingPoint>,
    hit_objects: Vec<HitObject>,
    combos: Vec<ComboInfo>,
    sample_set: SampleSet,
    audio_file: Option<String>,
    metadata: Metadata,
}

impl PreparedChart {
    pub fn format_version(&self) -> i32 {
        self.format_version
    }

    pub fn difficulty(&self) -> &Difficulty {
        &self.difficulty
    }

    pub fn timing_points(&self) -> &[TimingPoint] {
        &self.timing_points
    }

    pub fn hit_objects(&self) -> &[HitObject] {
        &self.hit_objects
    }

    pub fn combos(&self) -> &[ComboInfo] {
        &self.combos
    }

    pub fn sample_set(&self) -> SampleSet {
        self.sample_set
    }

    pub fn audio_file(&self) -> Option<&str> {
        self.audio_file.as_deref()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn is_empty(&self) -> bool {
        self.hit_objects.is_empty()
    }
}
