//! Conversion from parsed `.osu` files into engine charts.

use beatmap_player_core::{
    Chart, Difficulty, EdgeSet, Effects, GameMode, HitObject, HitObjectKind, HitSampleInfo,
    HitSound, Metadata, PathKind, Pos2, SampleSet, SliderData, TimingPoint,
};
use rosu_map::{
    section::{
        general::GameMode as RosuMode,
        hit_objects::{
            hit_samples::{
                HitSampleDefaultName, HitSampleInfo as RosuSample, HitSampleInfoName, SampleBank,
            },
            HitObject as RosuObject, HitObjectKind as RosuKind, PathControlPoint, PathType,
        },
        timing_points::{DifficultyPoint, EffectPoint, SamplePoint},
    },
    Beatmap,
};

/// Playfield y of mania hold notes, which only carry a column.
const HOLD_Y: f32 = 192.0;

pub fn chart_from_beatmap(beatmap: &Beatmap) -> Chart {
    let hit_objects = beatmap.hit_objects.iter().map(convert_object).collect();

    Chart {
        format_version: beatmap.format_version,
        mode: match beatmap.mode {
            RosuMode::Osu => GameMode::Osu,
            RosuMode::Taiko => GameMode::Taiko,
            RosuMode::Catch => GameMode::Catch,
            RosuMode::Mania => GameMode::Mania,
        },
        difficulty: Difficulty {
            circle_size: beatmap.circle_size,
            approach_rate: beatmap.approach_rate,
            overall_difficulty: beatmap.overall_difficulty,
            hp_drain_rate: beatmap.hp_drain_rate,
            slider_multiplier: beatmap.slider_multiplier,
            slider_tick_rate: beatmap.slider_tick_rate,
        },
        timing_points: convert_timing(beatmap),
        hit_objects,
        sample_set: match sample_set(beatmap.default_sample_bank) {
            SampleSet::None => SampleSet::Normal,
            set => set,
        },
        audio_file: Some(beatmap.audio_file.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_owned),
        metadata: Metadata {
            title: beatmap.title.clone(),
            artist: beatmap.artist.clone(),
            creator: beatmap.creator.clone(),
            version: beatmap.version.clone(),
        },
    }
}

/// Flattens the separate timing, velocity, sample and effect point lists
/// into one list of red and green lines.
fn convert_timing(beatmap: &Beatmap) -> Vec<TimingPoint> {
    let points = &beatmap.control_points;
    let mut out = Vec::new();

    for point in &points.timing_points {
        out.push(TimingPoint::uninherited(point.time, point.beat_len));
    }

    let mut green_times: Vec<f64> = points
        .difficulty_points
        .iter()
        .map(|point| point.time)
        .chain(points.sample_points.iter().map(|point| point.time))
        .chain(points.effect_points.iter().map(|point| point.time))
        .collect();
    green_times.sort_by(f64::total_cmp);
    green_times.dedup();

    for time in green_times {
        let sv = active(&points.difficulty_points, time, |point| point.time)
            .map_or(1.0, |point: &DifficultyPoint| point.slider_velocity);
        out.push(TimingPoint::inherited(time, sv));
    }

    for point in &mut out {
        if let Some(sample) = active(&points.sample_points, point.time, |p| p.time) {
            apply_sample_point(point, sample);
        }

        let kiai = active(&points.effect_points, point.time, |p| p.time)
            .is_some_and(|effect: &EffectPoint| effect.kiai);
        point.effects.set(Effects::KIAI, kiai);
    }

    out
}

fn apply_sample_point(point: &mut TimingPoint, sample: &SamplePoint) {
    point.sample_set = sample_set(sample.sample_bank);
    point.sample_index = u32::try_from(sample.custom_sample_bank).unwrap_or(0);
    point.volume = u32::try_from(sample.sample_volume).unwrap_or(0);
}

/// Last point at or before `time` in a time-sorted list.
fn active<T>(points: &[T], time: f64, time_of: impl Fn(&T) -> f64) -> Option<&T> {
    let idx = points.partition_point(|point| time_of(point) <= time);
    idx.checked_sub(1).map(|idx| &points[idx])
}

fn convert_object(object: &RosuObject) -> HitObject {
    let base = |pos: Pos2, new_combo: bool, combo_offset: i32| HitObject {
        new_combo,
        combo_offset: u32::try_from(combo_offset).unwrap_or(0),
        hit_sound: hit_sound(&object.samples),
        samples: sample_info(&object.samples),
        ..HitObject::circle(object.start_time, pos)
    };

    match &object.kind {
        RosuKind::Circle(circle) => base(
            pos(circle.pos.x, circle.pos.y),
            circle.new_combo,
            circle.combo_offset,
        ),
        RosuKind::Slider(slider) => {
            let head = pos(slider.pos.x, slider.pos.y);
            let (path_kind, control_points) = convert_path(head, slider.path.control_points());
            let data = SliderData {
                path_kind,
                control_points,
                repeat_count: u32::try_from(slider.repeat_count).unwrap_or(0),
                pixel_length: slider.path.expected_dist().unwrap_or(0.0),
                edge_sounds: slider.node_samples.iter().map(|node| hit_sound(node)).collect(),
                edge_sets: slider.node_samples.iter().map(|node| edge_set(node)).collect(),
            };

            HitObject {
                kind: HitObjectKind::Slider(data),
                ..base(head, slider.new_combo, slider.combo_offset)
            }
        }
        RosuKind::Spinner(spinner) => HitObject {
            kind: HitObjectKind::Spinner {
                end_time: object.start_time + spinner.duration,
            },
            ..base(pos(spinner.pos.x, spinner.pos.y), spinner.new_combo, 0)
        },
        RosuKind::Hold(hold) => HitObject {
            kind: HitObjectKind::Hold {
                end_time: object.start_time + hold.duration,
            },
            ..base(pos(hold.pos_x, HOLD_Y), false, 0)
        },
    }
}

fn pos(x: f32, y: f32) -> Pos2 {
    Pos2::new(x, y)
}

/// Makes control points absolute. For bezier paths, every typed point past
/// the head is doubled so it starts a new segment.
fn convert_path(head: Pos2, points: &[PathControlPoint]) -> (PathKind, Vec<Pos2>) {
    let kind = points
        .first()
        .and_then(|point| point.path_type.as_ref())
        .map_or(PathKind::Bezier, path_kind);
    let mut out = Vec::with_capacity(points.len());

    for (idx, point) in points.iter().enumerate() {
        let absolute = pos(head.x + point.pos.x, head.y + point.pos.y);
        let segment_start = idx > 0 && idx + 1 < points.len() && point.path_type.is_some();

        if kind == PathKind::Bezier && segment_start {
            out.push(absolute);
        }
        out.push(absolute);
    }

    if out.is_empty() {
        out.push(head);
    }

    (kind, out)
}

fn path_kind(path_type: &PathType) -> PathKind {
    if *path_type == PathType::LINEAR {
        PathKind::Linear
    } else if *path_type == PathType::PERFECT_CURVE {
        PathKind::PerfectCurve
    } else if *path_type == PathType::CATMULL {
        PathKind::Catmull
    } else {
        PathKind::Bezier
    }
}

fn default_name(sample: &RosuSample) -> Option<&HitSampleDefaultName> {
    match &sample.name {
        HitSampleInfoName::Default(name) => Some(name),
        HitSampleInfoName::File(_) => None,
    }
}

fn hit_sound(samples: &[RosuSample]) -> HitSound {
    samples
        .iter()
        .filter_map(default_name)
        .fold(HitSound::NORMAL, |sound, name| {
            sound
                | match name {
                    HitSampleDefaultName::Normal => HitSound::NORMAL,
                    HitSampleDefaultName::Whistle => HitSound::WHISTLE,
                    HitSampleDefaultName::Finish => HitSound::FINISH,
                    HitSampleDefaultName::Clap => HitSound::CLAP,
                }
        })
}

fn is_normal(sample: &&RosuSample) -> bool {
    matches!(default_name(sample), Some(HitSampleDefaultName::Normal))
}

fn is_addition(sample: &&RosuSample) -> bool {
    matches!(
        default_name(sample),
        Some(
            HitSampleDefaultName::Whistle
                | HitSampleDefaultName::Finish
                | HitSampleDefaultName::Clap
        )
    )
}

fn sample_info(samples: &[RosuSample]) -> HitSampleInfo {
    let normal = samples.iter().find(is_normal);
    let addition = samples.iter().find(is_addition);
    let reference = normal.or(addition).or(samples.first());

    HitSampleInfo {
        normal_set: normal.map_or(SampleSet::None, specified_set),
        addition_set: addition.map_or(SampleSet::None, specified_set),
        index: reference.map_or(0, |sample| {
            u32::try_from(sample.custom_sample_bank).unwrap_or(0)
        }),
        volume: reference.map_or(0, |sample| u32::try_from(sample.volume).unwrap_or(0)),
        filename: samples.iter().find_map(|sample| match &sample.name {
            HitSampleInfoName::File(name) => Some(name.clone()),
            HitSampleInfoName::Default(_) => None,
        }),
    }
}

fn edge_set(samples: &[RosuSample]) -> EdgeSet {
    EdgeSet {
        normal_set: samples.iter().find(is_normal).map_or(SampleSet::None, specified_set),
        addition_set: samples.iter().find(is_addition).map_or(SampleSet::None, specified_set),
    }
}

/// Bank of a sample, or `None` when it should come from the timing point.
fn specified_set(sample: &RosuSample) -> SampleSet {
    if sample.bank_specified {
        sample_set(sample.bank)
    } else {
        SampleSet::None
    }
}

fn sample_set(bank: SampleBank) -> SampleSet {
    match bank {
        SampleBank::None => SampleSet::None,
        SampleBank::Normal => SampleSet::Normal,
        SampleBank::Soft => SampleSet::Soft,
        SampleBank::Drum => SampleSet::Drum,
    }
}
