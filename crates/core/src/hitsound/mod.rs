//! Lookahead scheduling of hit sound samples.
//!
//! Sound events are derived once per drawable set and kept in time order.
//! The scheduler walks them with a cursor that only moves backwards on an
//! explicit [`HitsoundScheduler::seek`].

use tracing::{debug, trace};

use crate::{
    animation::DrawableKind, audio::SampleSink, timing::timing_point_at, DrawableSet, HitObject,
    HitObjectKind, HitSound, HitsoundConfig, PreparedChart, SampleSet, SliderData,
    SliderGeometry, TimingPoint,
};

const FALLBACK_INDEX: u32 = 1;
const FALLBACK_VOLUME: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundKind {
    Hit,
    SliderEdge,
    SliderTick,
}

impl SoundKind {
    pub fn priority(self) -> SoundPriority {
        match self {
            Self::Hit | Self::SliderEdge => SoundPriority::Primary,
            Self::SliderTick => SoundPriority::Tick,
        }
    }
}

/// Ticks may be dropped by the audio backend under load; primary sounds not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SoundPriority {
    Tick,
    Primary,
}

/// One sample file to play, with its volume in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleLayer {
    pub name: String,
    pub volume: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SoundEvent {
    pub time: f64,
    pub object_index: usize,
    pub kind: SoundKind,
    pub layers: Vec<SampleLayer>,
}

/// A sample handed to the audio backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledSample {
    pub name: String,
    pub volume: f32,
    /// Wall-clock milliseconds from now until the sample should sound.
    pub delay: f64,
    pub time: f64,
    pub object_index: usize,
    pub kind: SoundKind,
    pub priority: SoundPriority,
}

/// Bank, index and volume after the fallback cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ResolvedBank {
    normal: SampleSet,
    addition: SampleSet,
    index: u32,
    volume: u32,
}

impl ResolvedBank {
    /// Object value, then timing point, then chart default, then
    /// `Normal` / index 1 / volume 100.
    fn resolve(
        normal_set: SampleSet,
        addition_set: SampleSet,
        index: u32,
        volume: u32,
        point: Option<&TimingPoint>,
        chart_default: SampleSet,
    ) -> Self {
        let point_set = point.map_or(SampleSet::None, |point| point.sample_set);
        let normal = [normal_set, point_set, chart_default]
            .into_iter()
            .find(|set| !set.is_none())
            .unwrap_or(SampleSet::Normal);

        let addition = if addition_set.is_none() {
            normal
        } else {
            addition_set
        };

        let index = Some(index)
            .filter(|&i| i != 0)
            .or_else(|| point.map(|point| point.sample_index).filter(|&i| i != 0))
            .unwrap_or(FALLBACK_INDEX);

        let volume = Some(volume)
            .filter(|&v| v != 0)
            .or_else(|| point.map(|point| point.volume).filter(|&v| v != 0))
            .unwrap_or(FALLBACK_VOLUME);

        Self {
            normal,
            addition,
            index,
            volume,
        }
    }

    fn suffix(&self) -> String {
        if self.index > 1 {
            self.index.to_string()
        } else {
            String::new()
        }
    }

    fn volume(&self) -> f32 {
        (self.volume.min(100) as f32) / 100.0
    }

    fn hit_layers(&self, sounds: HitSound) -> Vec<SampleLayer> {
        let suffix = self.suffix();
        let layer = |set: SampleSet, name: &str| SampleLayer {
            name: format!("{}-hit{name}{suffix}", set.prefix()),
            volume: self.volume(),
        };

        let mut layers = vec![layer(self.normal, "normal")];

        for (flag, name) in [
            (HitSound::WHISTLE, "whistle"),
            (HitSound::FINISH, "finish"),
            (HitSound::CLAP, "clap"),
        ] {
            if sounds.contains(flag) {
                layers.push(layer(self.addition, name));
            }
        }

        layers
    }

    fn tick_layer(&self) -> SampleLayer {
        SampleLayer {
            name: format!("{}-slidertick{}", self.normal.prefix(), self.suffix()),
            volume: self.volume(),
        }
    }
}

struct EventBuilder<'a> {
    timing_points: &'a [TimingPoint],
    chart_default: SampleSet,
    events: Vec<SoundEvent>,
}

impl EventBuilder<'_> {
    fn bank(
        &self,
        object: &HitObject,
        normal: SampleSet,
        addition: SampleSet,
        time: f64,
    ) -> ResolvedBank {
        ResolvedBank::resolve(
            normal,
            addition,
            object.samples.index,
            object.samples.volume,
            timing_point_at(self.timing_points, time),
            self.chart_default,
        )
    }

    fn hit(
        &mut self,
        index: usize,
        object: &HitObject,
        time: f64,
        kind: SoundKind,
        sounds: HitSound,
    ) {
        self.hit_with_sets(
            index,
            object,
            time,
            kind,
            sounds,
            object.samples.normal_set,
            object.samples.addition_set,
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn hit_with_sets(
        &mut self,
        index: usize,
        object: &HitObject,
        time: f64,
        kind: SoundKind,
        sounds: HitSound,
        normal: SampleSet,
        addition: SampleSet,
    ) {
        let bank = self.bank(object, normal, addition, time);

        // A custom file replaces the layered sounds entirely.
        let layers = match object.samples.filename.as_deref() {
            Some(file) if !file.is_empty() => vec![SampleLayer {
                name: file.to_owned(),
                volume: bank.volume(),
            }],
            _ => bank.hit_layers(sounds),
        };

        self.events.push(SoundEvent {
            time,
            object_index: index,
            kind,
            layers,
        });
    }

    fn slider(
        &mut self,
        index: usize,
        object: &HitObject,
        data: &SliderData,
        geometry: &SliderGeometry,
    ) {
        if data.edge_sounds.is_empty() || geometry.is_degenerate() {
            self.hit(index, object, object.start_time, SoundKind::Hit, object.hit_sound);
        } else {
            for edge in 0..=geometry.span_count {
                let time = geometry.span_start_time(edge);
                let sounds = data
                    .edge_sounds
                    .get(edge as usize)
                    .copied()
                    .unwrap_or(object.hit_sound);
                let sets = data.edge_sets.get(edge as usize).copied().unwrap_or_default();

                let normal = if sets.normal_set.is_none() {
                    object.samples.normal_set
                } else {
                    sets.normal_set
                };
                let addition = if sets.addition_set.is_none() {
                    object.samples.addition_set
                } else {
                    sets.addition_set
                };

                let kind = if edge == 0 {
                    SoundKind::Hit
                } else {
                    SoundKind::SliderEdge
                };

                self.hit_with_sets(index, object, time, kind, sounds, normal, addition);
            }
        }

        for tick in geometry.ticks() {
            let bank = self.bank(
                object,
                object.samples.normal_set,
                object.samples.addition_set,
                tick.time,
            );

            self.events.push(SoundEvent {
                time: tick.time,
                object_index: index,
                kind: SoundKind::SliderTick,
                layers: vec![bank.tick_layer()],
            });
        }
    }
}

/// Derives every sound event of `chart`, using the slider geometry of `set`.
pub fn build_events(chart: &PreparedChart, set: &DrawableSet) -> Vec<SoundEvent> {
    let mut builder = EventBuilder {
        timing_points: chart.timing_points(),
        chart_default: chart.sample_set(),
        events: Vec::new(),
    };

    for (object, drawable) in chart.hit_objects().iter().zip(set.drawables()) {
        let index = drawable.index;

        match (&object.kind, drawable.kind()) {
            (HitObjectKind::Slider(data), DrawableKind::Slider(geometry)) => {
                builder.slider(index, object, data, geometry)
            }
            (HitObjectKind::Spinner { end_time }, _) => {
                builder.hit(index, object, *end_time, SoundKind::Hit, object.hit_sound)
            }
            _ => builder.hit(index, object, object.start_time, SoundKind::Hit, object.hit_sound),
        }
    }

    let mut events = builder.events;
    events.sort_by(|a, b| {
        a.time
            .total_cmp(&b.time)
            .then_with(|| a.object_index.cmp(&b.object_index))
    });
    events
}

#[derive(Debug, Clone)]
pub struct HitsoundScheduler {
    events: Vec<SoundEvent>,
    cursor: usize,
    config: HitsoundConfig,
    skipped: u64,
    /// Latest track time whose events have all been handed out.
    fired_through: Option<f64>,
}

impl HitsoundScheduler {
    pub fn new(mut events: Vec<SoundEvent>, config: HitsoundConfig) -> Self {
        events.sort_by(|a, b| a.time.total_cmp(&b.time));

        Self {
            events,
            cursor: 0,
            config,
            skipped: 0,
            fired_through: None,
        }
    }

    pub fn from_chart(chart: &PreparedChart, set: &DrawableSet, config: HitsoundConfig) -> Self {
        Self::new(build_events(chart, set), config)
    }

    pub fn events(&self) -> &[SoundEvent] {
        &self.events
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Events passed over because they were already too old when reached.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Fires every pending event inside the window around `now`.
    ///
    /// The window is `hit_window_ms` behind and `lookahead_ms` ahead of `now`
    /// in wall-clock time, so it widens on the track timeline at higher
    /// playback rates. Returns the number of samples handed to `sink`.
    pub fn update(&mut self, now: f64, rate: f64, sink: &mut dyn SampleSink) -> usize {
        let rate = if rate.is_finite() && rate > 0.0 { rate } else { 1.0 };
        let horizon = now + self.config.lookahead_ms * rate;
        let oldest = now - self.config.hit_window_ms * rate;
        let mut played = 0;
        self.fired_through = Some(self.fired_through.map_or(horizon, |mark| mark.max(horizon)));

        while let Some(event) = self.events.get(self.cursor) {
            if event.time > horizon {
                break;
            }

            self.cursor += 1;

            if event.time < oldest {
                self.skipped += 1;
                trace!(time = event.time, now, "skipped stale hitsound");
                continue;
            }

            if !self.config.enabled
                || event.kind == SoundKind::SliderTick && !self.config.slider_ticks
            {
                continue;
            }

            let delay = ((event.time - now) / rate).max(0.0);

            for layer in &event.layers {
                sink.play_sample(&ScheduledSample {
                    name: layer.name.clone(),
                    volume: layer.volume,
                    delay,
                    time: event.time,
                    object_index: event.object_index,
                    kind: event.kind,
                    priority: event.kind.priority(),
                });
                played += 1;
            }
        }

        played
    }

    /// Moves the cursor to the first event at or after `target`.
    pub fn seek(&mut self, target: f64) {
        self.cursor = self.events.partition_point(|event| event.time < target);
        self.fired_through = None;
        debug!(target, cursor = self.cursor, "hitsound cursor moved");
    }

    /// Takes over from `previous` at `now` after a rebuild. Events that
    /// `previous` already handed out, including those it fired early inside
    /// its lookahead, are not fired again.
    pub fn resume_after(&mut self, previous: &HitsoundScheduler, now: f64) {
        self.seek(now);

        if let Some(mark) = previous.fired_through {
            let handed_out = self.events.partition_point(|event| event.time <= mark);
            self.cursor = self.cursor.max(handed_out);
            self.fired_through = Some(mark);
        }
    }
}
