//! Slider duration, end position and nested tick / repeat events.

use crate::{CurveConfig, Difficulty, Pos2, SliderData, SliderPath, TimingState};

/// Ticks closer than this (in time) to a span end are dropped.
const TICK_END_GUARD_MS: f64 = 10.0;
/// Charts older than this version scale tick spacing with slider velocity.
const LEGACY_TICK_VERSION: i32 = 8;
/// Repeat counts come straight from the chart; larger sliders grow on demand.
const MAX_PREALLOCATED_EVENTS: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliderEventKind {
    Tick,
    Repeat,
}

/// A point of interest along a slider, in chronological order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderEvent {
    pub kind: SliderEventKind,
    pub span_index: u32,
    /// Path progress in `[0, 1]` where the event sits.
    pub progress: f64,
    pub time: f64,
}

/// Everything about a slider that depends on timing and difficulty.
///
/// Rebuilt whenever mods or difficulty change; never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct SliderGeometry {
    pub path: SliderPath,
    pub start_time: f64,
    pub span_count: u32,
    pub span_duration: f64,
    pub duration: f64,
    pub end_time: f64,
    /// Ball speed in osu!pixels per millisecond.
    pub velocity: f64,
    pub tick_distance: f64,
    pub min_distance_from_end: f64,
    pub events: Vec<SliderEvent>,
    pub end_position: Pos2,
}

impl SliderGeometry {
    pub fn compute(
        data: &SliderData,
        start_time: f64,
        state: TimingState,
        difficulty: &Difficulty,
        format_version: i32,
        config: &CurveConfig,
    ) -> Self {
        let declared = Some(data.pixel_length).filter(|len| len.is_finite() && *len > 0.0);
        let path = SliderPath::new(data.path_kind, &data.control_points, declared, config);
        let span_count = data.span_count();
        let distance = path.distance();

        let scoring_distance = 100.0 * difficulty.slider_multiplier * state.sv_multiplier;
        let velocity = scoring_distance / state.base_beat_length;
        let span_duration = distance * state.base_beat_length / scoring_distance;

        let usable = declared.is_some()
            && distance > 0.0
            && span_duration.is_finite()
            && span_duration > 0.0;

        if !usable {
            let head = path.start_position();

            return Self {
                path,
                start_time,
                span_count,
                span_duration: 0.0,
                duration: 0.0,
                end_time: start_time,
                velocity: 0.0,
                tick_distance: 0.0,
                min_distance_from_end: 0.0,
                events: Vec::new(),
                end_position: head,
            };
        }

        let mut tick_distance = scoring_distance / difficulty.slider_tick_rate;
        if format_version < LEGACY_TICK_VERSION {
            tick_distance /= state.sv_multiplier;
        }
        let tick_distance = if tick_distance.is_finite() {
            tick_distance.clamp(0.0, distance)
        } else {
            0.0
        };

        let min_distance_from_end = velocity * TICK_END_GUARD_MS;
        let duration = span_duration * span_count as f64;

        let end_position = if span_count % 2 == 0 {
            path.start_position()
        } else {
            path.end_position()
        };

        let mut geometry = Self {
            path,
            start_time,
            span_count,
            span_duration,
            duration,
            end_time: start_time + duration,
            velocity,
            tick_distance,
            min_distance_from_end,
            events: Vec::new(),
            end_position,
        };

        geometry.events = geometry.generate_events();
        geometry
    }

    fn generate_events(&self) -> Vec<SliderEvent> {
        let length = self.path.distance();
        let mut tick_progress = Vec::new();

        if self.tick_distance > 0.0 {
            let mut d = self.tick_distance;

            while d <= length {
                if d >= length - self.min_distance_from_end {
                    break;
                }

                tick_progress.push(d / length);
                d += self.tick_distance;
            }
        }

        let capacity = (tick_progress.len() + 1)
            .saturating_mul(self.span_count as usize)
            .min(MAX_PREALLOCATED_EVENTS);
        let mut events = Vec::with_capacity(capacity);

        for span in 0..self.span_count {
            let span_start = self.span_start_time(span);
            let reversed = span % 2 == 1;

            let ticks = tick_progress.iter().map(|&progress| {
                let time_progress = if reversed { 1.0 - progress } else { progress };

                SliderEvent {
                    kind: SliderEventKind::Tick,
                    span_index: span,
                    progress,
                    time: span_start + time_progress * self.span_duration,
                }
            });

            if reversed {
                events.extend(ticks.rev());
            } else {
                events.extend(ticks);
            }

            if span + 1 < self.span_count {
                events.push(SliderEvent {
                    kind: SliderEventKind::Repeat,
                    span_index: span,
                    progress: if span % 2 == 0 { 1.0 } else { 0.0 },
                    time: self.span_start_time(span + 1),
                });
            }
        }

        events
    }

    /// True when the slider collapsed to a single node.
    pub fn is_degenerate(&self) -> bool {
        self.duration <= 0.0
    }

    pub fn span_start_time(&self, span: u32) -> f64 {
        self.start_time + span as f64 * self.span_duration
    }

    /// Span the ball is travelling at `time`, clamped to the valid range.
    pub fn span_at(&self, time: f64) -> u32 {
        if self.is_degenerate() {
            return 0;
        }

        let span = ((time - self.start_time) / self.span_duration).floor();
        (span.max(0.0) as u32).min(self.span_count - 1)
    }

    /// Path progress of the ball `elapsed` milliseconds after the head.
    pub fn ball_progress(&self, elapsed: f64) -> f64 {
        if self.is_degenerate() || elapsed.is_nan() {
            return 0.0;
        }

        let spans = (elapsed / self.span_duration).clamp(0.0, self.span_count as f64);
        triangle_wave(spans)
    }

    pub fn ball_position(&self, time: f64) -> Pos2 {
        self.path.position_at(self.ball_progress(time - self.start_time))
    }

    pub fn ticks(&self) -> impl Iterator<Item = &SliderEvent> {
        self.events
            .iter()
            .filter(|event| event.kind == SliderEventKind::Tick)
    }

    pub fn repeats(&self) -> impl Iterator<Item = &SliderEvent> {
        self.events
            .iter()
            .filter(|event| event.kind == SliderEventKind::Repeat)
    }
}

/// Maps `x` onto 0→1→0→1..., period 2.
pub fn triangle_wave(x: f64) -> f64 {
    let m = x.rem_euclid(2.0);

    if m <= 1.0 {
        m
    } else {
        2.0 - m
    }
}
