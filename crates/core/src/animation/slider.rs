use crate::{
    easing::{lerp, progress, Easing},
    Pos2, SliderEventKind, SliderGeometry,
};

use super::{circle_visual, CircleVisual, ObjectTiming, HIT_FADE_MS, HIT_SCALE};

const FOLLOW_IN_MS: f64 = 300.0;
const FOLLOW_OUT_MS: f64 = 240.0;
const FOLLOW_START_SCALE: f64 = 0.5;
const FOLLOW_END_SCALE: f64 = 0.8;
const TICK_FADE_IN_MS: f64 = 150.0;
/// Extra lead for ticks on the first span, as a share of preempt.
const FIRST_SPAN_TICK_LEAD: f64 = 0.66;
const LATER_SPAN_TICK_LEAD_MS: f64 = 200.0;
const ARROW_FADE_IN_MS: f64 = 150.0;
const ARROW_HIT_FADE_MS: f64 = 150.0;
const ARROW_PULSE_MS: f64 = 300.0;
const ARROW_PULSE_SCALE: f64 = 1.3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickVisual {
    pub position: Pos2,
    pub alpha: f32,
    pub scale: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrowVisual {
    pub position: Pos2,
    /// Radians, pointing back along the path.
    pub rotation: f32,
    pub alpha: f32,
    pub scale: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SliderVisual {
    pub body_alpha: f32,
    pub head: CircleVisual,
    pub ball_position: Pos2,
    pub ball_alpha: f32,
    pub follow_alpha: f32,
    pub follow_scale: f32,
    pub ticks: Vec<TickVisual>,
    pub arrows: Vec<ArrowVisual>,
}

impl SliderVisual {
    pub fn is_visible(&self) -> bool {
        self.body_alpha > 0.0
            || self.head.is_visible()
            || self.ball_alpha > 0.0
            || self.follow_alpha > 0.0
            || self.ticks.iter().any(|tick| tick.alpha > 0.0)
            || self.arrows.iter().any(|arrow| arrow.alpha > 0.0)
    }
}

pub fn slider_visual(
    geometry: &SliderGeometry,
    timing: &ObjectTiming,
    time: f64,
    hidden: bool,
) -> SliderVisual {
    let body_fade = if hidden { hidden_body_factor(timing, time) } else { 1.0 };
    let (follow_alpha, follow_scale) = follow_circle(geometry, time);

    let ball_live = !geometry.is_degenerate()
        && time >= geometry.start_time
        && time < geometry.end_time;

    SliderVisual {
        body_alpha: (body_alpha(timing, time) * body_fade) as f32,
        head: circle_visual(timing, time, hidden),
        ball_position: geometry.ball_position(time),
        ball_alpha: if ball_live { 1.0 } else { 0.0 },
        follow_alpha,
        follow_scale,
        ticks: tick_visuals(geometry, timing, time, body_fade),
        arrows: arrow_visuals(geometry, timing, time, body_fade),
    }
}

/// Same envelope as the head until the hit, held while sliding, then the
/// regular post-hit fade from the end.
fn body_alpha(timing: &ObjectTiming, time: f64) -> f64 {
    if time < timing.start_time {
        progress(time, timing.appear_time(), timing.fade_in)
    } else if time < timing.end_time {
        1.0
    } else {
        1.0 - Easing::OutQuad.apply(progress(time, timing.end_time, HIT_FADE_MS))
    }
}

/// Under Hidden the body fades from the head's fade-out start and is gone by
/// the time the ball reaches the end.
fn hidden_body_factor(timing: &ObjectTiming, time: f64) -> f64 {
    let start = timing.hidden_fade_out_start();
    1.0 - Easing::OutQuad.apply(progress(time, start, timing.end_time - start))
}

fn follow_circle(geometry: &SliderGeometry, time: f64) -> (f32, f32) {
    if geometry.is_degenerate() || time < geometry.start_time {
        return (0.0, FOLLOW_START_SCALE as f32);
    }

    let grow = |at: f64| progress(at, geometry.start_time, FOLLOW_IN_MS);

    if time < geometry.end_time {
        let t = grow(time);

        return (
            Easing::OutQuad.apply(t) as f32,
            Easing::OutQuint.interpolate(FOLLOW_START_SCALE, 1.0, t) as f32,
        );
    }

    let at_end = grow(geometry.end_time);
    let alpha_at_end = Easing::OutQuad.apply(at_end);
    let scale_at_end = Easing::OutQuint.interpolate(FOLLOW_START_SCALE, 1.0, at_end);
    let out = Easing::OutQuad.apply(progress(time, geometry.end_time, FOLLOW_OUT_MS));

    (
        (alpha_at_end * (1.0 - out)) as f32,
        lerp(scale_at_end, FOLLOW_END_SCALE, out) as f32,
    )
}

fn tick_visuals(
    geometry: &SliderGeometry,
    timing: &ObjectTiming,
    time: f64,
    body_fade: f64,
) -> Vec<TickVisual> {
    geometry
        .ticks()
        .map(|tick| {
            let span_start = geometry.span_start_time(tick.span_index);
            let lead = if tick.span_index == 0 {
                FIRST_SPAN_TICK_LEAD * timing.preempt
            } else {
                LATER_SPAN_TICK_LEAD_MS
            };
            let appear = tick.time - ((tick.time - span_start) / 2.0 + lead);
            let position = geometry.path.position_at(tick.progress);

            if time < appear || time >= tick.time {
                return TickVisual {
                    position,
                    alpha: 0.0,
                    scale: 0.5,
                };
            }

            TickVisual {
                position,
                alpha: (progress(time, appear, TICK_FADE_IN_MS) * body_fade) as f32,
                scale: Easing::OutElasticHalf
                    .interpolate(0.5, 1.0, progress(time, appear, TICK_FADE_IN_MS * 4.0))
                    as f32,
            }
        })
        .collect()
}

fn arrow_visuals(
    geometry: &SliderGeometry,
    timing: &ObjectTiming,
    time: f64,
    body_fade: f64,
) -> Vec<ArrowVisual> {
    let fade_in = ARROW_FADE_IN_MS.min(geometry.span_duration);

    geometry
        .events
        .iter()
        .filter(|event| event.kind == SliderEventKind::Repeat)
        .enumerate()
        .map(|(i, repeat)| {
            let appear = if i == 0 {
                timing.appear_time()
            } else {
                geometry.start_time + (i - 1) as f64 * geometry.span_duration
            };

            let at_end = repeat.progress >= 0.5;
            let position = geometry.path.position_at(repeat.progress);
            let rotation = if at_end {
                (-geometry.path.direction_at(1.0)).angle()
            } else {
                geometry.path.direction_at(0.0).angle()
            };

            let (alpha, scale) = if time < appear {
                (0.0, 1.0)
            } else if time < repeat.time {
                let phase = (time - appear).rem_euclid(ARROW_PULSE_MS) / ARROW_PULSE_MS;

                (
                    progress(time, appear, fade_in),
                    Easing::OutQuad.interpolate(ARROW_PULSE_SCALE, 1.0, phase),
                )
            } else {
                let fade = progress(time, repeat.time, ARROW_HIT_FADE_MS);

                (
                    1.0 - Easing::OutQuad.apply(fade),
                    Easing::OutQuad.interpolate(1.0, HIT_SCALE, fade),
                )
            };

            ArrowVisual {
                position,
                rotation,
                alpha: (alpha * body_fade) as f32,
                scale: scale as f32,
            }
        })
        .collect()
}
